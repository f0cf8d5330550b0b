//! `trcli projects` command - Find the project IDs other commands take

use clap::Subcommand;
use miette::Result;

use crate::cli::commands::utils::connect;
use crate::cli::output::{print_record, print_records};
use crate::cli::GlobalOpts;

const LIST_COLUMNS: &[&str] = &["id", "name", "suite_mode", "is_completed"];

#[derive(Subcommand, Debug)]
pub enum ProjectsCommands {
    /// List projects
    List(ListArgs),

    /// Show a single project
    Get(GetArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Only active projects
    #[arg(long, conflicts_with = "completed")]
    pub active: bool,

    /// Only completed projects
    #[arg(long)]
    pub completed: bool,
}

impl ListArgs {
    fn is_completed(&self) -> Option<bool> {
        match (self.active, self.completed) {
            (true, _) => Some(false),
            (_, true) => Some(true),
            _ => None,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct GetArgs {
    /// Project ID
    pub project_id: u64,
}

pub fn run(cmd: ProjectsCommands, global: &GlobalOpts) -> Result<()> {
    let client = connect(global)?;
    match cmd {
        ProjectsCommands::List(args) => {
            let projects = client
                .get_projects(args.is_completed())
                .map_err(|e| miette::miette!("{}", e))?;
            print_records(&projects, LIST_COLUMNS, "project", global)
        }
        ProjectsCommands::Get(args) => {
            let project = client
                .get_project(args.project_id)
                .map_err(|e| miette::miette!("{}", e))?;
            print_record(&project, global)
        }
    }
}
