//! `trcli suites` command

use clap::Subcommand;
use miette::Result;

use crate::cli::commands::utils::connect;
use crate::cli::output::{print_records, to_values};
use crate::cli::GlobalOpts;
use crate::core::TestRailApi;

#[derive(Subcommand, Debug)]
pub enum SuitesCommands {
    /// List suites of a project
    List(ListArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Project ID
    #[arg(long)]
    pub project_id: u64,
}

pub fn run(cmd: SuitesCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        SuitesCommands::List(args) => {
            let client = connect(global)?;
            let suites = client
                .get_suites(args.project_id)
                .map_err(|e| miette::miette!("{}", e))?;
            print_records(&to_values(&suites)?, &["id", "name"], "suite", global)
        }
    }
}
