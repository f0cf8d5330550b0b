//! `trcli sections` command - Section listing and path resolution

use clap::Subcommand;
use console::style;
use miette::Result;

use crate::cli::commands::utils::connect;
use crate::cli::output::{print_records, to_values};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{SectionResolver, TestRailApi};

const LIST_COLUMNS: &[&str] = &["id", "name", "parent_id", "suite_id"];

#[derive(Subcommand, Debug)]
pub enum SectionsCommands {
    /// List sections of a project or suite
    List(ListArgs),

    /// Print the ID of a section path such as "Auth/Login"
    Resolve(ResolveArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Project ID
    #[arg(long)]
    pub project_id: u64,

    /// Suite ID (required for multi-suite projects)
    #[arg(long)]
    pub suite_id: Option<u64>,
}

#[derive(clap::Args, Debug)]
pub struct ResolveArgs {
    /// Slash-delimited section path
    pub path: String,

    /// Project ID
    #[arg(long)]
    pub project_id: u64,

    /// Suite ID (required for multi-suite projects)
    #[arg(long)]
    pub suite_id: Option<u64>,

    /// Create missing path segments
    #[arg(long)]
    pub create: bool,
}

/// Run a sections subcommand
pub fn run(cmd: SectionsCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        SectionsCommands::List(args) => run_list(args, global),
        SectionsCommands::Resolve(args) => run_resolve(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let client = connect(global)?;
    let sections = client
        .get_sections(args.project_id, args.suite_id)
        .map_err(|e| miette::miette!("{}", e))?;
    print_records(&to_values(&sections)?, LIST_COLUMNS, "section", global)
}

fn run_resolve(args: ResolveArgs, global: &GlobalOpts) -> Result<()> {
    let client = connect(global)?;
    let mut resolver = SectionResolver::new(&client, args.project_id, args.suite_id, args.create);

    let id = resolver
        .resolve(&args.path)
        .map_err(|e| miette::miette!("{}", e))?
        .ok_or_else(|| miette::miette!("Section path '{}' is empty", args.path))?;

    match global.format {
        OutputFormat::Json => println!("{}", serde_json::json!({ "path": args.path, "id": id })),
        OutputFormat::Raw => println!("{}", id),
        OutputFormat::Table => println!(
            "{} {} {}",
            style(&args.path).cyan(),
            style("→").dim(),
            style(id).yellow()
        ),
    }
    Ok(())
}
