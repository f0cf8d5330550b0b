//! `trcli cases` command - Test case management and CSV import/export

use clap::Subcommand;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm};
use miette::{IntoDiagnostic, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::commands::utils::connect;
use crate::cli::helpers::{json_or_string, parse_key_value, parse_timestamp};
use crate::cli::output::{print_record, print_records, to_values};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::{CaseFilter, TestRailApi};
use crate::csv_import::importer::DEFAULT_CHUNK_SIZE;
use crate::csv_import::{export_to_csv, import_from_csv, ExportOptions, ImportOptions, ImportResult};

/// Columns shown by `cases list` unless --fields is given
const LIST_COLUMNS: &[&str] =
    &["id", "title", "section_id", "priority_id", "type_id", "template_id"];

#[derive(Subcommand, Debug)]
pub enum CasesCommands {
    /// List test cases
    List(ListArgs),

    /// Show a single test case
    Get(GetArgs),

    /// Create a test case
    Add(AddArgs),

    /// Update fields of a test case
    Update(UpdateArgs),

    /// Delete a test case
    Delete(DeleteArgs),

    /// Create and update test cases from a CSV file
    Import(ImportArgs),

    /// Export test cases to a CSV file
    Export(ExportArgs),
}

#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Project ID
    #[arg(long)]
    pub project_id: u64,

    /// Suite ID (required for multi-suite projects)
    #[arg(long)]
    pub suite_id: Option<u64>,

    /// Only cases in this section
    #[arg(long)]
    pub section_id: Option<u64>,

    /// Only these priorities (comma-separated IDs)
    #[arg(long, value_delimiter = ',')]
    pub priority_ids: Vec<u64>,

    /// Only these case types (comma-separated IDs)
    #[arg(long, value_delimiter = ',')]
    pub type_ids: Vec<u64>,

    /// Fetch exactly these cases instead of filtering (comma-separated IDs)
    #[arg(long, value_delimiter = ',')]
    pub case_ids: Vec<u64>,

    /// Created after (ISO 8601 or epoch seconds)
    #[arg(long, value_parser = parse_timestamp)]
    pub created_after: Option<i64>,

    /// Created before (ISO 8601 or epoch seconds)
    #[arg(long, value_parser = parse_timestamp)]
    pub created_before: Option<i64>,

    /// Updated after (ISO 8601 or epoch seconds)
    #[arg(long, value_parser = parse_timestamp)]
    pub updated_after: Option<i64>,

    /// Updated before (ISO 8601 or epoch seconds)
    #[arg(long, value_parser = parse_timestamp)]
    pub updated_before: Option<i64>,

    /// Return at most this many cases
    #[arg(long)]
    pub limit: Option<usize>,

    /// Skip this many cases first
    #[arg(long)]
    pub offset: Option<usize>,
}

impl ListArgs {
    fn filter(&self) -> CaseFilter {
        CaseFilter {
            suite_id: self.suite_id,
            section_id: self.section_id,
            priority_ids: self.priority_ids.clone(),
            type_ids: self.type_ids.clone(),
            created_after: self.created_after,
            created_before: self.created_before,
            updated_after: self.updated_after,
            updated_before: self.updated_before,
            offset: self.offset,
            limit: self.limit,
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct GetArgs {
    /// Case ID (`123` or `C123`)
    #[arg(value_parser = parse_case_id)]
    pub case_id: u64,
}

/// Case fields settable from flags, shared by `add` and `update`
#[derive(clap::Args, Debug, Default)]
pub struct CaseFieldArgs {
    /// Template ID
    #[arg(long)]
    pub template_id: Option<u64>,

    /// Case type ID
    #[arg(long)]
    pub type_id: Option<u64>,

    /// Priority ID
    #[arg(long)]
    pub priority_id: Option<u64>,

    /// Estimate (e.g. 30s, 1m, 2h)
    #[arg(long)]
    pub estimate: Option<String>,

    /// References (comma-separated)
    #[arg(long)]
    pub refs: Option<String>,

    /// Any other field as key=value; values that parse as JSON are sent as JSON
    #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub extra: Vec<(String, String)>,
}

impl CaseFieldArgs {
    /// Write the given flags into a payload, overriding existing keys
    fn apply(&self, payload: &mut Map<String, Value>) {
        for (key, value) in &self.extra {
            payload.insert(key.clone(), json_or_string(value));
        }
        let ids = [
            ("template_id", self.template_id),
            ("type_id", self.type_id),
            ("priority_id", self.priority_id),
        ];
        for (key, id) in ids {
            if let Some(id) = id {
                payload.insert(key.to_string(), Value::from(id));
            }
        }
        if let Some(ref estimate) = self.estimate {
            payload.insert("estimate".to_string(), Value::String(estimate.clone()));
        }
        if let Some(ref refs) = self.refs {
            payload.insert("refs".to_string(), Value::String(refs.clone()));
        }
    }
}

#[derive(clap::Args, Debug)]
pub struct AddArgs {
    /// Section ID the case goes into
    #[arg(long)]
    pub section_id: u64,

    /// Case title
    #[arg(long)]
    pub title: String,

    #[command(flatten)]
    pub fields: CaseFieldArgs,
}

#[derive(clap::Args, Debug)]
pub struct UpdateArgs {
    /// Case ID (`123` or `C123`)
    #[arg(value_parser = parse_case_id)]
    pub case_id: u64,

    /// New title
    #[arg(long)]
    pub title: Option<String>,

    /// JSON object of fields to update, or '-' for stdin; flags override it
    #[arg(long = "json", visible_alias = "file", value_name = "PATH")]
    pub json: Option<PathBuf>,

    #[command(flatten)]
    pub fields: CaseFieldArgs,
}

#[derive(clap::Args, Debug)]
pub struct DeleteArgs {
    /// Case ID (`123` or `C123`)
    #[arg(value_parser = parse_case_id)]
    pub case_id: u64,

    /// Only report what would be deleted (TestRail soft mode)
    #[arg(long)]
    pub soft: bool,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

#[derive(clap::Args, Debug)]
pub struct ImportArgs {
    /// Project ID
    #[arg(long)]
    pub project_id: u64,

    /// CSV file to import
    #[arg(long)]
    pub csv: PathBuf,

    /// Suite ID
    #[arg(long, conflicts_with = "suite_name")]
    pub suite_id: Option<u64>,

    /// Suite name (exact match)
    #[arg(long)]
    pub suite_name: Option<String>,

    /// Default section path for rows without a section (e.g. "Auth/Login")
    #[arg(long)]
    pub section: Option<String>,

    /// YAML or JSON file renaming CSV columns to TestRail fields
    #[arg(long)]
    pub mapping: Option<PathBuf>,

    /// Template ID for cases whose row sets none
    #[arg(long)]
    pub template_id: Option<u64>,

    /// Steps field for every case (e.g. custom_steps_separated, custom_steps, custom_gherkin)
    #[arg(long)]
    pub steps_field: Option<String>,

    /// Create sections that do not exist yet
    #[arg(long)]
    pub create_missing_sections: bool,

    /// Cases per create batch
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Project ID
    #[arg(long)]
    pub project_id: u64,

    /// Output CSV file (parent directories are created)
    #[arg(long)]
    pub csv: PathBuf,

    /// Suite ID
    #[arg(long)]
    pub suite_id: Option<u64>,

    /// Export exactly these cases (comma-separated IDs)
    #[arg(long, value_delimiter = ',')]
    pub case_ids: Vec<u64>,

    /// Only cases in this section
    #[arg(long)]
    pub section_id: Option<u64>,

    /// Only these priorities (comma-separated IDs)
    #[arg(long, value_delimiter = ',')]
    pub priority_ids: Vec<u64>,

    /// Only these case types (comma-separated IDs)
    #[arg(long, value_delimiter = ',')]
    pub type_ids: Vec<u64>,
}

fn parse_case_id(s: &str) -> Result<u64, String> {
    crate::csv_import::aggregate::parse_case_id(s)
        .ok_or_else(|| format!("Invalid case ID: '{}'", s))
}

/// Run a cases subcommand
pub fn run(cmd: CasesCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        CasesCommands::List(args) => run_list(args, global),
        CasesCommands::Get(args) => run_get(args, global),
        CasesCommands::Add(args) => run_add(args, global),
        CasesCommands::Update(args) => run_update(args, global),
        CasesCommands::Delete(args) => run_delete(args, global),
        CasesCommands::Import(args) => run_import(args, global),
        CasesCommands::Export(args) => run_export(args, global),
    }
}

fn run_list(args: ListArgs, global: &GlobalOpts) -> Result<()> {
    let client = connect(global)?;

    let cases = if args.case_ids.is_empty() {
        client
            .get_cases(args.project_id, &args.filter())
            .map_err(|e| miette::miette!("{}", e))?
    } else {
        args.case_ids
            .iter()
            .map(|&id| client.get_case(id))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| miette::miette!("{}", e))?
    };

    print_records(&to_values(&cases)?, LIST_COLUMNS, "case", global)
}

fn run_get(args: GetArgs, global: &GlobalOpts) -> Result<()> {
    let client = connect(global)?;
    let case = client
        .get_case(args.case_id)
        .map_err(|e| miette::miette!("{}", e))?;
    print_record(&serde_json::to_value(&case).into_diagnostic()?, global)
}

fn run_add(args: AddArgs, global: &GlobalOpts) -> Result<()> {
    let client = connect(global)?;
    let mut payload = Map::new();
    args.fields.apply(&mut payload);

    let case = client
        .add_case(args.section_id, &args.title, &payload)
        .map_err(|e| miette::miette!("{}", e))?;
    print_record(&case, global)
}

/// Read a JSON object of fields from a file, or stdin for `-`
fn read_json_fields(path: &Path) -> Result<Map<String, Value>> {
    let text = if path == Path::new("-") {
        std::io::read_to_string(std::io::stdin()).into_diagnostic()?
    } else {
        fs::read_to_string(path)
            .map_err(|e| miette::miette!("Cannot read {}: {}", path.display(), e))?
    };

    match serde_json::from_str(&text) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(miette::miette!("{} must hold a JSON object", path.display())),
        Err(e) => Err(miette::miette!("Invalid JSON in {}: {}", path.display(), e)),
    }
}

/// Fields to send for `cases update`: the JSON file first, then flags
fn update_payload(args: &UpdateArgs) -> Result<Map<String, Value>> {
    let mut payload = match args.json {
        Some(ref path) => read_json_fields(path)?,
        None => Map::new(),
    };
    if let Some(ref title) = args.title {
        payload.insert("title".to_string(), Value::String(title.clone()));
    }
    args.fields.apply(&mut payload);

    if payload.is_empty() {
        return Err(miette::miette!("Nothing to update: pass --title, a field flag, or --json"));
    }
    Ok(payload)
}

fn run_update(args: UpdateArgs, global: &GlobalOpts) -> Result<()> {
    let payload = update_payload(&args)?;
    let client = connect(global)?;

    let case = client
        .update_case(args.case_id, &payload)
        .map_err(|e| miette::miette!("{}", e))?;
    print_record(&case, global)
}

fn run_delete(args: DeleteArgs, global: &GlobalOpts) -> Result<()> {
    if !args.yes && !args.soft {
        let confirmed = Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(format!("Delete case {}?", args.case_id))
            .default(false)
            .interact()
            .into_diagnostic()?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    let client = connect(global)?;
    let response = client
        .delete_case(args.case_id, args.soft)
        .map_err(|e| miette::miette!("{}", e))?;

    if args.soft {
        return print_record(&response, global);
    }
    if !global.quiet {
        println!(
            "{} Deleted case {}",
            style("✓").green(),
            style(format!("C{}", args.case_id)).cyan()
        );
    }
    Ok(())
}

fn run_import(args: ImportArgs, global: &GlobalOpts) -> Result<()> {
    let client = connect(global)?;

    let options = ImportOptions {
        suite_id: args.suite_id,
        suite_name: args.suite_name,
        section_path: args.section,
        mapping_path: args.mapping,
        template_id: args.template_id,
        steps_field: args.steps_field,
        create_missing_sections: args.create_missing_sections,
        chunk_size: args.chunk_size,
        ..ImportOptions::new(args.project_id, args.csv)
    };

    if !global.quiet && global.format == OutputFormat::Table {
        println!(
            "{} Importing cases from {}",
            style("→").blue(),
            style(options.csv_path.display()).yellow()
        );
    }

    let result = import_from_csv(&client, &options).map_err(|e| miette::miette!("{}", e))?;

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&result).into_diagnostic()?);
        }
        OutputFormat::Raw => {
            println!("{}\t{}\t{}", result.created, result.updated, result.errors);
        }
        OutputFormat::Table => print_import_summary(&result, global.quiet),
    }

    if result.errors > 0 {
        return Err(miette::miette!("Import completed with {} error(s)", result.errors));
    }
    Ok(())
}

fn print_import_summary(result: &ImportResult, quiet: bool) {
    if !quiet {
        println!();
        println!("{}", style("─".repeat(50)).dim());
        println!("{}", style("Import Summary").bold());
        println!("{}", style("─".repeat(50)).dim());
    }
    println!("  Created: {}", style(result.created).green());
    println!("  Updated: {}", style(result.updated).yellow());
    if result.errors > 0 {
        println!("  Errors:  {}", style(result.errors).red());
    } else {
        println!("  Errors:  {}", result.errors);
    }

    for detail in result.error_details.iter().flatten() {
        eprintln!("{} {}", style("✗").red(), detail);
    }
}

fn run_export(args: ExportArgs, global: &GlobalOpts) -> Result<()> {
    let client = connect(global)?;

    let options = ExportOptions {
        project_id: args.project_id,
        csv_path: args.csv,
        suite_id: args.suite_id,
        case_ids: args.case_ids,
        section_id: args.section_id,
        priority_ids: args.priority_ids,
        type_ids: args.type_ids,
    };

    let summary = export_to_csv(&client, &options).map_err(|e| miette::miette!("{}", e))?;

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&summary).into_diagnostic()?);
        }
        OutputFormat::Raw => println!("{}", summary.exported),
        OutputFormat::Table => println!(
            "{} Exported {} row(s) to {}",
            style("✓").green(),
            style(summary.exported).cyan(),
            style(options.csv_path.display()).yellow()
        ),
    }

    Ok(())
}
