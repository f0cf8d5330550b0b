//! Output rendering for list and get commands
//!
//! Records arrive as JSON objects straight from the API. `--fields` selects
//! and orders the keys shown; without it each command supplies its own
//! default column set for tables, while JSON output keeps every key.

use miette::{IntoDiagnostic, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{cell_text, truncate_str};
use crate::cli::{GlobalOpts, OutputFormat};

/// Widest cell shown in table output
const MAX_CELL_WIDTH: usize = 60;

/// Keep only `fields` of an object
pub fn filter_fields(record: &Value, fields: &[String]) -> Value {
    match record {
        Value::Object(map) if !fields.is_empty() => {
            let mut filtered = Map::new();
            for field in fields {
                if let Some(value) = map.get(field) {
                    filtered.insert(field.clone(), value.clone());
                }
            }
            Value::Object(filtered)
        }
        other => other.clone(),
    }
}

/// Convert serializable records to JSON values
pub fn to_values<T: Serialize>(items: &[T]) -> Result<Vec<Value>> {
    items
        .iter()
        .map(|item| serde_json::to_value(item).into_diagnostic())
        .collect()
}

/// Print a list of records
///
/// `noun` names the record type in the empty-list message.
pub fn print_records(
    records: &[Value],
    default_columns: &[&str],
    noun: &str,
    global: &GlobalOpts,
) -> Result<()> {
    let columns: Vec<String> = if global.fields.is_empty() {
        default_columns.iter().map(|c| c.to_string()).collect()
    } else {
        global.fields.clone()
    };

    match global.format {
        OutputFormat::Json => {
            let filtered: Vec<Value> = records
                .iter()
                .map(|r| filter_fields(r, &global.fields))
                .collect();
            let json = serde_json::to_string_pretty(&filtered).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Raw => {
            for record in records {
                let cells: Vec<String> = columns.iter().map(|c| cell_text(record.get(c))).collect();
                println!("{}", cells.join("\t"));
            }
        }
        OutputFormat::Table => {
            if records.is_empty() {
                if !global.quiet {
                    println!("No {} found.", noun);
                }
                return Ok(());
            }

            let mut builder = Builder::default();
            builder.push_record(columns.iter().map(|c| c.to_uppercase()));
            for record in records {
                builder.push_record(
                    columns
                        .iter()
                        .map(|c| truncate_str(&cell_text(record.get(c)), MAX_CELL_WIDTH)),
                );
            }
            println!("{}", builder.build().with(Style::sharp()));

            if !global.quiet {
                println!("{} {}(s) found", records.len(), noun);
            }
        }
    }

    Ok(())
}

/// Print a single record
pub fn print_record(record: &Value, global: &GlobalOpts) -> Result<()> {
    let record = filter_fields(record, &global.fields);

    match global.format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&record).into_diagnostic()?;
            println!("{}", json);
        }
        OutputFormat::Raw => {
            if let Value::Object(map) = &record {
                for (key, value) in map {
                    println!("{}\t{}", key, cell_text(Some(value)));
                }
            } else {
                println!("{}", cell_text(Some(&record)));
            }
        }
        OutputFormat::Table => {
            let mut builder = Builder::default();
            builder.push_record(["FIELD", "VALUE"]);
            if let Value::Object(map) = &record {
                for (key, value) in map {
                    builder.push_record([key.clone(), cell_text(Some(value))]);
                }
            }
            println!("{}", builder.build().with(Style::sharp()));
        }
    }

    Ok(())
}

/// Keys of the first object in a list, used as columns when nothing better
/// is known about the records
pub fn first_record_keys(records: &[Value]) -> Vec<&str> {
    records
        .first()
        .and_then(Value::as_object)
        .map(|map| map.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

/// Print an arbitrary API response
pub fn print_value(value: &Value, global: &GlobalOpts) -> Result<()> {
    match value {
        Value::Array(records) => {
            let columns = first_record_keys(records);
            print_records(records, &columns, "record", global)
        }
        Value::Object(_) => print_record(value, global),
        Value::Null => Ok(()),
        other => {
            println!("{}", cell_text(Some(other)));
            Ok(())
        }
    }
}
