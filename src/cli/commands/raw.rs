//! `trcli raw` command - Call any API endpoint directly
//!
//! Covers endpoints the other commands do not model. The body comes from
//! repeated `--data key=value` pairs or a JSON/YAML payload file.

use clap::ValueEnum;
use miette::Result;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::commands::utils::connect;
use crate::cli::helpers::{json_or_string, parse_key_value};
use crate::cli::output::print_value;
use crate::cli::GlobalOpts;

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Method {
    #[default]
    Get,
    Post,
    /// Sent as POST, which is how TestRail deletes
    Delete,
}

#[derive(clap::Args, Debug)]
pub struct RawArgs {
    /// Endpoint after /api/v2/ (e.g. get_projects, add_case/123)
    pub endpoint: String,

    /// HTTP method
    #[arg(long, short = 'X', default_value = "get")]
    pub method: Method,

    /// Query parameter as key=value (repeatable)
    #[arg(long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub params: Vec<(String, String)>,

    /// Body field as key=value (repeatable); values that parse as JSON are sent as JSON
    #[arg(long, value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub data: Vec<(String, String)>,

    /// JSON or YAML file holding the request body
    #[arg(long, conflicts_with = "data")]
    pub payload_file: Option<PathBuf>,
}

/// Load a request body from a `.json`, `.yaml` or `.yml` file
fn load_payload(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .map_err(|e| miette::miette!("Payload file not found: {} ({})", path.display(), e))?;
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        serde_yml::from_str(&text)
            .map_err(|e| miette::miette!("Invalid YAML in {}: {}", path.display(), e))
    } else {
        serde_json::from_str(&text)
            .map_err(|e| miette::miette!("Invalid JSON in {}: {}", path.display(), e))
    }
}

fn request_body(args: &RawArgs) -> Result<Value> {
    match args.payload_file {
        Some(ref path) => load_payload(path),
        None => Ok(Value::Object(
            args.data
                .iter()
                .map(|(key, value)| (key.clone(), json_or_string(value)))
                .collect::<Map<String, Value>>(),
        )),
    }
}

pub fn run(args: RawArgs, global: &GlobalOpts) -> Result<()> {
    let endpoint = args.endpoint.trim_start_matches('/');
    let params: Vec<(&str, String)> = args
        .params
        .iter()
        .map(|(key, value)| (key.as_str(), value.clone()))
        .collect();

    let response = match args.method {
        Method::Get => {
            if !args.data.is_empty() || args.payload_file.is_some() {
                return Err(miette::miette!("GET requests take no body; use --method post"));
            }
            connect(global)?.get(endpoint, &params)
        }
        Method::Post | Method::Delete => {
            let body = request_body(&args)?;
            connect(global)?.post(endpoint, &params, &body)
        }
    }
    .map_err(|e| miette::miette!("{}", e))?;

    print_value(&response, global)
}
