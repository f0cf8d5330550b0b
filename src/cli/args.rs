//! CLI argument definitions using clap derive

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::cli::commands::{
    cases::CasesCommands, completions::CompletionsArgs, config::ConfigCommands,
    projects::ProjectsCommands, raw::RawArgs, sections::SectionsCommands,
    suites::SuitesCommands,
};
use crate::core::ConfigOverrides;

#[derive(Parser)]
#[command(name = "trcli")]
#[command(author, version, about = "TestRail command-line client")]
#[command(long_about = "TestRail REST API client with bulk CSV import and export of test cases.")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalOpts,
}

#[derive(clap::Args, Clone, Debug)]
pub struct GlobalOpts {
    /// Profile name in the config file
    #[arg(long, global = true, env = "TESTRAIL_PROFILE")]
    pub profile: Option<String>,

    /// TestRail base URL (e.g. https://example.testrail.io)
    #[arg(long, global = true, env = "TESTRAIL_URL")]
    pub url: Option<String>,

    /// Login email
    #[arg(long, global = true, env = "TESTRAIL_EMAIL")]
    pub email: Option<String>,

    /// Password or API key
    #[arg(long, global = true, env = "TESTRAIL_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Config file (default: ./.testrail-cli.yaml, then ~/.testrail-cli.yaml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Skip TLS certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// HTTP(S) proxy URL
    #[arg(long, global = true)]
    pub proxy: Option<String>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "table")]
    pub format: OutputFormat,

    /// Only show these fields (comma-separated)
    #[arg(long, global = true, value_delimiter = ',')]
    pub fields: Vec<String>,

    /// Suppress non-essential output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Enable verbose output
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

impl GlobalOpts {
    /// Connection settings given on the command line or in the environment
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            profile: self.profile.clone(),
            url: self.url.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
            timeout: self.timeout,
            proxy: self.proxy.clone(),
            insecure: self.insecure,
            config_path: self.config.clone(),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Project queries
    #[command(subcommand)]
    Projects(ProjectsCommands),

    /// Test case management and CSV import/export
    #[command(subcommand)]
    Cases(CasesCommands),

    /// Section (folder) queries
    #[command(subcommand)]
    Sections(SectionsCommands),

    /// Suite queries
    #[command(subcommand)]
    Suites(SuitesCommands),

    /// Call any API endpoint directly
    Raw(RawArgs),

    /// Connection profile management
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Generate shell completion scripts
    Completions(CompletionsArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned table (for humans)
    #[default]
    Table,
    /// JSON (for programming)
    Json,
    /// Tab-separated values without header (for piping)
    Raw,
}
