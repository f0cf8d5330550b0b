//! `trcli config` command - Connection profile management
//!
//! Profiles live in `.testrail-cli.yaml`. Connection flags (`--url`,
//! `--email`, `--password`, `--timeout`, `--proxy`, `--insecure`) given to
//! `config init` are stored; anything missing is prompted for.

use clap::Subcommand;
use console::style;
use dialoguer::{theme::ColorfulTheme, Input, Password};
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

use crate::cli::GlobalOpts;
use crate::core::config::{init_profile, user_config_path};
use crate::core::{ConfigError, ConfigFile, Profile};

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Create or update a connection profile
    Init,

    /// Show the config file in effect
    Path,
}

/// Run a config subcommand
pub fn run(cmd: ConfigCommands, global: &GlobalOpts) -> Result<()> {
    match cmd {
        ConfigCommands::Init => run_init(global),
        ConfigCommands::Path => run_path(global),
    }
}

fn target_path(global: &GlobalOpts) -> Result<PathBuf> {
    match global.config {
        Some(ref path) => Ok(path.clone()),
        None => user_config_path().ok_or_else(|| miette::miette!("{}", ConfigError::NoHome)),
    }
}

fn run_init(global: &GlobalOpts) -> Result<()> {
    let path = target_path(global)?;
    let name = global.profile.as_deref().unwrap_or("default");
    let theme = ColorfulTheme::default();

    let url = match global.url {
        Some(ref url) => url.clone(),
        None => Input::with_theme(&theme)
            .with_prompt("TestRail URL")
            .interact_text()
            .into_diagnostic()?,
    };
    let email = match global.email {
        Some(ref email) => email.clone(),
        None => Input::with_theme(&theme)
            .with_prompt("Email")
            .interact_text()
            .into_diagnostic()?,
    };
    let password = match global.password {
        Some(ref password) => password.clone(),
        None => Password::with_theme(&theme)
            .with_prompt("Password or API key")
            .interact()
            .into_diagnostic()?,
    };

    let profile = Profile {
        url: Some(url.trim_end_matches('/').to_string()),
        email: Some(email),
        password: Some(password),
        timeout: global.timeout,
        proxy: global.proxy.clone(),
        verify: global.insecure.then_some(false),
    };

    init_profile(&path, name, profile).map_err(|e| miette::miette!("{}", e))?;

    if !global.quiet {
        println!(
            "{} Saved profile {} to {}",
            style("✓").green(),
            style(name).cyan(),
            style(path.display()).yellow()
        );
    }
    Ok(())
}

fn run_path(global: &GlobalOpts) -> Result<()> {
    match ConfigFile::locate(global.config.as_deref()).map_err(|e| miette::miette!("{}", e))? {
        Some(path) => println!("{}", path.display()),
        None => {
            let path = target_path(global)?;
            println!("{} {}", path.display(), style("(not created)").dim());
        }
    }
    Ok(())
}
