//! Connection configuration with layered precedence
//!
//! Values resolve in the order: command-line flag, environment variable,
//! profile from the config file, built-in default.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Config file name, looked up in the working directory and then in $HOME
pub const CONFIG_FILE_NAME: &str = ".testrail-cli.yaml";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid YAML in config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("TestRail {what} is required (via --{flag}, {env} env, or config file)")]
    Missing {
        what: &'static str,
        flag: &'static str,
        env: &'static str,
    },

    #[error("Could not determine home directory")]
    NoHome,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One named connection profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verify: Option<bool>,
}

/// On-disk config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    pub profiles: BTreeMap<String, Profile>,
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub profile: Option<String>,
    pub url: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub timeout: Option<u64>,
    pub proxy: Option<String>,
    pub insecure: bool,
    pub config_path: Option<PathBuf>,
}

/// Fully resolved connection settings
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionConfig {
    pub url: String,
    pub email: String,
    pub password: String,
    pub timeout: u64,
    pub proxy: Option<String>,
    pub verify: bool,
}

impl ConfigFile {
    /// Read and parse a config file
    pub fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        check_permissions(path);
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Locate the config file to use, if any
    ///
    /// An explicit path must exist; otherwise the repo-local file wins over
    /// the one in the home directory.
    pub fn locate(explicit: Option<&Path>) -> Result<Option<PathBuf>, ConfigError> {
        if let Some(path) = explicit {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Ok(Some(path.to_path_buf()));
        }

        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Ok(Some(local));
        }

        Ok(user_config_path().filter(|p| p.exists()))
    }

    /// Load the config file in effect (empty if none exists)
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match Self::locate(explicit)? {
            Some(path) => Self::read(&path),
            None => Ok(Self::default()),
        }
    }
}

/// Path of the per-user config file
pub fn user_config_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|dirs| dirs.home_dir().join(CONFIG_FILE_NAME))
}

impl ConfigOverrides {
    /// Resolve the final connection settings against a loaded config file
    pub fn resolve_with(&self, file: &ConfigFile) -> Result<ConnectionConfig, ConfigError> {
        let profile_name = self.profile.as_deref().unwrap_or("default");
        let profile = file.profiles.get(profile_name).cloned().unwrap_or_default();

        let url = self.url.clone().or(profile.url).ok_or(ConfigError::Missing {
            what: "URL",
            flag: "url",
            env: "TESTRAIL_URL",
        })?;
        let email = self.email.clone().or(profile.email).ok_or(ConfigError::Missing {
            what: "email",
            flag: "email",
            env: "TESTRAIL_EMAIL",
        })?;
        let password = self
            .password
            .clone()
            .or(profile.password)
            .ok_or(ConfigError::Missing {
                what: "password/API key",
                flag: "password",
                env: "TESTRAIL_PASSWORD",
            })?;

        Ok(ConnectionConfig {
            url,
            email,
            password,
            timeout: self.timeout.or(profile.timeout).unwrap_or(DEFAULT_TIMEOUT),
            proxy: self.proxy.clone().or(profile.proxy),
            verify: !self.insecure && profile.verify.unwrap_or(true),
        })
    }

    /// Load the config file and resolve
    pub fn resolve(&self) -> Result<ConnectionConfig, ConfigError> {
        let file = ConfigFile::load(self.config_path.as_deref())?;
        self.resolve_with(&file)
    }
}

/// Store a profile in the user config file, preserving other profiles
///
/// The file is written through a temporary sibling and renamed into place.
pub fn init_profile(path: &Path, name: &str, profile: Profile) -> Result<(), ConfigError> {
    let mut file = if path.exists() {
        ConfigFile::read(path)?
    } else {
        ConfigFile::default()
    };
    file.profiles.insert(name.to_string(), profile);

    let yaml = serde_yml::to_string(&file).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, yaml)?;
    restrict_permissions(&tmp)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

#[cfg(unix)]
fn check_permissions(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(meta) = std::fs::metadata(path) {
        let mode = meta.permissions().mode() & 0o777;
        if mode != 0o600 {
            warn!(
                "Config file {} has permissions {:o}, should be 600",
                path.display(),
                mode
            );
        }
    }
}

#[cfg(not(unix))]
fn check_permissions(path: &Path) {
    warn!(
        "Ensure {} is only accessible to your user account",
        path.display()
    );
}
