//! Column mapping files
//!
//! A mapping file renames CSV columns before anything else looks at them:
//!
//! ```yaml
//! fields:
//!   Summary: title
//!   Folder:
//!     field: section
//! ```
//!
//! Files ending in `.yaml`/`.yml` are read as YAML, everything else as JSON.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MappingError {
    #[error("Mapping file not found: {0}")]
    NotFound(String),

    #[error("Cannot read mapping file {path}: {message}")]
    Unreadable { path: String, message: String },

    #[error("Invalid mapping file {path}: {message}")]
    FileFormat { path: String, message: String },
}

/// Target of one mapped column
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldTarget {
    Name(String),
    Descriptor {
        #[serde(default)]
        field: Option<String>,
    },
}

/// Parsed mapping file
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ColumnMapping {
    #[serde(default)]
    pub fields: HashMap<String, FieldTarget>,
}

impl ColumnMapping {
    /// Load a mapping from disk
    pub fn load(path: &Path) -> Result<Self, MappingError> {
        let display = path.display().to_string();
        let contents = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => MappingError::NotFound(display.clone()),
            _ => MappingError::Unreadable {
                path: display.clone(),
                message: e.to_string(),
            },
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("yaml") | Some("yml")
        );

        let format_error = |message: String| MappingError::FileFormat {
            path: display.clone(),
            message,
        };

        if is_yaml {
            if contents.trim().is_empty() {
                return Ok(Self::default());
            }
            serde_yml::from_str(&contents).map_err(|e| format_error(e.to_string()))
        } else {
            serde_json::from_str(&contents).map_err(|e| format_error(e.to_string()))
        }
    }

    /// Target name for a source column; unmapped columns keep their name
    pub fn target<'a>(&'a self, column: &'a str) -> &'a str {
        match self.fields.get(column) {
            Some(FieldTarget::Name(name)) => name,
            Some(FieldTarget::Descriptor { field: Some(name) }) => name,
            Some(FieldTarget::Descriptor { field: None }) | None => column,
        }
    }
}
