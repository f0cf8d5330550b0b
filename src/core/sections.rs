//! Section path handling
//!
//! A section path is a slash-delimited list of section names, e.g.
//! `Auth/Login/SSO`. [`SectionResolver`] turns paths into section ids for the
//! importer; [`SectionPathCache`] does the reverse for the exporter.

use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{debug, info};

use crate::core::client::{ApiError, NewSection, Section, TestRailApi};

#[derive(Debug, Error)]
pub enum SectionError {
    #[error("Section not found: {segment} in path {path}")]
    NotFound { segment: String, path: String },

    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Split a path into trimmed, non-empty segments
pub fn split_path(path: &str) -> Vec<&str> {
    path.split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Resolves section paths within one suite, creating segments on request
///
/// The suite's sections are fetched once on first use; resolved paths and
/// newly created sections are remembered for the lifetime of the resolver.
pub struct SectionResolver<'a, C: TestRailApi + ?Sized> {
    client: &'a C,
    project_id: u64,
    suite_id: Option<u64>,
    create_missing: bool,
    sections: Option<Vec<Section>>,
    resolved: HashMap<String, u64>,
}

impl<'a, C: TestRailApi + ?Sized> SectionResolver<'a, C> {
    pub fn new(
        client: &'a C,
        project_id: u64,
        suite_id: Option<u64>,
        create_missing: bool,
    ) -> Self {
        Self {
            client,
            project_id,
            suite_id,
            create_missing,
            sections: None,
            resolved: HashMap::new(),
        }
    }

    /// Resolve a path to the id of its last segment
    ///
    /// Returns `Ok(None)` for a path with no segments.
    pub fn resolve(&mut self, path: &str) -> Result<Option<u64>, SectionError> {
        let segments = split_path(path);
        if segments.is_empty() {
            return Ok(None);
        }

        let key = segments.join("/");
        if let Some(&id) = self.resolved.get(&key) {
            return Ok(Some(id));
        }

        if self.sections.is_none() {
            let fetched = self.client.get_sections(self.project_id, self.suite_id)?;
            debug!(count = fetched.len(), "Loaded sections");
            self.sections = Some(fetched);
        }

        let mut parent: Option<u64> = None;
        for segment in &segments {
            let existing = self
                .sections
                .iter()
                .flatten()
                .find(|s| s.name == *segment && s.parent_id == parent)
                .map(|s| s.id);

            let id = match existing {
                Some(id) => id,
                None if self.create_missing => self.create(segment, parent)?,
                None => {
                    return Err(SectionError::NotFound {
                        segment: segment.to_string(),
                        path: path.to_string(),
                    })
                }
            };
            parent = Some(id);
        }

        if let Some(id) = parent {
            self.resolved.insert(key, id);
        }
        Ok(parent)
    }

    fn create(&mut self, name: &str, parent_id: Option<u64>) -> Result<u64, SectionError> {
        let created = self.client.add_section(
            self.project_id,
            &NewSection {
                name,
                suite_id: self.suite_id,
                parent_id,
            },
        )?;
        info!(id = created.id, name, "Created section");

        let id = created.id;
        // Record under the requested parent even if the server echo omits it
        let section = Section {
            parent_id,
            ..created
        };
        self.sections.get_or_insert_with(Vec::new).push(section);
        Ok(id)
    }
}

/// Memoized section id → full path lookups for one export run
#[derive(Debug, Default)]
pub struct SectionPathCache {
    paths: HashMap<u64, String>,
}

impl SectionPathCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full slash-joined path of a section, walking parent links as needed
    pub fn path_for<C: TestRailApi + ?Sized>(
        &mut self,
        client: &C,
        section_id: u64,
    ) -> Result<String, ApiError> {
        if let Some(path) = self.paths.get(&section_id) {
            return Ok(path.clone());
        }

        // Walk up until the root or an already-known ancestor
        let mut chain: Vec<Section> = Vec::new();
        let mut seen = HashSet::new();
        let mut prefix = String::new();
        let mut next = Some(section_id);

        while let Some(id) = next {
            if let Some(known) = self.paths.get(&id) {
                prefix = known.clone();
                break;
            }
            if !seen.insert(id) {
                break;
            }
            let section = client.get_section(id)?;
            next = section.parent_id;
            chain.push(section);
        }

        let mut path = prefix;
        for section in chain.iter().rev() {
            if path.is_empty() {
                path = section.name.clone();
            } else {
                path = format!("{}/{}", path, section.name);
            }
            self.paths.insert(section.id, path.clone());
        }

        Ok(self.paths.get(&section_id).cloned().unwrap_or(path))
    }
}
