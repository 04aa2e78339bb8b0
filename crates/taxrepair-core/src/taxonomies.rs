//! Registered taxonomy providers.
//!
//! The host environment is the authority on which taxonomies are active.
//! A provider is queried once per audit run; any failure aborts the audit
//! with a `Configuration` error.

use crate::config::TaxonomyDefaults;
use crate::error::{RepairError, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Source of the currently registered taxonomy names.
pub trait TaxonomyProvider: Send + Sync {
    fn registered_taxonomies(&self) -> Result<BTreeSet<String>>;
}

/// A fixed set of taxonomy names supplied by the host at startup.
#[derive(Debug, Clone)]
pub struct StaticTaxonomyProvider {
    names: BTreeSet<String>,
}

impl StaticTaxonomyProvider {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for StaticTaxonomyProvider {
    fn default() -> Self {
        Self::new(TaxonomyDefaults::CORE_TAXONOMIES)
    }
}

impl TaxonomyProvider for StaticTaxonomyProvider {
    fn registered_taxonomies(&self) -> Result<BTreeSet<String>> {
        Ok(self.names.clone())
    }
}

/// Reads a JSON array of taxonomy names from disk on every call.
///
/// The file is re-read each time so an audit always sees what the host
/// registered most recently.
#[derive(Debug, Clone)]
pub struct FileTaxonomyProvider {
    path: PathBuf,
}

impl FileTaxonomyProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaxonomyProvider for FileTaxonomyProvider {
    fn registered_taxonomies(&self) -> Result<BTreeSet<String>> {
        debug!("Loading registered taxonomies from {}", self.path.display());

        let contents =
            std::fs::read_to_string(&self.path).map_err(|e| RepairError::Configuration {
                message: format!(
                    "Failed to read registered taxonomies from {}: {}",
                    self.path.display(),
                    e
                ),
            })?;

        let names: Vec<String> =
            serde_json::from_str(&contents).map_err(|e| RepairError::Configuration {
                message: format!(
                    "Failed to parse registered taxonomies in {}: {}",
                    self.path.display(),
                    e
                ),
            })?;

        Ok(names.into_iter().collect())
    }
}
