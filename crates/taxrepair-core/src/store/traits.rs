//! Store backend trait and types.

use crate::config::StoreDefaults;
use crate::error::{RepairError, Result};
use crate::models::{Relationship, TableSnapshot, Term, TermId, TermTaxonomy, TermTaxonomyId};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the SQLite host store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SqliteStoreConfig {
    /// Prefix prepended to every table name (e.g. `wp_`).
    pub table_prefix: String,
    /// How long a statement waits on a locked database.
    pub busy_timeout: Duration,
}

impl SqliteStoreConfig {
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            table_prefix: prefix.into(),
            ..Self::default()
        }
    }

    /// Reject prefixes that cannot be spliced into SQL as an identifier.
    pub fn validate(&self) -> Result<()> {
        let valid = self
            .table_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(RepairError::Validation {
                field: "table_prefix".to_string(),
                message: format!(
                    "'{}' may only contain ASCII letters, digits and underscores",
                    self.table_prefix
                ),
            });
        }
        Ok(())
    }
}

impl Default for SqliteStoreConfig {
    fn default() -> Self {
        Self {
            table_prefix: StoreDefaults::TABLE_PREFIX.to_string(),
            busy_timeout: StoreDefaults::BUSY_TIMEOUT,
        }
    }
}

/// Stored vs. recomputed count after a count repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountCorrection {
    pub term_taxonomy_id: TermTaxonomyId,
    pub old: i64,
    pub new: i64,
}

impl CountCorrection {
    pub fn changed(&self) -> bool {
        self.old != self.new
    }
}

/// Result of one ghost relationship sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GhostSweep {
    pub deleted: usize,
}

/// Access to the host's term tables.
///
/// All operations are synchronous to match rusqlite's API. Mutations
/// re-validate against live rows; they never trust a cached report.
pub trait TaxonomyStore: Send + Sync {
    /// Every term row, in table scan order.
    fn fetch_terms(&self) -> Result<Vec<Term>>;

    /// Every term taxonomy row, in table scan order.
    fn fetch_term_taxonomies(&self) -> Result<Vec<TermTaxonomy>>;

    /// Every relationship row, in table scan order.
    fn fetch_relationships(&self) -> Result<Vec<Relationship>>;

    /// Live number of relationships pointing at `term_taxonomy_id`.
    fn count_relationships(&self, term_taxonomy_id: TermTaxonomyId) -> Result<i64>;

    /// Remove a term that no taxonomy row references.
    ///
    /// Fails with `NotFound` when the term is already gone and with
    /// `PreconditionFailed` when a taxonomy row references it at call time.
    fn delete_orphan_term(&self, term_id: TermId) -> Result<()>;

    /// Remove every relationship whose term taxonomy row is missing, atomically.
    fn delete_ghost_relationships(&self) -> Result<GhostSweep>;

    /// Overwrite the stored count with the live relationship count.
    fn sync_count(&self, term_taxonomy_id: TermTaxonomyId) -> Result<CountCorrection>;

    /// Read all three tables.
    ///
    /// Failures are reported as `IntegrityRead` naming the table. Backends
    /// that support it override this to read from one consistent view.
    fn snapshot(&self) -> Result<TableSnapshot> {
        let terms = self
            .fetch_terms()
            .map_err(|e| RepairError::integrity_read(StoreDefaults::TERMS_TABLE, e))?;
        let term_taxonomies = self
            .fetch_term_taxonomies()
            .map_err(|e| RepairError::integrity_read(StoreDefaults::TERM_TAXONOMY_TABLE, e))?;
        let relationships = self
            .fetch_relationships()
            .map_err(|e| RepairError::integrity_read(StoreDefaults::RELATIONSHIPS_TABLE, e))?;

        Ok(TableSnapshot {
            terms,
            term_taxonomies,
            relationships,
        })
    }
}
