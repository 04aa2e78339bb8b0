//! Repair executor for the three defects that are safe to fix automatically.
//!
//! Each repair targets live rows by primary key or by a structural predicate
//! and re-checks its precondition inside the store's transaction. Nothing
//! here reads a previously produced report.

use crate::error::{RepairError, Result};
use crate::models::{TermId, TermTaxonomyId};
use crate::store::{CountCorrection, GhostSweep, TaxonomyStore};
use tracing::{debug, warn};

pub struct RepairExecutor<'a> {
    store: &'a dyn TaxonomyStore,
}

impl<'a> RepairExecutor<'a> {
    pub fn new(store: &'a dyn TaxonomyStore) -> Self {
        Self { store }
    }

    /// Delete a term that has no term taxonomy rows.
    ///
    /// Repeating the call on a removed id yields `NotFound`.
    pub fn delete_orphan_term(&self, term_id: TermId) -> Result<()> {
        debug!("Repair requested: delete orphan term {}", term_id);
        self.store
            .delete_orphan_term(term_id)
            .inspect_err(|e| log_failure("delete_orphan_term", e))
    }

    /// Delete every relationship pointing at a missing term taxonomy row.
    pub fn delete_ghost_relationships(&self) -> Result<GhostSweep> {
        debug!("Repair requested: delete ghost relationships");
        self.store
            .delete_ghost_relationships()
            .inspect_err(|e| log_failure("delete_ghost_relationships", e))
    }

    /// Overwrite a cached count with the live relationship count.
    pub fn fix_count(&self, term_taxonomy_id: TermTaxonomyId) -> Result<CountCorrection> {
        debug!("Repair requested: fix count for {}", term_taxonomy_id);
        self.store
            .sync_count(term_taxonomy_id)
            .inspect_err(|e| log_failure("fix_count", e))
    }
}

fn log_failure(operation: &str, err: &RepairError) {
    if err.is_benign() {
        debug!("{}: {}", operation, err);
    } else {
        warn!("{} failed: {}", operation, err);
    }
}
