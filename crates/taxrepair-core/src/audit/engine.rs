//! The seven consistency checks over one table snapshot.

use super::report::{AuditReport, DuplicateGroup, IncorrectCount};
use crate::config::StoreDefaults;
use crate::error::{RepairError, Result};
use crate::models::{TableSnapshot, Term, TermId, TermTaxonomy, TermTaxonomyId, TermText};
use crate::store::TaxonomyStore;
use crate::taxonomies::TaxonomyProvider;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Options for an audit run.
#[derive(Debug, Clone, Copy)]
pub struct AuditConfig {
    /// Recount each row's relationships against live storage instead of
    /// the snapshot taken at the start of the run.
    pub recount_from_store: bool,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            recount_from_store: true,
        }
    }
}

/// Read-only auditor over a host store and its registered taxonomies.
pub struct AuditEngine<'a> {
    store: &'a dyn TaxonomyStore,
    provider: &'a dyn TaxonomyProvider,
    config: AuditConfig,
}

impl<'a> AuditEngine<'a> {
    pub fn new(store: &'a dyn TaxonomyStore, provider: &'a dyn TaxonomyProvider) -> Self {
        Self::with_config(store, provider, AuditConfig::default())
    }

    pub fn with_config(
        store: &'a dyn TaxonomyStore,
        provider: &'a dyn TaxonomyProvider,
        config: AuditConfig,
    ) -> Self {
        Self {
            store,
            provider,
            config,
        }
    }

    /// Snapshot the tables, load registered taxonomies and run every check.
    ///
    /// Either returns a complete report or an error; never a partial report.
    pub fn run(&self) -> Result<AuditReport> {
        let start = Instant::now();
        info!("Starting taxonomy audit");

        let snapshot = self.store.snapshot()?;
        let registered = self
            .provider
            .registered_taxonomies()
            .map_err(|e| match e {
                config @ RepairError::Configuration { .. } => config,
                other => RepairError::Configuration {
                    message: format!("Registered taxonomies unavailable: {}", other),
                },
            })?;

        let report = if self.config.recount_from_store {
            audit_snapshot(&snapshot, &registered, |tt_id| {
                self.store.count_relationships(tt_id).map_err(|e| {
                    RepairError::integrity_read(StoreDefaults::RELATIONSHIPS_TABLE, e)
                })
            })?
        } else {
            let mut counts: HashMap<TermTaxonomyId, i64> = HashMap::new();
            for rel in &snapshot.relationships {
                *counts.entry(rel.term_taxonomy_id).or_default() += 1;
            }
            audit_snapshot(&snapshot, &registered, |tt_id| {
                Ok(counts.get(&tt_id).copied().unwrap_or(0))
            })?
        };

        let summary = report.summary();
        if summary.total() > 0 {
            warn!(
                "Taxonomy audit found {} issue(s), {} repairable",
                summary.total(),
                summary.repairable()
            );
        }
        info!(
            "Taxonomy audit finished in {:?}: {} terms, {} term taxonomies, {} relationships",
            start.elapsed(),
            snapshot.terms.len(),
            snapshot.term_taxonomies.len(),
            snapshot.relationships.len()
        );

        Ok(report)
    }
}

/// Run all checks against an already loaded snapshot.
///
/// `real_count` yields the true relationship count for a term taxonomy id.
pub fn audit_snapshot<F>(
    snapshot: &TableSnapshot,
    registered: &BTreeSet<String>,
    mut real_count: F,
) -> Result<AuditReport>
where
    F: FnMut(TermTaxonomyId) -> Result<i64>,
{
    let term_ids: HashSet<TermId> = snapshot.terms.iter().map(|t| t.term_id).collect();
    let tt_ids: HashSet<TermTaxonomyId> = snapshot
        .term_taxonomies
        .iter()
        .map(|tt| tt.term_taxonomy_id)
        .collect();
    let mut tt_by_term: HashMap<TermId, Vec<&TermTaxonomy>> = HashMap::new();
    for tt in &snapshot.term_taxonomies {
        tt_by_term.entry(tt.term_id).or_default().push(tt);
    }

    let orphan_terms: Vec<Term> = snapshot
        .terms
        .iter()
        .filter(|t| !tt_by_term.contains_key(&t.term_id))
        .cloned()
        .collect();
    debug!("Orphan terms: {}", orphan_terms.len());

    let orphan_term_taxonomies: Vec<TermTaxonomy> = snapshot
        .term_taxonomies
        .iter()
        .filter(|tt| !term_ids.contains(&tt.term_id))
        .cloned()
        .collect();
    debug!("Orphan term taxonomy rows: {}", orphan_term_taxonomies.len());

    let ghost_relationships: Vec<_> = snapshot
        .relationships
        .iter()
        .filter(|rel| !tt_ids.contains(&rel.term_taxonomy_id))
        .copied()
        .collect();
    debug!("Ghost relationships: {}", ghost_relationships.len());

    let mut incorrect_counts = Vec::new();
    for tt in &snapshot.term_taxonomies {
        let real = real_count(tt.term_taxonomy_id)?;
        if real != tt.count {
            incorrect_counts.push(IncorrectCount {
                term_taxonomy: tt.clone(),
                stored: tt.count,
                real,
            });
        }
    }
    debug!("Incorrect counts: {}", incorrect_counts.len());

    // `parent` holds a term id, so it is resolved against term ids that own
    // at least one taxonomy row.
    let broken_parents: Vec<TermTaxonomy> = snapshot
        .term_taxonomies
        .iter()
        .filter(|tt| tt.has_parent() && !tt_by_term.contains_key(&tt.parent))
        .cloned()
        .collect();
    debug!("Broken parents: {}", broken_parents.len());

    let unregistered_taxonomies: Vec<TermTaxonomy> = snapshot
        .term_taxonomies
        .iter()
        .filter(|tt| !registered.contains(&tt.taxonomy))
        .cloned()
        .collect();
    debug!("Unregistered taxonomies: {}", unregistered_taxonomies.len());

    let duplicate_names = duplicate_groups(&snapshot.terms, |t| &t.name);
    let duplicate_slugs = duplicate_groups(&snapshot.terms, |t| &t.slug);
    debug!(
        "Duplicate names: {}, duplicate slugs: {}",
        duplicate_names.len(),
        duplicate_slugs.len()
    );

    Ok(AuditReport {
        orphan_terms,
        orphan_term_taxonomies,
        ghost_relationships,
        incorrect_counts,
        broken_parents,
        unregistered_taxonomies,
        duplicate_names,
        duplicate_slugs,
        generated_at: Utc::now(),
    })
}

/// Group terms by a byte-exact key, keeping groups of two or more.
fn duplicate_groups<'t, K>(terms: &'t [Term], key: K) -> Vec<DuplicateGroup>
where
    K: Fn(&'t Term) -> &'t TermText,
{
    let mut groups: Vec<DuplicateGroup> = Vec::new();
    let mut index: HashMap<&'t [u8], usize> = HashMap::new();

    for term in terms {
        let k = key(term);
        match index.get(k.as_bytes()) {
            Some(&slot) => groups[slot].terms.push(term.clone()),
            None => {
                index.insert(k.as_bytes(), groups.len());
                groups.push(DuplicateGroup {
                    key: k.clone(),
                    terms: vec![term.clone()],
                });
            }
        }
    }

    groups.retain(|g| g.terms.len() > 1);
    groups
}
