//! Audit report types.

use crate::models::{Relationship, Term, TermId, TermTaxonomy, TermTaxonomyId, TermText};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A term taxonomy row whose cached count disagrees with its relationships.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IncorrectCount {
    pub term_taxonomy: TermTaxonomy,
    pub stored: i64,
    pub real: i64,
}

impl IncorrectCount {
    pub fn term_taxonomy_id(&self) -> TermTaxonomyId {
        self.term_taxonomy.term_taxonomy_id
    }
}

/// Terms sharing one exact name or slug, in table scan order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateGroup {
    pub key: TermText,
    pub terms: Vec<Term>,
}

impl DuplicateGroup {
    pub fn term_ids(&self) -> Vec<TermId> {
        self.terms.iter().map(|t| t.term_id).collect()
    }
}

/// Findings of one audit run.
///
/// Every collection keeps snapshot row order. Duplicate groups are ordered
/// by the first appearance of their key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    /// Terms with no term taxonomy row. Repairable.
    pub orphan_terms: Vec<Term>,
    /// Term taxonomy rows pointing at a missing term. Manual review.
    pub orphan_term_taxonomies: Vec<TermTaxonomy>,
    /// Relationships pointing at a missing term taxonomy row. Repairable.
    pub ghost_relationships: Vec<Relationship>,
    /// Cached counts that disagree with the relationship table. Repairable.
    pub incorrect_counts: Vec<IncorrectCount>,
    /// Rows whose non-zero parent has no term taxonomy row. Manual review.
    pub broken_parents: Vec<TermTaxonomy>,
    /// Rows in taxonomies the host no longer registers. Manual review.
    pub unregistered_taxonomies: Vec<TermTaxonomy>,
    pub duplicate_names: Vec<DuplicateGroup>,
    pub duplicate_slugs: Vec<DuplicateGroup>,
    pub generated_at: DateTime<Utc>,
}

/// Per-category finding counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditSummary {
    pub orphan_terms: usize,
    pub orphan_term_taxonomies: usize,
    pub ghost_relationships: usize,
    pub incorrect_counts: usize,
    pub broken_parents: usize,
    pub unregistered_taxonomies: usize,
    pub duplicate_names: usize,
    pub duplicate_slugs: usize,
}

impl AuditSummary {
    pub fn total(&self) -> usize {
        self.orphan_terms
            + self.orphan_term_taxonomies
            + self.ghost_relationships
            + self.incorrect_counts
            + self.broken_parents
            + self.unregistered_taxonomies
            + self.duplicate_names
            + self.duplicate_slugs
    }

    /// Findings one of the three repair actions can resolve.
    pub fn repairable(&self) -> usize {
        self.orphan_terms + self.ghost_relationships + self.incorrect_counts
    }
}

impl AuditReport {
    pub fn summary(&self) -> AuditSummary {
        AuditSummary {
            orphan_terms: self.orphan_terms.len(),
            orphan_term_taxonomies: self.orphan_term_taxonomies.len(),
            ghost_relationships: self.ghost_relationships.len(),
            incorrect_counts: self.incorrect_counts.len(),
            broken_parents: self.broken_parents.len(),
            unregistered_taxonomies: self.unregistered_taxonomies.len(),
            duplicate_names: self.duplicate_names.len(),
            duplicate_slugs: self.duplicate_slugs.len(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.summary().total() == 0
    }

    /// Findings one of the three repair actions can resolve.
    pub fn repairable_count(&self) -> usize {
        self.summary().repairable()
    }
}
