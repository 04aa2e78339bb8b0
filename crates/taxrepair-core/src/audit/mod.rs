//! Taxonomy audit engine.
//!
//! Runs seven independent consistency checks over a full snapshot of the
//! term, term taxonomy and relationship tables:
//! - Orphan terms and orphan term taxonomy rows
//! - Ghost relationships
//! - Cached counts that disagree with the relationship table
//! - Broken parent chains
//! - Rows in unregistered taxonomies
//! - Duplicate term names and slugs

mod engine;
mod report;

pub use engine::{audit_snapshot, AuditConfig, AuditEngine};
pub use report::{AuditReport, AuditSummary, DuplicateGroup, IncorrectCount};
