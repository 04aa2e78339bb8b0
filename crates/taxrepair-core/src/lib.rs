//! Taxrepair Core - audit and selective repair of taxonomy tables.
//!
//! Years of imports, plugin churn and manual edits leave the term, term
//! taxonomy and relationship tables inconsistent. This crate detects seven
//! categories of drift and repairs the three that need no human judgment:
//! orphan terms, ghost relationships and incorrect cached counts. Everything
//! else (orphan taxonomy rows, broken parents, unregistered taxonomies,
//! duplicate names and slugs) is reported for manual review only.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use taxrepair_core::{
//!     CommandRouter, RepairCommand, SqliteStoreConfig, SqliteTaxonomyStore,
//!     StaticTaxonomyProvider,
//! };
//!
//! fn main() -> taxrepair_core::Result<()> {
//!     let store = SqliteTaxonomyStore::open("wordpress.sqlite", SqliteStoreConfig::default())?;
//!     let router = CommandRouter::new(Arc::new(store), Arc::new(StaticTaxonomyProvider::default()));
//!
//!     let outcome = router.run(RepairCommand::RunAudit)?;
//!     println!("{:?}", outcome);
//!     Ok(())
//! }
//! ```

pub mod audit;
pub mod command;
pub mod config;
pub mod error;
pub mod models;
pub mod repair;
pub mod store;
pub mod taxonomies;

// Re-export commonly used types
pub use audit::{
    AuditConfig, AuditEngine, AuditReport, AuditSummary, DuplicateGroup, IncorrectCount,
};
pub use command::{CommandOutcome, CommandRouter, RepairCommand};
pub use error::{RepairError, Result};
pub use models::{
    Relationship, TableSnapshot, Term, TermId, TermTaxonomy, TermTaxonomyId, TermText,
};
pub use repair::RepairExecutor;
pub use store::{
    CountCorrection, GhostSweep, SqliteStoreConfig, SqliteTaxonomyStore, TaxonomyStore,
};
pub use taxonomies::{FileTaxonomyProvider, StaticTaxonomyProvider, TaxonomyProvider};
