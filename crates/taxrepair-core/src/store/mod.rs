//! Host data-store access for the three taxonomy tables.
//!
//! The audit engine only reads through [`TaxonomyStore`]; the repair
//! executor issues the three bounded writes it exposes. The SQLite backend
//! addresses a WordPress-style schema under a configurable table prefix.

mod sqlite;
mod traits;

pub use sqlite::SqliteTaxonomyStore;
pub use traits::{CountCorrection, GhostSweep, SqliteStoreConfig, TaxonomyStore};
