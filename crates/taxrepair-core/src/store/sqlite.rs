//! SQLite-backed access to the host's taxonomy tables.

use super::traits::{CountCorrection, GhostSweep, SqliteStoreConfig, TaxonomyStore};
use crate::config::StoreDefaults;
use crate::error::{RepairError, Result};
use crate::models::{
    Relationship, TableSnapshot, Term, TermId, TermTaxonomy, TermTaxonomyId, TermText,
};
use rusqlite::types::{FromSql, FromSqlResult, ValueRef};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Fully prefixed table names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TableNames {
    pub terms: String,
    pub term_taxonomy: String,
    pub relationships: String,
}

impl TableNames {
    pub(crate) fn with_prefix(prefix: &str) -> Self {
        Self {
            terms: format!("{}{}", prefix, StoreDefaults::TERMS_TABLE),
            term_taxonomy: format!("{}{}", prefix, StoreDefaults::TERM_TAXONOMY_TABLE),
            relationships: format!("{}{}", prefix, StoreDefaults::RELATIONSHIPS_TABLE),
        }
    }
}

/// SQLite store over `{prefix}terms`, `{prefix}term_taxonomy` and
/// `{prefix}term_relationships`.
///
/// Thread-safe via internal mutex on the connection. Every repair runs in an
/// immediate transaction so its precondition check and its write see the
/// same rows. Opening a host database only sets a busy timeout; journal
/// settings persist in the file and belong to the host.
pub struct SqliteTaxonomyStore {
    /// Database connection (wrapped for thread safety).
    conn: Arc<Mutex<Connection>>,
    tables: TableNames,
}

impl SqliteTaxonomyStore {
    /// Open an existing host database.
    ///
    /// The tables are owned by the host and are not created here.
    pub fn open(db_path: impl AsRef<Path>, config: SqliteStoreConfig) -> Result<Self> {
        let db_path = db_path.as_ref();
        config.validate()?;

        if !db_path.exists() {
            return Err(RepairError::Io {
                message: "Database file does not exist".to_string(),
                path: Some(db_path.to_path_buf()),
                source: None,
            });
        }

        let conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| RepairError::Database {
            message: format!("Failed to open database {}: {}", db_path.display(), e),
            source: Some(e),
        })?;

        Self::from_connection(conn, db_path, &config)
    }

    /// Create (or reuse) a database file and install the three tables.
    pub fn create(db_path: impl AsRef<Path>, config: SqliteStoreConfig) -> Result<Self> {
        let db_path = db_path.as_ref();
        config.validate()?;

        // Create parent directory if needed
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| RepairError::io_with_path(e, parent))?;
            }
        }

        let conn = Connection::open(db_path).map_err(|e| RepairError::Database {
            message: format!("Failed to create database {}: {}", db_path.display(), e),
            source: Some(e),
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")
            .map_err(|e| RepairError::Database {
                message: format!("Failed to set pragmas: {}", e),
                source: Some(e),
            })?;

        let store = Self::from_connection(conn, db_path, &config)?;
        store.install_schema()?;
        Ok(store)
    }

    fn from_connection(
        conn: Connection,
        db_path: &Path,
        config: &SqliteStoreConfig,
    ) -> Result<Self> {
        conn.busy_timeout(config.busy_timeout)?;

        debug!(
            "Opened taxonomy store at {} (prefix '{}')",
            db_path.display(),
            config.table_prefix
        );

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            tables: TableNames::with_prefix(&config.table_prefix),
        })
    }

    /// Create the three tables and their lookup indexes if missing.
    ///
    /// No foreign keys are declared; the host schema has none either.
    pub fn install_schema(&self) -> Result<()> {
        let conn = self.lock()?;
        let TableNames {
            terms,
            term_taxonomy,
            relationships,
        } = &self.tables;

        conn.execute_batch(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {terms} (
                term_id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL DEFAULT '',
                slug TEXT NOT NULL DEFAULT '',
                term_group INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_{terms}_slug ON {terms}(slug);
            CREATE INDEX IF NOT EXISTS idx_{terms}_name ON {terms}(name);

            CREATE TABLE IF NOT EXISTS {term_taxonomy} (
                term_taxonomy_id INTEGER PRIMARY KEY AUTOINCREMENT,
                term_id INTEGER NOT NULL DEFAULT 0,
                taxonomy TEXT NOT NULL DEFAULT '',
                description TEXT NOT NULL DEFAULT '',
                parent INTEGER NOT NULL DEFAULT 0,
                count INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_{term_taxonomy}_term
                ON {term_taxonomy}(term_id, taxonomy);
            CREATE INDEX IF NOT EXISTS idx_{term_taxonomy}_taxonomy
                ON {term_taxonomy}(taxonomy);

            CREATE TABLE IF NOT EXISTS {relationships} (
                object_id INTEGER NOT NULL DEFAULT 0,
                term_taxonomy_id INTEGER NOT NULL DEFAULT 0,
                term_order INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (object_id, term_taxonomy_id)
            );
            CREATE INDEX IF NOT EXISTS idx_{relationships}_tt
                ON {relationships}(term_taxonomy_id);
            "#
        ))
        .map_err(|e| RepairError::Database {
            message: format!("Failed to initialize taxonomy schema: {}", e),
            source: Some(e),
        })?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| RepairError::Database {
            message: format!("Failed to lock database: {}", e),
            source: None,
        })
    }
}

/// Name and slug columns may hold bytes that are not valid UTF-8.
impl FromSql for TermText {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Ok(match value {
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => TermText::from(bytes.to_vec()),
            ValueRef::Integer(i) => TermText::from(i.to_string()),
            ValueRef::Real(f) => TermText::from(f.to_string()),
            ValueRef::Null => TermText::default(),
        })
    }
}

fn read_terms(conn: &Connection, table: &str) -> Result<Vec<Term>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT term_id, name, slug FROM {} ORDER BY rowid",
        table
    ))?;

    let terms = stmt
        .query_map([], |row| {
            Ok(Term {
                term_id: row.get(0)?,
                name: row.get(1)?,
                slug: row.get(2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    debug!("Fetched {} rows from {}", terms.len(), table);
    Ok(terms)
}

fn read_term_taxonomies(conn: &Connection, table: &str) -> Result<Vec<TermTaxonomy>> {
    // Host schemas may leave parent nullable; NULL is a root like zero.
    let mut stmt = conn.prepare(&format!(
        "SELECT term_taxonomy_id, term_id, taxonomy, COALESCE(parent, 0), count
         FROM {} ORDER BY rowid",
        table
    ))?;

    let rows = stmt
        .query_map([], |row| {
            Ok(TermTaxonomy {
                term_taxonomy_id: row.get(0)?,
                term_id: row.get(1)?,
                taxonomy: row.get(2)?,
                parent: row.get(3)?,
                count: row.get(4)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    debug!("Fetched {} rows from {}", rows.len(), table);
    Ok(rows)
}

fn read_relationships(conn: &Connection, table: &str) -> Result<Vec<Relationship>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT object_id, term_taxonomy_id FROM {} ORDER BY rowid",
        table
    ))?;

    let rows = stmt
        .query_map([], |row| {
            Ok(Relationship {
                object_id: row.get(0)?,
                term_taxonomy_id: row.get(1)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    debug!("Fetched {} rows from {}", rows.len(), table);
    Ok(rows)
}

/// Read all three tables on `conn`, labelling failures by table.
fn read_snapshot(conn: &Connection, tables: &TableNames) -> Result<TableSnapshot> {
    let terms = read_terms(conn, &tables.terms)
        .map_err(|e| RepairError::integrity_read(StoreDefaults::TERMS_TABLE, e))?;
    let term_taxonomies = read_term_taxonomies(conn, &tables.term_taxonomy)
        .map_err(|e| RepairError::integrity_read(StoreDefaults::TERM_TAXONOMY_TABLE, e))?;
    let relationships = read_relationships(conn, &tables.relationships)
        .map_err(|e| RepairError::integrity_read(StoreDefaults::RELATIONSHIPS_TABLE, e))?;

    Ok(TableSnapshot {
        terms,
        term_taxonomies,
        relationships,
    })
}

impl TaxonomyStore for SqliteTaxonomyStore {
    fn fetch_terms(&self) -> Result<Vec<Term>> {
        read_terms(&*self.lock()?, &self.tables.terms)
    }

    fn fetch_term_taxonomies(&self) -> Result<Vec<TermTaxonomy>> {
        read_term_taxonomies(&*self.lock()?, &self.tables.term_taxonomy)
    }

    fn fetch_relationships(&self) -> Result<Vec<Relationship>> {
        read_relationships(&*self.lock()?, &self.tables.relationships)
    }

    /// All three tables from one read transaction.
    fn snapshot(&self) -> Result<TableSnapshot> {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepairError::integrity_read(StoreDefaults::TERMS_TABLE, e.into()))?;

        let snapshot = read_snapshot(&tx, &self.tables)?;
        tx.commit()
            .map_err(|e| RepairError::integrity_read(StoreDefaults::TERMS_TABLE, e.into()))?;
        Ok(snapshot)
    }

    fn count_relationships(&self, term_taxonomy_id: TermTaxonomyId) -> Result<i64> {
        let conn = self.lock()?;
        let count = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {} WHERE term_taxonomy_id = ?1",
                self.tables.relationships
            ),
            params![term_taxonomy_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    fn delete_orphan_term(&self, term_id: TermId) -> Result<()> {
        const OP: &str = "delete_orphan_term";
        let TableNames {
            terms,
            term_taxonomy,
            ..
        } = &self.tables;

        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepairError::write(OP, e))?;

        let exists = tx
            .query_row(
                &format!("SELECT 1 FROM {terms} WHERE term_id = ?1"),
                params![term_id],
                |_| Ok(true),
            )
            .optional()
            .map_err(|e| RepairError::write(OP, e))?
            .unwrap_or(false);
        if !exists {
            debug!("Term {} already gone, nothing to delete", term_id);
            return Err(RepairError::NotFound {
                entity: "term",
                id: term_id,
            });
        }

        let references: i64 = tx
            .query_row(
                &format!("SELECT COUNT(*) FROM {term_taxonomy} WHERE term_id = ?1"),
                params![term_id],
                |row| row.get(0),
            )
            .map_err(|e| RepairError::write(OP, e))?;
        if references > 0 {
            return Err(RepairError::PreconditionFailed {
                message: format!(
                    "term {} is referenced by {} term taxonomy row(s)",
                    term_id, references
                ),
            });
        }

        let deleted = tx
            .execute(
                &format!(
                    "DELETE FROM {terms} WHERE term_id = ?1
                     AND NOT EXISTS (SELECT 1 FROM {term_taxonomy} WHERE term_id = ?1)"
                ),
                params![term_id],
            )
            .map_err(|e| RepairError::write(OP, e))?;
        if deleted != 1 {
            return Err(RepairError::PreconditionFailed {
                message: format!("term {} changed while being deleted", term_id),
            });
        }

        tx.commit().map_err(|e| RepairError::write(OP, e))?;
        info!("Deleted orphan term {}", term_id);
        Ok(())
    }

    fn delete_ghost_relationships(&self) -> Result<GhostSweep> {
        const OP: &str = "delete_ghost_relationships";
        let TableNames {
            term_taxonomy,
            relationships,
            ..
        } = &self.tables;

        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepairError::write(OP, e))?;

        let deleted = tx
            .execute(
                &format!(
                    "DELETE FROM {relationships}
                     WHERE NOT EXISTS (
                         SELECT 1 FROM {term_taxonomy} tt
                         WHERE tt.term_taxonomy_id = {relationships}.term_taxonomy_id
                     )"
                ),
                [],
            )
            .map_err(|e| RepairError::write(OP, e))?;

        tx.commit().map_err(|e| RepairError::write(OP, e))?;
        info!("Deleted {} ghost relationships", deleted);
        Ok(GhostSweep { deleted })
    }

    fn sync_count(&self, term_taxonomy_id: TermTaxonomyId) -> Result<CountCorrection> {
        const OP: &str = "fix_count";
        let TableNames {
            term_taxonomy,
            relationships,
            ..
        } = &self.tables;

        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| RepairError::write(OP, e))?;

        let old: i64 = tx
            .query_row(
                &format!("SELECT count FROM {term_taxonomy} WHERE term_taxonomy_id = ?1"),
                params![term_taxonomy_id],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| RepairError::write(OP, e))?
            .ok_or(RepairError::NotFound {
                entity: "term_taxonomy",
                id: term_taxonomy_id,
            })?;

        let new: i64 = tx
            .query_row(
                &format!("SELECT COUNT(*) FROM {relationships} WHERE term_taxonomy_id = ?1"),
                params![term_taxonomy_id],
                |row| row.get(0),
            )
            .map_err(|e| RepairError::write(OP, e))?;

        tx.execute(
            &format!("UPDATE {term_taxonomy} SET count = ?1 WHERE term_taxonomy_id = ?2"),
            params![new, term_taxonomy_id],
        )
        .map_err(|e| RepairError::write(OP, e))?;

        tx.commit().map_err(|e| RepairError::write(OP, e))?;

        if old != new {
            info!(
                "Corrected count for term taxonomy {}: {} -> {}",
                term_taxonomy_id, old, new
            );
        }
        Ok(CountCorrection {
            term_taxonomy_id,
            old,
            new,
        })
    }
}
