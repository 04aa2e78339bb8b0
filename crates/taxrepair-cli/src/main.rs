//! Taxrepair CLI - audit and repair taxonomy tables from the command line.
//!
//! A thin host over `taxrepair-core`: it opens the host database, picks the
//! registered-taxonomy source and hands one command to the router. Repairs
//! only run when explicitly requested; `audit` never writes.

mod render;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use taxrepair_core::config::{AppConfig, StoreDefaults};
use taxrepair_core::{
    AuditConfig, CommandRouter, FileTaxonomyProvider, RepairCommand, SqliteStoreConfig,
    SqliteTaxonomyStore, StaticTaxonomyProvider, TaxonomyProvider,
};
use tracing::{debug, info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "taxrepair")]
#[command(about = "Audit and repair term, term taxonomy and relationship tables")]
struct Args {
    /// SQLite database holding the taxonomy tables
    #[arg(long, default_value = AppConfig::DEFAULT_DB_FILENAME)]
    db: PathBuf,

    /// Table prefix
    #[arg(long, default_value = StoreDefaults::TABLE_PREFIX)]
    prefix: String,

    /// Registered taxonomy name (repeatable; defaults to the core taxonomies)
    #[arg(long = "taxonomy", value_name = "NAME")]
    taxonomies: Vec<String>,

    /// JSON file listing registered taxonomy names
    #[arg(long, conflicts_with = "taxonomies")]
    taxonomies_file: Option<PathBuf>,

    /// Count relationships from the snapshot instead of per-row live queries
    #[arg(long)]
    snapshot_counts: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run every consistency check and print the report
    Audit,
    /// Delete a term that has no term taxonomy rows
    DeleteOrphanTerm { term_id: i64 },
    /// Delete every relationship pointing at a missing term taxonomy row
    DeleteGhostRelationships,
    /// Recalculate the cached count of one term taxonomy row
    FixCount { term_taxonomy_id: i64 },
    /// Run a named command with JSON params and print the JSON outcome
    ///
    /// Output is always JSON, with or without `--json`.
    Exec {
        method: String,
        #[arg(long, default_value = "{}")]
        params: String,
    },
}

impl Command {
    fn to_repair_command(&self) -> Option<RepairCommand> {
        match self {
            Command::Audit => Some(RepairCommand::RunAudit),
            Command::DeleteOrphanTerm { term_id } => {
                Some(RepairCommand::DeleteOrphanTerm { term_id: *term_id })
            }
            Command::DeleteGhostRelationships => Some(RepairCommand::DeleteGhostRelationships),
            Command::FixCount { term_taxonomy_id } => Some(RepairCommand::FixCount {
                term_taxonomy_id: *term_taxonomy_id,
            }),
            Command::Exec { .. } => None,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Logs go to stderr so JSON output stays parseable
    let log_level = if args.debug { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    info!("Starting {}", AppConfig::APP_NAME);
    print!("{}", run(&args)?);
    Ok(())
}

/// Execute the selected subcommand and return what should be printed.
fn run(args: &Args) -> Result<String> {
    debug!("Database: {}", args.db.display());

    let store = SqliteTaxonomyStore::open(&args.db, SqliteStoreConfig::with_prefix(&args.prefix))
        .with_context(|| format!("Failed to open {}", args.db.display()))?;
    let router = CommandRouter::new(Arc::new(store), taxonomy_provider(args)).with_audit_config(
        AuditConfig {
            recount_from_store: !args.snapshot_counts,
        },
    );

    if let Command::Exec { method, params } = &args.command {
        let params: serde_json::Value =
            serde_json::from_str(params).context("--params must be valid JSON")?;
        let value = router.execute(method, &params)?;
        return Ok(format!("{}\n", serde_json::to_string_pretty(&value)?));
    }

    match args.command.to_repair_command() {
        Some(command) => {
            let outcome = router.run(command)?;
            if args.json {
                Ok(format!("{}\n", serde_json::to_string_pretty(&outcome)?))
            } else {
                Ok(render::render_outcome(&outcome))
            }
        }
        None => Ok(String::new()),
    }
}

fn taxonomy_provider(args: &Args) -> Arc<dyn TaxonomyProvider> {
    match &args.taxonomies_file {
        Some(path) => Arc::new(FileTaxonomyProvider::new(path)),
        None if args.taxonomies.is_empty() => Arc::new(StaticTaxonomyProvider::default()),
        None => Arc::new(StaticTaxonomyProvider::new(args.taxonomies.iter().cloned())),
    }
}
