//! Stateless command router over the audit engine and repair executor.
//!
//! Hosts adapt whatever transport they use (admin form post, JSON-RPC, CLI)
//! onto `execute(method, params)`. The router owns no mutable state; every
//! call builds a fresh engine or executor over the injected store.

use crate::audit::{AuditConfig, AuditEngine, AuditReport, AuditSummary};
use crate::error::{RepairError, Result};
use crate::models::{TermId, TermTaxonomyId};
use crate::repair::RepairExecutor;
use crate::store::TaxonomyStore;
use crate::taxonomies::TaxonomyProvider;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// One explicit, single-target operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairCommand {
    RunAudit,
    DeleteOrphanTerm { term_id: TermId },
    DeleteGhostRelationships,
    FixCount { term_taxonomy_id: TermTaxonomyId },
}

impl RepairCommand {
    pub const RUN_AUDIT: &'static str = "run_audit";
    pub const DELETE_ORPHAN_TERM: &'static str = "delete_orphan_term";
    pub const DELETE_GHOST_RELATIONSHIPS: &'static str = "delete_ghost_relationships";
    pub const FIX_COUNT: &'static str = "fix_count";

    /// Build a command from a method name and its JSON params.
    pub fn parse(method: &str, params: &Value) -> Result<Self> {
        match method {
            Self::RUN_AUDIT => Ok(Self::RunAudit),
            Self::DELETE_ORPHAN_TERM => Ok(Self::DeleteOrphanTerm {
                term_id: require_id_param(params, &["term_id", "termId"])?,
            }),
            Self::DELETE_GHOST_RELATIONSHIPS => Ok(Self::DeleteGhostRelationships),
            Self::FIX_COUNT => Ok(Self::FixCount {
                term_taxonomy_id: require_id_param(
                    params,
                    &["term_taxonomy_id", "termTaxonomyId", "tt_id", "ttId"],
                )?,
            }),
            _ => Err(RepairError::UnknownCommand(method.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::RunAudit => Self::RUN_AUDIT,
            Self::DeleteOrphanTerm { .. } => Self::DELETE_ORPHAN_TERM,
            Self::DeleteGhostRelationships => Self::DELETE_GHOST_RELATIONSHIPS,
            Self::FixCount { .. } => Self::FIX_COUNT,
        }
    }

    pub fn is_repair(&self) -> bool {
        !matches!(self, Self::RunAudit)
    }
}

/// What a command did, as reported back to the host.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CommandOutcome {
    Audited {
        summary: AuditSummary,
        report: AuditReport,
    },
    #[serde(rename_all = "camelCase")]
    TermDeleted { term_id: TermId },
    GhostsDeleted { deleted: usize },
    #[serde(rename_all = "camelCase")]
    CountFixed {
        term_taxonomy_id: TermTaxonomyId,
        old: i64,
        new: i64,
    },
    /// The repair target no longer exists; nothing was done.
    NotFound { entity: &'static str, id: i64 },
}

/// Dispatches commands to a freshly built engine or executor.
#[derive(Clone)]
pub struct CommandRouter {
    store: Arc<dyn TaxonomyStore>,
    provider: Arc<dyn TaxonomyProvider>,
    audit_config: AuditConfig,
}

impl CommandRouter {
    pub fn new(store: Arc<dyn TaxonomyStore>, provider: Arc<dyn TaxonomyProvider>) -> Self {
        Self {
            store,
            provider,
            audit_config: AuditConfig::default(),
        }
    }

    pub fn with_audit_config(mut self, config: AuditConfig) -> Self {
        self.audit_config = config;
        self
    }

    /// Run one command.
    ///
    /// A repair whose target is already gone succeeds with
    /// [`CommandOutcome::NotFound`]; every other failure is returned as is.
    pub fn run(&self, command: RepairCommand) -> Result<CommandOutcome> {
        debug!("Command: {:?}", command);

        let result = match command {
            RepairCommand::RunAudit => {
                let report = AuditEngine::with_config(
                    self.store.as_ref(),
                    self.provider.as_ref(),
                    self.audit_config,
                )
                .run()?;
                Ok(CommandOutcome::Audited {
                    summary: report.summary(),
                    report,
                })
            }
            RepairCommand::DeleteOrphanTerm { term_id } => self
                .executor()
                .delete_orphan_term(term_id)
                .map(|()| CommandOutcome::TermDeleted { term_id }),
            RepairCommand::DeleteGhostRelationships => self
                .executor()
                .delete_ghost_relationships()
                .map(|sweep| CommandOutcome::GhostsDeleted {
                    deleted: sweep.deleted,
                }),
            RepairCommand::FixCount { term_taxonomy_id } => self
                .executor()
                .fix_count(term_taxonomy_id)
                .map(|c| CommandOutcome::CountFixed {
                    term_taxonomy_id: c.term_taxonomy_id,
                    old: c.old,
                    new: c.new,
                }),
        };

        match result {
            Err(RepairError::NotFound { entity, id }) => {
                debug!("{}: {} {} not found, nothing to do", command.name(), entity, id);
                Ok(CommandOutcome::NotFound { entity, id })
            }
            other => other,
        }
    }

    /// Parse and run a named command, returning its outcome as JSON.
    pub fn execute(&self, method: &str, params: &Value) -> Result<Value> {
        let command = RepairCommand::parse(method, params).inspect_err(|e| {
            warn!("Rejected command {}: {}", method, e);
        })?;
        let outcome = self.run(command)?;
        Ok(serde_json::to_value(outcome)?)
    }

    fn executor(&self) -> RepairExecutor<'_> {
        RepairExecutor::new(self.store.as_ref())
    }
}

/// Extract an id from the first matching key.
///
/// Accepts JSON integers and integer strings (form posts carry strings).
fn get_id_param(params: &Value, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|key| {
        params.get(*key).and_then(|v| {
            v.as_i64()
                .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
        })
    })
}

fn require_id_param(params: &Value, keys: &[&str]) -> Result<i64> {
    get_id_param(params, keys).ok_or_else(|| RepairError::InvalidParams {
        message: format!("Missing required integer parameter: {}", keys[0]),
    })
}
