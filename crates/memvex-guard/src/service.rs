// service.rs — GuardService: the public permission-check facade.
//
// Combines the RulesEngine with an ApprovalBackend. A check whose decision
// requires approval queues exactly one new Pending request and returns its
// id alongside the decision. Every other operation passes straight through
// to the backend.
//
// Construction never fails because of storage: if the SQLite queue cannot be
// opened (or the crate was built without the `sqlite` feature) the service
// falls back to the in-memory queue and logs a warning. A disabled service
// allows every check and never creates a request. Invalid rules do fail
// construction, since running with an undefined policy is worse than not
// running.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::approval::{ApprovalBackend, ApprovalRequest};
use crate::config::GuardConfig;
use crate::engine::{GuardDecision, RulesEngine};
use crate::error::GuardError;
use crate::memory_queue::InMemoryApprovalQueue;

/// A decision plus the id of the approval request it queued, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckOutcome {
    #[serde(flatten)]
    pub decision: GuardDecision,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_id: Option<Uuid>,
}

/// Permission gate combining rules evaluation and the approval queue.
pub struct GuardService {
    engine: RulesEngine,
    backend: Box<dyn ApprovalBackend>,
    enabled: bool,
}

impl std::fmt::Debug for GuardService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardService")
            .field("enabled", &self.enabled)
            .field("rules", &self.engine.rules().len())
            .field("backend", &self.backend.name())
            .finish()
    }
}

impl GuardService {
    pub fn new(engine: RulesEngine, backend: Box<dyn ApprovalBackend>) -> Self {
        Self {
            engine,
            backend,
            enabled: true,
        }
    }

    /// A disabled guard: no rules, volatile queue, every check allowed.
    pub fn permissive() -> Self {
        Self {
            engine: RulesEngine::permissive(),
            backend: Box::new(InMemoryApprovalQueue::new()),
            enabled: false,
        }
    }

    /// Build the service described by `config`.
    ///
    /// `default_path` is used for the SQLite file when `config.path` is unset.
    pub fn from_config(config: &GuardConfig, default_path: &Path) -> Result<Self, GuardError> {
        if !config.enabled {
            tracing::debug!("guard disabled; all actions permitted");
            return Ok(Self::permissive());
        }

        let rules = config.rule_set()?;
        let backend: Box<dyn ApprovalBackend> = if config.persist {
            let path = config.path.as_deref().unwrap_or(default_path);
            open_persisted(path)
        } else {
            Box::new(InMemoryApprovalQueue::new())
        };

        tracing::info!(
            rules = rules.len(),
            backend = backend.name(),
            "guard initialized"
        );
        Ok(Self::new(RulesEngine::new(rules), backend))
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn engine(&self) -> &RulesEngine {
        &self.engine
    }

    /// Check an action. Queues an approval request when one is required.
    pub fn check(
        &self,
        action: &str,
        params: Option<&Map<String, Value>>,
        agent: Option<&str>,
    ) -> Result<CheckOutcome, GuardError> {
        let decision = self.engine.check(action, params);
        tracing::debug!(
            action = %action,
            allowed = decision.allowed,
            requires_approval = decision.requires_approval,
            "guard check"
        );

        let approval_id = if decision.requires_approval {
            let request = self
                .backend
                .submit(action, agent, params, Some(&decision.reason))?;
            Some(request.id)
        } else {
            None
        };

        Ok(CheckOutcome {
            decision,
            approval_id,
        })
    }

    /// Queue a request on the agent's own initiative, bypassing the rules.
    ///
    /// A disabled guard never creates requests and returns `Disabled`.
    pub fn request_approval(
        &self,
        action: &str,
        agent: Option<&str>,
        params: Option<&Map<String, Value>>,
        reason: Option<&str>,
    ) -> Result<ApprovalRequest, GuardError> {
        if !self.enabled {
            return Err(GuardError::Disabled);
        }
        self.backend.submit(action, agent, params, reason)
    }

    pub fn approve(&self, id: Uuid) -> Result<Option<ApprovalRequest>, GuardError> {
        self.backend.approve(id)
    }

    pub fn deny(&self, id: Uuid) -> Result<Option<ApprovalRequest>, GuardError> {
        self.backend.deny(id)
    }

    pub fn pending_approvals(&self) -> Result<Vec<ApprovalRequest>, GuardError> {
        self.backend.get_pending()
    }

    pub fn history(&self, limit: usize) -> Result<Vec<ApprovalRequest>, GuardError> {
        self.backend.get_history(limit)
    }

    pub fn get(&self, id: Uuid) -> Result<Option<ApprovalRequest>, GuardError> {
        self.backend.get(id)
    }
}

#[cfg(feature = "sqlite")]
fn open_persisted(path: &Path) -> Box<dyn ApprovalBackend> {
    match crate::sqlite_queue::SqliteApprovalQueue::open(path) {
        Ok(queue) => Box::new(queue),
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "SQLite approval queue unavailable; using in-memory queue"
            );
            Box::new(InMemoryApprovalQueue::new())
        }
    }
}

#[cfg(not(feature = "sqlite"))]
fn open_persisted(path: &Path) -> Box<dyn ApprovalBackend> {
    tracing::warn!(
        path = %path.display(),
        "built without the `sqlite` feature; using in-memory approval queue"
    );
    Box::new(InMemoryApprovalQueue::new())
}
