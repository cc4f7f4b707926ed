// memory_queue.rs — Volatile in-process approval queue.
//
// Requests live in a Mutex<Vec<_>> in insertion order, which is also
// creation order. Every operation holds the lock for its whole duration, so
// the approve/deny check-and-set is atomic with respect to other callers of
// the same instance. Nothing survives the process.

use std::sync::{Mutex, MutexGuard};

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::approval::{ApprovalBackend, ApprovalRequest, ApprovalStatus};
use crate::error::GuardError;

/// Approval queue held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryApprovalQueue {
    requests: Mutex<Vec<ApprovalRequest>>,
}

impl InMemoryApprovalQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ApprovalRequest>> {
        // A panic while holding the lock cannot leave a request half-decided
        // (decide() mutates two fields with no fallible step in between).
        self.requests.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn decide(&self, id: Uuid, next: ApprovalStatus) -> Option<ApprovalRequest> {
        let mut requests = self.lock();
        let request = requests.iter_mut().find(|r| r.id == id)?;
        if !request.decide(next) {
            return None;
        }
        tracing::info!(id = %id, action = %request.action, status = %next, "approval decided");
        Some(request.clone())
    }
}

impl ApprovalBackend for InMemoryApprovalQueue {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn submit(
        &self,
        action: &str,
        agent: Option<&str>,
        params: Option<&Map<String, Value>>,
        reason: Option<&str>,
    ) -> Result<ApprovalRequest, GuardError> {
        let request = ApprovalRequest::pending(
            action,
            agent.map(str::to_string),
            params.cloned(),
            reason.map(str::to_string),
        );
        self.lock().push(request.clone());
        tracing::info!(id = %request.id, action = %action, "approval requested");
        Ok(request)
    }

    fn approve(&self, id: Uuid) -> Result<Option<ApprovalRequest>, GuardError> {
        Ok(self.decide(id, ApprovalStatus::Approved))
    }

    fn deny(&self, id: Uuid) -> Result<Option<ApprovalRequest>, GuardError> {
        Ok(self.decide(id, ApprovalStatus::Denied))
    }

    fn get_pending(&self) -> Result<Vec<ApprovalRequest>, GuardError> {
        Ok(self
            .lock()
            .iter()
            .filter(|r| r.status == ApprovalStatus::Pending)
            .cloned()
            .collect())
    }

    fn get(&self, id: Uuid) -> Result<Option<ApprovalRequest>, GuardError> {
        Ok(self.lock().iter().find(|r| r.id == id).cloned())
    }

    fn get_history(&self, limit: usize) -> Result<Vec<ApprovalRequest>, GuardError> {
        Ok(self.lock().iter().rev().take(limit).cloned().collect())
    }
}
