//! # memvex-guard
//!
//! Action-level permission gate for memvex.
//!
//! Agents ask "can I do X with parameters P right now?" and get back a
//! [`GuardDecision`]: allowed, denied, or deferred to a human. Deferred
//! decisions become [`ApprovalRequest`]s that a person approves or denies
//! later through the CLI or any other caller of [`GuardService`].
//!
//! ## Key invariants
//!
//! - **Default allow**: an action with no rule is always permitted.
//! - **First rule wins**: duplicate action names are warned about at load time
//!   and only the first one is ever consulted.
//! - **Hard cap beats escalation order**: `blocked` → `require_approval` →
//!   `require_approval_above` → `max`, first applicable clause decides.
//! - **Decide once**: an approval request leaves `Pending` exactly once;
//!   `Approved` and `Denied` are terminal and a second decision returns `None`.

pub mod approval;
pub mod config;
pub mod engine;
pub mod error;
pub mod memory_queue;
pub mod rule;
pub mod service;
#[cfg(feature = "sqlite")]
pub mod sqlite_queue;

pub use approval::{ApprovalBackend, ApprovalRequest, ApprovalStatus, DEFAULT_HISTORY_LIMIT};
pub use config::GuardConfig;
pub use engine::{GuardDecision, RulesEngine};
pub use error::GuardError;
pub use memory_queue::InMemoryApprovalQueue;
pub use rule::{GuardRule, RuleSet};
pub use service::{CheckOutcome, GuardService};
#[cfg(feature = "sqlite")]
pub use sqlite_queue::SqliteApprovalQueue;
