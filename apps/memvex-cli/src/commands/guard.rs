// guard.rs — Guard subcommands: check, pending, approve, deny, history, show.
//
// This is the human side of the approval queue. Agents can only ask; these
// commands are where a person answers.

use std::path::Path;

use anyhow::Context;
use clap::Subcommand;
use memvex_guard::{ApprovalRequest, ApprovalStatus, GuardService, DEFAULT_HISTORY_LIMIT};
use serde_json::{Map, Value};

use super::{fmt_time, load_state, parse_id, truncate};

#[derive(Subcommand)]
pub enum GuardCommands {
    /// Check whether an action is allowed (queues a request if approval is needed).
    Check {
        /// Action name (e.g., spend_money).
        action: String,
        /// Action parameters as a JSON object (e.g., '{"amount": 75}').
        #[arg(long)]
        params: Option<String>,
        /// Agent name recorded on any queued request.
        #[arg(long)]
        agent: Option<String>,
    },
    /// List requests awaiting a decision, oldest first.
    Pending,
    /// Approve a pending request.
    Approve {
        /// Approval request id.
        id: String,
    },
    /// Deny a pending request.
    Deny {
        /// Approval request id.
        id: String,
    },
    /// Show recent requests, newest first.
    History {
        /// Number of requests to show.
        #[arg(short, default_value_t = DEFAULT_HISTORY_LIMIT)]
        n: usize,
    },
    /// Show one request in full.
    Show {
        /// Approval request id.
        id: String,
    },
}

pub fn execute(cmd: &GuardCommands, config_path: &Path) -> anyhow::Result<()> {
    let state = load_state(config_path)?;
    let guard = &state.guard;

    match cmd {
        GuardCommands::Check {
            action,
            params,
            agent,
        } => {
            let params = params.as_deref().map(parse_params).transpose()?;
            let outcome = guard.check(action, params.as_ref(), agent.as_deref())?;
            let decision = &outcome.decision;

            if decision.allowed {
                println!("ALLOWED   {}", action);
            } else if decision.requires_approval {
                println!("APPROVAL REQUIRED   {}", action);
            } else {
                println!("BLOCKED   {}", action);
            }
            println!("  Reason: {}", decision.reason);
            if let Some(id) = outcome.approval_id {
                println!("  Request: {}", id);
                println!();
                println!("Approve with: memvex guard approve {}", id);
            }
            if !guard.is_enabled() {
                println!("  (guard is disabled in memvex.yaml; every action is allowed)");
            }
        }

        GuardCommands::Pending => {
            let pending = guard.pending_approvals()?;
            if pending.is_empty() {
                println!("No pending approvals.");
                return Ok(());
            }
            print_table(&pending, false);
            println!();
            println!("{} pending request(s).", pending.len());
        }

        GuardCommands::Approve { id } => {
            let request = decide(guard, id, ApprovalStatus::Approved)?;
            println!("Approved {} ({})", request.id, request.action);
        }

        GuardCommands::Deny { id } => {
            let request = decide(guard, id, ApprovalStatus::Denied)?;
            println!("Denied {} ({})", request.id, request.action);
        }

        GuardCommands::History { n } => {
            let history = guard.history(*n)?;
            if history.is_empty() {
                println!("No approval requests yet.");
                return Ok(());
            }
            print_table(&history, true);
        }

        GuardCommands::Show { id } => {
            let uuid = parse_id(id)?;
            match guard.get(uuid)? {
                Some(request) => println!("{}", serde_json::to_string_pretty(&request)?),
                None => anyhow::bail!("no approval request with id {}", uuid),
            }
        }
    }

    Ok(())
}

/// Parse `--params`. Only a JSON object can carry an `amount`.
fn parse_params(raw: &str) -> anyhow::Result<Map<String, Value>> {
    let value: Value =
        serde_json::from_str(raw).with_context(|| format!("--params is not valid JSON: {}", raw))?;
    match value {
        Value::Object(map) => Ok(map),
        other => anyhow::bail!("--params must be a JSON object, got {}", other),
    }
}

/// Approve or deny, explaining why when nothing changed.
fn decide(
    guard: &GuardService,
    raw_id: &str,
    next: ApprovalStatus,
) -> anyhow::Result<ApprovalRequest> {
    let id = parse_id(raw_id)?;
    let decided = match next {
        ApprovalStatus::Approved => guard.approve(id)?,
        ApprovalStatus::Denied => guard.deny(id)?,
        ApprovalStatus::Pending => anyhow::bail!("a request cannot be moved back to pending"),
    };
    if let Some(request) = decided {
        return Ok(request);
    }
    match guard.get(id)? {
        Some(existing) => anyhow::bail!("request {} is already {}", id, existing.status),
        None => anyhow::bail!("no approval request with id {}", id),
    }
}

fn print_table(requests: &[ApprovalRequest], with_status: bool) {
    if with_status {
        println!(
            "{:<38} {:<9} {:<20} {:<22} {:<12} REASON",
            "ID", "STATUS", "CREATED", "ACTION", "AGENT"
        );
    } else {
        println!(
            "{:<38} {:<20} {:<22} {:<12} REASON",
            "ID", "CREATED", "ACTION", "AGENT"
        );
    }
    println!("{}", "-".repeat(if with_status { 120 } else { 110 }));

    for request in requests {
        let created = fmt_time(&request.created_at);
        let action = truncate(&request.action, 22);
        let agent = truncate(request.agent.as_deref().unwrap_or("-"), 12);
        let reason = truncate(request.reason.as_deref().unwrap_or("-"), 40);
        if with_status {
            println!(
                "{:<38} {:<9} {:<20} {:<22} {:<12} {}",
                request.id.to_string(),
                request.status.as_str(),
                created,
                action,
                agent,
                reason
            );
        } else {
            println!(
                "{:<38} {:<20} {:<22} {:<12} {}",
                request.id.to_string(),
                created,
                action,
                agent,
                reason
            );
        }
    }
}
