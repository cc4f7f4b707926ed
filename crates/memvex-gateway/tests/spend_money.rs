//! End-to-end approval flow through the tool layer: an agent checks a
//! purchase, a human approves it from another process, the agent sees it.

use memvex_gateway::{dispatch, GatewayState};
use serde_json::{json, Value};
use uuid::Uuid;

const CONFIG: &str = "\
guard:
  enabled: true
  rules:
    - action: spend_money
      require_approval_above: 50
      max: 500
memory:
  enabled: true
  storage: sqlite
";

fn write_config(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("memvex.yaml");
    std::fs::write(&path, CONFIG).unwrap();
    path
}

#[test]
fn spend_money_approval_flow() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(dir.path());
    let agent = GatewayState::load(&config_path).unwrap();

    // Under the threshold: allowed, nothing queued.
    let small = dispatch(
        &agent,
        "guard_check",
        json!({ "action": "spend_money", "params": { "amount": 30 } }),
    )
    .unwrap();
    assert_eq!(small["allowed"], json!(true));
    assert!(small.get("approvalId").is_none());

    // Over the threshold: held for a human.
    let large = dispatch(
        &agent,
        "guard_check",
        json!({ "action": "spend_money", "params": { "amount": 75 }, "agent": "shopper" }),
    )
    .unwrap();
    assert_eq!(large["allowed"], json!(false));
    assert_eq!(large["requiresApproval"], json!(true));
    let approval_id = large["approvalId"].as_str().unwrap().to_string();

    let pending = dispatch(&agent, "guard_list_pending", Value::Null).unwrap();
    let pending = pending.as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["id"], json!(approval_id));
    assert_eq!(pending[0]["agent"], json!("shopper"));
    assert_eq!(pending[0]["params"]["amount"], json!(75));

    // A separate process (the human's CLI) decides.
    let human = GatewayState::load(&config_path).unwrap();
    let id = Uuid::parse_str(&approval_id).unwrap();
    let decided = human.guard.approve(id).unwrap().unwrap();
    assert_eq!(decided.status.as_str(), "approved");
    assert!(decided.decided_at.is_some());

    // The agent's process observes the decision.
    let pending = dispatch(&agent, "guard_list_pending", json!({})).unwrap();
    assert_eq!(pending, json!([]));

    let status = dispatch(&agent, "guard_approval_status", json!({ "id": approval_id })).unwrap();
    assert_eq!(status["status"], json!("approved"));
    assert!(status["decidedAt"].is_string());

    // Deciding again is a no-op.
    assert!(human.guard.deny(id).unwrap().is_none());
}

#[test]
fn hard_cap_applies_when_threshold_does_not() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("memvex.yaml");
    std::fs::write(
        &path,
        "guard:\n  enabled: true\n  rules:\n    - action: spend_money\n      max: 500\n",
    )
    .unwrap();
    let state = GatewayState::load(&path).unwrap();

    let result = dispatch(
        &state,
        "guard_check",
        json!({ "action": "spend_money", "params": { "amount": 900 } }),
    )
    .unwrap();
    assert_eq!(result["allowed"], json!(false));
    assert_eq!(result["requiresApproval"], json!(false));
    assert!(result.get("approvalId").is_none());
    assert!(result["reason"].as_str().unwrap().contains("500"));
    assert_eq!(dispatch(&state, "guard_list_pending", Value::Null).unwrap(), json!([]));
}

#[test]
fn threshold_escalates_before_the_cap() {
    let dir = tempfile::tempdir().unwrap();
    let state = GatewayState::load(&write_config(dir.path())).unwrap();

    let result = dispatch(
        &state,
        "guard_check",
        json!({ "action": "spend_money", "params": { "amount": 900 } }),
    )
    .unwrap();
    assert_eq!(result["requiresApproval"], json!(true));
    assert!(result["approvalId"].is_string());
}

#[test]
fn memories_are_shared_between_processes() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write_config(dir.path());
    let cursor = GatewayState::load(&config_path).unwrap();
    let claude = GatewayState::load(&config_path).unwrap();

    dispatch(
        &cursor,
        "memory_store",
        json!({ "content": "Deploys happen on Tuesdays", "namespace": "work", "agent": "cursor" }),
    )
    .unwrap();

    let found = dispatch(&claude, "memory_recall", json!({ "query": "deploys" })).unwrap();
    let found = found.as_array().unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0]["agent"], json!("cursor"));
    assert_eq!(found[0]["namespace"], json!("work"));
}

#[test]
fn unknown_approval_id_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let state = GatewayState::load(&write_config(dir.path())).unwrap();
    let status = dispatch(
        &state,
        "guard_approval_status",
        json!({ "id": Uuid::new_v4().to_string() }),
    )
    .unwrap();
    assert_eq!(status, json!("not found"));
}
