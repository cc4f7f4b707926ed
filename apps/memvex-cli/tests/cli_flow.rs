// cli_flow.rs — Drive the `memvex` binary the way a person would.
//
// Flow:
//   1. memvex init → starter memvex.yaml
//   2. guard check over the threshold → request queued
//   3. guard pending → the request is listed
//   4. guard approve → decided; a second approve fails
//   5. memory add / recall / forget

use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn memvex(config: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_memvex"))
        .arg("--config")
        .arg(config)
        .args(args)
        .env_remove("MEMVEX_CONFIG")
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn init_project() -> (TempDir, std::path::PathBuf) {
    let project = TempDir::new().unwrap();
    let config = project.path().join("memvex.yaml");
    let out = memvex(&config, &["init"]);
    assert!(out.status.success(), "init failed: {:?}", out);
    (project, config)
}

#[test]
fn approval_flow_through_the_binary() {
    let (project, config) = init_project();

    let out = memvex(
        &config,
        &["guard", "check", "spend_money", "--params", r#"{"amount": 75}"#],
    );
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("APPROVAL REQUIRED"), "got: {}", text);
    let id = text
        .lines()
        .find_map(|l| l.trim().strip_prefix("Request: "))
        .unwrap()
        .to_string();

    let pending = stdout(&memvex(&config, &["guard", "pending"]));
    assert!(pending.contains(&id));

    let out = memvex(&config, &["guard", "approve", &id]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("Approved"));

    let again = memvex(&config, &["guard", "approve", &id]);
    assert!(!again.status.success());
    assert!(String::from_utf8_lossy(&again.stderr).contains("already approved"));

    assert!(stdout(&memvex(&config, &["guard", "pending"])).contains("No pending approvals"));
    assert!(stdout(&memvex(&config, &["guard", "history"])).contains("approved"));
    assert!(project.path().join(".memvex/guard.db").exists());
}

#[test]
fn blocked_action_is_reported() {
    let (_project, config) = init_project();
    let out = memvex(&config, &["guard", "check", "modify_production"]);
    assert!(out.status.success());
    let text = stdout(&out);
    assert!(text.contains("BLOCKED"));
    assert!(text.contains("deploy pipeline"));
}

#[test]
fn memory_commands_round_trip() {
    let (_project, config) = init_project();

    let out = memvex(
        &config,
        &["memory", "add", "User prefers dark mode", "-n", "prefs", "-t", "ui,theme"],
    );
    assert!(out.status.success());
    let id = stdout(&out).trim().strip_prefix("Stored ").unwrap().to_string();

    let recalled = stdout(&memvex(&config, &["memory", "recall", "dark", "-t", "theme"]));
    assert!(recalled.contains(&id));

    let listed = stdout(&memvex(&config, &["memory", "list", "-n", "prefs"]));
    assert!(listed.contains("dark mode"));

    assert!(memvex(&config, &["memory", "forget", &id]).status.success());
    assert!(!memvex(&config, &["memory", "forget", &id]).status.success());
    assert!(stdout(&memvex(&config, &["memory", "list"])).contains("No memories"));
}

#[test]
fn init_refuses_to_overwrite() {
    let (_project, config) = init_project();
    assert!(!memvex(&config, &["init"]).status.success());
    assert!(memvex(&config, &["init", "--force"]).status.success());
}

#[test]
fn status_without_config_suggests_init() {
    let project = TempDir::new().unwrap();
    let out = memvex(&project.path().join("memvex.yaml"), &["status"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("memvex init"));
}
