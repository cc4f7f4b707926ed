// status.rs — Report enabled modules and active backends.

use std::path::Path;

use memvex_gateway::StatusReport;

pub fn execute(config_path: &Path) -> anyhow::Result<()> {
    if !config_path.exists() {
        println!("No config found at {}", config_path.display());
        println!("Run `memvex init` to create one.");
        return Ok(());
    }

    let state = super::load_state(config_path)?;
    let report = state.status()?;
    println!("Config:  {}", config_path.display());
    print!("{}", render(&report));
    Ok(())
}

fn render(report: &StatusReport) -> String {
    let mut out = format!("Project: {}\n", report.project_root);
    if report.guard_enabled {
        out.push_str(&format!(
            "Guard:   enabled ({} backend, {} rule(s), {} pending)\n",
            report.guard_backend, report.guard_rules, report.pending_approvals
        ));
    } else {
        out.push_str("Guard:   disabled (all actions allowed)\n");
    }
    match (&report.memory_backend, report.memory_count) {
        (Some(backend), Some(count)) => out.push_str(&format!(
            "Memory:  enabled ({} backend, {} memories)\n",
            backend, count
        )),
        _ => out.push_str("Memory:  disabled\n"),
    }
    out
}
