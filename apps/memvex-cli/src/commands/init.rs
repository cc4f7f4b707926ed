// init.rs — Write a starter memvex.yaml.

use std::path::Path;

use anyhow::Context;
use memvex_gateway::STARTER_CONFIG;

pub fn execute(config_path: &Path, force: bool) -> anyhow::Result<()> {
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }
    if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(config_path, STARTER_CONFIG)
        .with_context(|| format!("failed to write {}", config_path.display()))?;

    println!("Wrote {}", config_path.display());
    println!("Edit the guard rules, then point your agents at `memvex serve`.");
    Ok(())
}
