use std::path::Path;

use anyhow::Context;
use hookjira_bridge::{resolve_rev, run_hook};
use hookjira_core::{HookConfig, HookPaths};
use hookjira_tracker::JiraClient;
use hookjira_vcs::{load_changeset, Vcs};
use tracing::debug;

pub fn execute(
    root: &Path,
    rev: Option<String>,
    branch: Option<&str>,
    vcs: Option<&str>,
) -> anyhow::Result<()> {
    let config = HookConfig::load(&HookPaths::discover(root)).context("loading configuration")?;

    if let Some(pattern) = config.skip_reason(root) {
        println!(
            "hookjira: skipping {} (matches skip pattern '{pattern}')",
            root.display()
        );
        return Ok(());
    }

    let vcs = match vcs {
        Some(name) => name.parse::<Vcs>()?,
        None => Vcs::detect(root)?,
    };
    let rev = resolve_rev(rev, vcs == Vcs::Git, |key| std::env::var(key).ok())?;
    debug!(root = %root.display(), %vcs, rev = %rev, "hook invoked");
    let changeset = load_changeset(vcs, root, &rev, branch)
        .with_context(|| format!("loading changeset {rev} from {}", root.display()))?;

    config.validate()?;
    let client = JiraClient::from_config(&config)?;
    let report = run_hook(&config, &changeset, &client)?;

    for warning in &report.warnings {
        eprintln!("hookjira: warning: {warning}");
    }
    for line in report.status_lines() {
        println!("{line}");
    }
    Ok(())
}
