use std::path::Path;

use anyhow::Context;
use hookjira_vcs::{hooks_installed, install_hooks, uninstall_hooks, Vcs};

fn pick_vcs(root: &Path, vcs: Option<&str>) -> anyhow::Result<Vcs> {
    Ok(match vcs {
        Some(name) => name.parse()?,
        None => Vcs::detect(root)?,
    })
}

pub fn install(root: &Path, vcs: Option<&str>) -> anyhow::Result<()> {
    let vcs = pick_vcs(root, vcs)?;
    if hooks_installed(vcs, root)? {
        println!("hookjira {vcs} hooks already installed in {}", root.display());
        return Ok(());
    }
    install_hooks(vcs, root)
        .with_context(|| format!("installing {vcs} hooks in {}", root.display()))?;
    println!("Installed hookjira {vcs} hooks in {}", root.display());
    println!("  Configure the tracker in .hookjira/config.json or HOOKJIRA_* env vars.");
    Ok(())
}

pub fn uninstall(root: &Path, vcs: Option<&str>) -> anyhow::Result<()> {
    let vcs = pick_vcs(root, vcs)?;
    if !hooks_installed(vcs, root)? {
        println!("No hookjira {vcs} hooks in {}", root.display());
    }
    uninstall_hooks(vcs, root)
        .with_context(|| format!("removing {vcs} hooks from {}", root.display()))?;
    println!("Removed hookjira {vcs} hooks from {}", root.display());
    Ok(())
}
