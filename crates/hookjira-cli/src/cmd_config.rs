use std::path::Path;

use anyhow::Context;
use clap::Subcommand;
use hookjira_core::{HookConfig, HookPaths};

// ── CLI Schema ──

#[derive(Subcommand)]
pub enum ConfigCmd {
    /// Print the resolved configuration (API key masked)
    Show,
    /// Print the configuration file locations
    Path,
}

// ── Dispatch ──

pub fn run(cmd: ConfigCmd, repo_root: &Path) -> anyhow::Result<()> {
    match cmd {
        ConfigCmd::Show => show(repo_root),
        ConfigCmd::Path => path(repo_root),
    }
}

// ── Command Implementations ──

fn show(repo_root: &Path) -> anyhow::Result<()> {
    let config = HookConfig::load(&HookPaths::discover(repo_root))
        .context("loading configuration")?;
    println!("{}", render_config(&config)?);
    Ok(())
}

fn path(repo_root: &Path) -> anyhow::Result<()> {
    let paths = HookPaths::discover(repo_root);
    println!("repository: {}", describe(&paths.config_json));
    match HookPaths::user_config_json() {
        Some(user) => println!("user:       {}", describe(&user)),
        None => println!("user:       (no config directory on this platform)"),
    }
    Ok(())
}

fn render_config(config: &HookConfig) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&config.redacted())?)
}

fn describe(path: &Path) -> String {
    if path.exists() {
        path.display().to_string()
    } else {
        format!("{} (not present)", path.display())
    }
}
