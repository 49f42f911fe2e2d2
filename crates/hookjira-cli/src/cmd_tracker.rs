use std::path::Path;

use anyhow::Context;
use clap::Subcommand;
use hookjira_core::{normalize_issue_id, HookConfig, HookPaths};
use hookjira_tracker::{IssueTracker, JiraClient};

#[derive(Subcommand)]
pub enum TrackerCmd {
    /// Look up an issue's project to verify the URL and credentials
    Check {
        /// Issue key, e.g. AB-123
        issue: String,
    },
}

pub fn run(cmd: TrackerCmd, repo_root: &Path) -> anyhow::Result<()> {
    match cmd {
        TrackerCmd::Check { issue } => check(repo_root, &issue),
    }
}

fn check(repo_root: &Path, issue: &str) -> anyhow::Result<()> {
    let issue_id = normalize_issue_id(issue)
        .with_context(|| format!("'{issue}' is not an issue key"))?;
    let config = HookConfig::load(&HookPaths::discover(repo_root))
        .context("loading configuration")?;
    config.validate()?;

    let client = JiraClient::from_config(&config)?;
    let project = client
        .project_key(&issue_id)
        .with_context(|| format!("looking up {issue_id} at {}", config.url))?;

    let verdict = if config.is_allowed_project(&project) {
        "allowed"
    } else {
        "not in allowed projects"
    };
    println!("Issue {issue_id} : project {project} ({verdict})");
    Ok(())
}
