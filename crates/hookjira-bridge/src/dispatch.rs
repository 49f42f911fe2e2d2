use hookjira_core::{
    render, ChangesetRef, CommentComposer, ConfigError, HookConfig, ReferenceAttrs,
    ReferenceScanner, TemplateError, TemplateVars,
};
use hookjira_tracker::{IssueTracker, TrackerError};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("hook type {hook_type} does not pass a changeset id")]
    MissingChangeset { hook_type: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("comment template: {0}")]
    Template(#[from] TemplateError),
}

// ── Report ──

#[derive(Debug, Clone, PartialEq)]
pub enum IssueOutcome {
    /// At least one tracker update went through.
    Updated { hours: Option<f64> },
    /// Nothing to send (plain mention with an empty comment).
    Skipped { reason: String },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct IssueResult {
    pub issue_id: String,
    pub outcome: IssueOutcome,
}

impl IssueResult {
    /// `Issue <ID> : Updated[, hours: h]` or `Issue <ID> : <error>`.
    pub fn status_line(&self) -> String {
        match &self.outcome {
            IssueOutcome::Updated { hours: Some(h) } => {
                format!("Issue {} : Updated, hours: {h}", self.issue_id)
            }
            IssueOutcome::Updated { hours: None } => format!("Issue {} : Updated", self.issue_id),
            IssueOutcome::Skipped { reason } => {
                format!("Issue {} : Skipped, {reason}", self.issue_id)
            }
            IssueOutcome::Failed { error } => format!("Issue {} : {error}", self.issue_id),
        }
    }
}

/// What one hook invocation did to one changeset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookReport {
    pub changeset: String,
    /// Set when the whole repository was skipped; holds the matching pattern.
    pub skipped: Option<String>,
    pub outcomes: Vec<IssueResult>,
    /// Scan warnings (malformed hours and the like).
    pub warnings: Vec<String>,
}

impl HookReport {
    pub fn status_lines(&self) -> Vec<String> {
        self.outcomes.iter().map(IssueResult::status_line).collect()
    }

    pub fn failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|r| matches!(r.outcome, IssueOutcome::Failed { .. }))
            .count()
    }
}

// ── Entry points ──

/// Changeset id for this invocation: the explicit `--rev`, then `$HG_NODE`,
/// then `HEAD` for git. Mercurial hooks without a node cannot be handled.
pub fn resolve_rev(
    rev: Option<String>,
    is_git: bool,
    env: impl Fn(&str) -> Option<String>,
) -> Result<String, HookError> {
    if let Some(rev) = rev.filter(|r| !r.trim().is_empty()) {
        return Ok(rev);
    }
    if let Some(node) = env("HG_NODE").filter(|n| !n.trim().is_empty()) {
        return Ok(node);
    }
    if is_git {
        return Ok("HEAD".to_string());
    }
    Err(HookError::MissingChangeset {
        hook_type: env("HG_HOOKTYPE").unwrap_or_else(|| "unknown".to_string()),
    })
}

/// Full hook run for one loaded changeset: skip check, scanner and template
/// from `config`, then [`process_changeset`].
pub fn run_hook(
    config: &HookConfig,
    changeset: &ChangesetRef,
    tracker: &dyn IssueTracker,
) -> Result<HookReport, HookError> {
    if let Some(pattern) = config.skip_reason(&changeset.repo_root) {
        info!(pattern, root = %changeset.repo_root.display(), "repository skipped");
        return Ok(HookReport {
            changeset: changeset.id.clone(),
            skipped: Some(pattern.to_string()),
            ..HookReport::default()
        });
    }
    let scanner = ReferenceScanner::from_config(config)?;
    let template = config.template_text(&changeset.repo_root)?;
    process_changeset(config, &scanner, &template, changeset, tracker)
}

/// Push the updates for every issue referenced by `changeset`.
///
/// Issues are handled in scan order. A failing issue is recorded in the
/// report and the loop moves on; updates already made are kept.
pub fn process_changeset(
    config: &HookConfig,
    scanner: &ReferenceScanner,
    template: &str,
    changeset: &ChangesetRef,
    tracker: &dyn IssueTracker,
) -> Result<HookReport, HookError> {
    let scan = scanner.scan(&changeset.description);
    let composer = CommentComposer::new(scanner);
    let webroot = config.webroot(&changeset.repo_root);

    let mut report = HookReport {
        changeset: changeset.id.clone(),
        warnings: scan.warnings.clone(),
        ..HookReport::default()
    };

    for (issue_id, attrs) in scan.iter() {
        let vars = TemplateVars::for_issue(changeset, issue_id, &config.web_base_url, &webroot);
        let rendered = render(template, &vars)?;
        let comment = composer.extract_text(&rendered, issue_id);
        debug!(issue_id, comment = %comment, "composed comment");

        let outcome = match update_issue(config, tracker, issue_id, attrs, &comment) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(issue_id, error = %e, "issue update failed");
                IssueOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };
        report.outcomes.push(IssueResult {
            issue_id: issue_id.to_string(),
            outcome,
        });
    }

    Ok(report)
}

fn update_issue(
    config: &HookConfig,
    tracker: &dyn IssueTracker,
    issue_id: &str,
    attrs: &ReferenceAttrs,
    comment: &str,
) -> Result<IssueOutcome, TrackerError> {
    let project = tracker.project_key(issue_id)?;
    if !config.is_allowed_project(&project) {
        return Err(TrackerError::NotAllowedProject {
            issue_id: issue_id.to_string(),
            allowed: config.allowed_projects.clone(),
        });
    }

    // Jira rejects zero-second worklogs.
    let worklog = attrs
        .hours_worked
        .filter(|_| attrs.wants_resolve || config.log_work_on_mention)
        .map(|h| (h, (h * 3600.0).round() as u64))
        .filter(|(_, seconds)| *seconds > 0);
    let hours = worklog.map(|(h, _)| h);
    let has_comment = !comment.trim().is_empty();

    if !attrs.wants_resolve && !has_comment && hours.is_none() {
        return Ok(IssueOutcome::Skipped {
            reason: "empty comment".to_string(),
        });
    }

    if attrs.wants_resolve {
        tracker.set_status(issue_id, &config.resolve_status)?;
        info!(issue_id, status = %config.resolve_status, "status changed");
    }
    if has_comment {
        tracker.add_comment(issue_id, comment)?;
        info!(issue_id, "comment added");
    }
    if let Some((_, seconds)) = worklog {
        tracker.add_worklog(issue_id, seconds)?;
        info!(issue_id, seconds, "work logged");
    }

    Ok(IssueOutcome::Updated { hours })
}
