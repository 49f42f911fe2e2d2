use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

use crate::paths::HookPaths;
use crate::scanner::{DEFAULT_MENTION_PATTERN, DEFAULT_RESOLVE_PATTERN};

/// Comment template used when neither `template` nor `template_file` is set.
pub const DEFAULT_TEMPLATE: &str = "{desc|escape}\\n\\n------\\nAuthor : {author}\\nChangeset : {hgweb}/{webroot}/rev/{node|short}\\nBranch : {branch}";

pub const DEFAULT_RESOLVE_STATUS: &str = "Done";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid {name}: {source}")]
    Pattern {
        name: &'static str,
        #[source]
        source: regex::Error,
    },

    #[error("{name} has no capture group for the issue id\n  hint: add a named group (?P<ids>...)")]
    MissingIdGroup { name: &'static str },

    #[error("missing config value: {0}\n  hint: set it in .hookjira/config.json or via {1}")]
    Missing(&'static str, &'static str),

    #[error("no allowed projects configured\n  hint: set allowed_projects, e.g. [\"ABCD\", \"EFGH\"]")]
    NoAllowedProjects,

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Everything a hook invocation needs, loaded once and passed down.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HookConfig {
    /// Base URL of the Jira instance.
    pub url: String,
    pub user_email: String,
    pub api_key: String,
    pub mention_pattern: String,
    pub resolve_pattern: String,
    /// Status an issue is moved to on a resolve reference.
    pub resolve_status: String,
    /// Optional resolution set together with the status transition.
    pub resolve_resolution: Option<String>,
    /// Characters stripped from the front of the repository root to form `{webroot}`.
    pub strip: usize,
    pub template: Option<String>,
    /// Template file, relative to the repository root.
    pub template_file: Option<PathBuf>,
    /// Base URL for browsing repositories, `{hgweb}` in templates.
    pub web_base_url: String,
    #[serde(deserialize_with = "list_or_csv")]
    pub allowed_projects: Vec<String>,
    /// Repository roots containing any of these are never processed.
    #[serde(deserialize_with = "list_or_csv")]
    pub skip_repo_patterns: Vec<String>,
    /// Also log hours for plain mentions, not only for resolve references.
    pub log_work_on_mention: bool,
    pub timeout_secs: u64,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            user_email: String::new(),
            api_key: String::new(),
            mention_pattern: DEFAULT_MENTION_PATTERN.to_string(),
            resolve_pattern: DEFAULT_RESOLVE_PATTERN.to_string(),
            resolve_status: DEFAULT_RESOLVE_STATUS.to_string(),
            resolve_resolution: None,
            strip: 0,
            template: None,
            template_file: None,
            web_base_url: String::new(),
            allowed_projects: Vec::new(),
            skip_repo_patterns: Vec::new(),
            log_work_on_mention: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Accept `["AB", "CD"]` as well as the comma-separated `"AB,CD"`.
fn list_or_csv<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ListOrCsv {
        List(Vec<String>),
        Csv(String),
    }

    let items = match ListOrCsv::deserialize(deserializer)? {
        ListOrCsv::List(v) => v,
        ListOrCsv::Csv(s) => s.split(',').map(str::to_string).collect(),
    };
    Ok(items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

impl HookConfig {
    /// Load the user config, overlay the repository config, then apply
    /// `HOOKJIRA_*` environment overrides. Missing files are skipped.
    pub fn load(paths: &HookPaths) -> Result<Self, ConfigError> {
        let mut merged = serde_json::Map::new();
        if let Some(user) = HookPaths::user_config_json() {
            overlay_file(&mut merged, &user)?;
        }
        overlay_file(&mut merged, &paths.config_json)?;

        let mut config: HookConfig = serde_json::from_value(serde_json::Value::Object(merged))
            .map_err(|source| ConfigError::Parse {
                path: paths.config_json.clone(),
                source,
            })?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a single JSON document (no layering, no env).
    pub fn from_json(path: &Path, content: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var("HOOKJIRA_URL") {
            self.url = v;
        }
        if let Some(v) = var("HOOKJIRA_USER_EMAIL") {
            self.user_email = v;
        }
        if let Some(v) = var("HOOKJIRA_API_KEY") {
            self.api_key = v;
        }
    }

    /// Check the values a tracker connection needs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::Missing("url", "HOOKJIRA_URL"));
        }
        if self.user_email.trim().is_empty() {
            return Err(ConfigError::Missing("user_email", "HOOKJIRA_USER_EMAIL"));
        }
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("api_key", "HOOKJIRA_API_KEY"));
        }
        if self.allowed_projects.is_empty() {
            return Err(ConfigError::NoAllowedProjects);
        }
        Ok(())
    }

    /// Comment template text: inline template, then template file, then default.
    pub fn template_text(&self, repo_root: &Path) -> Result<String, ConfigError> {
        if let Some(t) = self.template.as_deref().filter(|t| !t.is_empty()) {
            return Ok(t.to_string());
        }
        if let Some(file) = &self.template_file {
            let path = repo_root.join(file);
            return std::fs::read_to_string(&path)
                .map(|s| s.trim_end_matches('\n').to_string())
                .map_err(|source| ConfigError::Read { path, source });
        }
        Ok(DEFAULT_TEMPLATE.to_string())
    }

    /// Repository root with `/` separators, minus the first `strip` characters.
    pub fn webroot(&self, repo_root: &Path) -> String {
        let root = repo_root.to_string_lossy().replace('\\', "/");
        root.chars().skip(self.strip).collect()
    }

    /// The skip pattern matching `repo_root`, if any.
    pub fn skip_reason(&self, repo_root: &Path) -> Option<&str> {
        let root = repo_root.to_string_lossy();
        self.skip_repo_patterns
            .iter()
            .find(|p| root.contains(p.as_str()))
            .map(String::as_str)
    }

    pub fn is_allowed_project(&self, project_key: &str) -> bool {
        self.allowed_projects
            .iter()
            .any(|p| p.eq_ignore_ascii_case(project_key))
    }

    /// Copy safe to print: the API key is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if !copy.api_key.is_empty() {
            copy.api_key = "********".to_string();
        }
        copy
    }
}

fn overlay_file(
    merged: &mut serde_json::Map<String, serde_json::Value>,
    path: &Path,
) -> Result<(), ConfigError> {
    if !path.exists() {
        return Ok(());
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let val: serde_json::Value =
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    if let serde_json::Value::Object(map) = val {
        merged.extend(map);
    }
    Ok(())
}
