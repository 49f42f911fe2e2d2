use std::path::{Path, PathBuf};

/// Well-known paths of a hookjira-enabled repository.
#[derive(Debug, Clone)]
pub struct HookPaths {
    pub root: PathBuf,
    pub hookjira_dir: PathBuf,
    pub config_json: PathBuf,
}

impl HookPaths {
    /// Derive all paths from a repo root. Pure computation, no I/O.
    pub fn discover(repo_root: impl Into<PathBuf>) -> Self {
        let root = repo_root.into();
        let hookjira_dir = root.join(".hookjira");
        Self {
            config_json: hookjira_dir.join("config.json"),
            hookjira_dir,
            root,
        }
    }

    /// Walk up from `start` to the nearest directory holding `.git` or `.hg`.
    pub fn find_repo_root(start: &Path) -> Option<PathBuf> {
        let mut current = Some(start);
        while let Some(dir) = current {
            if dir.join(".git").exists() || dir.join(".hg").is_dir() {
                return Some(dir.to_path_buf());
            }
            current = dir.parent();
        }
        None
    }

    /// Per-user config, layered under the repository config.
    pub fn user_config_json() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("hookjira").join("config.json"))
    }
}
