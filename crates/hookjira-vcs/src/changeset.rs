use std::path::{Path, PathBuf};
use std::process::Command;
use std::str::FromStr;

use hookjira_core::ChangesetRef;
use tracing::debug;

use crate::VcsError;

/// Field separator used in log templates (ASCII unit separator).
const FIELD_SEP: char = '\u{1f}';

const GIT_FORMAT: &str = "--format=%H%x1f%an <%ae>%x1f%B";
const HG_TEMPLATE: &str = r"{node}\x1f{author}\x1f{branch}\x1f{desc}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vcs {
    Git,
    Hg,
}

impl Vcs {
    pub fn tool(self) -> &'static str {
        match self {
            Vcs::Git => "git",
            Vcs::Hg => "hg",
        }
    }

    /// Detect the repository type from the marker directory at `root`.
    pub fn detect(root: &Path) -> Result<Self, VcsError> {
        if root.join(".hg").is_dir() {
            return Ok(Vcs::Hg);
        }
        // `.git` is a file in worktrees and submodules.
        if root.join(".git").exists() || is_bare_git(root) {
            return Ok(Vcs::Git);
        }
        Err(VcsError::NotARepository(root.to_path_buf()))
    }
}

impl FromStr for Vcs {
    type Err = VcsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "git" => Ok(Vcs::Git),
            "hg" | "mercurial" => Ok(Vcs::Hg),
            other => Err(VcsError::UnknownVcs(other.to_string())),
        }
    }
}

impl std::fmt::Display for Vcs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tool())
    }
}

fn is_bare_git(root: &Path) -> bool {
    root.join("HEAD").is_file() && root.join("objects").is_dir() && root.join("refs").is_dir()
}

/// Load changeset `rev` from the repository at `repo_root`.
///
/// `branch` overrides the branch the changeset is reported on. Git commits
/// carry no branch, so without it the checked-out branch is used; a
/// post-receive hook passes the pushed ref instead.
pub fn load_changeset(
    vcs: Vcs,
    repo_root: &Path,
    rev: &str,
    branch: Option<&str>,
) -> Result<ChangesetRef, VcsError> {
    let branch = branch.map(str::trim).filter(|b| !b.is_empty());
    match vcs {
        Vcs::Git => {
            let log = run(vcs, repo_root, &["log", "-1", GIT_FORMAT, rev])?;
            let (id, author, description) = parse_git_log(&log)?;
            let branch = match branch {
                Some(b) => b.to_string(),
                None => run(vcs, repo_root, &["rev-parse", "--abbrev-ref", "HEAD"])
                    .map(|b| b.trim().to_string())
                    .unwrap_or_default(),
            };
            Ok(ChangesetRef {
                id,
                description,
                author,
                branch,
                repo_root: repo_root.to_path_buf(),
            })
        }
        Vcs::Hg => {
            let log = run(vcs, repo_root, &["log", "-r", rev, "--template", HG_TEMPLATE])?;
            let mut changeset = parse_hg_log(&log)?;
            changeset.repo_root = repo_root.to_path_buf();
            if let Some(b) = branch {
                changeset.branch = b.to_string();
            }
            Ok(changeset)
        }
    }
}

pub(crate) fn run(vcs: Vcs, cwd: &Path, args: &[&str]) -> Result<String, VcsError> {
    let tool = vcs.tool();
    debug!(tool, ?args, cwd = %cwd.display(), "running");
    let output = Command::new(tool)
        .current_dir(cwd)
        .args(args)
        .output()
        .map_err(|source| VcsError::Spawn { tool, source })?;

    if !output.status.success() {
        return Err(VcsError::Command {
            tool,
            args: args.join(" "),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn parse_git_log(out: &str) -> Result<(String, String, String), VcsError> {
    let mut fields = out.splitn(3, FIELD_SEP);
    match (fields.next(), fields.next(), fields.next()) {
        (Some(id), Some(author), Some(desc)) if !id.trim().is_empty() => Ok((
            id.trim().to_string(),
            author.trim().to_string(),
            desc.trim_end().to_string(),
        )),
        _ => Err(VcsError::Output {
            tool: "git",
            detail: format!("expected 3 fields, got {out:?}"),
        }),
    }
}

fn parse_hg_log(out: &str) -> Result<ChangesetRef, VcsError> {
    let mut fields = out.splitn(4, FIELD_SEP);
    match (fields.next(), fields.next(), fields.next(), fields.next()) {
        (Some(id), Some(author), Some(branch), Some(desc)) if !id.trim().is_empty() => {
            Ok(ChangesetRef {
                id: id.trim().to_string(),
                description: desc.trim_end().to_string(),
                author: author.trim().to_string(),
                branch: branch.trim().to_string(),
                repo_root: PathBuf::new(),
            })
        }
        _ => Err(VcsError::Output {
            tool: "hg",
            detail: format!("expected 4 fields, got {out:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_git_output() {
        let out = "abc123\u{1f}Jane Doe <jane@example.com>\u{1f}Fix thing\n\njira AB-1\n";
        let (id, author, desc) = parse_git_log(out).unwrap();
        assert_eq!(id, "abc123");
        assert_eq!(author, "Jane Doe <jane@example.com>");
        assert_eq!(desc, "Fix thing\n\njira AB-1");
    }

    #[test]
    fn parse_hg_output() {
        let out = "def456\u{1f}jane\u{1f}stable\u{1f}sjira AB-2 hours 1";
        let cs = parse_hg_log(out).unwrap();
        assert_eq!(cs.id, "def456");
        assert_eq!(cs.branch, "stable");
        assert_eq!(cs.description, "sjira AB-2 hours 1");
    }

    #[test]
    fn description_may_contain_separator_free_text() {
        let out = "a\u{1f}b\u{1f}c\u{1f}line one\nline two";
        assert_eq!(parse_hg_log(out).unwrap().description, "line one\nline two");
    }

    #[test]
    fn truncated_output_is_rejected() {
        assert!(parse_git_log("abc123").is_err());
        assert!(parse_hg_log("a\u{1f}b").is_err());
    }

    #[test]
    fn vcs_from_str() {
        assert_eq!("git".parse::<Vcs>().unwrap(), Vcs::Git);
        assert_eq!("Mercurial".parse::<Vcs>().unwrap(), Vcs::Hg);
        assert!("svn".parse::<Vcs>().is_err());
    }

    #[test]
    fn detect_by_marker_dir() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(Vcs::detect(tmp.path()).is_err());
        std::fs::create_dir(tmp.path().join(".hg")).unwrap();
        assert_eq!(Vcs::detect(tmp.path()).unwrap(), Vcs::Hg);
    }

    #[test]
    fn load_git_changeset() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path();
        let git = |args: &[&str]| {
            Command::new("git")
                .current_dir(dir)
                .args(args)
                .output()
                .unwrap()
        };
        git(&["init", "-b", "main"]);
        git(&["config", "user.email", "test@test.com"]);
        git(&["config", "user.name", "Test"]);
        std::fs::write(dir.join("README"), "hi").unwrap();
        git(&["add", "."]);
        git(&["commit", "-m", "Add readme\n\njira AB-1 hours 2"]);

        let cs = load_changeset(Vcs::Git, dir, "HEAD", None).unwrap();
        assert_eq!(cs.id.len(), 40);
        assert_eq!(cs.author, "Test <test@test.com>");
        assert_eq!(cs.branch, "main");
        assert_eq!(cs.description, "Add readme\n\njira AB-1 hours 2");
        assert_eq!(cs.repo_root, dir);
    }

    #[test]
    fn pushed_branch_is_reported_for_bare_repo() {
        let tmp = tempfile::tempdir().unwrap();
        let work = tmp.path().join("work");
        let bare = tmp.path().join("server.git");
        std::fs::create_dir(&work).unwrap();
        let git = |cwd: &Path, args: &[&str]| {
            Command::new("git")
                .current_dir(cwd)
                .args(args)
                .output()
                .unwrap()
        };
        git(tmp.path(), &["init", "--bare", "-b", "main", "server.git"]);
        git(&work, &["init", "-b", "main"]);
        git(&work, &["config", "user.email", "test@test.com"]);
        git(&work, &["config", "user.name", "Test"]);
        std::fs::write(work.join("README"), "hi").unwrap();
        git(&work, &["add", "."]);
        git(&work, &["commit", "-m", "Base"]);
        git(&work, &["push", bare.to_str().unwrap(), "main"]);
        git(&work, &["checkout", "-b", "feature/x"]);
        std::fs::write(work.join("README"), "there").unwrap();
        git(&work, &["commit", "-am", "jira AB-1 on a branch"]);
        git(&work, &["push", bare.to_str().unwrap(), "feature/x"]);

        assert_eq!(Vcs::detect(&bare).unwrap(), Vcs::Git);
        let pushed = load_changeset(Vcs::Git, &bare, "feature/x", Some("feature/x")).unwrap();
        assert_eq!(pushed.branch, "feature/x");
        assert_eq!(pushed.description, "jira AB-1 on a branch");

        let fallback = load_changeset(Vcs::Git, &bare, "feature/x", None).unwrap();
        assert_eq!(fallback.branch, "main");
    }
}
