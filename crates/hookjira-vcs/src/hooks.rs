//! Hook installation for git and Mercurial repositories.
//!
//! Every installed snippet sits between [`HOOK_MARKER_START`] and
//! [`HOOK_MARKER_END`], so existing hook content is preserved and the block
//! can be removed again without touching anything else.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::changeset::{run, Vcs};
use crate::VcsError;

pub const HOOK_MARKER_START: &str = "# >>> hookjira";
pub const HOOK_MARKER_END: &str = "# <<< hookjira";

const SHEBANG: &str = "#!/bin/sh";

const POST_COMMIT_BODY: &str = r#"hookjira hook --vcs git --rev "$(git rev-parse HEAD)" || true"#;

const POST_RECEIVE_BODY: &str = r#"zero=0000000000000000000000000000000000000000
while read old new ref; do
    [ "$new" = "$zero" ] && continue
    if [ "$old" = "$zero" ]; then
        range="-1 $new"
    else
        range="$old..$new"
    fi
    for rev in $(git rev-list --reverse $range); do
        hookjira hook --vcs git --rev "$rev" --branch "${ref#refs/heads/}" || true
    done
done"#;

const HGRC_BODY: &str = "[hooks]
incoming.hookjira = hookjira hook --vcs hg --rev $HG_NODE
commit.hookjira = hookjira hook --vcs hg --rev $HG_NODE";

const GIT_HOOKS: [(&str, &str); 2] = [
    ("post-commit", POST_COMMIT_BODY),
    ("post-receive", POST_RECEIVE_BODY),
];

/// Install hookjira hooks into the repository at `repo_root`.
///
/// Installing twice is a no-op.
pub fn install_hooks(vcs: Vcs, repo_root: &Path) -> Result<(), VcsError> {
    match vcs {
        Vcs::Git => {
            let hooks_dir = git_hooks_dir(repo_root)?;
            fs::create_dir_all(&hooks_dir)?;
            for (name, body) in GIT_HOOKS {
                let path = hooks_dir.join(name);
                if append_block(&path, body, Some(SHEBANG))? {
                    make_executable(&path)?;
                    info!(hook = %path.display(), "installed git hook");
                }
            }
        }
        Vcs::Hg => {
            let path = hgrc_path(repo_root)?;
            if append_block(&path, HGRC_BODY, None)? {
                info!(hgrc = %path.display(), "installed hg hooks");
            }
        }
    }
    Ok(())
}

/// Remove the hookjira block from every hook file. Git hook files left with
/// nothing but a shebang are deleted.
pub fn uninstall_hooks(vcs: Vcs, repo_root: &Path) -> Result<(), VcsError> {
    match vcs {
        Vcs::Git => {
            let hooks_dir = git_hooks_dir(repo_root)?;
            for (name, _) in GIT_HOOKS {
                let path = hooks_dir.join(name);
                let Some(rest) = remove_block(&path)? else {
                    continue;
                };
                let trimmed = rest.trim();
                if trimmed.is_empty() || trimmed == SHEBANG {
                    fs::remove_file(&path)?;
                } else {
                    fs::write(&path, rest)?;
                }
                info!(hook = %path.display(), "removed git hook");
            }
        }
        Vcs::Hg => {
            let path = hgrc_path(repo_root)?;
            if let Some(rest) = remove_block(&path)? {
                fs::write(&path, rest)?;
                info!(hgrc = %path.display(), "removed hg hooks");
            }
        }
    }
    Ok(())
}

/// Whether every hook hookjira installs for `vcs` is present.
pub fn hooks_installed(vcs: Vcs, repo_root: &Path) -> Result<bool, VcsError> {
    let paths: Vec<PathBuf> = match vcs {
        Vcs::Git => {
            let hooks_dir = git_hooks_dir(repo_root)?;
            GIT_HOOKS.iter().map(|(name, _)| hooks_dir.join(name)).collect()
        }
        Vcs::Hg => vec![hgrc_path(repo_root)?],
    };
    for path in paths {
        if !has_block(&read_or_empty(&path)?) {
            return Ok(false);
        }
    }
    Ok(true)
}

fn git_hooks_dir(repo_root: &Path) -> Result<PathBuf, VcsError> {
    let out = run(Vcs::Git, repo_root, &["rev-parse", "--git-path", "hooks"])
        .map_err(|_| VcsError::NotARepository(repo_root.to_path_buf()))?;
    let dir = PathBuf::from(out.trim());
    Ok(if dir.is_absolute() {
        dir
    } else {
        repo_root.join(dir)
    })
}

fn hgrc_path(repo_root: &Path) -> Result<PathBuf, VcsError> {
    let hg_dir = repo_root.join(".hg");
    if !hg_dir.is_dir() {
        return Err(VcsError::NotARepository(repo_root.to_path_buf()));
    }
    Ok(hg_dir.join("hgrc"))
}

fn read_or_empty(path: &Path) -> Result<String, VcsError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(e.into()),
    }
}

fn has_block(content: &str) -> bool {
    content.lines().any(|l| l.trim_end() == HOOK_MARKER_START)
}

/// Append a marker block holding `body`. A new file starts with `header`.
/// Returns `false` when the block was already present.
fn append_block(path: &Path, body: &str, header: Option<&str>) -> Result<bool, VcsError> {
    let existing = read_or_empty(path)?;
    if has_block(&existing) {
        return Ok(false);
    }

    let mut content = if existing.trim().is_empty() {
        header.map(|h| format!("{h}\n")).unwrap_or_default()
    } else {
        format!("{}\n", existing.trim_end())
    };
    if !content.is_empty() {
        content.push('\n');
    }
    content.push_str(&format!("{HOOK_MARKER_START}\n{body}\n{HOOK_MARKER_END}\n"));
    fs::write(path, content)?;
    Ok(true)
}

/// Content of `path` with the marker block cut out, or `None` when the file
/// has no block.
fn remove_block(path: &Path) -> Result<Option<String>, VcsError> {
    let existing = read_or_empty(path)?;
    if !has_block(&existing) {
        return Ok(None);
    }

    let mut kept = Vec::new();
    let mut inside = false;
    for line in existing.lines() {
        match line.trim_end() {
            HOOK_MARKER_START => inside = true,
            HOOK_MARKER_END if inside => inside = false,
            _ if !inside => kept.push(line),
            _ => {}
        }
    }
    while kept.last().is_some_and(|l| l.trim().is_empty()) {
        kept.pop();
    }

    let mut rest = kept.join("\n");
    if !rest.is_empty() {
        rest.push('\n');
    }
    Ok(Some(rest))
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<(), VcsError> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms)?;
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<(), VcsError> {
    Ok(())
}

#[cfg(test)]
#[path = "hooks_tests.rs"]
mod tests;
