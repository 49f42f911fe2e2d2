use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum VcsError {
    #[error("failed to run {tool}: {source}\n  hint: is {tool} installed and on PATH?")]
    Spawn {
        tool: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} {args} failed: {stderr}")]
    Command {
        tool: &'static str,
        args: String,
        stderr: String,
    },

    #[error("unexpected {tool} output: {detail}")]
    Output { tool: &'static str, detail: String },

    #[error("not a git or mercurial repository: {0}")]
    NotARepository(PathBuf),

    #[error("unknown version control system '{0}'\n  hint: use git or hg")]
    UnknownVcs(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
