mod changeset;
mod error;
mod hooks;

pub use changeset::{load_changeset, Vcs};
pub use error::VcsError;
pub use hooks::{
    hooks_installed, install_hooks, uninstall_hooks, HOOK_MARKER_END, HOOK_MARKER_START,
};
