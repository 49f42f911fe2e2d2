pub mod dispatch;

pub use dispatch::{
    process_changeset, resolve_rev, run_hook, HookError, HookReport, IssueOutcome, IssueResult,
};
