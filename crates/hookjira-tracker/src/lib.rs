mod error;
mod jira;
mod recording;

pub use error::TrackerError;
pub use jira::{JiraClient, JiraCredentials};
pub use recording::{RecordingTracker, TrackerCall};

/// Operations the hook needs from an issue tracker.
pub trait IssueTracker {
    /// Append a comment to the issue.
    fn add_comment(&self, issue_id: &str, body: &str) -> Result<(), TrackerError>;

    /// Move the issue to the named status.
    fn set_status(&self, issue_id: &str, status: &str) -> Result<(), TrackerError>;

    /// Record time spent on the issue.
    fn add_worklog(&self, issue_id: &str, seconds: u64) -> Result<(), TrackerError>;

    /// Key of the project the issue belongs to.
    fn project_key(&self, issue_id: &str) -> Result<String, TrackerError>;
}
