use std::cell::RefCell;
use std::collections::HashMap;

use crate::{IssueTracker, TrackerError};

/// One call made against a [`RecordingTracker`].
#[derive(Debug, Clone, PartialEq)]
pub enum TrackerCall {
    Comment { issue_id: String, body: String },
    Status { issue_id: String, status: String },
    Worklog { issue_id: String, seconds: u64 },
    Project { issue_id: String },
}

/// In-memory tracker that records calls instead of talking to a server.
///
/// Project keys default to the part of the issue id before the first `-`.
/// Individual issues can be made to fail every call.
#[derive(Debug, Default)]
pub struct RecordingTracker {
    calls: RefCell<Vec<TrackerCall>>,
    projects: HashMap<String, String>,
    failing: HashMap<String, String>,
}

impl RecordingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `project` as the project of `issue_id`.
    pub fn with_project(mut self, issue_id: &str, project: &str) -> Self {
        self.projects.insert(issue_id.to_string(), project.to_string());
        self
    }

    /// Fail every mutating call on `issue_id` with `message`.
    pub fn failing_on(mut self, issue_id: &str, message: &str) -> Self {
        self.failing.insert(issue_id.to_string(), message.to_string());
        self
    }

    pub fn calls(&self) -> Vec<TrackerCall> {
        self.calls.borrow().clone()
    }

    /// Calls that change the tracker (everything but project lookups).
    pub fn updates(&self) -> Vec<TrackerCall> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| !matches!(c, TrackerCall::Project { .. }))
            .cloned()
            .collect()
    }

    fn check(&self, issue_id: &str) -> Result<(), TrackerError> {
        match self.failing.get(issue_id) {
            Some(msg) => Err(TrackerError::Other(msg.clone())),
            None => Ok(()),
        }
    }
}

impl IssueTracker for RecordingTracker {
    fn add_comment(&self, issue_id: &str, body: &str) -> Result<(), TrackerError> {
        self.check(issue_id)?;
        self.calls.borrow_mut().push(TrackerCall::Comment {
            issue_id: issue_id.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }

    fn set_status(&self, issue_id: &str, status: &str) -> Result<(), TrackerError> {
        self.check(issue_id)?;
        self.calls.borrow_mut().push(TrackerCall::Status {
            issue_id: issue_id.to_string(),
            status: status.to_string(),
        });
        Ok(())
    }

    fn add_worklog(&self, issue_id: &str, seconds: u64) -> Result<(), TrackerError> {
        self.check(issue_id)?;
        self.calls.borrow_mut().push(TrackerCall::Worklog {
            issue_id: issue_id.to_string(),
            seconds,
        });
        Ok(())
    }

    fn project_key(&self, issue_id: &str) -> Result<String, TrackerError> {
        self.calls.borrow_mut().push(TrackerCall::Project {
            issue_id: issue_id.to_string(),
        });
        Ok(self.projects.get(issue_id).cloned().unwrap_or_else(|| {
            issue_id
                .split('-')
                .next()
                .unwrap_or_default()
                .to_string()
        }))
    }
}
