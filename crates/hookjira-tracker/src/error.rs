#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("{url} returned HTTP {code}")]
    Status { url: String, code: u16 },

    #[error("unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("no transition to status '{status}' available (available: {})", available.join(", "))]
    NoTransition {
        status: String,
        available: Vec<String>,
    },

    #[error("Issue {issue_id} not in possible projects {}", allowed.join(","))]
    NotAllowedProject {
        issue_id: String,
        allowed: Vec<String>,
    },

    #[error("tracker misconfigured: {0}")]
    Config(String),

    /// Failure injected by a test double.
    #[error("{0}")]
    Other(String),
}

impl TrackerError {
    pub(crate) fn from_ureq(url: &str, err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => TrackerError::Status {
                url: url.to_string(),
                code,
            },
            other => TrackerError::Http {
                url: url.to_string(),
                source: Box::new(other),
            },
        }
    }
}
