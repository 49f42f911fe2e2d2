use std::time::Duration;

use base64::Engine;
use hookjira_core::HookConfig;
use serde::Deserialize;
use tracing::debug;

use crate::{IssueTracker, TrackerError};

// ── Config ──

/// Connection settings for a Jira instance.
#[derive(Clone)]
pub struct JiraCredentials {
    pub url: String,
    pub user_email: String,
    pub api_key: String,
}

impl std::fmt::Debug for JiraCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraCredentials")
            .field("url", &self.url)
            .field("user_email", &self.user_email)
            .field("api_key", &"********")
            .finish()
    }
}

/// Blocking Jira REST (v2) client.
pub struct JiraClient {
    base_url: String,
    auth_header: String,
    resolution: Option<String>,
    agent: ureq::Agent,
}

impl JiraClient {
    pub fn new(creds: &JiraCredentials, timeout: Duration) -> Result<Self, TrackerError> {
        let base_url = creds.url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(TrackerError::Config("empty Jira URL".into()));
        }
        let token = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:{}", creds.user_email, creds.api_key));
        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Ok(Self {
            base_url,
            auth_header: format!("Basic {token}"),
            resolution: None,
            agent,
        })
    }

    pub fn from_config(config: &HookConfig) -> Result<Self, TrackerError> {
        let creds = JiraCredentials {
            url: config.url.clone(),
            user_email: config.user_email.clone(),
            api_key: config.api_key.clone(),
        };
        let client = Self::new(&creds, Duration::from_secs(config.timeout_secs))?;
        Ok(client.with_resolution(config.resolve_resolution.clone()))
    }

    /// Resolution to set together with every status transition.
    pub fn with_resolution(mut self, resolution: Option<String>) -> Self {
        self.resolution = resolution.filter(|r| !r.trim().is_empty());
        self
    }

    fn issue_url(&self, issue_id: &str, suffix: &str) -> Result<String, TrackerError> {
        if issue_id.is_empty()
            || !issue_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(TrackerError::Config(format!("invalid issue key '{issue_id}'")));
        }
        Ok(format!("{}/rest/api/2/issue/{issue_id}{suffix}", self.base_url))
    }

    fn get_json(&self, url: &str) -> Result<serde_json::Value, TrackerError> {
        debug!(url, "GET");
        let mut resp = self
            .agent
            .get(url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .call()
            .map_err(|e| TrackerError::from_ureq(url, e))?;
        let text = resp
            .body_mut()
            .read_to_string()
            .map_err(|e| TrackerError::from_ureq(url, e))?;
        serde_json::from_str(&text).map_err(|e| TrackerError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }

    fn post_json(&self, url: &str, payload: &serde_json::Value) -> Result<(), TrackerError> {
        debug!(url, "POST");
        self.agent
            .post(url)
            .header("Authorization", &self.auth_header)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .send(payload.to_string())
            .map_err(|e| TrackerError::from_ureq(url, e))?;
        Ok(())
    }
}

impl IssueTracker for JiraClient {
    fn add_comment(&self, issue_id: &str, body: &str) -> Result<(), TrackerError> {
        let url = self.issue_url(issue_id, "/comment")?;
        self.post_json(&url, &comment_payload(body))
    }

    fn set_status(&self, issue_id: &str, status: &str) -> Result<(), TrackerError> {
        let url = self.issue_url(issue_id, "/transitions")?;
        let available = self.get_json(&url)?;
        let transition_id = pick_transition(&available, status)?;
        self.post_json(
            &url,
            &transition_payload(&transition_id, self.resolution.as_deref()),
        )
    }

    fn add_worklog(&self, issue_id: &str, seconds: u64) -> Result<(), TrackerError> {
        let url = self.issue_url(issue_id, "/worklog")?;
        self.post_json(&url, &worklog_payload(seconds))
    }

    fn project_key(&self, issue_id: &str) -> Result<String, TrackerError> {
        let url = self.issue_url(issue_id, "?fields=project")?;
        let issue = self.get_json(&url)?;
        parse_project_key(&url, &issue)
    }
}

// ── Payloads ──

fn comment_payload(body: &str) -> serde_json::Value {
    serde_json::json!({ "body": body })
}

fn worklog_payload(seconds: u64) -> serde_json::Value {
    serde_json::json!({ "timeSpentSeconds": seconds })
}

fn transition_payload(transition_id: &str, resolution: Option<&str>) -> serde_json::Value {
    let mut payload = serde_json::json!({ "transition": { "id": transition_id } });
    if let Some(name) = resolution {
        payload["fields"] = serde_json::json!({ "resolution": { "name": name } });
    }
    payload
}

#[derive(Deserialize)]
struct TransitionList {
    #[serde(default)]
    transitions: Vec<Transition>,
}

#[derive(Deserialize)]
struct Transition {
    id: String,
    name: String,
    to: Option<TransitionTarget>,
}

#[derive(Deserialize)]
struct TransitionTarget {
    name: String,
}

/// Pick the transition leading to `status`. The target status name is
/// preferred; the transition's own name is accepted as a fallback.
fn pick_transition(available: &serde_json::Value, status: &str) -> Result<String, TrackerError> {
    let list: TransitionList =
        serde_json::from_value(available.clone()).map_err(|e| TrackerError::Decode {
            url: "transitions".into(),
            reason: e.to_string(),
        })?;

    let by_target = list.transitions.iter().find(|t| {
        t.to
            .as_ref()
            .is_some_and(|to| to.name.eq_ignore_ascii_case(status))
    });
    let by_name = || {
        list.transitions
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(status))
    };

    match by_target.or_else(by_name) {
        Some(t) => Ok(t.id.clone()),
        None => Err(TrackerError::NoTransition {
            status: status.to_string(),
            available: list
                .transitions
                .iter()
                .map(|t| t.to.as_ref().map_or(t.name.clone(), |to| to.name.clone()))
                .collect(),
        }),
    }
}

fn parse_project_key(url: &str, issue: &serde_json::Value) -> Result<String, TrackerError> {
    issue
        .pointer("/fields/project/key")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| TrackerError::Decode {
            url: url.to_string(),
            reason: "missing fields.project.key".into(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> JiraClient {
        let creds = JiraCredentials {
            url: "https://example.atlassian.net/".into(),
            user_email: "dev@example.com".into(),
            api_key: "token".into(),
        };
        JiraClient::new(&creds, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn basic_auth_header() {
        // base64("dev@example.com:token")
        assert_eq!(client().auth_header, "Basic ZGV2QGV4YW1wbGUuY29tOnRva2Vu");
    }

    #[test]
    fn issue_urls() {
        let c = client();
        assert_eq!(
            c.issue_url("AB-12", "/comment").unwrap(),
            "https://example.atlassian.net/rest/api/2/issue/AB-12/comment"
        );
        assert_eq!(
            c.issue_url("AB-12", "?fields=project").unwrap(),
            "https://example.atlassian.net/rest/api/2/issue/AB-12?fields=project"
        );
        assert!(c.issue_url("AB 12/../x", "").is_err());
        assert!(c.issue_url("", "").is_err());
    }

    #[test]
    fn empty_url_is_rejected() {
        let creds = JiraCredentials {
            url: "  ".into(),
            user_email: "a".into(),
            api_key: "b".into(),
        };
        assert!(matches!(
            JiraClient::new(&creds, Duration::from_secs(1)),
            Err(TrackerError::Config(_))
        ));
    }

    #[test]
    fn credentials_debug_masks_key() {
        let creds = JiraCredentials {
            url: "u".into(),
            user_email: "e".into(),
            api_key: "very-secret".into(),
        };
        assert!(!format!("{creds:?}").contains("very-secret"));
    }

    #[test]
    fn payload_shapes() {
        assert_eq!(comment_payload("hi")["body"], "hi");
        assert_eq!(worklog_payload(5400)["timeSpentSeconds"], 5400);

        let p = transition_payload("31", None);
        assert_eq!(p["transition"]["id"], "31");
        assert!(p.get("fields").is_none());

        let p = transition_payload("31", Some("Fixed"));
        assert_eq!(p["fields"]["resolution"]["name"], "Fixed");
    }

    #[test]
    fn transition_matched_by_target_status() {
        let available = serde_json::json!({
            "transitions": [
                { "id": "11", "name": "Start work", "to": { "name": "In Progress" } },
                { "id": "31", "name": "Close", "to": { "name": "Done" } }
            ]
        });
        assert_eq!(pick_transition(&available, "done").unwrap(), "31");
    }

    #[test]
    fn transition_matched_by_own_name() {
        let available = serde_json::json!({
            "transitions": [ { "id": "41", "name": "Accepted" } ]
        });
        assert_eq!(pick_transition(&available, "Accepted").unwrap(), "41");
    }

    #[test]
    fn missing_transition_lists_available() {
        let available = serde_json::json!({
            "transitions": [ { "id": "11", "name": "Start", "to": { "name": "In Progress" } } ]
        });
        let err = pick_transition(&available, "Done").unwrap_err();
        match err {
            TrackerError::NoTransition { status, available } => {
                assert_eq!(status, "Done");
                assert_eq!(available, vec!["In Progress".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn project_key_from_issue() {
        let issue = serde_json::json!({ "key": "AB-1", "fields": { "project": { "key": "AB" } } });
        assert_eq!(parse_project_key("u", &issue).unwrap(), "AB");
        assert!(parse_project_key("u", &serde_json::json!({})).is_err());
    }
}
