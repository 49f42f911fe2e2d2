use regex::{Captures, Regex, RegexBuilder};
use tracing::{debug, warn};

use crate::config::{ConfigError, HookConfig};
use crate::types::{ReferenceAttrs, ScanResult};

/// Default mention pattern: `jira ABCD-1234`, `jira #ABCD-1234 h 1.5`, ...
pub const DEFAULT_MENTION_PATTERN: &str =
    r"\bjira?\s*(?P<ids>(?:#?[a-z]+-\d+)?)\s*\.?,?\s*(?:h(?:ours?)?\s*(?P<hours>\d*(?:\.\d+)?))?";

/// Default resolve pattern: `sjira ABCD-1234`, `sjira ABCD-1234 hours 2`, ...
pub const DEFAULT_RESOLVE_PATTERN: &str =
    r"\bsjira\s*(?P<ids>(?:#?[a-z]+-\d+)?)\s*\.?,?\s*(?:h(?:ours?)?\s*(?P<hours>\d*(?:\.\d+)?))?";

// ── Pattern ──

/// A compiled reference pattern plus the capture groups holding the issue id
/// and the optional hours value.
#[derive(Debug, Clone)]
pub struct ReferencePattern {
    re: Regex,
    id_group: usize,
    hours_group: Option<usize>,
}

impl ReferencePattern {
    /// Compile `pattern` case-insensitively.
    ///
    /// The issue id comes from the named group `ids`, else from group 1.
    /// Hours come from the named group `hours`, else from group 2.
    pub fn compile(name: &'static str, pattern: &str) -> Result<Self, ConfigError> {
        let re = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|source| ConfigError::Pattern { name, source })?;

        let named = |wanted: &str| {
            re.capture_names()
                .position(|n| n == Some(wanted))
        };

        let id_group = match named("ids") {
            Some(i) => i,
            None if re.captures_len() > 1 => 1,
            None => return Err(ConfigError::MissingIdGroup { name }),
        };
        let hours_group = named("hours").or_else(|| {
            (re.captures_len() > 2 && id_group != 2).then_some(2)
        });

        Ok(Self {
            re,
            id_group,
            hours_group,
        })
    }

    /// First match starting at or after byte offset `start`.
    pub fn captures_from<'t>(&self, text: &'t str, start: usize) -> Option<Captures<'t>> {
        if start > text.len() {
            return None;
        }
        self.re.captures_at(text, start)
    }

    /// Normalised issue id of a match, `None` when the id group is empty.
    pub fn issue_id(&self, caps: &Captures<'_>) -> Option<String> {
        caps.get(self.id_group)
            .and_then(|m| normalize_issue_id(m.as_str()))
    }

    /// Raw hours text of a match, if the hours group participated.
    pub fn hours_text<'t>(&self, caps: &Captures<'t>) -> Option<&'t str> {
        self.hours_group
            .and_then(|g| caps.get(g))
            .map(|m| m.as_str())
    }
}

/// Strip a leading `#` and upper-case the key. Empty ids yield `None`.
pub fn normalize_issue_id(raw: &str) -> Option<String> {
    let id = raw.trim().trim_start_matches('#');
    if id.is_empty() {
        None
    } else {
        Some(id.to_uppercase())
    }
}

/// Byte offset where the next search should begin after `m`.
/// Empty matches step over one character so the walk always terminates.
pub(crate) fn resume_offset(text: &str, m: &regex::Match<'_>) -> usize {
    if m.end() > m.start() {
        return m.end();
    }
    text[m.end()..]
        .chars()
        .next()
        .map_or(text.len() + 1, |c| m.end() + c.len_utf8())
}

// ── Scanner ──

/// Finds issue references in a changeset description using a mention
/// pattern and a resolve pattern.
#[derive(Debug, Clone)]
pub struct ReferenceScanner {
    mention: ReferencePattern,
    resolve: ReferencePattern,
}

impl ReferenceScanner {
    pub fn new(mention_pattern: &str, resolve_pattern: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            mention: ReferencePattern::compile("mention_pattern", mention_pattern)?,
            resolve: ReferencePattern::compile("resolve_pattern", resolve_pattern)?,
        })
    }

    pub fn from_config(config: &HookConfig) -> Result<Self, ConfigError> {
        Self::new(&config.mention_pattern, &config.resolve_pattern)
    }

    pub fn mention(&self) -> &ReferencePattern {
        &self.mention
    }

    pub fn resolve(&self) -> &ReferencePattern {
        &self.resolve
    }

    /// Walk both patterns over `description`, always consuming whichever
    /// pending match starts first. At equal offsets the resolve match wins.
    pub fn scan(&self, description: &str) -> ScanResult {
        let mut result = ScanResult::new();
        let mut mention = self.mention.captures_from(description, 0);
        let mut resolve = self.resolve.captures_from(description, 0);

        loop {
            let take_resolve = match (&mention, &resolve) {
                (None, None) => break,
                (Some(_), None) => false,
                (None, Some(_)) => true,
                (Some(m), Some(r)) => start_of(r) <= start_of(m),
            };

            let (pattern, caps) = if take_resolve {
                (&self.resolve, resolve.take())
            } else {
                (&self.mention, mention.take())
            };
            let Some(caps) = caps else { break };
            let Some(whole) = caps.get(0) else { break };

            let next = resume_offset(description, &whole);
            if take_resolve {
                resolve = self.resolve.captures_from(description, next);
            } else {
                mention = self.mention.captures_from(description, next);
            }

            debug!(
                matched = whole.as_str(),
                resolve = take_resolve,
                "reference match"
            );

            let Some(issue_id) = pattern.issue_id(&caps) else {
                continue;
            };
            let hours_worked = pattern
                .hours_text(&caps)
                .and_then(|text| parse_hours(text, &mut result.warnings));

            result.record(
                issue_id,
                ReferenceAttrs {
                    wants_resolve: take_resolve,
                    hours_worked,
                },
            );
        }

        result
    }
}

fn start_of(caps: &Captures<'_>) -> usize {
    caps.get(0).map_or(usize::MAX, |m| m.start())
}

/// Parse captured hours text. An empty capture means "no hours"; anything
/// that is not a finite, non-negative number is reported and dropped.
fn parse_hours(text: &str, warnings: &mut Vec<String>) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    match text.parse::<f64>() {
        Ok(h) if h.is_finite() && h >= 0.0 => Some(h),
        _ => {
            let msg = format!("{text}: invalid hours");
            warn!("{msg}");
            warnings.push(msg);
            None
        }
    }
}
