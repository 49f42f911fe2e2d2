use crate::scanner::{resume_offset, ReferencePattern, ReferenceScanner};
use crate::types::COMMENT_SEPARATOR;

/// Cuts a rendered, multi-issue comment down to the part relevant to one issue:
/// the line mentioning it, plus the metadata block after the separator.
///
/// A line counts as mentioning an issue when the mention pattern or the
/// resolve pattern matches it with that issue id.
#[derive(Debug, Clone)]
pub struct CommentComposer<'a> {
    patterns: [&'a ReferencePattern; 2],
}

impl<'a> CommentComposer<'a> {
    pub fn new(scanner: &'a ReferenceScanner) -> Self {
        Self {
            patterns: [scanner.mention(), scanner.resolve()],
        }
    }

    /// Split `rendered` on newlines (`\n` or `\r\n`) and extract the comment
    /// for `issue_id`.
    pub fn extract_text(&self, rendered: &str, issue_id: &str) -> String {
        let lines: Vec<&str> = rendered
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();
        self.extract(&lines, issue_id)
    }

    /// Comment body for `issue_id`, or an empty string when no line
    /// mentions it.
    pub fn extract(&self, lines: &[&str], issue_id: &str) -> String {
        let Some(hit) = lines.iter().position(|line| self.mentions(line, issue_id)) else {
            return String::new();
        };
        let separator = lines.iter().position(|line| *line == COMMENT_SEPARATOR);

        let mut comment = lines[hit].to_string();
        match separator {
            Some(sep) if sep > hit => {
                comment.push_str("\n\n");
                for line in &lines[sep..] {
                    comment.push_str(line);
                    comment.push('\n');
                }
            }
            Some(_) => {
                comment.push('\n');
                for line in &lines[hit + 1..] {
                    comment.push_str(line);
                    comment.push('\n');
                }
            }
            None => {}
        }
        comment
    }

    fn mentions(&self, line: &str, issue_id: &str) -> bool {
        self.patterns
            .iter()
            .any(|pattern| pattern_names(pattern, line, issue_id))
    }
}

/// Whether any match of `pattern` on `line` names `issue_id`.
fn pattern_names(pattern: &ReferencePattern, line: &str, issue_id: &str) -> bool {
    let mut start = 0;
    while let Some(caps) = pattern.captures_from(line, start) {
        let Some(whole) = caps.get(0) else { break };
        start = resume_offset(line, &whole);
        if let Some(id) = pattern.issue_id(&caps) {
            if id.eq_ignore_ascii_case(issue_id) {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::{DEFAULT_MENTION_PATTERN, DEFAULT_RESOLVE_PATTERN};

    fn scanner() -> ReferenceScanner {
        ReferenceScanner::new(DEFAULT_MENTION_PATTERN, DEFAULT_RESOLVE_PATTERN).unwrap()
    }

    const RENDERED: &str = "Fix login timeout jira AB-1\n\
                            Tidy imports jira CD-2 h 1\n\
                            \n\
                            ------\n\
                            Author : Jane Doe <jane@example.com>\n\
                            Changeset : https://hg.example.com/widgets/rev/0123456789ab\n\
                            Branch : default";

    #[test]
    fn keeps_matching_line_and_metadata_tail() {
        let scanner = scanner();
        let composer = CommentComposer::new(&scanner);
        assert_eq!(
            composer.extract_text(RENDERED, "CD-2"),
            "Tidy imports jira CD-2 h 1\n\n\
             ------\n\
             Author : Jane Doe <jane@example.com>\n\
             Changeset : https://hg.example.com/widgets/rev/0123456789ab\n\
             Branch : default\n"
        );
    }

    #[test]
    fn only_the_target_issue_line_is_kept() {
        let scanner = scanner();
        let composer = CommentComposer::new(&scanner);
        let comment = composer.extract_text(RENDERED, "AB-1");
        assert!(comment.starts_with("Fix login timeout jira AB-1\n\n------\n"));
        assert!(!comment.contains("CD-2"));
    }

    #[test]
    fn no_mention_yields_empty_comment() {
        let scanner = scanner();
        let composer = CommentComposer::new(&scanner);
        assert_eq!(composer.extract_text(RENDERED, "ZZ-9"), "");
    }

    #[test]
    fn second_match_on_the_same_line_is_found() {
        let scanner = scanner();
        let composer = CommentComposer::new(&scanner);
        let lines = ["jira AB-1 and jira CD-2"];
        assert_eq!(composer.extract(&lines, "CD-2"), "jira AB-1 and jira CD-2");
    }

    #[test]
    fn keyword_without_id_is_skipped() {
        let scanner = scanner();
        let composer = CommentComposer::new(&scanner);
        let lines = ["see jira notes", "jira AB-3 follow-up"];
        assert_eq!(composer.extract(&lines, "AB-3"), "jira AB-3 follow-up");
    }

    #[test]
    fn match_inside_tail_keeps_following_lines() {
        let scanner = scanner();
        let composer = CommentComposer::new(&scanner);
        let lines = ["summary", "------", "Related: jira AB-4", "Branch : default"];
        assert_eq!(
            composer.extract(&lines, "AB-4"),
            "Related: jira AB-4\nBranch : default\n"
        );
    }

    #[test]
    fn without_separator_only_the_line_is_returned() {
        let scanner = scanner();
        let composer = CommentComposer::new(&scanner);
        let lines = ["first", "jira AB-5 done", "last"];
        assert_eq!(composer.extract(&lines, "AB-5"), "jira AB-5 done");
    }

    #[test]
    fn crlf_line_endings_are_normalised() {
        let scanner = scanner();
        let composer = CommentComposer::new(&scanner);
        assert_eq!(
            composer.extract_text("Fix jira AB-1\r\n\r\n------\r\nBranch : default", "AB-1"),
            "Fix jira AB-1\n\n------\nBranch : default\n"
        );
    }

    #[test]
    fn resolve_keyword_lines_are_found() {
        let scanner = scanner();
        let composer = CommentComposer::new(&scanner);
        let lines = ["sjira AB-6 hours 2", "------", "Branch : default"];
        assert_eq!(
            composer.extract(&lines, "AB-6"),
            "sjira AB-6 hours 2\n\n------\nBranch : default\n"
        );
    }
}
