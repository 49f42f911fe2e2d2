use std::io::Read;
use std::path::Path;

use anyhow::Context;
use hookjira_core::{
    render, ChangesetRef, CommentComposer, HookConfig, HookPaths, ReferenceAttrs,
    ReferenceScanner, TemplateVars,
};

/// Changeset id used when rendering a dry run.
const DRY_RUN_NODE: &str = "000000000000";

pub fn execute(
    root: &Path,
    text: Option<String>,
    file: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let description = match (text, file) {
        (Some(text), _) => text,
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        (None, None) => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading description from stdin")?;
            buf
        }
    };

    let config = HookConfig::load(&HookPaths::discover(root)).context("loading configuration")?;
    let scanner = ReferenceScanner::from_config(&config)?;
    let scan = scanner.scan(&description);

    for warning in &scan.warnings {
        eprintln!("hookjira: warning: {warning}");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&scan.references())?);
        return Ok(());
    }

    if scan.is_empty() {
        println!("no issue references found");
        return Ok(());
    }

    let template = config.template_text(root)?;
    let changeset = ChangesetRef {
        repo_root: root.to_path_buf(),
        ..ChangesetRef::from_description(DRY_RUN_NODE, description.trim_end())
    };
    let composer = CommentComposer::new(&scanner);
    let webroot = config.webroot(root);

    for (issue_id, attrs) in scan.iter() {
        let vars = TemplateVars::for_issue(&changeset, issue_id, &config.web_base_url, &webroot);
        let rendered = render(&template, &vars)?;
        let comment = composer.extract_text(&rendered, issue_id);
        print!("{}", format_entry(issue_id, attrs, &comment));
    }
    Ok(())
}

fn format_entry(issue_id: &str, attrs: &ReferenceAttrs, comment: &str) -> String {
    let kind = if attrs.wants_resolve {
        "resolve"
    } else {
        "mention"
    };
    let mut out = match attrs.hours_worked {
        Some(h) => format!("{issue_id} ({kind}, hours: {h})\n"),
        None => format!("{issue_id} ({kind})\n"),
    };
    if comment.is_empty() {
        out.push_str("  (empty comment, not sent)\n");
    }
    for line in comment.lines() {
        out.push_str("  ");
        out.push_str(line);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_shows_kind_hours_and_indented_comment() {
        let attrs = ReferenceAttrs {
            wants_resolve: true,
            hours_worked: Some(2.5),
        };
        assert_eq!(
            format_entry("AB-1", &attrs, "sjira AB-1 h 2.5\n\n------\nBranch : default\n"),
            "AB-1 (resolve, hours: 2.5)\n  sjira AB-1 h 2.5\n  \n  ------\n  Branch : default\n"
        );
    }

    #[test]
    fn empty_comment_is_flagged() {
        let out = format_entry("AB-2", &ReferenceAttrs::default(), "");
        assert_eq!(out, "AB-2 (mention)\n  (empty comment, not sent)\n");
    }
}
