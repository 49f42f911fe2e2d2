//! Minimal changeset templating.
//!
//! Templates are plain text with `{name}` or `{name|filter|filter}`
//! expressions, and backslash escapes (`\n`, `\t`, `\\`, `\{`, `\}`) so that
//! a whole template fits in one config string:
//!
//! ```text
//! {desc|escape}\n\n------\nAuthor : {author}\nBranch : {branch}
//! ```

use std::collections::BTreeMap;

use crate::types::ChangesetRef;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TemplateError {
    #[error("unknown template keyword '{0}'")]
    UnknownVariable(String),

    #[error("unknown template filter '{0}'")]
    UnknownFilter(String),

    #[error("unterminated template expression starting at offset {0}")]
    Unterminated(usize),
}

/// Named values available to a template.
#[derive(Debug, Clone, Default)]
pub struct TemplateVars {
    values: BTreeMap<String, String>,
}

impl TemplateVars {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Variables for one issue's comment on one changeset.
    pub fn for_issue(
        changeset: &ChangesetRef,
        issue_id: &str,
        web_base_url: &str,
        webroot: &str,
    ) -> Self {
        let root = changeset.repo_root.to_string_lossy().replace('\\', "/");
        let hgweb = web_base_url.trim_end_matches('/');
        let changeset_url = format!("{hgweb}/{webroot}/rev/{}", short(&changeset.id));

        let mut vars = Self::new();
        vars.set("desc", changeset.description.as_str())
            .set("description", changeset.description.as_str())
            .set("author", changeset.author.as_str())
            .set("node", changeset.id.as_str())
            .set("branch", changeset.branch.as_str())
            .set("bug", issue_id)
            .set("issue_id", issue_id)
            .set("root", root)
            .set("webroot", webroot)
            .set("repository_web_path", webroot)
            .set("hgweb", hgweb)
            .set("changeset_url", changeset_url);
        vars
    }
}

/// Render `template` against `vars`.
pub fn render(template: &str, vars: &TemplateVars) -> Result<String, TemplateError> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.char_indices();

    while let Some((offset, ch)) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, c @ ('\\' | '{' | '}'))) => out.push(c),
                Some((_, other)) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            },
            '{' => {
                let mut expr = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    expr.push(c);
                }
                if !closed {
                    return Err(TemplateError::Unterminated(offset));
                }
                out.push_str(&eval(&expr, vars)?);
            }
            _ => out.push(ch),
        }
    }

    Ok(out)
}

fn eval(expr: &str, vars: &TemplateVars) -> Result<String, TemplateError> {
    let mut parts = expr.split('|').map(str::trim);
    let name = parts.next().unwrap_or_default();
    let mut value = vars
        .get(name)
        .ok_or_else(|| TemplateError::UnknownVariable(name.to_string()))?
        .to_string();
    for filter in parts {
        value = apply_filter(filter, &value)?;
    }
    Ok(value)
}

fn apply_filter(filter: &str, value: &str) -> Result<String, TemplateError> {
    let out = match filter {
        "escape" => escape(value),
        "short" => short(value).to_string(),
        "firstline" => value.lines().next().unwrap_or_default().to_string(),
        "strip" => value.trim().to_string(),
        "upper" => value.to_uppercase(),
        "lower" => value.to_lowercase(),
        "person" => person(value),
        "email" => email(value),
        other => return Err(TemplateError::UnknownFilter(other.to_string())),
    };
    Ok(out)
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// First 12 characters of a changeset hash.
fn short(node: &str) -> &str {
    match node.char_indices().nth(12) {
        Some((idx, _)) => &node[..idx],
        None => node,
    }
}

/// `Jane Doe <jane@example.com>` → `Jane Doe`; `jane@example.com` → `jane`.
fn person(author: &str) -> String {
    if let Some(idx) = author.find('<') {
        let name = author[..idx].trim().trim_matches('"').trim();
        if !name.is_empty() {
            return name.to_string();
        }
    }
    let addr = email(author);
    addr.split('@').next().unwrap_or_default().to_string()
}

/// `Jane Doe <jane@example.com>` → `jane@example.com`.
fn email(author: &str) -> String {
    match (author.find('<'), author.rfind('>')) {
        (Some(start), Some(end)) if start < end => author[start + 1..end].to_string(),
        (Some(start), None) => author[start + 1..].to_string(),
        _ => author.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_TEMPLATE;

    fn sample_changeset() -> ChangesetRef {
        ChangesetRef {
            id: "0123456789abcdef0123456789abcdef01234567".into(),
            description: "Fix <overflow> & crash\njira AB-1".into(),
            author: "Jane Doe <jane@example.com>".into(),
            branch: "default".into(),
            repo_root: "/var/hg/repos/widgets".into(),
        }
    }

    #[test]
    fn renders_default_template() {
        let cs = sample_changeset();
        let vars =
            TemplateVars::for_issue(&cs, "AB-1", "https://hg.example.com/", "repos/widgets");
        let out = render(DEFAULT_TEMPLATE, &vars).unwrap();
        assert_eq!(
            out,
            "Fix &lt;overflow&gt; &amp; crash\njira AB-1\n\n------\n\
             Author : Jane Doe <jane@example.com>\n\
             Changeset : https://hg.example.com/repos/widgets/rev/0123456789ab\n\
             Branch : default"
        );
    }

    #[test]
    fn filters_chain_left_to_right() {
        let mut vars = TemplateVars::new();
        vars.set("author", "Jane Doe <jane@example.com>");
        assert_eq!(render("{author|person|upper}", &vars).unwrap(), "JANE DOE");
        assert_eq!(render("{ author | email }", &vars).unwrap(), "jane@example.com");
    }

    #[test]
    fn person_falls_back_to_local_part() {
        assert_eq!(person("jane@example.com"), "jane");
        assert_eq!(person("<jane@example.com>"), "jane");
    }

    #[test]
    fn escapes_are_interpreted() {
        let vars = TemplateVars::new();
        assert_eq!(render(r"a\tb\\c\{d\}", &vars).unwrap(), "a\tb\\c{d}");
    }

    #[test]
    fn unknown_keyword_is_an_error() {
        let vars = TemplateVars::new();
        assert_eq!(
            render("{nope}", &vars),
            Err(TemplateError::UnknownVariable("nope".into()))
        );
    }

    #[test]
    fn unknown_filter_is_an_error() {
        let mut vars = TemplateVars::new();
        vars.set("desc", "x");
        assert_eq!(
            render("{desc|rot13}", &vars),
            Err(TemplateError::UnknownFilter("rot13".into()))
        );
    }

    #[test]
    fn unterminated_expression_is_an_error() {
        let mut vars = TemplateVars::new();
        vars.set("desc", "x");
        assert_eq!(render("ok {desc", &vars), Err(TemplateError::Unterminated(3)));
    }

    #[test]
    fn long_variable_aliases_are_available() {
        let cs = sample_changeset();
        let vars = TemplateVars::for_issue(&cs, "AB-1", "https://hg.example.com", "widgets");
        let out = render("{issue_id} {repository_web_path} {changeset_url}", &vars).unwrap();
        assert_eq!(out, "AB-1 widgets https://hg.example.com/widgets/rev/0123456789ab");
    }
}
