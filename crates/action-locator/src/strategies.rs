//! Candidate generation for the transformation and semantic tiers

use once_cell::sync::Lazy;
use regex::Regex;

static TEST_ID_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"data-test-?id=["']([^"']+)["']"#).expect("static regex"));
static HAS_TEXT_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"has-text\(["']([^"']+)["']\)"#).expect("static regex"));
static QUOTED_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"["']([^"']+)["']"#).expect("static regex"));

/// Equivalent locators derived purely from the shape of `locator`.
///
/// Order matters: earlier candidates are tested first.
pub fn transformations(locator: &str) -> Vec<String> {
    let locator = locator.trim();
    let mut out: Vec<String> = Vec::new();

    if let Some(id) = locator.strip_prefix('#').filter(|id| is_plain_token(id)) {
        out.push(format!("[data-testid=\"{id}\"]"));
        out.push(format!("[data-test-id=\"{id}\"]"));
        out.push(format!("[id=\"{id}\"]"));
        out.push(format!("[name=\"{id}\"]"));
    }

    if let Some(captures) = TEST_ID_VALUE.captures(locator) {
        let id = &captures[1];
        out.push(format!("#{id}"));
        out.push(format!("[id=\"{id}\"]"));
    }

    if let Some(class) = locator.strip_prefix('.').filter(|class| is_plain_token(class)) {
        out.push(format!("[class*=\"{class}\"]"));
    }

    if let Some(text) = has_text(locator) {
        if locator.contains("button") {
            out.push(format!("role=button[name=\"{text}\"]"));
            out.push(format!("button >> text=\"{text}\""));
        }
        if locator.contains(":has-text(") {
            out.push(format!("text=\"{text}\""));
            out.push(format!("text={text}"));
        }
    }

    let mut seen = std::collections::HashSet::new();
    out.retain(|candidate| candidate != locator && seen.insert(candidate.clone()));
    out
}

/// Text to search for when nothing structural survives.
///
/// A `:has-text(...)` fragment wins, then an id humanised by replacing
/// dashes and underscores, then any quoted fragment.
pub fn text_hint(locator: &str) -> Option<String> {
    let locator = locator.trim();
    if let Some(text) = has_text(locator) {
        return Some(text);
    }
    if let Some(id) = locator.strip_prefix('#').filter(|id| is_plain_token(id)) {
        let humanised = id.replace(['-', '_'], " ");
        return Some(humanised.trim().to_string()).filter(|hint| !hint.is_empty());
    }
    QUOTED_VALUE
        .captures(locator)
        .map(|captures| captures[1].trim().to_string())
        .filter(|hint| !hint.is_empty())
}

fn has_text(locator: &str) -> Option<String> {
    HAS_TEXT_VALUE
        .captures(locator)
        .map(|captures| captures[1].to_string())
}

fn is_plain_token(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

/// Quote a value for use inside a `text=`/`has-text` locator.
pub(crate) fn escape_quotes(value: &str) -> String {
    value.replace('"', "\\\"")
}
