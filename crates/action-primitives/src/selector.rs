//! Locator grammar understood by the automation surface
//!
//! Supports the subset of Playwright-style locators the explorer and the
//! healer emit:
//! - CSS compounds: `tag`, `*`, `#id`, `.class`, `[attr]`, `[attr="v"]`,
//!   `[attr*="v"]`, `[attr^="v"]`, `[attr$="v"]`, `:has-text("v")`,
//!   `:not(...)`, `:visible`, descendant combinators and `,` lists
//! - `text="v"` (exact) and `text=v` (case-insensitive substring)
//! - `role=button[name="v"]`
//! - `a >> b` chaining, where `b` is matched within (or on) matches of `a`

use crate::errors::ActionError;

/// Read-only view of a node used for matching.
pub trait SelectorTarget {
    fn tag(&self) -> &str;
    fn attribute(&self, name: &str) -> Option<&str>;
    fn text(&self) -> &str;
    fn is_visible(&self) -> bool;
}

#[derive(Clone, Debug, PartialEq)]
pub struct Selector {
    source: String,
    branches: Vec<Chain>,
}

#[derive(Clone, Debug, PartialEq)]
struct Chain {
    steps: Vec<Step>,
}

#[derive(Clone, Debug, PartialEq)]
struct Step {
    matcher: Matcher,
    relation: Relation,
}

/// Relation of a step to the step before it.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Relation {
    /// Strict ancestor (CSS descendant combinator)
    Descendant,
    /// Ancestor or the node itself (`>>`)
    Within,
}

#[derive(Clone, Debug, PartialEq)]
enum Matcher {
    Compound(Compound),
    Text { value: String, exact: bool },
    Role { role: String, name: Option<String> },
}

#[derive(Clone, Debug, PartialEq, Default)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
    has_text: Vec<String>,
    negations: Vec<Compound>,
    visible_only: bool,
}

#[derive(Clone, Debug, PartialEq)]
struct AttrTest {
    name: String,
    op: AttrOp,
    value: String,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum AttrOp {
    Exists,
    Equals,
    Contains,
    Prefix,
    Suffix,
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, ActionError> {
        let trimmed = source.trim();
        if trimmed.is_empty() {
            return Err(ActionError::invalid_locator(source, "empty locator"));
        }

        let mut branches: Vec<Vec<Step>> = vec![Vec::new()];
        for (index, segment) in split_top_level(trimmed, ">>").into_iter().enumerate() {
            let segment = segment.trim();
            if segment.is_empty() {
                return Err(ActionError::invalid_locator(source, "empty chain segment"));
            }
            let alternatives = parse_segment(source, segment)?;
            let mut next = Vec::with_capacity(branches.len() * alternatives.len());
            for prefix in &branches {
                for alternative in &alternatives {
                    let mut chain = prefix.clone();
                    for (offset, step) in alternative.iter().enumerate() {
                        let mut step = step.clone();
                        if offset == 0 && index > 0 {
                            step.relation = Relation::Within;
                        }
                        chain.push(step);
                    }
                    next.push(chain);
                }
            }
            branches = next;
        }

        Ok(Self {
            source: trimmed.to_string(),
            branches: branches.into_iter().map(|steps| Chain { steps }).collect(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Match a node given its ancestry, ordered from the root down to the node.
    pub fn matches_path(&self, path: &[&dyn SelectorTarget]) -> bool {
        if path.is_empty() {
            return false;
        }
        self.branches.iter().any(|chain| chain.matches(path))
    }
}

impl Chain {
    fn matches(&self, path: &[&dyn SelectorTarget]) -> bool {
        let Some(last) = self.steps.last() else {
            return false;
        };
        let pos = path.len() - 1;
        last.matcher.matches(path[pos]) && self.match_from(self.steps.len() - 1, pos, path)
    }

    fn match_from(&self, step: usize, pos: usize, path: &[&dyn SelectorTarget]) -> bool {
        if step == 0 {
            return true;
        }
        let upper = match self.steps[step].relation {
            Relation::Descendant => pos,
            Relation::Within => pos + 1,
        };
        let previous = &self.steps[step - 1].matcher;
        (0..upper)
            .rev()
            .any(|q| previous.matches(path[q]) && self.match_from(step - 1, q, path))
    }
}

impl Matcher {
    fn matches(&self, node: &dyn SelectorTarget) -> bool {
        match self {
            Matcher::Compound(compound) => compound.matches(node),
            Matcher::Text { value, exact } => {
                let text = normalize_ws(node.text());
                if *exact {
                    text == normalize_ws(value)
                } else {
                    contains_ci(&text, value)
                }
            }
            Matcher::Role { role, name } => {
                if implicit_role(node).as_deref() != Some(role.as_str()) {
                    return false;
                }
                match name {
                    Some(name) => contains_ci(&accessible_name(node), name),
                    None => true,
                }
            }
        }
    }
}

impl Compound {
    fn matches(&self, node: &dyn SelectorTarget) -> bool {
        if let Some(tag) = &self.tag {
            if !node.tag().eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if node.attribute("id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let classes = node.attribute("class").unwrap_or_default();
            if !self
                .classes
                .iter()
                .all(|wanted| classes.split_whitespace().any(|c| c == wanted))
            {
                return false;
            }
        }
        if !self.attrs.iter().all(|test| test.matches(node)) {
            return false;
        }
        if !self
            .has_text
            .iter()
            .all(|needle| contains_ci(&normalize_ws(node.text()), needle))
        {
            return false;
        }
        if self.negations.iter().any(|negated| negated.matches(node)) {
            return false;
        }
        if self.visible_only && !node.is_visible() {
            return false;
        }
        true
    }
}

impl AttrTest {
    fn matches(&self, node: &dyn SelectorTarget) -> bool {
        let Some(actual) = node.attribute(&self.name) else {
            return false;
        };
        match self.op {
            AttrOp::Exists => true,
            AttrOp::Equals => actual == self.value,
            AttrOp::Contains => actual.contains(&self.value),
            AttrOp::Prefix => actual.starts_with(&self.value),
            AttrOp::Suffix => actual.ends_with(&self.value),
        }
    }
}

/// ARIA role of a node, explicit or implied by its tag.
pub fn implicit_role(node: &dyn SelectorTarget) -> Option<String> {
    if let Some(role) = node.attribute("role") {
        return Some(role.to_string());
    }
    let tag = node.tag().to_ascii_lowercase();
    let role = match tag.as_str() {
        "button" => "button",
        "a" if node.attribute("href").is_some() => "link",
        "textarea" => "textbox",
        "select" => "combobox",
        "dialog" => "dialog",
        "input" => match node.attribute("type").unwrap_or("text") {
            "submit" | "button" | "reset" => "button",
            "checkbox" => "checkbox",
            "radio" => "radio",
            _ => "textbox",
        },
        _ => return None,
    };
    Some(role.to_string())
}

fn accessible_name(node: &dyn SelectorTarget) -> String {
    if let Some(label) = node.attribute("aria-label") {
        return label.trim().to_string();
    }
    let text = normalize_ws(node.text());
    if !text.is_empty() {
        return text;
    }
    node.attribute("placeholder").unwrap_or_default().trim().to_string()
}

fn normalize_ws(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack
        .to_lowercase()
        .contains(&normalize_ws(needle).to_lowercase())
}

/// Split on `sep` outside quotes, brackets and parentheses.
fn split_top_level(input: &str, sep: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut rest = input;

    while let Some(ch) = rest.chars().next() {
        if let Some(q) = quote {
            current.push(ch);
            rest = &rest[ch.len_utf8()..];
            if ch == '\\' {
                if let Some(escaped) = rest.chars().next() {
                    current.push(escaped);
                    rest = &rest[escaped.len_utf8()..];
                }
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        if depth == 0 && rest.starts_with(sep) {
            parts.push(std::mem::take(&mut current));
            rest = &rest[sep.len()..];
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
        current.push(ch);
        rest = &rest[ch.len_utf8()..];
    }
    parts.push(current);
    parts
}

fn parse_segment(source: &str, segment: &str) -> Result<Vec<Vec<Step>>, ActionError> {
    if let Some(body) = segment.strip_prefix("text=") {
        let (value, exact) = match unquote(body.trim()) {
            Some(value) => (value, true),
            None => (body.trim().to_string(), false),
        };
        if value.is_empty() {
            return Err(ActionError::invalid_locator(source, "empty text selector"));
        }
        return Ok(vec![vec![Step {
            matcher: Matcher::Text { value, exact },
            relation: Relation::Within,
        }]]);
    }
    if let Some(body) = segment.strip_prefix("role=") {
        return Ok(vec![vec![Step {
            matcher: parse_role(source, body.trim())?,
            relation: Relation::Within,
        }]]);
    }
    let css = segment.strip_prefix("css=").unwrap_or(segment);

    let mut alternatives = Vec::new();
    for alternative in split_top_level(css, ",") {
        let alternative = alternative.trim();
        if alternative.is_empty() {
            return Err(ActionError::invalid_locator(source, "empty selector list entry"));
        }
        let mut steps = Vec::new();
        for token in split_whitespace_top_level(alternative) {
            if token == ">" {
                continue;
            }
            steps.push(Step {
                matcher: Matcher::Compound(parse_compound(source, &token)?),
                relation: Relation::Descendant,
            });
        }
        if steps.is_empty() {
            return Err(ActionError::invalid_locator(source, "empty compound"));
        }
        alternatives.push(steps);
    }
    Ok(alternatives)
}

fn split_whitespace_top_level(input: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for ch in input.chars() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            current.push(ch);
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '[' | '(' => depth += 1,
            ']' | ')' => depth = depth.saturating_sub(1),
            c if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    parts.push(std::mem::take(&mut current));
                }
                continue;
            }
            _ => {}
        }
        current.push(ch);
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

fn parse_role(source: &str, body: &str) -> Result<Matcher, ActionError> {
    let (role, rest) = match body.find('[') {
        Some(idx) => (&body[..idx], &body[idx..]),
        None => (body, ""),
    };
    let role = role.trim();
    if role.is_empty() {
        return Err(ActionError::invalid_locator(source, "missing role"));
    }
    let mut name = None;
    let mut scanner = Scanner::new(rest);
    while !scanner.is_done() {
        if !scanner.eat('[') {
            return Err(ActionError::invalid_locator(source, "expected '[' in role options"));
        }
        let attr = scanner.parse_attr(source)?;
        if attr.name == "name" {
            name = Some(attr.value);
        }
    }
    Ok(Matcher::Role {
        role: role.to_string(),
        name,
    })
}

fn parse_compound(source: &str, token: &str) -> Result<Compound, ActionError> {
    let mut scanner = Scanner::new(token);
    let compound = scanner.parse_compound(source)?;
    if !scanner.is_done() {
        return Err(ActionError::invalid_locator(
            source,
            format!("unexpected input near '{}'", scanner.remaining()),
        ));
    }
    Ok(compound)
}

fn unquote(value: &str) -> Option<String> {
    let mut chars = value.chars();
    let quote = chars.next()?;
    if (quote != '"' && quote != '\'') || value.len() < 2 || !value.ends_with(quote) {
        return None;
    }
    let inner = &value[1..value.len() - 1];
    Some(unescape(inner))
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(ch);
        }
    }
    out
}

struct Scanner<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn is_done(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn remaining(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn skip_ws(&mut self) {
        while let Some(ch) = self.peek() {
            if !ch.is_whitespace() {
                break;
            }
            self.pos += ch.len_utf8();
        }
    }

    fn ident(&mut self) -> String {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_alphanumeric() || ch == '-' || ch == '_' {
                self.pos += ch.len_utf8();
            } else {
                break;
            }
        }
        self.input[start..self.pos].to_string()
    }

    fn quoted(&mut self, source: &str) -> Result<String, ActionError> {
        let Some(quote) = self.peek().filter(|c| *c == '"' || *c == '\'') else {
            return Err(ActionError::invalid_locator(source, "expected quoted string"));
        };
        self.pos += 1;
        let mut value = String::new();
        loop {
            let Some(ch) = self.peek() else {
                return Err(ActionError::invalid_locator(source, "unterminated string"));
            };
            self.pos += ch.len_utf8();
            if ch == '\\' {
                if let Some(next) = self.peek() {
                    self.pos += next.len_utf8();
                    value.push(next);
                }
            } else if ch == quote {
                return Ok(value);
            } else {
                value.push(ch);
            }
        }
    }

    fn parse_compound(&mut self, source: &str) -> Result<Compound, ActionError> {
        let mut compound = Compound::default();
        if self.eat('*') {
            // universal selector
        } else if self.peek().map(|c| c.is_alphabetic()).unwrap_or(false) {
            compound.tag = Some(self.ident().to_ascii_lowercase());
        }

        while let Some(ch) = self.peek() {
            match ch {
                '#' => {
                    self.pos += 1;
                    let id = self.ident();
                    if id.is_empty() {
                        return Err(ActionError::invalid_locator(source, "empty id"));
                    }
                    compound.id = Some(id);
                }
                '.' => {
                    self.pos += 1;
                    let class = self.ident();
                    if class.is_empty() {
                        return Err(ActionError::invalid_locator(source, "empty class"));
                    }
                    compound.classes.push(class);
                }
                '[' => {
                    self.pos += 1;
                    compound.attrs.push(self.parse_attr(source)?);
                }
                ':' => {
                    self.pos += 1;
                    let pseudo = self.ident();
                    match pseudo.as_str() {
                        "has-text" => {
                            if !self.eat('(') {
                                return Err(ActionError::invalid_locator(source, "expected '('"));
                            }
                            self.skip_ws();
                            let text = self.quoted(source)?;
                            self.skip_ws();
                            if !self.eat(')') {
                                return Err(ActionError::invalid_locator(source, "expected ')'"));
                            }
                            compound.has_text.push(text);
                        }
                        "not" => {
                            if !self.eat('(') {
                                return Err(ActionError::invalid_locator(source, "expected '('"));
                            }
                            let inner = self.parse_compound(source)?;
                            if !self.eat(')') {
                                return Err(ActionError::invalid_locator(source, "expected ')'"));
                            }
                            compound.negations.push(inner);
                        }
                        "visible" => compound.visible_only = true,
                        other => {
                            return Err(ActionError::invalid_locator(
                                source,
                                format!("unsupported pseudo-class ':{}'", other),
                            ))
                        }
                    }
                }
                _ => break,
            }
        }
        Ok(compound)
    }

    /// Parses `name op value]` after the opening bracket.
    fn parse_attr(&mut self, source: &str) -> Result<AttrTest, ActionError> {
        self.skip_ws();
        let name = self.ident();
        if name.is_empty() {
            return Err(ActionError::invalid_locator(source, "empty attribute name"));
        }
        self.skip_ws();
        if self.eat(']') {
            return Ok(AttrTest {
                name,
                op: AttrOp::Exists,
                value: String::new(),
            });
        }
        let op = if self.eat('=') {
            AttrOp::Equals
        } else {
            let op = match self.peek() {
                Some('*') => AttrOp::Contains,
                Some('^') => AttrOp::Prefix,
                Some('$') => AttrOp::Suffix,
                _ => {
                    return Err(ActionError::invalid_locator(
                        source,
                        "unsupported attribute operator",
                    ))
                }
            };
            self.pos += 1;
            if !self.eat('=') {
                return Err(ActionError::invalid_locator(source, "expected '='"));
            }
            op
        };
        self.skip_ws();
        let value = if matches!(self.peek(), Some('"') | Some('\'')) {
            self.quoted(source)?
        } else {
            let start = self.pos;
            while let Some(ch) = self.peek() {
                if ch == ']' || ch.is_whitespace() {
                    break;
                }
                self.pos += ch.len_utf8();
            }
            self.input[start..self.pos].to_string()
        };
        self.skip_ws();
        // case-insensitivity flags are accepted and ignored
        if matches!(self.peek(), Some('i') | Some('s')) {
            self.pos += 1;
            self.skip_ws();
        }
        if !self.eat(']') {
            return Err(ActionError::invalid_locator(source, "expected ']'"));
        }
        Ok(AttrTest { name, op, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Node {
        tag: &'static str,
        text: &'static str,
        attrs: HashMap<&'static str, &'static str>,
        visible: bool,
    }

    impl Node {
        fn new(
            tag: &'static str,
            text: &'static str,
            attrs: &[(&'static str, &'static str)],
        ) -> Self {
            Self {
                tag,
                text,
                attrs: attrs.iter().copied().collect(),
                visible: true,
            }
        }
    }

    impl SelectorTarget for Node {
        fn tag(&self) -> &str {
            self.tag
        }
        fn attribute(&self, name: &str) -> Option<&str> {
            self.attrs.get(name).copied()
        }
        fn text(&self) -> &str {
            self.text
        }
        fn is_visible(&self) -> bool {
            self.visible
        }
    }

    fn matches(selector: &str, node: &Node) -> bool {
        Selector::parse(selector).unwrap().matches_path(&[node])
    }

    #[test]
    fn matches_id_class_and_attributes() {
        let node = Node::new(
            "button",
            "Submit order",
            &[("id", "submit-btn"), ("class", "btn primary"), ("data-test-id", "submit-btn")],
        );
        assert!(matches("#submit-btn", &node));
        assert!(matches("button.btn.primary", &node));
        assert!(matches(r#"[data-test-id="submit-btn"]"#, &node));
        assert!(matches(r#"[class*="prim"]"#, &node));
        assert!(!matches(r#"[data-testid="submit-btn"]"#, &node));
        assert!(!matches("a#submit-btn", &node));
    }

    #[test]
    fn has_text_and_text_engines() {
        let node = Node::new("button", "  Create   Account ", &[]);
        assert!(matches(r#"button:has-text("create account")"#, &node));
        assert!(matches(r#"text="Create Account""#, &node));
        assert!(!matches(r#"text="create account""#, &node));
        assert!(matches("text=create acc", &node));
    }

    #[test]
    fn role_engine_uses_implicit_roles() {
        let button = Node::new("button", "Continue", &[]);
        let link = Node::new("a", "Docs", &[("href", "/docs")]);
        assert!(matches(r#"role=button[name="continue"]"#, &button));
        assert!(matches("role=link", &link));
        assert!(!matches("role=button", &link));
    }

    #[test]
    fn negation_and_lists() {
        let hidden = Node::new("input", "", &[("type", "hidden")]);
        let email = Node::new("input", "", &[("type", "email")]);
        let selector = r#"input:not([type="hidden"]):not([type="submit"]), textarea"#;
        assert!(!matches(selector, &hidden));
        assert!(matches(selector, &email));
        assert!(matches(selector, &Node::new("textarea", "", &[])));
    }

    #[test]
    fn chain_matches_within_ancestors_or_self() {
        let dialog = Node::new("div", "Sign in", &[("role", "dialog")]);
        let button = Node::new("button", "Sign in", &[]);
        let selector = Selector::parse(r#"[role="dialog"] >> text="Sign in""#).unwrap();
        assert!(selector.matches_path(&[&dialog, &button]));

        let self_chain = Selector::parse(r#"button >> text="Sign in""#).unwrap();
        assert!(self_chain.matches_path(&[&button]));

        let descendant = Selector::parse(r#"[role="dialog"] button"#).unwrap();
        assert!(descendant.matches_path(&[&dialog, &button]));
        assert!(!descendant.matches_path(&[&button]));
    }

    #[test]
    fn rejects_malformed_locators() {
        assert!(Selector::parse("").is_err());
        assert!(Selector::parse("[data-testid=").is_err());
        assert!(Selector::parse("button:hover").is_err());
        assert!(Selector::parse(r#"div:has-text("open"#).is_err());
    }
}
