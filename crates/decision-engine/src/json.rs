/// Pull the first JSON object out of free-form model output.
///
/// Accepts a bare object (trailing prose is cut at the matching brace), a
/// fenced code block, or an object embedded in surrounding text.
pub fn extract_json_object(raw: &str) -> Option<String> {
    let trimmed = raw.trim_start();
    if trimmed.starts_with('{') {
        return balanced_object(trimmed).map(trim_symmetric);
    }

    let fence = "```";
    if let Some(start) = raw.find(fence) {
        let after_fence = &raw[start + fence.len()..];
        let after_lang = after_fence.trim_start_matches(|c: char| c.is_alphanumeric() || c == '_');
        if let Some(end) = after_lang.find(fence) {
            let block = &after_lang[..end];
            if let Some(open) = block.find('{') {
                if let Some(object) = balanced_object(&block[open..]) {
                    return Some(trim_symmetric(object));
                }
            }
        }
    }

    let open = raw.find('{')?;
    balanced_object(&raw[open..]).map(trim_symmetric)
}

/// `input` must start with `{`. Braces inside string literals are ignored.
fn balanced_object(input: &str) -> Option<&str> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in input.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&input[..=idx]);
                }
            }
            _ => {}
        }
    }
    None
}

fn trim_symmetric(value: &str) -> String {
    value.trim().trim_matches('`').trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_from_fenced_block() {
        let input = "Here is my verdict:\n```json\n{\"shouldInteract\":false}\n```";
        let extracted = extract_json_object(input).expect("json");
        assert_eq!(extracted, "{\"shouldInteract\":false}");
    }

    #[test]
    fn extracts_from_inline_object() {
        let input = "text { \"foo\": 1 } more";
        let extracted = extract_json_object(input).expect("json");
        assert_eq!(extracted, "{ \"foo\": 1 }");
    }

    #[test]
    fn cuts_trailing_prose_after_bare_object() {
        let input = "{\"reasoning\": \"close } brace\"} trailing prose";
        let extracted = extract_json_object(input).expect("json");
        assert_eq!(extracted, "{\"reasoning\": \"close } brace\"}");
    }

    #[test]
    fn returns_none_when_missing_or_unbalanced() {
        assert!(extract_json_object("no braces").is_none());
        assert!(extract_json_object("{\"open\": true").is_none());
    }
}
