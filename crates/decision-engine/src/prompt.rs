use soulscout_core_types::{ElementDescriptor, PatternKind};

const MAX_TEXT_CHARS: usize = 100;
const MAX_LOCATOR_CHARS: usize = 200;
const MAX_ATTRIBUTE_CHARS: usize = 600;

/// Bounded, structured input for one oracle call.
#[derive(Debug, Clone)]
pub struct OraclePrompt {
    pub element: ElementDescriptor,
    pub current_overlay: Option<String>,
    pub explored_count: usize,
    pub depth: usize,
    pub known_patterns: Vec<PatternKind>,
}

impl OraclePrompt {
    pub fn is_form_context(&self) -> bool {
        self.current_overlay.as_deref().is_some_and(|overlay| {
            overlay.contains("signup") || overlay.contains("login") || overlay.contains("form")
        })
    }

    pub fn render(&self) -> String {
        let flow = if self.is_form_context() {
            "FORM/SIGNUP"
        } else {
            "web"
        };
        let attributes = serde_json::to_string(&self.element.attributes)
            .unwrap_or_else(|_| "{}".to_string());
        let context = match &self.current_overlay {
            Some(overlay) => format!("Inside overlay: {}", overlay),
            None => "Page root".to_string(),
        };
        let patterns = if self.known_patterns.is_empty() {
            "none".to_string()
        } else {
            self.known_patterns
                .iter()
                .map(PatternKind::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        };

        format!(
            r#"You are an expert at web UI exploration testing a {flow} flow.

Element Details:
- Type: {category}
- Text: "{text}"
- Selector: {locator}
- Attributes: {attributes}
- Context: {context}

Current Situation:
- Elements explored: {explored}
- Exploration depth: {depth}
- Known patterns: {patterns}

PRIORITIES (in order):
1. INPUT FIELDS (text, email, password) are primary for forms, use "fill"
2. SUBMIT/CONTINUE buttons progress the flow, use "click"
3. SKIP auxiliary widgets: date picker days, calendar arrows, dropdown options
4. Do not close overlays prematurely

Respond with ONLY valid JSON (no markdown):
{{
  "shouldInteract": true|false,
  "interactionType": "click"|"fill"|"skip"|"explore_deeper",
  "reasoning": "Brief explanation (1 sentence)",
  "confidence": 0.0-1.0,
  "elementClassification": "close_button"|"action_button"|"input"|"navigation"|"unknown"
}}"#,
            category = self.element.category,
            text = clip(&self.element.text, MAX_TEXT_CHARS),
            locator = clip(&self.element.locator, MAX_LOCATOR_CHARS),
            attributes = clip(&attributes, MAX_ATTRIBUTE_CHARS),
            explored = self.explored_count,
            depth = self.depth,
        )
    }
}

fn clip(value: &str, max_chars: usize) -> String {
    if value.chars().count() <= max_chars {
        return value.to_string();
    }
    let mut clipped: String = value.chars().take(max_chars).collect();
    clipped.push('…');
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use soulscout_core_types::ElementCategory;

    fn prompt(overlay: Option<&str>) -> OraclePrompt {
        OraclePrompt {
            element: ElementDescriptor::new("#go", "x".repeat(400), ElementCategory::Button)
                .with_attribute("data-blob", "y".repeat(2000)),
            current_overlay: overlay.map(str::to_string),
            explored_count: 3,
            depth: 1,
            known_patterns: vec![PatternKind::CloseButton],
        }
    }

    #[test]
    fn render_is_bounded() {
        let rendered = prompt(None).render();
        assert!(rendered.len() < 2_500);
        assert!(rendered.contains("Page root"));
        assert!(rendered.contains("Known patterns: close_button"));
        assert!(rendered.contains("testing a web flow"));
    }

    #[test]
    fn long_locators_are_clipped() {
        let mut long = prompt(None);
        long.element.locator = format!("[data-testid=\"{}\"]", "z".repeat(5_000));
        let rendered = long.render();
        assert!(rendered.len() < 2_700);
        assert!(rendered.contains("- Selector: [data-testid=\"zzz"));
        assert!(!rendered.contains(&"z".repeat(MAX_LOCATOR_CHARS)));
    }

    #[test]
    fn form_overlays_change_flow_label() {
        let rendered = prompt(Some("signup-modal")).render();
        assert!(rendered.contains("Inside overlay: signup-modal"));
        assert!(rendered.contains("FORM/SIGNUP"));
    }
}
