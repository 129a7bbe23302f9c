use soulscout_core_types::ElementDescriptor;

/// Why an element was excluded by the skip list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkipMatch {
    pub entry: String,
    pub reason: String,
}

const LOGIN_TEXTS: &[&str] = &["log in", "login", "sign in"];
const LOGIN_LABELS: &[&str] = &["login", "log in", "sign in"];
const SIGNUP_TEXTS: &[&str] = &["sign up", "signup", "join now", "register", "create account"];
const SIGNUP_LABELS: &[&str] = &["signup", "sign up", "register"];

/// Caller-supplied exclusion list, consulted before any other reasoning.
#[derive(Clone, Debug, Default)]
pub struct SkipMatcher {
    entries: Vec<String>,
}

impl SkipMatcher {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let entries = entries
            .into_iter()
            .map(Into::into)
            .map(|entry: String| entry.trim().to_string())
            .filter(|entry| !entry.is_empty())
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Literal match on text, aria-label, test-id and locator, then the
    /// login/signup trigger aliases.
    pub fn match_element(&self, element: &ElementDescriptor) -> Option<SkipMatch> {
        if self.entries.is_empty() {
            return None;
        }

        let fields = [
            ("text", element.text.as_str()),
            ("aria-label", element.aria_label()),
            ("test-id", element.test_id()),
            ("locator", element.locator.as_str()),
        ];
        for entry in &self.entries {
            let needle = normalize(entry);
            if needle.is_empty() {
                continue;
            }
            for (field, value) in fields {
                if normalize(value).contains(&needle) {
                    return Some(SkipMatch {
                        entry: entry.clone(),
                        reason: format!("Skip list entry '{}' matches element {}", entry, field),
                    });
                }
            }
        }

        self.trigger_alias(element)
    }

    fn trigger_alias(&self, element: &ElementDescriptor) -> Option<SkipMatch> {
        let text = element.text.trim().to_lowercase();
        let aria = element.aria_label().to_lowercase();
        let test_id = element.test_id().to_lowercase();
        let locator = element.locator.to_lowercase();

        let groups = [
            ("login", LOGIN_TEXTS, LOGIN_LABELS, "login-modal"),
            ("signup", SIGNUP_TEXTS, SIGNUP_LABELS, "signup-modal"),
        ];
        for (token, texts, labels, overlay) in groups {
            let Some(entry) = self.entries.iter().find(|e| e.to_lowercase().contains(token)) else {
                continue;
            };
            let triggered = texts.contains(&text.as_str())
                || labels.iter().any(|label| aria.contains(label))
                || test_id.contains(token)
                || locator.contains(token);
            if triggered {
                return Some(SkipMatch {
                    entry: entry.clone(),
                    reason: format!("Would open skipped overlay: {}", overlay),
                });
            }
        }
        None
    }

    /// Bidirectional substring containment between entries and a detected overlay id.
    pub fn matches_overlay(&self, overlay_id: &str) -> bool {
        if overlay_id.is_empty() {
            return false;
        }
        self.entries.iter().any(|entry| {
            entry == overlay_id || overlay_id.contains(entry.as_str()) || entry.contains(overlay_id)
        })
    }
}

/// Lowercase and strip everything but letters and digits, so "Log In" == "login".
pub(crate) fn normalize(value: &str) -> String {
    value
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use soulscout_core_types::ElementCategory;

    fn button(text: &str) -> ElementDescriptor {
        ElementDescriptor::new(
            format!("button:has-text(\"{text}\")"),
            text,
            ElementCategory::Button,
        )
    }

    #[test]
    fn normalized_text_matches_entry() {
        let matcher = SkipMatcher::new(["login"]);
        let hit = matcher.match_element(&button("Log In")).expect("skip");
        assert_eq!(hit.entry, "login");
    }

    #[test]
    fn trigger_aliases_cover_overlay_ids() {
        let matcher = SkipMatcher::new(["signup-modal"]);
        let hit = matcher.match_element(&button("Join now")).expect("skip");
        assert!(hit.reason.contains("signup-modal"));

        let login = SkipMatcher::new(["login-modal"]);
        assert!(login.match_element(&button("Sign in")).is_some());
        assert!(login.match_element(&button("Search")).is_none());
    }

    #[test]
    fn test_id_and_label_are_checked() {
        let matcher = SkipMatcher::new(["newsletter"]);
        let element = ElementDescriptor::new("[data-testid=\"nl\"]", "", ElementCategory::Button)
            .with_attribute("aria-label", "Open Newsletter");
        assert!(matcher.match_element(&element).is_some());
    }

    #[test]
    fn overlay_matching_is_bidirectional() {
        let matcher = SkipMatcher::new(["login"]);
        assert!(matcher.matches_overlay("login-modal"));
        let matcher = SkipMatcher::new(["signup-modal-v2"]);
        assert!(matcher.matches_overlay("signup-modal"));
        assert!(!matcher.matches_overlay(""));
        assert!(!SkipMatcher::default().matches_overlay("anything"));
    }
}
