//! Candidate discovery inside an interactive scope
//!
//! Inputs come first, then buttons, then links, so form fields are handled
//! before the buttons that submit them. Calendar and country-list noise is
//! dropped before any decision is spent on it.

use action_primitives::{ActionError, BrowserSurface, ElementHandle, ElementSnapshot};
use once_cell::sync::Lazy;
use regex::Regex;
use soulscout_core_types::{ElementCategory, ElementDescriptor};
use std::collections::HashSet;
use tracing::debug;

use crate::scope::Scope;

const INPUT_LOCATOR: &str = r#"input:not([type="hidden"]):not([type="submit"]), textarea"#;
const BUTTON_LOCATOR: &str = r#"button, [role="button"], input[type="submit"]"#;
const LINK_LOCATOR: &str = "a[href]";

const MONTHS: &[&str] = &[
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december", "jan", "feb", "mar", "apr", "jun", "jul", "aug", "sep",
    "oct", "nov", "dec",
];

const COUNTRIES: &[&str] = &[
    "united arab emirates", "uae", "saudi arabia", "united states", "united kingdom", "canada",
    "australia", "india", "pakistan", "germany", "france", "spain", "italy", "netherlands",
    "belgium", "switzerland", "austria", "sweden", "norway", "denmark", "finland", "poland",
    "portugal", "ireland", "new zealand", "singapore", "malaysia", "indonesia", "philippines",
    "thailand", "vietnam", "japan", "south korea", "china", "brazil", "mexico", "argentina",
    "chile", "colombia", "peru", "egypt", "morocco", "south africa", "nigeria", "kenya", "qatar",
    "kuwait", "bahrain", "oman",
];

static FORMATTED_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\d{1,2}\s+(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)\s+\d{4}$")
        .expect("static regex")
});

static UTILITY_CLASS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(bg-|text-|p-|m-|w-|h-|flex|grid|absolute|relative|fixed|top-|left-|right-|bottom-|z-|rounded|border|shadow|transition|hover:|focus:|active:)",
    )
    .expect("static regex")
});

/// A discovered element together with the live handle it was read from.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub handle: ElementHandle,
    pub element: ElementDescriptor,
}

/// Visible interactive elements inside `scope`, in priority order.
///
/// `in_overlay` widens the calendar-day filter: bare day numbers inside any
/// overlay are treated as date picker cells.
pub async fn discover(
    surface: &dyn BrowserSurface,
    scope: &Scope,
    in_overlay: bool,
) -> Result<Vec<Candidate>, ActionError> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    let groups = [
        (INPUT_LOCATOR, ElementCategory::Input),
        (BUTTON_LOCATOR, ElementCategory::Button),
        (LINK_LOCATOR, ElementCategory::Link),
    ];
    for (locator, category) in groups {
        for handle in surface.query(scope.handle(), locator).await? {
            if !seen.insert(handle.clone()) {
                continue;
            }
            let snapshot = match surface.inspect(&handle).await {
                Ok(snapshot) => snapshot,
                Err(err) if err.is_surface_lost() => return Err(err),
                Err(err) => {
                    debug!(element = %handle, error = %err, "element vanished during discovery");
                    continue;
                }
            };
            if !snapshot.visible {
                continue;
            }
            let element = describe(&snapshot, refine_category(&snapshot, category));
            if category == ElementCategory::Button && is_noise(&element, in_overlay) {
                debug!(locator = %element.locator, "dropping picker noise");
                continue;
            }
            candidates.push(Candidate { handle, element });
        }
    }
    Ok(candidates)
}

fn refine_category(snapshot: &ElementSnapshot, category: ElementCategory) -> ElementCategory {
    if category != ElementCategory::Input {
        return category;
    }
    match snapshot.attr("type") {
        Some("checkbox") | Some("radio") => ElementCategory::Checkbox,
        _ => ElementCategory::Input,
    }
}

/// Build the descriptor the rest of the run sees.
pub fn describe(snapshot: &ElementSnapshot, category: ElementCategory) -> ElementDescriptor {
    ElementDescriptor {
        locator: generate_locator(snapshot),
        text: snapshot.text.trim().to_string(),
        category,
        attributes: snapshot.attributes.clone(),
        visible: snapshot.visible,
        enabled: snapshot.enabled,
        geometry: snapshot.geometry,
    }
}

/// Most stable locator available for the element.
pub fn generate_locator(snapshot: &ElementSnapshot) -> String {
    if let Some(test_id) = non_empty(snapshot.attr("data-testid")) {
        return format!("[data-testid=\"{}\"]", quote(test_id));
    }
    if let Some(id) = non_empty(snapshot.attr("id")) {
        return format!("#{}", id);
    }
    if let Some(name) = non_empty(snapshot.attr("name")) {
        return format!("[name=\"{}\"]", quote(name));
    }
    if let Some(label) = non_empty(snapshot.attr("aria-label")) {
        return format!("[aria-label=\"{}\"]", quote(label));
    }
    if let Some(placeholder) = non_empty(snapshot.attr("placeholder")) {
        return format!("[placeholder=\"{}\"]", quote(placeholder));
    }

    let text = snapshot.text.trim();
    if let Some(role) = non_empty(snapshot.attr("role")) {
        return match clip(text, 30) {
            Some(text) => format!("[role=\"{}\"]:has-text(\"{}\")", role, quote(&text)),
            None => format!("[role=\"{}\"]", role),
        };
    }

    let tag = snapshot.tag.to_ascii_lowercase();
    match tag.as_str() {
        "button" => {
            if let Some(text) = clip(text, 40) {
                return format!("button:has-text(\"{}\")", quote(&text));
            }
        }
        "input" => {
            let kind = snapshot.attr("type").unwrap_or("text");
            return format!("input[type=\"{}\"]", kind);
        }
        "a" => {
            if let Some(text) = clip(text, 30) {
                return format!("a:has-text(\"{}\")", quote(&text));
            }
            if let Some(href) = snapshot.attr("href").filter(|href| *href != "#") {
                return format!("a[href=\"{}\"]", quote(href));
            }
        }
        _ => {}
    }

    if let Some(text) = clip(text, 30) {
        return format!("{}:has-text(\"{}\")", tag, quote(&text));
    }

    let classes: Vec<&str> = snapshot
        .classes()
        .filter(|class| !UTILITY_CLASS.is_match(class))
        .filter(|class| !class.contains(&[':', '.', '[', ']', '/'][..]))
        .take(2)
        .collect();
    if classes.is_empty() {
        tag
    } else {
        format!("{}.{}", tag, classes.join("."))
    }
}

fn is_noise(element: &ElementDescriptor, in_overlay: bool) -> bool {
    let text = element.text.trim().to_lowercase();
    if is_calendar_day(element, &text, in_overlay) {
        return true;
    }
    if MONTHS.contains(&text.as_str()) {
        return true;
    }
    if let Ok(year) = text.parse::<u32>() {
        if (1900..=2100).contains(&year) && text == year.to_string() {
            return true;
        }
    }
    FORMATTED_DATE.is_match(&text) || COUNTRIES.contains(&text.as_str())
}

fn is_calendar_day(element: &ElementDescriptor, text: &str, in_overlay: bool) -> bool {
    let Ok(day) = text.parse::<u32>() else {
        return false;
    };
    if !(1..=31).contains(&day) || text != day.to_string() {
        return false;
    }
    let locator = element.locator.to_lowercase();
    let attrs = serde_json::to_string(&element.attributes)
        .unwrap_or_default()
        .to_lowercase();
    let calendar_context = ["calendar", "date", "day", "picker"]
        .iter()
        .any(|needle| locator.contains(needle))
        || attrs.contains("calendar")
        || attrs.contains("date");
    calendar_context || in_overlay
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn clip(text: &str, max_chars: usize) -> Option<String> {
    let clipped: String = text.chars().take(max_chars).collect();
    let clipped = clipped.trim().to_string();
    (!clipped.is_empty()).then_some(clipped)
}

fn quote(value: &str) -> String {
    value.replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_primitives::{FixtureNode, FixturePage};
    use std::collections::BTreeMap;

    fn snapshot(tag: &str, text: &str, attrs: &[(&str, &str)]) -> ElementSnapshot {
        ElementSnapshot {
            tag: tag.to_string(),
            text: text.to_string(),
            attributes: attrs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>(),
            visible: true,
            enabled: true,
            geometry: None,
        }
    }

    #[test]
    fn locator_priority_prefers_stable_attributes() {
        let both = snapshot("button", "Go", &[("data-testid", "go"), ("id", "go-btn")]);
        assert_eq!(generate_locator(&both), r#"[data-testid="go"]"#);
        assert_eq!(generate_locator(&snapshot("input", "", &[("id", "email")])), "#email");
        assert_eq!(
            generate_locator(&snapshot("input", "", &[("placeholder", "Your \"name\"")])),
            r#"[placeholder="Your \"name\""]"#
        );
        assert_eq!(
            generate_locator(&snapshot("div", "Open menu", &[("role", "button")])),
            r#"[role="button"]:has-text("Open menu")"#
        );
        assert_eq!(
            generate_locator(&snapshot("button", "  Continue  ", &[])),
            r#"button:has-text("Continue")"#
        );
        assert_eq!(
            generate_locator(&snapshot("input", "", &[("type", "email")])),
            r#"input[type="email"]"#
        );
        assert_eq!(
            generate_locator(&snapshot("a", "", &[("href", "/pricing")])),
            r#"a[href="/pricing"]"#
        );
    }

    #[test]
    fn class_fallback_drops_utility_classes() {
        let element = snapshot("span", "", &[("class", "flex p-4 card-toggle hover:bg-x primary")]);
        assert_eq!(generate_locator(&element), "span.card-toggle.primary");
        assert_eq!(generate_locator(&snapshot("span", "", &[("class", "flex p-2")])), "span");
    }

    #[test]
    fn picker_noise_is_recognised() {
        let day = ElementDescriptor::new("button:has-text(\"12\")", "12", ElementCategory::Button);
        assert!(is_noise(&day, true));
        assert!(!is_noise(&day, false));
        let calendar_day = day.clone().with_attribute("class", "calendar-cell");
        assert!(is_noise(&calendar_day, false));

        for text in ["March", "1998", "15 Jan 2000", "United Kingdom"] {
            let element = ElementDescriptor::new("button", text, ElementCategory::Button);
            assert!(is_noise(&element, false), "{text} should be noise");
        }
        let real = ElementDescriptor::new("button", "Continue", ElementCategory::Button);
        assert!(!is_noise(&real, true));
    }

    #[tokio::test]
    async fn discovery_orders_groups_and_skips_hidden_and_noise() {
        let page = FixturePage::new(
            "https://app.test/",
            vec![
                FixtureNode::new("a").key("home").text("Home").attr("href", "/"),
                FixtureNode::new("button").key("go").text("Go"),
                FixtureNode::new("button").key("may").text("May"),
                FixtureNode::new("input").key("hidden-token").attr("type", "hidden"),
                FixtureNode::new("input").key("email").attr("id", "email"),
                FixtureNode::new("input").key("ghost").attr("name", "ghost").hidden(),
                FixtureNode::new("input").key("submit").attr("type", "submit").text("Send"),
            ],
        )
        .unwrap();

        let found = discover(&page, &Scope::Root, false).await.unwrap();
        let keys: Vec<&str> = found.iter().map(|c| c.handle.0.as_str()).collect();
        assert_eq!(keys, vec!["email", "go", "submit", "home"]);
        assert_eq!(found[0].element.category, ElementCategory::Input);
        assert_eq!(found[3].element.category, ElementCategory::Link);
    }
}
