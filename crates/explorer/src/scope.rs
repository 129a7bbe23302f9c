//! Interactive scope resolution and overlay detection

use action_primitives::{ActionError, BrowserSurface, ElementHandle, ElementSnapshot};
use tracing::debug;
use url::Url;

/// Overlay selectors tried in order when picking the scope to explore.
const SCOPE_SELECTORS: &[&str] = &[
    r#"[role="dialog"][aria-modal="true"]"#,
    r#"[role="dialog"]"#,
    r#"[aria-modal="true"]"#,
    r#"[data-testid*="modal"], [data-testid*="dialog"], [data-testid*="overlay"]"#,
    r#"[role="menu"]"#,
    r#"[role="listbox"]"#,
    r#"[role="tooltip"]"#,
    r#"[data-state="open"]"#,
    r#"[data-open="true"]"#,
];

const MODAL_SELECTORS: &[&str] = &[
    r#"[role="dialog"]"#,
    r#"[data-testid*="modal"]"#,
    r#"[aria-modal="true"]"#,
];

const DROPDOWN_SELECTORS: &[&str] = &[
    r#"[role="menu"]"#,
    r#"[role="listbox"]"#,
    r#"[data-state="open"]"#,
];

/// Where discovery runs.
#[derive(Debug, Clone, PartialEq)]
pub enum Scope {
    Root,
    Overlay {
        handle: ElementHandle,
        locator: String,
    },
}

impl Scope {
    pub fn handle(&self) -> Option<&ElementHandle> {
        match self {
            Scope::Root => None,
            Scope::Overlay { handle, .. } => Some(handle),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Scope::Root => "body",
            Scope::Overlay { locator, .. } => locator,
        }
    }
}

/// An overlay seen on the page, with the id the modal stack tracks it by.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectedOverlay {
    pub id: String,
    pub handle: ElementHandle,
}

/// The scope to explore next, or `None` when the page is unusable.
///
/// A blank, closed or off-origin page yields `None`. That ends the current
/// branch only.
pub async fn resolve_scope(surface: &dyn BrowserSurface, origin: Option<&str>) -> Option<Scope> {
    if surface.is_closed().await {
        return None;
    }
    let url = match surface.current_url().await {
        Ok(url) => url,
        Err(err) => {
            debug!(error = %err, "current url unavailable");
            return None;
        }
    };
    if url == "about:blank" {
        debug!("page is about:blank");
        return None;
    }
    if let Some(origin) = origin {
        if !same_origin(&url, origin) {
            debug!(url, origin, "page left the explored origin");
            return None;
        }
    }

    for selector in SCOPE_SELECTORS {
        match last_visible(surface, selector).await {
            Ok(Some((handle, _))) => {
                debug!(scope = selector, element = %handle, "overlay scope");
                return Some(Scope::Overlay {
                    handle,
                    locator: selector.to_string(),
                });
            }
            Ok(None) => {}
            Err(err) if err.is_surface_lost() => return None,
            Err(err) => debug!(error = %err, selector, "scope lookup failed"),
        }
    }
    Some(Scope::Root)
}

/// Every visible overlay in detection order, duplicates removed.
pub async fn visible_overlays(
    surface: &dyn BrowserSurface,
) -> Result<Vec<DetectedOverlay>, ActionError> {
    let mut found: Vec<DetectedOverlay> = Vec::new();
    let groups = [(MODAL_SELECTORS, false), (DROPDOWN_SELECTORS, true)];
    for (selectors, dropdown) in groups {
        for selector in selectors {
            for handle in surface.query(None, selector).await? {
                if found.iter().any(|overlay| overlay.handle == handle) {
                    continue;
                }
                let snapshot = surface.inspect(&handle).await?;
                if !snapshot.visible {
                    continue;
                }
                found.push(DetectedOverlay {
                    id: overlay_id(&snapshot, selector, dropdown),
                    handle,
                });
            }
        }
    }
    Ok(found)
}

fn overlay_id(snapshot: &ElementSnapshot, selector: &str, dropdown: bool) -> String {
    if let Some(test_id) = snapshot.attr("data-testid").filter(|v| !v.is_empty()) {
        return test_id.to_string();
    }
    if dropdown {
        if let Some(id) = snapshot.attr("id").filter(|v| !v.is_empty()) {
            return id.to_string();
        }
        return format!("dropdown:{}", selector);
    }
    selector.to_string()
}

/// The innermost match: the last visible one in document order.
async fn last_visible(
    surface: &dyn BrowserSurface,
    selector: &str,
) -> Result<Option<(ElementHandle, ElementSnapshot)>, ActionError> {
    let mut last = None;
    for handle in surface.query(None, selector).await? {
        let snapshot = surface.inspect(&handle).await?;
        if snapshot.visible {
            last = Some((handle, snapshot));
        }
    }
    Ok(last)
}

/// Whether `handle` still resolves to a visible element.
pub async fn is_still_visible(surface: &dyn BrowserSurface, handle: &ElementHandle) -> bool {
    surface
        .inspect(handle)
        .await
        .map(|snapshot| snapshot.visible)
        .unwrap_or(false)
}

pub fn origin_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .map(|parsed| parsed.origin().ascii_serialization())
        .filter(|origin| origin != "null")
}

fn same_origin(url: &str, origin: &str) -> bool {
    match origin_of(url) {
        Some(current) => current == origin,
        None => false,
    }
}
