use async_trait::async_trait;

use crate::errors::ActionError;
use crate::types::{ElementHandle, ElementSnapshot, ExecCtx};

/// Capability set the explorer and the healer need from a browser.
///
/// Implementations wrap a real driver or the in-memory [`crate::FixturePage`].
/// Every locator passed in uses the grammar of [`crate::Selector`].
#[async_trait]
pub trait BrowserSurface: Send + Sync {
    async fn goto(&self, url: &str) -> Result<(), ActionError>;

    async fn current_url(&self) -> Result<String, ActionError>;

    async fn is_closed(&self) -> bool;

    /// All elements matching `locator`, hidden ones included, in document
    /// order. With a scope only strict descendants of the scope are returned.
    async fn query(
        &self,
        scope: Option<&ElementHandle>,
        locator: &str,
    ) -> Result<Vec<ElementHandle>, ActionError>;

    async fn inspect(&self, element: &ElementHandle) -> Result<ElementSnapshot, ActionError>;

    async fn click(&self, ctx: &ExecCtx, element: &ElementHandle) -> Result<(), ActionError>;

    async fn fill(
        &self,
        ctx: &ExecCtx,
        element: &ElementHandle,
        value: &str,
    ) -> Result<(), ActionError>;

    async fn press_key(&self, ctx: &ExecCtx, key: &str) -> Result<(), ActionError>;

    /// Number of elements in the whole document matching `locator`.
    async fn count(&self, locator: &str) -> Result<usize, ActionError> {
        Ok(self.query(None, locator).await?.len())
    }

    /// First visible match of `locator`, with its snapshot.
    async fn first_visible(
        &self,
        scope: Option<&ElementHandle>,
        locator: &str,
    ) -> Result<Option<(ElementHandle, ElementSnapshot)>, ActionError> {
        for handle in self.query(scope, locator).await? {
            let snapshot = self.inspect(&handle).await?;
            if snapshot.visible {
                return Ok(Some((handle, snapshot)));
            }
        }
        Ok(None)
    }
}
