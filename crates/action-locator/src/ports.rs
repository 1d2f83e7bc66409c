//! Capabilities a page backend provides to the locator and the fill tools.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::errors::LocatorError;
use crate::types::{ControlInfo, ControlKind, DomEvent, NativeOption};

pub type ControlRef = Arc<dyn ControlHandle>;

/// Live reference to one element. Every operation on a detached element
/// returns [`LocatorError::StaleHandle`].
#[async_trait]
pub trait ControlHandle: Send + Sync + fmt::Debug {
    /// Backend-scoped identity, stable for the element's lifetime.
    fn token(&self) -> &str;

    async fn describe(&self) -> Result<ControlInfo, LocatorError>;
    async fn attribute(&self, name: &str) -> Result<Option<String>, LocatorError>;
    /// Trimmed text content.
    async fn text(&self) -> Result<String, LocatorError>;
    /// Displayed, with no hidden ancestor and a rendered layout box.
    async fn is_visible(&self) -> Result<bool, LocatorError>;

    async fn value(&self) -> Result<String, LocatorError>;
    /// Checked state of a check box or radio input; false for anything else.
    async fn is_checked(&self) -> Result<bool, LocatorError>;
    /// Assigns through the element's native value setter.
    async fn set_value(&self, value: &str) -> Result<(), LocatorError>;
    /// Dispatches a bubbling notification on the element.
    async fn dispatch(&self, event: DomEvent) -> Result<(), LocatorError>;
    async fn click(&self) -> Result<(), LocatorError>;
    /// Entries of a native list; empty for anything else.
    async fn options(&self) -> Result<Vec<NativeOption>, LocatorError>;

    async fn closest(&self, pattern: &str) -> Result<Option<ControlRef>, LocatorError>;
    async fn query(&self, pattern: &str) -> Result<Vec<ControlRef>, LocatorError>;
    async fn parent(&self) -> Result<Option<ControlRef>, LocatorError>;
    async fn next_siblings(&self) -> Result<Vec<ControlRef>, LocatorError>;

    async fn kind(&self) -> Result<ControlKind, LocatorError> {
        Ok(self.describe().await?.kind())
    }
}

/// Document-level access for one page.
#[async_trait]
pub trait Locatable: Send + Sync {
    /// All elements matching `pattern`, in document order.
    async fn query_all(&self, pattern: &str) -> Result<Vec<ControlRef>, LocatorError>;
    async fn by_id(&self, id: &str) -> Result<Option<ControlRef>, LocatorError>;
    /// Dispatches a keyboard notification at the document.
    async fn dispatch_key(&self, event: DomEvent) -> Result<(), LocatorError>;
    async fn location(&self) -> Result<String, LocatorError>;
    /// First heading-like text, falling back to the document title.
    async fn heading(&self) -> Result<String, LocatorError>;

    async fn find_first_visible(&self, pattern: &str) -> Result<Option<ControlRef>, LocatorError> {
        for control in self.query_all(pattern).await? {
            if control.is_visible().await.unwrap_or(false) {
                return Ok(Some(control));
            }
        }
        Ok(None)
    }

    /// True when any element matches `pattern` and is visible.
    async fn any_visible(&self, pattern: &str) -> Result<bool, LocatorError> {
        Ok(self.find_first_visible(pattern).await?.is_some())
    }
}
