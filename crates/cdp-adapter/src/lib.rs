//! Chrome DevTools Protocol backend.
//!
//! [`CdpPage`] attaches to the first page tab of a running Chromium and
//! implements the locator's [`Locatable`](action_locator::Locatable) and
//! [`ControlHandle`](action_locator::ControlHandle) capabilities on it.

pub mod config;
pub mod error;
pub mod page;
pub mod transport;
pub mod util;

pub use config::CdpConfig;
pub use error::CdpError;
pub use page::{CdpControl, CdpPage};
pub use transport::{CdpTransport, ChromiumTransport, CommandTarget};
pub use util::{resolve_ws_url, ws_url_from_version};
