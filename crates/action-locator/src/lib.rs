//! Field-to-control resolution.
//!
//! This crate finds the live control for a logical field with:
//! - configured structural patterns (primary strategy)
//! - label proximity fallback
//! - ownership-link fallback for custom dropdown triggers
//!
//! It also finds add-entry controls and Yes/No switches.
//!
//! Page access goes through the [`Locatable`] and [`ControlHandle`]
//! capabilities; [`memory::MemoryPage`] implements them in memory.

pub mod errors;
pub mod memory;
pub mod pattern;
pub mod ports;
pub mod resolver;
pub mod strategies;
pub mod toggle;
pub mod types;

pub use errors::*;
pub use memory::{MemoryPage, NodeSpec, PageSnapshot, PanelSpec, HEADING_PATTERN};
pub use pattern::LocatorPattern;
pub use ports::*;
pub use resolver::*;
pub use strategies::*;
pub use toggle::{ToggleControl, ToggleStyle};
pub use types::*;
