//! Dropdown fill state machine.
//!
//! Native lists are resolved by reading their options and assigning a value.
//! Custom dropdowns are opened, given a typeahead attempt, then re-opened and
//! enumerated; every exit path closes the option panel again.

pub mod api;
pub mod errors;
pub mod matching;
pub mod model;
pub mod policy;
pub mod state;

mod runner;

pub use api::{DropdownFiller, SelectTool, SelectToolBuilder};
pub use errors::SelectError;
pub use model::{ListPath, MatchSource, MatchedOption, SelectReport};
pub use policy::{SelectPolicyView, SelectTimeouts};
pub use state::{DropdownState, Resolution, Trail};
