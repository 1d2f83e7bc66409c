//! formfill command line and control surface
//!
//! Wires the fill engine crates to a page backend (a JSON page snapshot or a
//! live browser tab over DevTools) and exposes one-shot commands plus a
//! line-delimited JSON request loop.

pub mod backend;
pub mod cli;
pub mod config;
pub mod control;
pub mod engine;

pub use backend::Backend;
pub use config::Config;
pub use control::{ControlSurface, Request, RequestError, Response};
pub use engine::build_engine;
