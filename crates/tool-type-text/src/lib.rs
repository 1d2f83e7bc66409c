pub mod api;
pub mod errors;
pub mod model;
pub mod policy;

mod redact;
mod runner;

pub use api::{TextFiller, TypeTextTool};
pub use errors::TypeError;
pub use model::TypeReport;
pub use policy::TypePolicyView;
