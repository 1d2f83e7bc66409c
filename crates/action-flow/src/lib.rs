//! Fill orchestration layer
//!
//! One pass over a page switches on the Yes/No toggles the record asks for,
//! fills text fields in configured order, then the dropdowns active for the
//! page context, retries the dropdowns that failed after a delay and finally
//! expands configured sub-entity lists. All state
//! of a pass lives in a [`FillSession`]; the result is a [`FillReport`].

mod entities;
pub mod errors;
pub mod executor;
pub mod inventory;
pub mod prepare;
pub mod session;
mod toggles;
pub mod types;

pub use errors::FlowError;
pub use executor::{select_policy, FillOrchestrator, FillOrchestratorBuilder, FormFiller};
pub use inventory::{ControlInventory, ListInfo, TextEntryInfo};
pub use prepare::prepare_values;
pub use session::{Attempt, FillSession};
pub use toggles::toggle_outcome_name;
pub use types::{FieldOutcome, FillCounts, FillReport, KindCounts, OutcomeStatus, VocabularyHints};
