//! Value matching for form filling
//!
//! - Bigram (Dice) similarity between free-text strings
//! - Best-match selection with a containment floor
//! - Abbreviation normalization with field-aware context groups

pub mod normalize;
pub mod similarity;

pub use normalize::{AbbreviationTable, ContextGroup, TableError};
pub use similarity::{best_match, score, Match, CONTAINMENT_FLOOR, DEFAULT_CUTOFF};
