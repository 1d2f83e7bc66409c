//! Field mapping, abbreviation tables, toggles, entity lists and timings for the
//! formfill engine, loaded once and validated up front.

pub mod errors;
pub mod loader;
pub mod model;
pub mod timings;

pub use errors::ConfigError;
pub use loader::{
    default_fields, default_fields_source, load_fields_from_path, load_fields_from_reader,
    parse_fields_str,
};
pub use model::{
    split_key, DropdownField, DropdownSets, EntityConfig, EntityField, EntityFieldKind,
    EntityFilter, FieldConfig, PatternConfig, PatternWarning, TextField, ToggleField, ToggleSet,
    CURRENT_VERSION, ENTRY_INDEX,
};
pub use timings::Timings;
