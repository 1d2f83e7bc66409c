use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TypePolicyView {
    pub enabled: bool,
    pub max_text_len: usize,
    /// Refuse controls that are not text entries instead of writing into them.
    pub require_text_entry: bool,
}

impl Default for TypePolicyView {
    fn default() -> Self {
        Self {
            enabled: true,
            max_text_len: 4000,
            require_text_entry: true,
        }
    }
}
