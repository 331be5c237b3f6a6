//! Protocol input limits.

use super::defaults::{default_max_display_name_length, default_max_participant_id_length};
use serde::{Deserialize, Serialize};

/// Limits applied to identifiers and names carried in client messages.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProtocolConfig {
    /// Maximum byte length of a participant id
    #[serde(default = "default_max_participant_id_length")]
    pub max_participant_id_length: usize,
    /// Maximum character length of participant and room display names
    #[serde(default = "default_max_display_name_length")]
    pub max_display_name_length: usize,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            max_participant_id_length: default_max_participant_id_length(),
            max_display_name_length: default_max_display_name_length(),
        }
    }
}
