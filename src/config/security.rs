//! Security configuration types.

use super::defaults::{default_cors_origins, default_max_message_size, default_require_admin_auth};
use serde::{Deserialize, Serialize};

/// Security configuration.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SecurityConfig {
    /// Allowed CORS origins (comma-separated, or "*" for any)
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
    /// Require a bearer token for the admin and metrics endpoints
    #[serde(default = "default_require_admin_auth")]
    pub require_admin_auth: bool,
    /// Bearer token for the admin and metrics endpoints (if required)
    #[serde(default)]
    pub admin_auth_token: Option<String>,
    /// Maximum WebSocket message size in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            cors_origins: default_cors_origins(),
            require_admin_auth: default_require_admin_auth(),
            admin_auth_token: None,
            max_message_size: default_max_message_size(),
        }
    }
}

impl SecurityConfig {
    /// Copy with the admin token masked, for printing.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            admin_auth_token: self
                .admin_auth_token
                .as_ref()
                .map(|_| "<redacted>".to_string()),
            ..self.clone()
        }
    }
}
