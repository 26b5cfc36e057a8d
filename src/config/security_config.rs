use serde_derive::{Deserialize, Serialize};

/// Security configuration (JWT signing, token lifetime).
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct SecurityConfig {
    /// Secret used to sign and verify access tokens. Must be set before the
    /// server can start.
    pub jwt_secret: String,
    /// Access token lifetime, in seconds.
    pub token_expiry_sec: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: String::new(),
            token_expiry_sec: 86400,
        }
    }
}
