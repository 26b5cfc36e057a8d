mod api_ext;
mod secret;

pub use self::{api_ext::SecretsApiExt, secret::Secret};

use serde_derive::Deserialize;

/// Batch of secrets pushed by a client during sync.
#[derive(Deserialize, Debug, Clone)]
pub struct SyncRequest {
    pub secrets: Vec<Secret>,
}
