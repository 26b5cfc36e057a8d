use crate::{config::Config, secrets::SecretsApiExt, security::SecurityApiExt, storage::Storage};
use std::sync::Arc;

/// APIs collection shared by all request handlers. Storage is picked at
/// startup (durable or in-memory) and hidden behind the capability trait.
#[derive(Clone)]
pub struct Api {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
}

impl Api {
    /// Instantiates APIs collection with the specified config and storage.
    pub fn new(config: Config, storage: Arc<dyn Storage>) -> Self {
        Self { config, storage }
    }

    /// Returns an API to register and authenticate users.
    pub fn security(&self) -> SecurityApiExt<'_> {
        SecurityApiExt::new(self)
    }

    /// Returns an API to work with secrets.
    pub fn secrets(&self) -> SecretsApiExt<'_> {
        SecretsApiExt::new(self)
    }
}
