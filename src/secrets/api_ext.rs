use crate::{api::Api, error::Error, secrets::Secret};
use tracing::info;

/// Covault secrets controller, a thin layer over the storage engine for an
/// already authenticated user identity.
pub struct SecretsApiExt<'a> {
    api: &'a Api,
}

impl<'a> SecretsApiExt<'a> {
    /// Instantiates secrets API extension.
    pub fn new(api: &'a Api) -> Self {
        Self { api }
    }

    /// Merges a pushed batch of secrets into the account (last-write-wins).
    pub async fn save_secrets(&self, login: &str, secrets: Vec<Secret>) -> Result<(), Error> {
        info!(login, count = secrets.len(), "Sync push.");
        self.api.storage.save_secrets(login, secrets).await
    }

    /// Stores a single secret, subject to the same last-write-wins merge as
    /// a batch push.
    pub async fn add_secret(&self, login: &str, secret: Secret) -> Result<(), Error> {
        info!(login, id = %secret.id, "Add secret.");
        self.api.storage.add_secret(login, secret).await
    }

    /// Returns all secrets owned by the login.
    pub async fn get_secrets(&self, login: &str) -> Result<Vec<Secret>, Error> {
        self.api.storage.get_secrets(login).await
    }

    /// Deletes a secret by id. Deletion is permanent and immediate.
    pub async fn delete_secret(&self, login: &str, id: &str) -> Result<(), Error> {
        info!(login, id, "Delete secret.");
        self.api.storage.delete_secret(login, id).await
    }
}
