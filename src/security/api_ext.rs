use crate::{
    api::Api,
    error::Error,
    security::{compute_password_hash, issue_token},
    users::User,
};
use std::time::Duration;
use tracing::info;

/// Covault security controller: registration and token issuance. Invoked
/// before storage is touched; the storage engine only ever sees the already
/// established user identity.
pub struct SecurityApiExt<'a> {
    api: &'a Api,
}

impl<'a> SecurityApiExt<'a> {
    /// Instantiates security API extension.
    pub fn new(api: &'a Api) -> Self {
        Self { api }
    }

    /// Registers a user with the specified login and password. Fails with
    /// `UserExists` if the login is already taken.
    pub async fn register(&self, login: &str, password: &str) -> Result<(), Error> {
        info!(login, "Registration attempt.");
        let user = User {
            login: login.to_string(),
            password_hash: compute_password_hash(password),
        };
        self.api.storage.create_user(&user).await
    }

    /// Authenticates a user and mints a bearer token embedding the login and
    /// an expiry. Unknown login and hash mismatch are indistinguishable to
    /// the caller.
    pub async fn signin(&self, login: &str, password: &str) -> Result<String, Error> {
        // Unknown login already surfaces as `InvalidCredentials` from the
        // storage engine; backend failures propagate with their own kind.
        let stored_hash = self.api.storage.get_user(login).await?;
        if stored_hash != compute_password_hash(password) {
            return Err(Error::invalid_credentials());
        }

        let security_config = &self.api.config.security;
        Ok(issue_token(
            &security_config.jwt_secret,
            login,
            Duration::from_secs(security_config.token_expiry_sec),
        )?)
    }
}
