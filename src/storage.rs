mod database;
mod memory;
mod query_tracer;

pub use self::{database::DatabaseStorage, memory::MemoryStorage, query_tracer::QueryTracer};

use crate::{error::Error, secrets::Secret, users::User};
use async_trait::async_trait;
use futures::future::BoxFuture;

/// Callback executed within a single transaction scope. The session it
/// receives runs every operation against the active transaction, so nested
/// calls never need to know whether a transaction is in progress.
#[allow(dead_code)] // used by tests only
pub type TransactionCallback =
    Box<dyn for<'a> FnOnce(&'a mut dyn StorageSession) -> BoxFuture<'a, Result<(), Error>> + Send>;

/// Capability contract that every storage backend must satisfy. Both backends
/// must produce identical externally observable semantics for identical
/// inputs, modulo persistence across restarts.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Registers a new user, fails with `UserExists` if the login is taken.
    async fn create_user(&self, user: &User) -> Result<(), Error>;

    /// Returns the stored password hash for the login, fails with
    /// `InvalidCredentials` if the login is unknown.
    async fn get_user(&self, login: &str) -> Result<String, Error>;

    /// Merges a batch of incoming secrets into the account under the
    /// last-write-wins rule. Every record's `updated_at` is stamped with the
    /// current server time at the moment of processing; an existing record is
    /// only overwritten when the new stamp is strictly greater than the stored
    /// one, and its `created_at` is preserved unconditionally. The whole batch
    /// applies atomically: a mid-batch failure rolls back every write in the
    /// call. An empty batch is a no-op, not an error.
    async fn save_secrets(&self, login: &str, secrets: Vec<Secret>) -> Result<(), Error>;

    /// Saves a single secret, defined as `save_secrets` with a one-element
    /// batch.
    async fn add_secret(&self, login: &str, secret: Secret) -> Result<(), Error> {
        self.save_secrets(login, vec![secret]).await
    }

    /// Returns all secrets owned by the login, with `user_login` populated on
    /// every returned record.
    async fn get_secrets(&self, login: &str) -> Result<Vec<Secret>, Error>;

    /// Deletes a secret by `(login, id)`, fails with `SecretNotFound` if the
    /// target is absent.
    async fn delete_secret(&self, login: &str, id: &str) -> Result<(), Error>;

    /// Runs the callback within a single transaction scope: committed if the
    /// callback succeeds, rolled back in full if it returns an error.
    #[allow(dead_code)] // used by tests only
    async fn run_in_transaction(&self, callback: TransactionCallback) -> Result<(), Error>;

    /// Releases all held resources. Operations invoked afterwards fail with
    /// `ClosedStorage` rather than panicking.
    async fn close(&self) -> Result<(), Error>;
}

/// Storage operations available within an active transaction scope.
#[allow(dead_code)] // used by tests only
#[async_trait]
pub trait StorageSession: Send {
    async fn create_user(&mut self, user: &User) -> Result<(), Error>;
    async fn save_secrets(&mut self, login: &str, secrets: Vec<Secret>) -> Result<(), Error>;
    async fn get_secrets(&mut self, login: &str) -> Result<Vec<Secret>, Error>;
    async fn delete_secret(&mut self, login: &str, id: &str) -> Result<(), Error>;
}
