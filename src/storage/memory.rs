use crate::{
    error::Error,
    secrets::Secret,
    storage::{Storage, StorageSession, TransactionCallback},
    users::User,
};
use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};
use time::OffsetDateTime;
use tokio::sync::RwLock;

/// In-memory storage backend, a reference implementation for tests and
/// ephemeral deployments. The whole state sits behind a single coarse lock:
/// writes take it exclusively, reads take it shared. `run_in_transaction`
/// holds the exclusive lock for its entire body and hands the callback a
/// session operating on the already-locked state, so nested operations never
/// re-enter locking. A running transaction callback is not preempted by
/// cancellation.
#[derive(Default)]
pub struct MemoryStorage {
    state: RwLock<MemoryState>,
    closed: AtomicBool,
}

#[derive(Default, Clone)]
struct MemoryState {
    users: HashMap<String, String>,
    user_secrets: HashMap<String, Vec<Secret>>,
}

impl MemoryState {
    fn create_user(&mut self, user: &User) -> Result<(), Error> {
        if self.users.contains_key(&user.login) {
            return Err(Error::user_exists(&user.login));
        }

        self.users
            .insert(user.login.clone(), user.password_hash.clone());
        Ok(())
    }

    /// Applies the last-write-wins merge: every incoming record is stamped
    /// with `now`, existing records are only overwritten when the new stamp is
    /// strictly greater than the stored one, and `created_at` of an existing
    /// record is preserved unconditionally.
    fn merge_secrets(&mut self, login: &str, incoming: Vec<Secret>, now: OffsetDateTime) {
        let existing = self.user_secrets.entry(login.to_string()).or_default();
        let mut index = existing
            .iter()
            .enumerate()
            .map(|(position, secret)| (secret.id.clone(), position))
            .collect::<HashMap<_, _>>();

        for mut secret in incoming {
            secret.user_login = login.to_string();
            secret.updated_at = now;

            match index.get(&secret.id) {
                Some(&position) => {
                    // Ties and backward stamps favor the existing record. This
                    // is the last-write-wins policy, not an error, so the
                    // dropped update is silently ignored.
                    if existing[position].updated_at < now {
                        secret.created_at = existing[position].created_at;
                        existing[position] = secret;
                    }
                }
                None => {
                    secret.created_at = now;
                    index.insert(secret.id.clone(), existing.len());
                    existing.push(secret);
                }
            }
        }
    }

    fn get_secrets(&self, login: &str) -> Vec<Secret> {
        self.user_secrets.get(login).cloned().unwrap_or_default()
    }

    fn delete_secret(&mut self, login: &str, id: &str) -> Result<(), Error> {
        let Some(secrets) = self.user_secrets.get_mut(login) else {
            return Err(Error::secret_not_found(id));
        };

        let original_len = secrets.len();
        secrets.retain(|secret| secret.id != id);
        if secrets.len() == original_len {
            return Err(Error::secret_not_found(id));
        }

        Ok(())
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> Result<(), Error> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::closed_storage());
        }

        Ok(())
    }

    /// Rewinds or advances the stored `updated_at` of a secret, to exercise
    /// merge branches that real server stamping cannot reach.
    #[cfg(test)]
    pub(crate) async fn set_secret_updated_at(
        &self,
        login: &str,
        id: &str,
        updated_at: OffsetDateTime,
    ) {
        let mut state = self.state.write().await;
        if let Some(secrets) = state.user_secrets.get_mut(login) {
            for secret in secrets.iter_mut().filter(|secret| secret.id == id) {
                secret.updated_at = updated_at;
            }
        }
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn create_user(&self, user: &User) -> Result<(), Error> {
        self.ensure_open()?;
        self.state.write().await.create_user(user)
    }

    async fn get_user(&self, login: &str) -> Result<String, Error> {
        self.ensure_open()?;
        self.state
            .read()
            .await
            .users
            .get(login)
            .cloned()
            .ok_or_else(Error::invalid_credentials)
    }

    async fn save_secrets(&self, login: &str, secrets: Vec<Secret>) -> Result<(), Error> {
        self.ensure_open()?;
        if secrets.is_empty() {
            return Ok(());
        }

        let now = OffsetDateTime::now_utc();
        self.state.write().await.merge_secrets(login, secrets, now);
        Ok(())
    }

    async fn get_secrets(&self, login: &str) -> Result<Vec<Secret>, Error> {
        self.ensure_open()?;
        Ok(self.state.read().await.get_secrets(login))
    }

    async fn delete_secret(&self, login: &str, id: &str) -> Result<(), Error> {
        self.ensure_open()?;
        self.state.write().await.delete_secret(login, id)
    }

    async fn run_in_transaction(&self, callback: TransactionCallback) -> Result<(), Error> {
        self.ensure_open()?;

        let mut state = self.state.write().await;
        let snapshot = state.clone();

        let mut session = MemorySession { state: &mut *state };
        if let Err(err) = callback(&mut session).await {
            *state = snapshot;
            return Err(err);
        }

        Ok(())
    }

    async fn close(&self) -> Result<(), Error> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Session bound to the exclusively locked state, used by transaction
/// callbacks. Operations here must not touch the backend lock.
#[allow(dead_code)] // constructed by tests only
struct MemorySession<'a> {
    state: &'a mut MemoryState,
}

#[async_trait]
impl StorageSession for MemorySession<'_> {
    async fn create_user(&mut self, user: &User) -> Result<(), Error> {
        self.state.create_user(user)
    }

    async fn save_secrets(&mut self, login: &str, secrets: Vec<Secret>) -> Result<(), Error> {
        if secrets.is_empty() {
            return Ok(());
        }

        let now = OffsetDateTime::now_utc();
        self.state.merge_secrets(login, secrets, now);
        Ok(())
    }

    async fn get_secrets(&mut self, login: &str) -> Result<Vec<Secret>, Error> {
        Ok(self.state.get_secrets(login))
    }

    async fn delete_secret(&mut self, login: &str, id: &str) -> Result<(), Error> {
        self.state.delete_secret(login, id)
    }
}
