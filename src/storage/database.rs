mod raw_secret;

use self::raw_secret::{RawSecret, timestamp_to_micros};
use crate::{
    config::DatabaseConfig,
    error::{Error, ErrorKind},
    secrets::Secret,
    storage::{QueryTracer, Storage, StorageSession, TransactionCallback},
    users::User,
};
use anyhow::{Context, anyhow};
use async_trait::async_trait;
use sqlx::{
    SqliteConnection,
    error::ErrorKind as DbErrorKind,
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions},
};
use std::{path::Path, time::Duration};
use time::OffsetDateTime;
use tracing::info;

const USER_CREATE: &str = "INSERT INTO users (login, password_hash) VALUES ($1, $2)";
const USER_GET: &str = "SELECT password_hash FROM users WHERE login = $1";

// The relational engine enforces the last-write-wins comparison atomically
// per row: the update only fires when the stored stamp is strictly older than
// the incoming one, so concurrent writers cannot produce a lost update.
const SECRET_UPSERT: &str = r#"
INSERT INTO secrets (id, user_login, type, data, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $6)
ON CONFLICT (id, user_login) DO UPDATE
SET type = excluded.type,
    data = excluded.data,
    updated_at = excluded.updated_at
WHERE secrets.updated_at < excluded.updated_at
"#;

const SECRET_GET: &str =
    "SELECT id, user_login, type, data, created_at, updated_at FROM secrets WHERE user_login = $1";
const SECRET_DELETE: &str = "DELETE FROM secrets WHERE id = $1 AND user_login = $2";

/// Durable storage backend on top of a pooled SQLite database. Pool sizing is
/// fixed at construction; operations run either directly against the pool or
/// against the transaction connection carried by a session.
pub struct DatabaseStorage {
    pool: SqlitePool,
    tracer: QueryTracer,
}

impl DatabaseStorage {
    /// Opens the database at the given path, configures the connection pool
    /// and applies pending migrations.
    pub async fn open<P: AsRef<Path>>(
        data_path: P,
        config: &DatabaseConfig,
    ) -> anyhow::Result<Self> {
        info!(
            max_connections = config.max_connections,
            min_connections = config.min_connections,
            "Configuring database pool."
        );

        let options = SqliteConnectOptions::new()
            .filename(data_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(config.acquire_timeout_sec));
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .max_lifetime(Duration::from_secs(config.max_lifetime_sec))
            .acquire_timeout(Duration::from_secs(config.acquire_timeout_sec))
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .with_context(|| "Failed to migrate database")?;

        Ok(Self {
            pool,
            tracer: QueryTracer::new(Duration::from_millis(config.slow_query_threshold_ms)),
        })
    }
}

#[async_trait]
impl Storage for DatabaseStorage {
    async fn create_user(&self, user: &User) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await.map_err(translate_db_error)?;
        create_user_with(&mut conn, &self.tracer, user).await
    }

    async fn get_user(&self, login: &str) -> Result<String, Error> {
        let mut conn = self.pool.acquire().await.map_err(translate_db_error)?;
        self.tracer
            .trace(USER_GET, login, async {
                sqlx::query_scalar::<_, String>(USER_GET)
                    .bind(login)
                    .fetch_optional(&mut *conn)
                    .await
            })
            .await
            .map_err(translate_db_error)?
            .ok_or_else(Error::invalid_credentials)
    }

    async fn save_secrets(&self, login: &str, secrets: Vec<Secret>) -> Result<(), Error> {
        if secrets.is_empty() {
            return Ok(());
        }

        let mut tx = self.pool.begin().await.map_err(translate_db_error)?;
        save_secrets_with(&mut *tx, &self.tracer, login, secrets).await?;
        tx.commit().await.map_err(translate_db_error)
    }

    async fn get_secrets(&self, login: &str) -> Result<Vec<Secret>, Error> {
        let mut conn = self.pool.acquire().await.map_err(translate_db_error)?;
        get_secrets_with(&mut conn, &self.tracer, login).await
    }

    async fn delete_secret(&self, login: &str, id: &str) -> Result<(), Error> {
        let mut conn = self.pool.acquire().await.map_err(translate_db_error)?;
        delete_secret_with(&mut conn, &self.tracer, login, id).await
    }

    async fn run_in_transaction(&self, callback: TransactionCallback) -> Result<(), Error> {
        let mut tx = self.pool.begin().await.map_err(translate_db_error)?;

        // Any error path drops the transaction, which rolls it back.
        let mut session = DatabaseSession {
            conn: &mut *tx,
            tracer: &self.tracer,
        };
        callback(&mut session).await?;

        tx.commit().await.map_err(translate_db_error)
    }

    async fn close(&self) -> Result<(), Error> {
        self.pool.close().await;
        Ok(())
    }
}

/// Session bound to an active transaction connection.
#[allow(dead_code)] // constructed by tests only
struct DatabaseSession<'t> {
    conn: &'t mut SqliteConnection,
    tracer: &'t QueryTracer,
}

#[async_trait]
impl StorageSession for DatabaseSession<'_> {
    async fn create_user(&mut self, user: &User) -> Result<(), Error> {
        create_user_with(self.conn, self.tracer, user).await
    }

    async fn save_secrets(&mut self, login: &str, secrets: Vec<Secret>) -> Result<(), Error> {
        if secrets.is_empty() {
            return Ok(());
        }

        save_secrets_with(self.conn, self.tracer, login, secrets).await
    }

    async fn get_secrets(&mut self, login: &str) -> Result<Vec<Secret>, Error> {
        get_secrets_with(self.conn, self.tracer, login).await
    }

    async fn delete_secret(&mut self, login: &str, id: &str) -> Result<(), Error> {
        delete_secret_with(self.conn, self.tracer, login, id).await
    }
}

async fn create_user_with(
    conn: &mut SqliteConnection,
    tracer: &QueryTracer,
    user: &User,
) -> Result<(), Error> {
    tracer
        .trace(USER_CREATE, &user.login, async {
            sqlx::query(USER_CREATE)
                .bind(&user.login)
                .bind(&user.password_hash)
                .execute(&mut *conn)
                .await
        })
        .await
        .map_err(translate_db_error)?;
    Ok(())
}

async fn save_secrets_with(
    conn: &mut SqliteConnection,
    tracer: &QueryTracer,
    login: &str,
    secrets: Vec<Secret>,
) -> Result<(), Error> {
    // Stamp at the moment of ingestion: client clocks are never trusted for
    // conflict resolution.
    let now = timestamp_to_micros(OffsetDateTime::now_utc());

    for secret in secrets {
        tracer
            .trace(SECRET_UPSERT, login, async {
                sqlx::query(SECRET_UPSERT)
                    .bind(&secret.id)
                    .bind(login)
                    .bind(&secret.secret_type)
                    .bind(&secret.data)
                    .bind(now)
                    .bind(now)
                    .execute(&mut *conn)
                    .await
            })
            .await
            .map_err(translate_db_error)?;
    }

    Ok(())
}

async fn get_secrets_with(
    conn: &mut SqliteConnection,
    tracer: &QueryTracer,
    login: &str,
) -> Result<Vec<Secret>, Error> {
    tracer
        .trace(SECRET_GET, login, async {
            sqlx::query_as::<_, RawSecret>(SECRET_GET)
                .bind(login)
                .fetch_all(&mut *conn)
                .await
        })
        .await
        .map_err(translate_db_error)?
        .into_iter()
        .map(|raw_secret| Secret::try_from(raw_secret).map_err(Error::storage_unavailable))
        .collect()
}

async fn delete_secret_with(
    conn: &mut SqliteConnection,
    tracer: &QueryTracer,
    login: &str,
    id: &str,
) -> Result<(), Error> {
    let result = tracer
        .trace(SECRET_DELETE, id, async {
            sqlx::query(SECRET_DELETE)
                .bind(id)
                .bind(login)
                .execute(&mut *conn)
                .await
        })
        .await
        .map_err(translate_db_error)?;

    if result.rows_affected() == 0 {
        return Err(Error::secret_not_found(id));
    }

    Ok(())
}

/// Translates backend-specific errors into domain error kinds. This is the
/// only place that inspects `sqlx` error representations.
fn translate_db_error(err: sqlx::Error) -> Error {
    if let sqlx::Error::Database(db_err) = &err {
        let code = db_err.code().map(|code| code.into_owned());
        return match database_error_kind(db_err.kind(), code.as_deref()) {
            ErrorKind::SerializationConflict => Error::serialization_conflict(anyhow!(err)),
            ErrorKind::Cancelled => Error::cancelled(),
            kind => Error::with_kind(kind, anyhow!(err)),
        };
    }

    match err {
        sqlx::Error::PoolTimedOut => Error::deadline_exceeded(),
        sqlx::Error::PoolClosed => Error::closed_storage(),
        err => Error::storage_unavailable(anyhow!(err)),
    }
}

/// Classifies a database-level error by its constraint kind and raw SQLite
/// result code.
fn database_error_kind(db_kind: DbErrorKind, code: Option<&str>) -> ErrorKind {
    // SQLITE_BUSY, SQLITE_LOCKED and their extended codes signal a lock
    // conflict the caller may retry; this backend never retries on its own.
    const CONFLICT_CODES: [&str; 4] = ["5", "6", "261", "517"];
    // SQLITE_INTERRUPT: the statement was aborted mid-flight.
    const INTERRUPT_CODE: &str = "9";

    match db_kind {
        DbErrorKind::UniqueViolation => ErrorKind::UserExists,
        DbErrorKind::ForeignKeyViolation => ErrorKind::SecretNotFound,
        _ if code.is_some_and(|code| CONFLICT_CODES.contains(&code)) => {
            ErrorKind::SerializationConflict
        }
        _ if code == Some(INTERRUPT_CODE) => ErrorKind::Cancelled,
        _ => ErrorKind::StorageUnavailable,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        DatabaseStorage, DbErrorKind, database_error_kind, raw_secret::timestamp_to_micros,
    };
    use crate::{
        config::DatabaseConfig,
        error::ErrorKind,
        storage::{
            Storage,
            tests::{mock_secret, mock_user},
        },
    };
    use futures::FutureExt;
    use std::{sync::Arc, time::Duration};
    use time::OffsetDateTime;

    async fn open_storage(dir: &tempfile::TempDir) -> anyhow::Result<DatabaseStorage> {
        DatabaseStorage::open(
            dir.path().join("data.db"),
            &DatabaseConfig {
                path: None,
                max_connections: 5,
                min_connections: 1,
                max_lifetime_sec: 3600,
                acquire_timeout_sec: 5,
                slow_query_threshold_ms: 200,
            },
        )
        .await
    }

    #[tokio::test]
    async fn duplicate_user_creation_fails_without_side_effects() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = open_storage(&dir).await?;
        storage.create_user(&mock_user("alice", "hash-one")).await?;

        let err = storage
            .create_user(&mock_user("alice", "hash-two"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UserExists);
        assert_eq!(storage.get_user("alice").await?, "hash-one");

        Ok(())
    }

    #[tokio::test]
    async fn unknown_user_lookup_fails_with_invalid_credentials() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = open_storage(&dir).await?;

        let err = storage.get_user("nobody").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCredentials);

        Ok(())
    }

    #[tokio::test]
    async fn resync_preserves_created_at_and_takes_latest_data() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = open_storage(&dir).await?;
        storage.create_user(&mock_user("alice", "hash")).await?;

        storage
            .save_secrets("alice", vec![mock_secret("note-1", "first")])
            .await?;
        let first = storage.get_secrets("alice").await?.remove(0);

        tokio::time::sleep(Duration::from_millis(5)).await;
        storage
            .save_secrets("alice", vec![mock_secret("note-1", "second")])
            .await?;

        let secrets = storage.get_secrets("alice").await?;
        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets[0].data, "second");
        assert_eq!(secrets[0].created_at, first.created_at);
        assert!(secrets[0].updated_at > first.updated_at);

        Ok(())
    }

    #[tokio::test]
    async fn stale_update_is_silently_dropped() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = open_storage(&dir).await?;
        storage.create_user(&mock_user("alice", "hash")).await?;
        storage
            .save_secrets("alice", vec![mock_secret("note-1", "current")])
            .await?;

        // Push the stored stamp into the future so the conditional upsert's
        // strictly-greater guard rejects the next write.
        let future = timestamp_to_micros(OffsetDateTime::now_utc() + Duration::from_secs(3600));
        sqlx::query("UPDATE secrets SET updated_at = $1 WHERE id = $2 AND user_login = $3")
            .bind(future)
            .bind("note-1")
            .bind("alice")
            .execute(&storage.pool)
            .await?;

        storage
            .save_secrets("alice", vec![mock_secret("note-1", "stale")])
            .await?;

        let secrets = storage.get_secrets("alice").await?;
        assert_eq!(secrets[0].data, "current");
        assert_eq!(timestamp_to_micros(secrets[0].updated_at), future);

        Ok(())
    }

    #[tokio::test]
    async fn empty_batch_is_a_noop() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = open_storage(&dir).await?;
        storage.create_user(&mock_user("alice", "hash")).await?;
        storage
            .save_secrets("alice", vec![mock_secret("note-1", "payload")])
            .await?;

        storage.save_secrets("alice", vec![]).await?;

        let secrets = storage.get_secrets("alice").await?;
        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets[0].data, "payload");

        Ok(())
    }

    #[tokio::test]
    async fn save_for_unknown_user_violates_foreign_key() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = open_storage(&dir).await?;

        let err = storage
            .save_secrets("ghost", vec![mock_secret("note-1", "payload")])
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SecretNotFound);
        assert!(storage.get_secrets("ghost").await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn delete_of_missing_secret_fails_without_residue() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = open_storage(&dir).await?;
        storage.create_user(&mock_user("alice", "hash")).await?;

        let err = storage.delete_secret("alice", "ghost").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SecretNotFound);

        storage
            .save_secrets("alice", vec![mock_secret("note-1", "payload")])
            .await?;
        storage.delete_secret("alice", "note-1").await?;
        assert!(storage.get_secrets("alice").await?.is_empty());

        Ok(())
    }

    #[tokio::test]
    async fn failing_transaction_rolls_back_all_writes() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = open_storage(&dir).await?;
        storage.create_user(&mock_user("alice", "hash")).await?;
        storage
            .save_secrets("alice", vec![mock_secret("note-1", "stable")])
            .await?;

        let err = storage
            .run_in_transaction(Box::new(|session| {
                async move {
                    session
                        .save_secrets("alice", vec![mock_secret("note-2", "doomed")])
                        .await?;
                    session.create_user(&mock_user("bob", "hash")).await?;
                    // Last write of the batch fails, everything above must be
                    // rolled back.
                    session.delete_secret("alice", "ghost").await
                }
                .boxed()
            }))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SecretNotFound);

        let secrets = storage.get_secrets("alice").await?;
        assert_eq!(secrets.len(), 1);
        assert_eq!(secrets[0].id, "note-1");
        assert_eq!(
            storage.get_user("bob").await.unwrap_err().kind(),
            ErrorKind::InvalidCredentials
        );

        Ok(())
    }

    #[tokio::test]
    async fn successful_transaction_commits_all_writes() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = open_storage(&dir).await?;

        storage
            .run_in_transaction(Box::new(|session| {
                async move {
                    session.create_user(&mock_user("bob", "hash")).await?;
                    session
                        .save_secrets("bob", vec![mock_secret("note-1", "payload")])
                        .await?;

                    // Reads in the same scope observe the uncommitted writes.
                    let secrets = session.get_secrets("bob").await?;
                    assert_eq!(secrets.len(), 1);
                    assert_eq!(secrets[0].data, "payload");
                    Ok(())
                }
                .boxed()
            }))
            .await?;

        assert_eq!(storage.get_user("bob").await?, "hash");
        assert_eq!(storage.get_secrets("bob").await?.len(), 1);

        Ok(())
    }

    #[tokio::test]
    async fn round_trip_populates_user_login() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = open_storage(&dir).await?;
        storage.create_user(&mock_user("alice", "hash")).await?;

        storage
            .save_secrets(
                "alice",
                vec![mock_secret("note-1", "one"), mock_secret("note-2", "two")],
            )
            .await?;

        let mut secrets = storage.get_secrets("alice").await?;
        secrets.sort_by(|left, right| left.id.cmp(&right.id));
        assert_eq!(secrets.len(), 2);
        for secret in &secrets {
            assert_eq!(secret.user_login, "alice");
        }
        assert_eq!(secrets[0].data, "one");
        assert_eq!(secrets[1].data, "two");

        Ok(())
    }

    #[tokio::test]
    async fn concurrent_saves_never_interleave_payloads() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = Arc::new(open_storage(&dir).await?);
        storage.create_user(&mock_user("alice", "hash")).await?;

        let one = tokio::spawn({
            let storage = storage.clone();
            async move {
                storage
                    .save_secrets("alice", vec![mock_secret("note-1", "racer-one")])
                    .await
            }
        });
        let two = tokio::spawn({
            let storage = storage.clone();
            async move {
                storage
                    .save_secrets("alice", vec![mock_secret("note-1", "racer-two")])
                    .await
            }
        });
        one.await??;
        two.await??;

        let secrets = storage.get_secrets("alice").await?;
        assert_eq!(secrets.len(), 1);
        assert!(secrets[0].data == "racer-one" || secrets[0].data == "racer-two");

        Ok(())
    }

    #[test]
    fn classifies_database_error_codes() {
        assert_eq!(
            database_error_kind(DbErrorKind::UniqueViolation, Some("1555")),
            ErrorKind::UserExists
        );
        assert_eq!(
            database_error_kind(DbErrorKind::ForeignKeyViolation, Some("787")),
            ErrorKind::SecretNotFound
        );

        // SQLITE_BUSY, SQLITE_LOCKED and their extended codes.
        for code in ["5", "6", "261", "517"] {
            assert_eq!(
                database_error_kind(DbErrorKind::Other, Some(code)),
                ErrorKind::SerializationConflict
            );
        }

        // SQLITE_INTERRUPT.
        assert_eq!(
            database_error_kind(DbErrorKind::Other, Some("9")),
            ErrorKind::Cancelled
        );

        assert_eq!(
            database_error_kind(DbErrorKind::Other, Some("1")),
            ErrorKind::StorageUnavailable
        );
        assert_eq!(
            database_error_kind(DbErrorKind::Other, None),
            ErrorKind::StorageUnavailable
        );
    }

    #[tokio::test]
    async fn operations_after_close_fail_with_closed_storage() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let storage = open_storage(&dir).await?;
        storage.create_user(&mock_user("alice", "hash")).await?;
        storage.close().await?;

        assert_eq!(
            storage
                .create_user(&mock_user("bob", "hash"))
                .await
                .unwrap_err()
                .kind(),
            ErrorKind::ClosedStorage
        );
        assert_eq!(
            storage.get_secrets("alice").await.unwrap_err().kind(),
            ErrorKind::ClosedStorage
        );

        Ok(())
    }
}
