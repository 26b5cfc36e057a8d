use serde_derive::{Deserialize, Serialize};
use time::OffsetDateTime;

/// User-owned secret record. The payload is opaque to the server: clients are
/// expected to encrypt it before pushing. The id is caller-supplied and only
/// unique within a single account, so the full identity is `(id, user_login)`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Secret {
    pub id: String,
    /// Owning account. Populated by the server on every returned record, any
    /// client-supplied value is overwritten during sync.
    #[serde(default)]
    pub user_login: String,
    /// Opaque classification string ("password", "note", "card", ...).
    #[serde(rename = "type")]
    pub secret_type: String,
    pub data: String,
    /// Set once, on the first successful write, never changed afterwards.
    #[serde(default = "unix_epoch", with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,
    /// Stamped by the server on every successful write. Client-supplied values
    /// are ignored for conflict resolution.
    #[serde(default = "unix_epoch", with = "time::serde::timestamp")]
    pub updated_at: OffsetDateTime,
}

fn unix_epoch() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH
}
