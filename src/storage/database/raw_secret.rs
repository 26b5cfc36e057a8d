use crate::secrets::Secret;
use anyhow::Context;
use time::OffsetDateTime;

/// Secret row exactly as stored: timestamps are unix microseconds so the
/// conditional upsert compares them as plain integers.
#[derive(sqlx::FromRow)]
pub(super) struct RawSecret {
    pub id: String,
    pub user_login: String,
    #[sqlx(rename = "type")]
    pub secret_type: String,
    pub data: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TryFrom<RawSecret> for Secret {
    type Error = anyhow::Error;

    fn try_from(raw: RawSecret) -> Result<Self, Self::Error> {
        Ok(Secret {
            created_at: timestamp_from_micros(raw.created_at)?,
            updated_at: timestamp_from_micros(raw.updated_at)?,
            id: raw.id,
            user_login: raw.user_login,
            secret_type: raw.secret_type,
            data: raw.data,
        })
    }
}

pub(super) fn timestamp_to_micros(timestamp: OffsetDateTime) -> i64 {
    (timestamp.unix_timestamp_nanos() / 1_000) as i64
}

pub(super) fn timestamp_from_micros(micros: i64) -> anyhow::Result<OffsetDateTime> {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(micros) * 1_000)
        .with_context(|| format!("Cannot deserialize stored timestamp `{micros}`"))
}
