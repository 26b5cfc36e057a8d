use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde_derive::{Deserialize, Serialize};
use serde_with::{TimestampSeconds, serde_as};
use std::time::Duration;
use time::OffsetDateTime;

/// JWT claims struct.
#[serde_as]
#[derive(Debug, Serialize, Deserialize, Eq, PartialEq)]
pub struct Claims {
    /// User login.
    pub sub: String,
    /// Token expiration time (UTC timestamp).
    #[serde_as(as = "TimestampSeconds<i64>")]
    pub exp: OffsetDateTime,
}

/// Mints an HS256 bearer token embedding the login and an expiry.
pub fn issue_token(
    jwt_secret: &str,
    login: &str,
    expires_in: Duration,
) -> anyhow::Result<String> {
    Ok(encode(
        &Header::default(),
        &Claims {
            sub: login.to_string(),
            exp: OffsetDateTime::now_utc() + expires_in,
        },
        &EncodingKey::from_secret(jwt_secret.as_bytes()),
    )?)
}

/// Verifies a bearer token and returns its claims.
pub fn verify_token(jwt_secret: &str, token: &str) -> anyhow::Result<Claims> {
    Ok(decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_secret.as_bytes()),
        &Validation::default(),
    )?
    .claims)
}

#[cfg(test)]
mod tests {
    use super::{Claims, issue_token, verify_token};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use std::time::Duration;
    use time::OffsetDateTime;

    #[test]
    fn token_round_trip() -> anyhow::Result<()> {
        let token = issue_token("top-secret", "alice", Duration::from_secs(3600))?;
        let claims = verify_token("top-secret", &token)?;

        assert_eq!(claims.sub, "alice");
        assert!(claims.exp > OffsetDateTime::now_utc());

        Ok(())
    }

    #[test]
    fn rejects_wrong_secret() -> anyhow::Result<()> {
        let token = issue_token("top-secret", "alice", Duration::from_secs(3600))?;
        assert!(verify_token("not-the-secret", &token).is_err());
        Ok(())
    }

    #[test]
    fn rejects_expired_token() -> anyhow::Result<()> {
        // Far enough in the past to defeat the default validation leeway.
        let token = encode(
            &Header::default(),
            &Claims {
                sub: "alice".to_string(),
                exp: OffsetDateTime::now_utc() - Duration::from_secs(300),
            },
            &EncodingKey::from_secret("top-secret".as_bytes()),
        )?;
        assert!(verify_token("top-secret", &token).is_err());
        Ok(())
    }
}
