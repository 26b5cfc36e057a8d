mod error_kind;

use actix_web::{HttpResponse, HttpResponseBuilder, ResponseError, http::StatusCode};
use anyhow::anyhow;
use serde_json::json;
use std::fmt::{Debug, Display, Formatter};

pub use error_kind::ErrorKind;

/// Covault native error type.
#[derive(thiserror::Error)]
pub struct Error {
    root_cause: anyhow::Error,
    kind: ErrorKind,
}

impl Error {
    /// Creates an error instance with the given kind and root cause.
    pub fn with_kind(kind: ErrorKind, root_cause: anyhow::Error) -> Self {
        Self { root_cause, kind }
    }

    /// Creates a `UserExists` error for a duplicate registration attempt.
    pub fn user_exists<L: Display>(login: L) -> Self {
        Self {
            root_cause: anyhow!("User with login `{login}` already exists."),
            kind: ErrorKind::UserExists,
        }
    }

    /// Creates an `InvalidCredentials` error instance.
    pub fn invalid_credentials() -> Self {
        Self {
            root_cause: anyhow!("Invalid credentials."),
            kind: ErrorKind::InvalidCredentials,
        }
    }

    /// Creates a `SecretNotFound` error for the given secret identifier.
    pub fn secret_not_found<I: Display>(id: I) -> Self {
        Self {
            root_cause: anyhow!("Secret with id `{id}` is not found."),
            kind: ErrorKind::SecretNotFound,
        }
    }

    /// Creates a `SerializationConflict` error instance.
    pub fn serialization_conflict(root_cause: anyhow::Error) -> Self {
        Self {
            root_cause,
            kind: ErrorKind::SerializationConflict,
        }
    }

    /// Creates a `Cancelled` error instance.
    pub fn cancelled() -> Self {
        Self {
            root_cause: anyhow!("Operation was cancelled."),
            kind: ErrorKind::Cancelled,
        }
    }

    /// Creates a `DeadlineExceeded` error instance.
    pub fn deadline_exceeded() -> Self {
        Self {
            root_cause: anyhow!("Operation timed out."),
            kind: ErrorKind::DeadlineExceeded,
        }
    }

    /// Creates a `ClosedStorage` error instance.
    pub fn closed_storage() -> Self {
        Self {
            root_cause: anyhow!("Storage is closed."),
            kind: ErrorKind::ClosedStorage,
        }
    }

    /// Creates a `StorageUnavailable` error with the given root cause.
    pub fn storage_unavailable(root_cause: anyhow::Error) -> Self {
        Self {
            root_cause,
            kind: ErrorKind::StorageUnavailable,
        }
    }

    /// Returns the error kind.
    #[allow(dead_code)] // used by tests only
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.root_cause, f)
    }
}

impl Debug for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(&self.root_cause, f)
    }
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self.kind {
            ErrorKind::UserExists => StatusCode::CONFLICT,
            ErrorKind::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ErrorKind::SecretNotFound => StatusCode::NOT_FOUND,
            ErrorKind::SerializationConflict => StatusCode::CONFLICT,
            ErrorKind::Cancelled | ErrorKind::DeadlineExceeded => StatusCode::REQUEST_TIMEOUT,
            ErrorKind::ClosedStorage | ErrorKind::StorageUnavailable => {
                StatusCode::SERVICE_UNAVAILABLE
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponseBuilder::new(self.status_code()).json(json!({
            "message": match self.kind {
                // Backend failure details never leak to the client.
                ErrorKind::ClosedStorage | ErrorKind::StorageUnavailable => {
                    "Service Unavailable".to_string()
                }
                _ => self.root_cause.to_string(),
            }
        }))
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Error {
        err.downcast::<Error>().unwrap_or_else(|root_cause| Error {
            root_cause,
            kind: ErrorKind::StorageUnavailable,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind};
    use actix_web::{ResponseError, http::StatusCode};
    use anyhow::anyhow;
    use insta::assert_debug_snapshot;

    #[test]
    fn can_create_domain_errors() {
        let error = Error::user_exists("alice");
        assert_eq!(error.kind(), ErrorKind::UserExists);
        assert_debug_snapshot!(error, @r###""User with login `alice` already exists.""###);
        assert_eq!(error.status_code(), StatusCode::CONFLICT);

        let error = Error::invalid_credentials();
        assert_eq!(error.kind(), ErrorKind::InvalidCredentials);
        assert_eq!(error.status_code(), StatusCode::UNAUTHORIZED);

        let error = Error::secret_not_found("card-1");
        assert_eq!(error.kind(), ErrorKind::SecretNotFound);
        assert_debug_snapshot!(error, @r###""Secret with id `card-1` is not found.""###);
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);

        let error = Error::cancelled();
        assert_eq!(error.kind(), ErrorKind::Cancelled);
        assert_eq!(error.status_code(), StatusCode::REQUEST_TIMEOUT);

        let error = Error::deadline_exceeded();
        assert_eq!(error.kind(), ErrorKind::DeadlineExceeded);
        assert_eq!(error.status_code(), StatusCode::REQUEST_TIMEOUT);

        let error = Error::closed_storage();
        assert_eq!(error.kind(), ErrorKind::ClosedStorage);
        assert_eq!(error.status_code(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn can_create_unclassified_errors() {
        let error = Error::from(anyhow!("Something sensitive"));
        assert_eq!(error.kind(), ErrorKind::StorageUnavailable);
        assert_eq!(error.status_code(), StatusCode::SERVICE_UNAVAILABLE);

        // Root cause must not be exposed through the HTTP response.
        let error_response = error.error_response();
        assert_eq!(error_response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn can_recover_original_error() {
        let original = Error::secret_not_found("note-42");
        let error = Error::from(anyhow!(original).context("Failed to delete secret"));
        assert_eq!(error.kind(), ErrorKind::SecretNotFound);
    }
}
