/// Describes a Covault specific error type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Registration attempted with a login that is already taken.
    UserExists,
    /// Unknown login or password hash mismatch.
    InvalidCredentials,
    /// Delete or lookup target is absent.
    SecretNotFound,
    /// Transaction isolation conflict, the caller may retry the operation.
    SerializationConflict,
    /// Operation was aborted before it could complete.
    Cancelled,
    /// Operation did not complete within the allotted time.
    DeadlineExceeded,
    /// Operation invoked after the storage was shut down.
    ClosedStorage,
    /// Unclassified backend failure.
    StorageUnavailable,
}
