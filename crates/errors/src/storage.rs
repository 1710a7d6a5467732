/// Errors surfaced by `bridge-storage`. Duplicate-key conditions are
/// deliberately not a variant here — callers that expect idempotence treat
/// them as a success count (`{inserted, duplicates}`), never as an error.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage connection failed: {0}")]
    Connection(String),

    #[error("storage query failed: {0}")]
    Query(String),

    #[error("startup index verification failed: {0}")]
    IndexVerification(String),

    #[error("document (de)serialization failed: {0}")]
    Serialization(String),
}
