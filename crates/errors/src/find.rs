use crate::{FetchError, StorageError};

/// The finder's tagged-union result type. A bare `NotFound` is a terminal,
/// successful-search-that-found-nothing outcome (the matcher marks the
/// transfer `FAILED`); the other two variants leave the transfer `PENDING`
/// for retry.
#[derive(Debug, thiserror::Error)]
pub enum FindError {
    #[error("exhaustive search concluded with no match after {blocks_searched} blocks")]
    NotFound { blocks_searched: u64 },

    #[error("fetch failed during search: {0}")]
    Fetch(#[from] FetchError),

    #[error("storage failed during search: {0}")]
    Storage(#[from] StorageError),
}
