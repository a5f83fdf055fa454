//! Errors returned by [`crate::BlobStore`] and [`crate::Index`] implementations.

/// Error returned by a [`crate::BlobStore`].
///
/// `NotFound` is a distinguished sentinel, never an I/O error wrapped to look
/// like one — callers (the cache core, in particular) branch on it to detect
/// blob drift.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("key not found in blob store")]
    NotFound,

    #[error("blob store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blob store backend error: {0}")]
    Backend(String),
}

impl BlobError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BlobError::NotFound)
    }
}

/// Error returned by an [`crate::Index`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    #[error("index query failed: {0}")]
    Query(String),

    #[error("index connection failed: {0}")]
    Connection(String),
}
