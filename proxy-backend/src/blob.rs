//! The blob store contract: opaque key -> bytes persistence with
//! atomic writes and streaming reads.

use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncRead;

use crate::error::BlobError;

/// A boxed, owned streaming reader. Callers (the cache core) are responsible
/// for closing it by dropping it once they are done.
pub type BlobReader = Pin<Box<dyn AsyncRead + Send>>;

pub type BlobResult<T> = Result<T, BlobError>;

/// The outcome of a successful [`BlobStore::store`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOutcome {
    pub size: u64,
    /// Lowercase hex-encoded SHA-256 of the stored bytes.
    pub hash_hex: String,
}

/// Durable, key-addressed byte storage with atomic writes and streaming
/// reads. Keys are forward-slash-delimited paths (see
/// [`proxy_core::ArtifactIdentity::blob_key`]).
///
/// Implementations MUST make `store` atomic: a concurrent or interrupted
/// `store` call for the same key leaves the key either fully present with one
/// well-defined content, or absent. Nothing in between is observable to a
/// concurrent `open`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Consume `reader` to EOF, durably persist it under `key`, and return
    /// its size and lowercase-hex SHA-256. Does not buffer the whole blob in
    /// memory.
    async fn store(&self, key: &str, reader: BlobReader) -> BlobResult<StoreOutcome>;

    /// Open `key` for streaming read. Returns [`BlobError::NotFound`] — not a
    /// generic I/O error — when the key is absent.
    async fn open(&self, key: &str) -> BlobResult<BlobReader>;

    async fn exists(&self, key: &str) -> BlobResult<bool>;

    /// Size in bytes of the blob at `key`.
    async fn size(&self, key: &str) -> BlobResult<u64>;

    /// Idempotent: deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> BlobResult<()>;

    /// Total bytes occupied by the store, for the `proxy_cache_size_bytes`
    /// gauge. Implementations may estimate this rather than walk every key.
    async fn used_space(&self) -> BlobResult<u64>;
}

#[async_trait]
impl BlobStore for Arc<dyn BlobStore> {
    async fn store(&self, key: &str, reader: BlobReader) -> BlobResult<StoreOutcome> {
        (**self).store(key, reader).await
    }

    async fn open(&self, key: &str) -> BlobResult<BlobReader> {
        (**self).open(key).await
    }

    async fn exists(&self, key: &str) -> BlobResult<bool> {
        (**self).exists(key).await
    }

    async fn size(&self, key: &str) -> BlobResult<u64> {
        (**self).size(key).await
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        (**self).delete(key).await
    }

    async fn used_space(&self) -> BlobResult<u64> {
        (**self).used_space().await
    }
}
