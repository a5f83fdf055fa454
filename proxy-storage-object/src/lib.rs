//! A [`BlobStore`] backed by the `object_store` crate — a strict drop-in for
//! [`proxy_storage_fs::LocalFsStore`] that talks to S3, GCS, Azure Blob, or
//! any other backend `object_store` supports.
//!
//! Atomicity here is inherited from the backend: `put`/`put_multipart` +
//! `complete` either lands the whole object under the key or doesn't land
//! anything, per the object store's own write-then-commit semantics.

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::{ObjectStore as DynObjectStore, PutPayload, path::Path as ObjectPath};
use proxy_backend::{BlobError, BlobReader, BlobResult, BlobStore, StoreOutcome};
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

const COPY_BUFFER: usize = 256 * 1024;

/// Wraps any [`object_store::ObjectStore`] implementation as a [`BlobStore`].
pub struct ObjectStoreBackend<O> {
    store: O,
}

impl<O> ObjectStoreBackend<O> {
    pub fn new(store: O) -> Self {
        Self { store }
    }
}

fn to_blob_error(err: object_store::Error) -> BlobError {
    match err {
        object_store::Error::NotFound { .. } => BlobError::NotFound,
        other => BlobError::Backend(other.to_string()),
    }
}

#[async_trait]
impl<O> BlobStore for ObjectStoreBackend<O>
where
    O: DynObjectStore + 'static,
{
    async fn store(&self, key: &str, mut reader: BlobReader) -> BlobResult<StoreOutcome> {
        let path = ObjectPath::from(key);
        let mut upload = self.store.put_multipart(&path).await.map_err(to_blob_error)?;

        let mut hasher = Sha256::new();
        let mut total: u64 = 0;
        let mut buf = vec![0u8; COPY_BUFFER];
        let result = async {
            loop {
                let n = reader.read(&mut buf).await?;
                if n == 0 {
                    break;
                }
                hasher.update(&buf[..n]);
                total += n as u64;
                upload
                    .put_part(PutPayload::from_bytes(Bytes::copy_from_slice(&buf[..n])))
                    .await
                    .map_err(to_blob_error)?;
            }
            Ok::<(), BlobError>(())
        }
        .await;

        if let Err(e) = result {
            let _ = upload.abort().await;
            return Err(e);
        }

        upload.complete().await.map_err(to_blob_error)?;

        Ok(StoreOutcome {
            size: total,
            hash_hex: hex::encode(hasher.finalize()),
        })
    }

    async fn open(&self, key: &str) -> BlobResult<BlobReader> {
        let path = ObjectPath::from(key);
        let result = self.store.get(&path).await.map_err(to_blob_error)?;
        let stream = result
            .into_stream()
            .map_err(|e| std::io::Error::other(e.to_string()));
        let reader = tokio_util::io::StreamReader::new(stream);
        Ok(Box::pin(reader) as Pin<Box<dyn tokio::io::AsyncRead + Send>>)
    }

    async fn exists(&self, key: &str) -> BlobResult<bool> {
        let path = ObjectPath::from(key);
        match self.store.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(to_blob_error(e)),
        }
    }

    async fn size(&self, key: &str) -> BlobResult<u64> {
        let path = ObjectPath::from(key);
        let meta = self.store.head(&path).await.map_err(to_blob_error)?;
        Ok(meta.size as u64)
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        let path = ObjectPath::from(key);
        match self.store.delete(&path).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(to_blob_error(e)),
        }
    }

    async fn used_space(&self) -> BlobResult<u64> {
        let mut total = 0u64;
        let mut listing = self.store.list(None);
        loop {
            match listing.try_next().await {
                Ok(Some(meta)) => total += meta.size as u64,
                Ok(None) => break,
                Err(e) => return Err(to_blob_error(e)),
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use object_store::memory::InMemory;
    use std::io::Cursor;

    fn reader_of(data: &'static [u8]) -> BlobReader {
        Box::pin(Cursor::new(data))
    }

    #[tokio::test]
    async fn store_then_open_round_trips() {
        let backend = ObjectStoreBackend::new(InMemory::new());
        let outcome = backend
            .store("cargo/serde/1.0.0/serde-1.0.0.crate", reader_of(b"crate bytes"))
            .await
            .unwrap();
        assert_eq!(outcome.size, 11);

        assert!(backend.exists("cargo/serde/1.0.0/serde-1.0.0.crate").await.unwrap());

        let mut reader = backend.open("cargo/serde/1.0.0/serde-1.0.0.crate").await.unwrap();
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"crate bytes");
    }

    #[tokio::test]
    async fn open_missing_key_is_not_found() {
        let backend = ObjectStoreBackend::new(InMemory::new());
        let err = backend.open("cargo/missing/1.0.0/missing.crate").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let backend = ObjectStoreBackend::new(InMemory::new());
        backend.delete("cargo/serde/1.0.0/serde-1.0.0.crate").await.unwrap();
        backend.delete("cargo/serde/1.0.0/serde-1.0.0.crate").await.unwrap();
    }
}
