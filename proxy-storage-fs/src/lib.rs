//! A [`BlobStore`] backed by the local filesystem.
//!
//! Atomicity is achieved the way most local caches do it: stream the
//! incoming reader into a `NamedTempFile` created alongside the final
//! destination (so the rename is same-filesystem), then `persist()` it onto
//! the destination path. A reader that observes the destination path only
//! ever sees either nothing, or the complete prior write — `rename(2)` is
//! atomic on POSIX filesystems, and `persist` uses it.

use std::path::{Path, PathBuf};
use std::pin::Pin;

use async_trait::async_trait;
use proxy_backend::{BlobError, BlobReader, BlobResult, BlobStore, StoreOutcome};
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;

/// Size of the in-memory copy buffer used while streaming into the store.
/// The blob is never buffered whole — only this much of it at a time.
const COPY_BUFFER: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct LocalFsStore {
    root: PathBuf,
}

impl LocalFsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> BlobResult<PathBuf> {
        if key.is_empty() || key.starts_with('/') || key.split('/').any(|seg| seg == "..") {
            return Err(BlobError::Backend(format!("unsafe blob key: {key}")));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl BlobStore for LocalFsStore {
    async fn store(&self, key: &str, mut reader: BlobReader) -> BlobResult<StoreOutcome> {
        let dest = self.resolve(key)?;
        let parent = dest
            .parent()
            .ok_or_else(|| BlobError::Backend(format!("blob key has no parent: {key}")))?
            .to_path_buf();
        tokio::fs::create_dir_all(&parent).await?;

        let parent_for_blocking = parent.clone();
        let tmp = tokio::task::spawn_blocking(move || tempfile::NamedTempFile::new_in(&parent_for_blocking))
            .await
            .map_err(|e| BlobError::Backend(format!("blocking task panicked: {e}")))??;

        let std_file = tmp.as_file().try_clone()?;
        let mut async_file = tokio::fs::File::from_std(std_file);

        let mut hasher = Sha256::new();
        let mut total: u64 = 0;
        let mut buf = vec![0u8; COPY_BUFFER];
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
            async_file.write_all(&buf[..n]).await?;
            total += n as u64;
        }
        async_file.flush().await?;
        drop(async_file);

        let dest_for_blocking = dest.clone();
        tokio::task::spawn_blocking(move || tmp.persist(&dest_for_blocking))
            .await
            .map_err(|e| BlobError::Backend(format!("blocking task panicked: {e}")))?
            .map_err(|e| BlobError::Backend(format!("failed to persist blob: {}", e.error)))?;

        Ok(StoreOutcome {
            size: total,
            hash_hex: hex::encode(hasher.finalize()),
        })
    }

    async fn open(&self, key: &str) -> BlobResult<BlobReader> {
        let path = self.resolve(key)?;
        match tokio::fs::File::open(&path).await {
            Ok(file) => Ok(Box::pin(file) as Pin<Box<dyn tokio::io::AsyncRead + Send>>),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BlobError::NotFound),
            Err(e) => Err(BlobError::Io(e)),
        }
    }

    async fn exists(&self, key: &str) -> BlobResult<bool> {
        let path = self.resolve(key)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    async fn size(&self, key: &str) -> BlobResult<u64> {
        let path = self.resolve(key)?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BlobError::NotFound),
            Err(e) => Err(BlobError::Io(e)),
        }
    }

    async fn delete(&self, key: &str) -> BlobResult<()> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(BlobError::Io(e)),
        }
    }

    async fn used_space(&self) -> BlobResult<u64> {
        used_space_recursive(&self.root).await
    }
}

async fn used_space_recursive(dir: &Path) -> BlobResult<u64> {
    let mut total = 0u64;
    let mut stack = vec![dir.to_path_buf()];
    while let Some(current) = stack.pop() {
        let mut entries = match tokio::fs::read_dir(&current).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(BlobError::Io(e)),
        };
        while let Some(entry) = entries.next_entry().await? {
            let meta = entry.metadata().await?;
            if meta.is_dir() {
                stack.push(entry.path());
            } else {
                total += meta.len();
            }
        }
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn reader_of(data: &'static [u8]) -> BlobReader {
        Box::pin(Cursor::new(data))
    }

    #[tokio::test]
    async fn store_then_open_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsStore::new(dir.path());

        let outcome = store
            .store("npm/lodash/4.17.21/lodash-4.17.21.tgz", reader_of(b"hello world"))
            .await
            .unwrap();
        assert_eq!(outcome.size, 11);
        assert_eq!(
            outcome.hash_hex,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );

        assert!(store.exists("npm/lodash/4.17.21/lodash-4.17.21.tgz").await.unwrap());
        assert_eq!(store.size("npm/lodash/4.17.21/lodash-4.17.21.tgz").await.unwrap(), 11);

        let mut reader = store.open("npm/lodash/4.17.21/lodash-4.17.21.tgz").await.unwrap();
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.unwrap();
        assert_eq!(buf, b"hello world");
    }

    #[tokio::test]
    async fn open_missing_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsStore::new(dir.path());
        let err = store.open("cargo/serde/1.0.0/serde-1.0.0.crate").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFsStore::new(dir.path());
        store.delete("cargo/serde/1.0.0/serde-1.0.0.crate").await.unwrap();
        store.delete("cargo/serde/1.0.0/serde-1.0.0.crate").await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_store_to_same_key_is_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let store = std::sync::Arc::new(LocalFsStore::new(dir.path()));

        let mut handles = Vec::new();
        for i in 0..8u8 {
            let store = store.clone();
            let payload: &'static [u8] = if i % 2 == 0 { b"version-a" } else { b"version-b" };
            handles.push(tokio::spawn(async move {
                store.store("cargo/race/1.0.0/race-1.0.0.crate", reader_of(payload)).await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let mut reader = store.open("cargo/race/1.0.0/race-1.0.0.crate").await.unwrap();
        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await.unwrap();
        assert!(buf == b"version-a" || buf == b"version-b");
    }
}
