//! The `GetOrFetch` / `GetOrFetchFromURL` cache core.
//!
//! This crate owns none of the storage itself — it composes a
//! [`proxy_backend::BlobStore`], a [`proxy_backend::Index`], and a
//! [`proxy_fetcher::Fetcher`] into the single read path every adapter calls
//! through. There is deliberately no per-key single-flight lock here:
//! correctness comes from the blob key being a pure function of the identity
//! tuple, atomic blob-store writes, and idempotent index upserts. Two
//! requests racing a miss for the same artifact may both fetch it upstream
//! and both write it to the same key — the second write is redundant but
//! harmless, and is the accepted cost of not coordinating in-flight fetches.

mod error;
mod resolver;

pub use error::CacheError;
pub use resolver::{StaticUrl, UrlResolver};

use std::sync::Arc;

use proxy_backend::{ArtifactUpsert, BlobStore, Index};
use proxy_core::{ArtifactIdentity, ProxyError};
use proxy_fetcher::Fetcher;
use tokio::io::AsyncReadExt;
use tracing::{info, warn};

/// The result of a successful `GetOrFetch*` call: a reader positioned at the
/// start of the artifact's bytes, plus the metadata an HTTP adapter needs to
/// build a response.
pub struct CachedArtifact {
    pub reader: proxy_backend::BlobReader,
    pub size: u64,
    pub content_type: Option<String>,
    /// Lowercase hex SHA-256, usable verbatim as an HTTP `ETag`.
    pub etag: String,
    /// Whether this call served from the cache or fetched upstream. Purely
    /// informational — callers use it only for logging/metrics, never to
    /// change response semantics.
    pub hit: bool,
}

/// Composes the three collaborators behind `GetOrFetch`.
pub struct CacheCore {
    index: Arc<dyn Index>,
    blobs: Arc<dyn BlobStore>,
    fetcher: Arc<dyn Fetcher>,
}

impl CacheCore {
    pub fn new(index: Arc<dyn Index>, blobs: Arc<dyn BlobStore>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { index, blobs, fetcher }
    }

    /// `GetOrFetchFromURL`: the eager primitive. `upstream_url` is already
    /// known — most adapters compute it as part of `identify()` and can call
    /// this directly.
    #[tracing::instrument(skip(self, upstream_url), fields(ecosystem = %identity.ecosystem, name = %identity.name, version = %identity.version))]
    pub async fn get_or_fetch_from_url(&self, identity: &ArtifactIdentity, upstream_url: &str) -> Result<CachedArtifact, ProxyError> {
        let ecosystem = identity.ecosystem.as_str();
        let blob_key = identity.blob_key();

        if let Some(cached) = self.try_serve_cached(identity, &blob_key).await? {
            proxy_metrics::record_cache_hit(ecosystem);
            return Ok(cached);
        }

        proxy_metrics::record_cache_miss(ecosystem);
        self.fetch_and_store(identity, &blob_key, upstream_url).await
    }

    /// `GetOrFetch`: the lazy primitive. `resolver` is consulted only on a
    /// cache miss, so adapters whose URL resolution itself costs an upstream
    /// round trip (OCI tag -> digest, for instance) don't pay it on a hit.
    pub async fn get_or_fetch(&self, identity: &ArtifactIdentity, resolver: &dyn UrlResolver) -> Result<CachedArtifact, ProxyError> {
        let ecosystem = identity.ecosystem.as_str();
        let blob_key = identity.blob_key();

        if let Some(cached) = self.try_serve_cached(identity, &blob_key).await? {
            proxy_metrics::record_cache_hit(ecosystem);
            return Ok(cached);
        }

        proxy_metrics::record_cache_miss(ecosystem);
        let upstream_url = resolver.resolve().await?;
        self.fetch_and_store(identity, &blob_key, &upstream_url).await
    }

    /// Looks the artifact up in the index, and if it claims to be cached,
    /// tries to open the blob. Returns `Ok(None)` for every flavor of miss
    /// (absent from the index, or present in the index but drifted out of
    /// the blob store).
    async fn try_serve_cached(&self, identity: &ArtifactIdentity, blob_key: &str) -> Result<Option<CachedArtifact>, ProxyError> {
        let version_purl = identity.version_purl().to_string();
        let row = match self.index.get_artifact(&version_purl, &identity.filename).await {
            Ok(row) => row,
            Err(e) => {
                warn!(error = %e, "index lookup failed, falling through to upstream fetch");
                None
            }
        };

        let Some(row) = row.filter(|r| r.is_cached()) else {
            return Ok(None);
        };

        let timer = proxy_metrics::Timer::new();
        match self.blobs.open(blob_key).await {
            Ok(reader) => {
                proxy_metrics::record_storage_op("open", timer.elapsed());
                if let Err(e) = self.index.upsert_artifact(identity.ecosystem, &identity.name, &identity.version, &identity.filename, ArtifactUpsert::hit()).await {
                    warn!(error = %e, "failed to record cache hit, serving anyway");
                }
                Ok(Some(CachedArtifact {
                    reader,
                    size: row.size.unwrap_or_default() as u64,
                    content_type: row.content_type,
                    etag: row.content_hash.unwrap_or_default(),
                    hit: true,
                }))
            }
            Err(e) if e.is_not_found() => {
                warn!(blob_key, "index claims artifact is cached but blob is missing, treating as miss");
                Ok(None)
            }
            Err(e) => {
                proxy_metrics::record_storage_error("open");
                Err(ProxyError::StorageTransient(e.to_string()))
            }
        }
    }

    /// Fetches from upstream, persists under the deterministic key, upserts
    /// the index (best-effort), and hands back a fresh reader over what was
    /// just stored.
    async fn fetch_and_store(&self, identity: &ArtifactIdentity, blob_key: &str, upstream_url: &str) -> Result<CachedArtifact, ProxyError> {
        let fetch_timer = proxy_metrics::Timer::new();
        let response = self.fetcher.fetch(upstream_url).await.map_err(|e| {
            proxy_metrics::record_upstream_error(identity.ecosystem.as_str());
            ProxyError::UpstreamUnavailable(e.to_string())
        })?;
        proxy_metrics::record_upstream_fetch(identity.ecosystem.as_str(), fetch_timer.elapsed());

        let content_type = response.content_type.clone();

        let store_timer = proxy_metrics::Timer::new();
        let outcome = self.blobs.store(blob_key, response.reader).await.map_err(|e| {
            proxy_metrics::record_storage_error("store");
            ProxyError::StorageTransient(e.to_string())
        })?;
        proxy_metrics::record_storage_op("store", store_timer.elapsed());

        let upsert = ArtifactUpsert::fetched(
            upstream_url.to_string(),
            blob_key.to_string(),
            outcome.hash_hex.clone(),
            outcome.size as i64,
            content_type.clone(),
        );
        if let Err(e) = self
            .index
            .upsert_artifact(identity.ecosystem, &identity.name, &identity.version, &identity.filename, upsert)
            .await
        {
            // IndexTransient: logged, request still succeeds. The blob is
            // already durably stored under its deterministic key, so the
            // next lookup for this identity will re-derive the same key and
            // self-heal the index entry on its own upsert.
            warn!(error = %e, blob_key, "failed to record fetched artifact in index, continuing");
        }

        info!(blob_key, bytes = outcome.size, "fetched and cached artifact from upstream");

        let reader = self.blobs.open(blob_key).await.map_err(|e| ProxyError::StorageTransient(e.to_string()))?;

        Ok(CachedArtifact {
            reader,
            size: outcome.size,
            content_type,
            etag: outcome.hash_hex,
            hit: false,
        })
    }
}

/// Reads a [`CachedArtifact`] to completion into memory. Adapters that need
/// to rewrite or inspect the body (metadata documents) use this; adapters
/// streaming a binary artifact straight to the client stream `reader`
/// directly instead.
pub async fn read_to_vec(mut artifact: CachedArtifact) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(artifact.size as usize);
    artifact.reader.read_to_end(&mut buf).await?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use proxy_backend::{ArtifactRow, BlobError, BlobReader, BlobResult, IndexCounts, IndexError, IndexResult, PackageRow, PackageUpsert, VersionUpsert};
    use proxy_core::Ecosystem;
    use proxy_fetcher::{FetchError, FetchedResponse, Fetcher};

    #[derive(Default)]
    struct FakeIndex {
        artifacts: Mutex<HashMap<(String, String), ArtifactRow>>,
    }

    #[async_trait]
    impl Index for FakeIndex {
        async fn upsert_package(&self, _upsert: PackageUpsert) -> IndexResult<()> {
            Ok(())
        }

        async fn upsert_version(&self, _upsert: VersionUpsert) -> IndexResult<()> {
            Ok(())
        }

        async fn upsert_artifact(&self, ecosystem: Ecosystem, name: &str, version: &str, filename: &str, upsert: ArtifactUpsert) -> IndexResult<()> {
            let version_purl = proxy_core::VersionPurl::new(ecosystem, name, version).to_string();
            let mut artifacts = self.artifacts.lock().unwrap();
            let key = (version_purl.clone(), filename.to_string());
            let entry = artifacts.entry(key).or_insert_with(|| ArtifactRow {
                version_purl: version_purl.clone(),
                filename: filename.to_string(),
                upstream_url: String::new(),
                blob_path: None,
                content_hash: None,
                size: None,
                content_type: None,
                fetched_at: None,
                hits: 0,
            });
            if let Some(url) = upsert.upstream_url {
                entry.upstream_url = url;
            }
            if upsert.blob_path.is_some() {
                entry.blob_path = upsert.blob_path;
            }
            if upsert.content_hash.is_some() {
                entry.content_hash = upsert.content_hash;
            }
            if upsert.size.is_some() {
                entry.size = upsert.size;
            }
            if upsert.content_type.is_some() {
                entry.content_type = upsert.content_type;
            }
            if upsert.reset_hits {
                entry.hits = 0;
            } else if upsert.increment_hit {
                entry.hits += 1;
            }
            Ok(())
        }

        async fn get_package(&self, _purl: &str) -> IndexResult<Option<PackageRow>> {
            Ok(None)
        }

        async fn get_artifact(&self, version_purl: &str, filename: &str) -> IndexResult<Option<ArtifactRow>> {
            Ok(self.artifacts.lock().unwrap().get(&(version_purl.to_string(), filename.to_string())).cloned())
        }

        async fn counts(&self) -> IndexResult<IndexCounts> {
            Ok(IndexCounts::default())
        }

        async fn popular(&self, _limit: i64) -> IndexResult<Vec<ArtifactRow>> {
            Ok(Vec::new())
        }

        async fn recent(&self, _limit: i64) -> IndexResult<Vec<ArtifactRow>> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct FakeBlobStore {
        blobs: Mutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl BlobStore for FakeBlobStore {
        async fn store(&self, key: &str, mut reader: BlobReader) -> BlobResult<proxy_backend::StoreOutcome> {
            use sha2::{Digest, Sha256};
            use tokio::io::AsyncReadExt;
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf).await?;
            let hash = hex::encode(Sha256::digest(&buf));
            let size = buf.len() as u64;
            self.blobs.lock().unwrap().insert(key.to_string(), buf);
            Ok(proxy_backend::StoreOutcome { size, hash_hex: hash })
        }

        async fn open(&self, key: &str) -> BlobResult<BlobReader> {
            let blobs = self.blobs.lock().unwrap();
            match blobs.get(key) {
                Some(bytes) => Ok(Box::pin(std::io::Cursor::new(bytes.clone()))),
                None => Err(BlobError::NotFound),
            }
        }

        async fn exists(&self, key: &str) -> BlobResult<bool> {
            Ok(self.blobs.lock().unwrap().contains_key(key))
        }

        async fn size(&self, key: &str) -> BlobResult<u64> {
            self.blobs.lock().unwrap().get(key).map(|b| b.len() as u64).ok_or(BlobError::NotFound)
        }

        async fn delete(&self, key: &str) -> BlobResult<()> {
            self.blobs.lock().unwrap().remove(key);
            Ok(())
        }

        async fn used_space(&self) -> BlobResult<u64> {
            Ok(self.blobs.lock().unwrap().values().map(|b| b.len() as u64).sum())
        }
    }

    struct CountingFetcher {
        body: &'static [u8],
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Fetcher for CountingFetcher {
        async fn fetch(&self, _url: &str) -> Result<FetchedResponse, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(FetchedResponse {
                reader: Box::pin(std::io::Cursor::new(self.body)),
                content_type: Some("application/octet-stream".to_string()),
                content_length: Some(self.body.len() as u64),
            })
        }
    }

    fn identity() -> ArtifactIdentity {
        ArtifactIdentity::new(Ecosystem::Npm, "lodash", "4.17.21", "lodash-4.17.21.tgz")
    }

    #[tokio::test]
    async fn miss_then_hit_only_fetches_once() {
        let index = Arc::new(FakeIndex::default());
        let blobs = Arc::new(FakeBlobStore::default());
        let fetcher: Arc<CountingFetcher> = Arc::new(CountingFetcher { body: b"tarball", calls: AtomicUsize::new(0) });

        let core = CacheCore::new(index, blobs, fetcher.clone() as Arc<dyn Fetcher>);
        let id = identity();

        let first = core.get_or_fetch_from_url(&id, "https://registry.npmjs.org/lodash/-/lodash-4.17.21.tgz").await.unwrap();
        assert!(!first.hit);
        assert_eq!(first.size, 7);

        let second = core.get_or_fetch_from_url(&id, "https://registry.npmjs.org/lodash/-/lodash-4.17.21.tgz").await.unwrap();
        assert!(second.hit);
        assert_eq!(second.etag, first.etag);

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blob_drift_is_treated_as_a_miss_and_refetches() {
        let index = Arc::new(FakeIndex::default());
        let blobs = Arc::new(FakeBlobStore::default());
        let fetcher: Arc<CountingFetcher> = Arc::new(CountingFetcher { body: b"tarball", calls: AtomicUsize::new(0) });
        let core = CacheCore::new(index.clone(), blobs.clone(), fetcher.clone() as Arc<dyn Fetcher>);
        let id = identity();

        core.get_or_fetch_from_url(&id, "https://registry.npmjs.org/lodash/-/lodash-4.17.21.tgz").await.unwrap();
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);

        blobs.delete(&id.blob_key()).await.unwrap();

        let after_drift = core.get_or_fetch_from_url(&id, "https://registry.npmjs.org/lodash/-/lodash-4.17.21.tgz").await.unwrap();
        assert!(!after_drift.hit);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn upstream_failure_surfaces_as_unavailable() {
        struct FailingFetcher;
        #[async_trait]
        impl Fetcher for FailingFetcher {
            async fn fetch(&self, _url: &str) -> Result<FetchedResponse, FetchError> {
                Err(FetchError::Status(503))
            }
        }

        let core = CacheCore::new(Arc::new(FakeIndex::default()), Arc::new(FakeBlobStore::default()), Arc::new(FailingFetcher));
        let err = core.get_or_fetch_from_url(&identity(), "https://example.invalid/x").await.unwrap_err();
        assert!(matches!(err, ProxyError::UpstreamUnavailable(_)));
        assert_eq!(err.status_code(), 502);
    }

    #[tokio::test]
    async fn get_or_fetch_resolves_url_only_on_miss() {
        let index = Arc::new(FakeIndex::default());
        let blobs = Arc::new(FakeBlobStore::default());
        let fetcher: Arc<CountingFetcher> = Arc::new(CountingFetcher { body: b"tarball", calls: AtomicUsize::new(0) });
        let core = CacheCore::new(index, blobs, fetcher.clone() as Arc<dyn Fetcher>);
        let id = identity();

        let resolves = AtomicUsize::new(0);
        struct CountingResolver<'a>(&'a AtomicUsize, &'static str);
        #[async_trait]
        impl<'a> UrlResolver for CountingResolver<'a> {
            async fn resolve(&self) -> Result<String, ProxyError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(self.1.to_string())
            }
        }

        let resolver = CountingResolver(&resolves, "https://registry.npmjs.org/lodash/-/lodash-4.17.21.tgz");
        core.get_or_fetch(&id, &resolver).await.unwrap();
        core.get_or_fetch(&id, &resolver).await.unwrap();

        assert_eq!(resolves.load(Ordering::SeqCst), 1);
    }
}
