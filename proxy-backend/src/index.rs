//! The relational index contract: idempotent upserts over
//! Package/Version/Artifact, plus the derived queries the operator CLI uses.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::IndexError;
use crate::models::{ArtifactRow, ArtifactUpsert, IndexCounts, PackageRow, PackageUpsert, VersionUpsert};

pub type IndexResult<T> = Result<T, IndexError>;

/// Transactional record of cache state. Every method is an upsert keyed by
/// PURL (or `(version_purl, filename)` for artifacts) — callers never need to
/// check existence first; missing ancestors are created as a side effect.
#[async_trait]
pub trait Index: Send + Sync {
    /// Create the package row if absent; otherwise a no-op (the fields this
    /// index tracks for a package don't change after creation except
    /// `last_enriched_at`, which callers update separately if they enrich).
    async fn upsert_package(&self, upsert: PackageUpsert) -> IndexResult<()>;

    /// Create the version row (and its parent package row) if absent.
    async fn upsert_version(&self, upsert: VersionUpsert) -> IndexResult<()>;

    /// Partial upsert of an artifact row, creating the parent version (and
    /// its parent package) if necessary. A `None` field in `upsert` must not
    /// overwrite an existing non-null column.
    async fn upsert_artifact(
        &self,
        ecosystem: proxy_core::Ecosystem,
        name: &str,
        version: &str,
        filename: &str,
        upsert: ArtifactUpsert,
    ) -> IndexResult<()>;

    async fn get_package(&self, purl: &str) -> IndexResult<Option<PackageRow>>;

    async fn get_artifact(&self, version_purl: &str, filename: &str) -> IndexResult<Option<ArtifactRow>>;

    /// Aggregate counts and total stored bytes, for the CLI and the
    /// `proxy_cache_artifact_count` / `proxy_cache_size_bytes` gauges.
    async fn counts(&self) -> IndexResult<IndexCounts>;

    /// Top `limit` artifacts by hit count.
    async fn popular(&self, limit: i64) -> IndexResult<Vec<ArtifactRow>>;

    /// Top `limit` artifacts by `fetched_at`, most recent first.
    async fn recent(&self, limit: i64) -> IndexResult<Vec<ArtifactRow>>;
}

#[async_trait]
impl Index for Arc<dyn Index> {
    async fn upsert_package(&self, upsert: PackageUpsert) -> IndexResult<()> {
        (**self).upsert_package(upsert).await
    }

    async fn upsert_version(&self, upsert: VersionUpsert) -> IndexResult<()> {
        (**self).upsert_version(upsert).await
    }

    async fn upsert_artifact(
        &self,
        ecosystem: proxy_core::Ecosystem,
        name: &str,
        version: &str,
        filename: &str,
        upsert: ArtifactUpsert,
    ) -> IndexResult<()> {
        (**self)
            .upsert_artifact(ecosystem, name, version, filename, upsert)
            .await
    }

    async fn get_package(&self, purl: &str) -> IndexResult<Option<PackageRow>> {
        (**self).get_package(purl).await
    }

    async fn get_artifact(&self, version_purl: &str, filename: &str) -> IndexResult<Option<ArtifactRow>> {
        (**self).get_artifact(version_purl, filename).await
    }

    async fn counts(&self) -> IndexResult<IndexCounts> {
        (**self).counts().await
    }

    async fn popular(&self, limit: i64) -> IndexResult<Vec<ArtifactRow>> {
        (**self).popular(limit).await
    }

    async fn recent(&self, limit: i64) -> IndexResult<Vec<ArtifactRow>> {
        (**self).recent(limit).await
    }
}
