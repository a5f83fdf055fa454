//! A [`proxy_backend::Index`] backed by `sqlx`'s `Any` driver, so the same
//! code runs against either an embedded SQLite file (the default, zero-ops
//! deployment) or a Postgres connection string (for a shared, multi-instance
//! cache) — the driver is selected by the scheme of the URL passed to
//! [`SqlIndex::connect`].
//!
//! Queries are written with `?` placeholders and plain `sqlx::query`/
//! `query_as` calls rather than the `sqlx::query!` compile-time macros,
//! since the macros require a live database at build time and `Any` doesn't
//! support them at all.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use proxy_backend::{ArtifactRow, ArtifactUpsert, IndexCounts, IndexError, IndexResult, PackageRow, PackageUpsert, VersionUpsert};
use proxy_core::{Ecosystem, PackagePurl, VersionPurl};
use sqlx::any::{AnyPoolOptions, install_default_drivers};
use sqlx::{AnyPool, Row};

fn to_index_error(err: sqlx::Error) -> IndexError {
    match err {
        sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => IndexError::Connection(err.to_string()),
        other => IndexError::Query(other.to_string()),
    }
}

/// A relational index reachable through any backend `sqlx::Any` supports.
pub struct SqlIndex {
    pool: AnyPool,
}

impl SqlIndex {
    /// Connects to `url` (e.g. `sqlite://cache.db` or `postgres://...`) and
    /// runs pending migrations. Call once at startup.
    pub async fn connect(url: &str, max_connections: u32) -> IndexResult<Self> {
        install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
            .map_err(to_index_error)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| IndexError::Connection(e.to_string()))?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: AnyPool) -> Self {
        Self { pool }
    }
}

fn package_row_from(row: &sqlx::any::AnyRow) -> Result<PackageRow, sqlx::Error> {
    let ecosystem_str: String = row.try_get("ecosystem")?;
    let ecosystem = ecosystem_str
        .parse::<Ecosystem>()
        .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
    Ok(PackageRow {
        purl: row.try_get("purl")?,
        ecosystem,
        name: row.try_get("name")?,
        upstream_registry_url: row.try_get("upstream_registry_url")?,
        last_enriched_at: row.try_get::<Option<DateTime<Utc>>, _>("last_enriched_at")?,
    })
}

fn artifact_row_from(row: &sqlx::any::AnyRow) -> Result<ArtifactRow, sqlx::Error> {
    Ok(ArtifactRow {
        version_purl: row.try_get("version_purl")?,
        filename: row.try_get("filename")?,
        upstream_url: row.try_get("upstream_url")?,
        blob_path: row.try_get("blob_path")?,
        content_hash: row.try_get("content_hash")?,
        size: row.try_get("size")?,
        content_type: row.try_get("content_type")?,
        fetched_at: row.try_get::<Option<DateTime<Utc>>, _>("fetched_at")?,
        hits: row.try_get("hits")?,
    })
}

#[async_trait]
impl proxy_backend::Index for SqlIndex {
    async fn upsert_package(&self, upsert: PackageUpsert) -> IndexResult<()> {
        let purl = PackagePurl::new(upsert.ecosystem, upsert.name.clone()).to_string();
        sqlx::query(
            "INSERT INTO packages (purl, ecosystem, name, upstream_registry_url) VALUES (?, ?, ?, ?) \
             ON CONFLICT (purl) DO NOTHING",
        )
        .bind(&purl)
        .bind(upsert.ecosystem.as_str())
        .bind(&upsert.name)
        .bind(&upsert.upstream_registry_url)
        .execute(&self.pool)
        .await
        .map_err(to_index_error)?;
        Ok(())
    }

    async fn upsert_version(&self, upsert: VersionUpsert) -> IndexResult<()> {
        let package_purl = PackagePurl::new(upsert.ecosystem, upsert.name.clone()).to_string();
        let purl = VersionPurl::new(upsert.ecosystem, upsert.name.clone(), upsert.version.clone()).to_string();

        let mut tx = self.pool.begin().await.map_err(to_index_error)?;
        sqlx::query(
            "INSERT INTO packages (purl, ecosystem, name, upstream_registry_url) VALUES (?, ?, ?, '') \
             ON CONFLICT (purl) DO NOTHING",
        )
        .bind(&package_purl)
        .bind(upsert.ecosystem.as_str())
        .bind(&upsert.name)
        .execute(&mut *tx)
        .await
        .map_err(to_index_error)?;

        sqlx::query(
            "INSERT INTO versions (purl, package_purl, version) VALUES (?, ?, ?) \
             ON CONFLICT (purl) DO NOTHING",
        )
        .bind(&purl)
        .bind(&package_purl)
        .bind(&upsert.version)
        .execute(&mut *tx)
        .await
        .map_err(to_index_error)?;

        tx.commit().await.map_err(to_index_error)?;
        Ok(())
    }

    async fn upsert_artifact(
        &self,
        ecosystem: Ecosystem,
        name: &str,
        version: &str,
        filename: &str,
        upsert: ArtifactUpsert,
    ) -> IndexResult<()> {
        let package_purl = PackagePurl::new(ecosystem, name).to_string();
        let version_purl = VersionPurl::new(ecosystem, name, version).to_string();

        let mut tx = self.pool.begin().await.map_err(to_index_error)?;

        sqlx::query("INSERT INTO packages (purl, ecosystem, name, upstream_registry_url) VALUES (?, ?, ?, '') ON CONFLICT (purl) DO NOTHING")
            .bind(&package_purl)
            .bind(ecosystem.as_str())
            .bind(name)
            .execute(&mut *tx)
            .await
            .map_err(to_index_error)?;

        sqlx::query("INSERT INTO versions (purl, package_purl, version) VALUES (?, ?, ?) ON CONFLICT (purl) DO NOTHING")
            .bind(&version_purl)
            .bind(&package_purl)
            .bind(version)
            .execute(&mut *tx)
            .await
            .map_err(to_index_error)?;

        let existing = sqlx::query(
            "SELECT version_purl, filename, upstream_url, blob_path, content_hash, size, content_type, fetched_at, hits \
             FROM artifacts WHERE version_purl = ? AND filename = ?",
        )
        .bind(&version_purl)
        .bind(filename)
        .fetch_optional(&mut *tx)
        .await
        .map_err(to_index_error)?;

        let existing = existing.map(|r| artifact_row_from(&r)).transpose().map_err(to_index_error)?;

        let upstream_url = upsert
            .upstream_url
            .or_else(|| existing.as_ref().map(|r| r.upstream_url.clone()))
            .unwrap_or_default();
        let blob_path = upsert.blob_path.or_else(|| existing.as_ref().and_then(|r| r.blob_path.clone()));
        let content_hash = upsert
            .content_hash
            .or_else(|| existing.as_ref().and_then(|r| r.content_hash.clone()));
        let size = upsert.size.or_else(|| existing.as_ref().and_then(|r| r.size));
        let content_type = upsert
            .content_type
            .or_else(|| existing.as_ref().and_then(|r| r.content_type.clone()));
        let fetched_at = if upsert.touch_fetched_at {
            Some(Utc::now())
        } else {
            existing.as_ref().and_then(|r| r.fetched_at)
        };
        let hits = if upsert.reset_hits {
            0
        } else {
            let base = existing.as_ref().map(|r| r.hits).unwrap_or(0);
            if upsert.increment_hit { base + 1 } else { base }
        };

        sqlx::query(
            "INSERT INTO artifacts \
             (version_purl, filename, upstream_url, blob_path, content_hash, size, content_type, fetched_at, hits) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT (version_purl, filename) DO UPDATE SET \
               upstream_url = excluded.upstream_url, \
               blob_path = excluded.blob_path, \
               content_hash = excluded.content_hash, \
               size = excluded.size, \
               content_type = excluded.content_type, \
               fetched_at = excluded.fetched_at, \
               hits = excluded.hits",
        )
        .bind(&version_purl)
        .bind(filename)
        .bind(&upstream_url)
        .bind(&blob_path)
        .bind(&content_hash)
        .bind(size)
        .bind(&content_type)
        .bind(fetched_at)
        .bind(hits)
        .execute(&mut *tx)
        .await
        .map_err(to_index_error)?;

        tx.commit().await.map_err(to_index_error)?;
        Ok(())
    }

    async fn get_package(&self, purl: &str) -> IndexResult<Option<PackageRow>> {
        let row = sqlx::query("SELECT purl, ecosystem, name, upstream_registry_url, last_enriched_at FROM packages WHERE purl = ?")
            .bind(purl)
            .fetch_optional(&self.pool)
            .await
            .map_err(to_index_error)?;
        row.map(|r| package_row_from(&r)).transpose().map_err(to_index_error)
    }

    async fn get_artifact(&self, version_purl: &str, filename: &str) -> IndexResult<Option<ArtifactRow>> {
        let row = sqlx::query(
            "SELECT version_purl, filename, upstream_url, blob_path, content_hash, size, content_type, fetched_at, hits \
             FROM artifacts WHERE version_purl = ? AND filename = ?",
        )
        .bind(version_purl)
        .bind(filename)
        .fetch_optional(&self.pool)
        .await
        .map_err(to_index_error)?;
        row.map(|r| artifact_row_from(&r)).transpose().map_err(to_index_error)
    }

    async fn counts(&self) -> IndexResult<IndexCounts> {
        let packages: i64 = sqlx::query("SELECT COUNT(*) AS n FROM packages")
            .fetch_one(&self.pool)
            .await
            .map_err(to_index_error)?
            .try_get("n")
            .map_err(to_index_error)?;
        let versions: i64 = sqlx::query("SELECT COUNT(*) AS n FROM versions")
            .fetch_one(&self.pool)
            .await
            .map_err(to_index_error)?
            .try_get("n")
            .map_err(to_index_error)?;
        let artifacts: i64 = sqlx::query("SELECT COUNT(*) AS n FROM artifacts")
            .fetch_one(&self.pool)
            .await
            .map_err(to_index_error)?
            .try_get("n")
            .map_err(to_index_error)?;
        let cached_row = sqlx::query(
            "SELECT COUNT(*) AS n, COALESCE(SUM(size), 0) AS bytes FROM artifacts WHERE blob_path IS NOT NULL",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(to_index_error)?;
        let cached_artifacts: i64 = cached_row.try_get("n").map_err(to_index_error)?;
        let total_bytes: i64 = cached_row.try_get("bytes").map_err(to_index_error)?;

        Ok(IndexCounts {
            packages,
            versions,
            artifacts,
            cached_artifacts,
            total_bytes,
        })
    }

    async fn popular(&self, limit: i64) -> IndexResult<Vec<ArtifactRow>> {
        let rows = sqlx::query(
            "SELECT version_purl, filename, upstream_url, blob_path, content_hash, size, content_type, fetched_at, hits \
             FROM artifacts ORDER BY hits DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(to_index_error)?;
        rows.iter().map(artifact_row_from).collect::<Result<Vec<_>, _>>().map_err(to_index_error)
    }

    async fn recent(&self, limit: i64) -> IndexResult<Vec<ArtifactRow>> {
        let rows = sqlx::query(
            "SELECT version_purl, filename, upstream_url, blob_path, content_hash, size, content_type, fetched_at, hits \
             FROM artifacts ORDER BY fetched_at DESC NULLS LAST LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(to_index_error)?;
        rows.iter().map(artifact_row_from).collect::<Result<Vec<_>, _>>().map_err(to_index_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxy_backend::Index;

    async fn memory_index() -> SqlIndex {
        SqlIndex::connect("sqlite::memory:", 1).await.unwrap()
    }

    #[tokio::test]
    async fn fetch_then_hit_preserves_path() {
        let index = memory_index().await;
        index
            .upsert_artifact(
                Ecosystem::Npm,
                "lodash",
                "4.17.21",
                "lodash-4.17.21.tgz",
                ArtifactUpsert::fetched(
                    "https://registry.npmjs.org/lodash/-/lodash-4.17.21.tgz".into(),
                    "npm/lodash/4.17.21/lodash-4.17.21.tgz".into(),
                    "deadbeef".into(),
                    1234,
                    Some("application/octet-stream".into()),
                ),
            )
            .await
            .unwrap();

        index
            .upsert_artifact(Ecosystem::Npm, "lodash", "4.17.21", "lodash-4.17.21.tgz", ArtifactUpsert::hit())
            .await
            .unwrap();

        let row = index
            .get_artifact("pkg:npm/lodash@4.17.21", "lodash-4.17.21.tgz")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.hits, 1);
        assert_eq!(row.blob_path.as_deref(), Some("npm/lodash/4.17.21/lodash-4.17.21.tgz"));
        assert_eq!(row.content_hash.as_deref(), Some("deadbeef"));
    }

    #[tokio::test]
    async fn counts_reflect_cached_artifacts() {
        let index = memory_index().await;
        index
            .upsert_artifact(
                Ecosystem::Cargo,
                "serde",
                "1.0.0",
                "serde-1.0.0.crate",
                ArtifactUpsert::fetched("https://static.crates.io/serde-1.0.0.crate".into(), "cargo/serde/1.0.0/serde-1.0.0.crate".into(), "abc123".into(), 500, None),
            )
            .await
            .unwrap();

        let counts = index.counts().await.unwrap();
        assert_eq!(counts.packages, 1);
        assert_eq!(counts.versions, 1);
        assert_eq!(counts.artifacts, 1);
        assert_eq!(counts.cached_artifacts, 1);
        assert_eq!(counts.total_bytes, 500);
    }

    #[tokio::test]
    async fn package_row_is_absent_before_first_upsert() {
        let index = memory_index().await;
        assert!(index.get_package("pkg:npm/left-pad").await.unwrap().is_none());
    }
}
