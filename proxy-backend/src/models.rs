//! Row types for the three-level Package -> Version -> Artifact schema.

use chrono::{DateTime, Utc};
use proxy_core::Ecosystem;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRow {
    pub purl: String,
    pub ecosystem: Ecosystem,
    pub name: String,
    pub upstream_registry_url: String,
    pub last_enriched_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionRow {
    pub purl: String,
    pub package_purl: String,
    pub version: String,
}

/// An artifact row. `blob_path`, `content_hash`, `size`, `content_type`, and
/// `fetched_at` are nullable: null until the first successful fetch, refreshed
/// on every subsequent successful fetch, and never touched by a hit-recording
/// update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactRow {
    pub version_purl: String,
    pub filename: String,
    pub upstream_url: String,
    pub blob_path: Option<String>,
    pub content_hash: Option<String>,
    pub size: Option<i64>,
    pub content_type: Option<String>,
    pub fetched_at: Option<DateTime<Utc>>,
    pub hits: i64,
}

impl ArtifactRow {
    /// An artifact is *cached* (per the index's bookkeeping — the live
    /// blob-store check in the cache core is the final authority) iff it has
    /// a recorded blob path.
    pub fn is_cached(&self) -> bool {
        self.blob_path.is_some()
    }
}

/// Idempotent, partial upsert for a package row. Supplying `None` for a field
/// must never overwrite an existing non-null value.
#[derive(Debug, Clone)]
pub struct PackageUpsert {
    pub ecosystem: Ecosystem,
    pub name: String,
    pub upstream_registry_url: String,
}

#[derive(Debug, Clone)]
pub struct VersionUpsert {
    pub ecosystem: Ecosystem,
    pub name: String,
    pub version: String,
}

/// Partial upsert for an artifact row.
///
/// A hit-recording update constructs one of these with every field `None`
/// except the key — that's what makes "record a hit" cheap and safe to run
/// without clobbering the path/hash/size columns a concurrent fetch just
/// wrote.
#[derive(Debug, Clone, Default)]
pub struct ArtifactUpsert {
    pub upstream_url: Option<String>,
    pub blob_path: Option<String>,
    pub content_hash: Option<String>,
    pub size: Option<i64>,
    pub content_type: Option<String>,
    pub touch_fetched_at: bool,
    pub increment_hit: bool,
    pub reset_hits: bool,
}

impl ArtifactUpsert {
    /// An upsert recording a fresh successful fetch: path/hash/size/type are
    /// all set, `fetched_at` is refreshed, and hits reset to zero.
    pub fn fetched(
        upstream_url: String,
        blob_path: String,
        content_hash: String,
        size: i64,
        content_type: Option<String>,
    ) -> Self {
        Self {
            upstream_url: Some(upstream_url),
            blob_path: Some(blob_path),
            content_hash: Some(content_hash),
            size: Some(size),
            content_type,
            touch_fetched_at: true,
            increment_hit: false,
            reset_hits: true,
        }
    }

    /// An upsert recording a cache hit: only the hit counter moves.
    pub fn hit() -> Self {
        Self {
            increment_hit: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct IndexCounts {
    pub packages: i64,
    pub versions: i64,
    pub artifacts: i64,
    pub cached_artifacts: i64,
    pub total_bytes: i64,
}
