//! Cargo (crates.io) adapter.
//!
//! Artifact: `/crates/{name}/{version}/download` — trivial extraction.
//! Listing: `/config.json`, whose `dl` template is rewritten to point back
//! at this adapter's own download endpoint. Everything else (the sparse
//! index) is proxied through at a computed upstream path, since the index
//! host's on-disk layout folds package names into a prefix tree that this
//! adapter's own mount doesn't replicate.

use http::Method;
use proxy_core::{ArtifactIdentity, Ecosystem};
use regex::Regex;
use std::sync::LazyLock;

use crate::{Adapter, Disposition, Identified, RewriteContext};

static ARTIFACT_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/crates/(?P<name>[^/]+)/(?P<version>[^/]+)/download$").unwrap());

pub struct CargoAdapter {
    pub upstream_base: String,
    pub index_base: String,
}

impl CargoAdapter {
    pub fn new(upstream_base: impl Into<String>, index_base: impl Into<String>) -> Self {
        Self {
            upstream_base: upstream_base.into(),
            index_base: index_base.into(),
        }
    }
}

/// The sparse-index path cargo computes for a crate name, lowercased:
/// 1 char -> `1/{name}`, 2 chars -> `2/{name}`, 3 chars -> `3/{first}/{name}`,
/// otherwise `{first two}/{next two}/{name}`.
pub fn build_index_path(name: &str) -> String {
    let lower = name.to_lowercase();
    match lower.len() {
        1 => format!("1/{lower}"),
        2 => format!("2/{lower}"),
        3 => {
            let first = &lower[..1];
            format!("3/{first}/{lower}")
        }
        _ => {
            let first2 = &lower[..2];
            let next2 = &lower[2..4];
            format!("{first2}/{next2}/{lower}")
        }
    }
}

impl Adapter for CargoAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Cargo
    }

    fn classify(&self, method: &Method, path: &str) -> Disposition {
        if method != Method::GET {
            return Disposition::Unsupported;
        }
        if ARTIFACT_PATH.is_match(path) {
            Disposition::Artifact
        } else if path == "/config.json" {
            Disposition::Listing
        } else {
            Disposition::Other
        }
    }

    fn identify(&self, path: &str) -> Option<Identified> {
        let caps = ARTIFACT_PATH.captures(path)?;
        let name = caps["name"].to_string();
        let version = caps["version"].to_string();
        let filename = format!("{name}-{version}.crate");
        let identity = ArtifactIdentity::new(Ecosystem::Cargo, name.clone(), version.clone(), filename);
        let upstream_url = format!("{}/crates/{}/{}/download", self.upstream_base, name, version);
        Some(Identified { identity, upstream_url })
    }

    fn rewrite(&self, body: &[u8], ctx: &RewriteContext) -> Vec<u8> {
        let mut value: serde_json::Value = match serde_json::from_slice(body) {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!("cargo: failed to parse config.json, passing through unchanged");
                return body.to_vec();
            }
        };
        value["dl"] = serde_json::Value::String(ctx.proxy_url("/crates/{crate}/{version}/download"));
        serde_json::to_vec(&value).unwrap_or_else(|_| body.to_vec())
    }

    fn passthrough_url(&self, path: &str) -> String {
        if let Some(name) = path.strip_prefix('/') {
            if !name.is_empty() && !name.contains('/') {
                return format!("{}/{}", self.index_base, build_index_path(name));
            }
        }
        format!("{}{}", self.index_base, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_index_path_per_length_bucket() {
        assert_eq!(build_index_path("a"), "1/a");
        assert_eq!(build_index_path("ab"), "2/ab");
        assert_eq!(build_index_path("abc"), "3/a/abc");
        assert_eq!(build_index_path("serde"), "se/rd/serde");
        assert_eq!(build_index_path("SERDE"), "se/rd/serde");
    }

    #[test]
    fn identifies_trivially() {
        let adapter = CargoAdapter::new("https://crates.io/api/v1", "https://index.crates.io");
        let identified = adapter.identify("/crates/serde/1.0.0/download").unwrap();
        assert_eq!(identified.identity.name, "serde");
        assert_eq!(identified.identity.version, "1.0.0");
        assert_eq!(identified.identity.blob_key(), "cargo/serde/1.0.0/serde-1.0.0.crate");
    }

    #[test]
    fn rewrites_config_dl_template() {
        let adapter = CargoAdapter::new("https://crates.io/api/v1", "https://index.crates.io");
        let ctx = RewriteContext::new("https://cache.example.com", "/cargo");
        let out = adapter.rewrite(br#"{"dl":"https://crates.io/api/v1/crates","api":"https://crates.io"}"#, &ctx);
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["dl"], "https://cache.example.com/cargo/crates/{crate}/{version}/download");
    }
}
