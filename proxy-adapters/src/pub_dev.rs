//! Dart/Flutter `pub.dev` adapter.
//!
//! Artifact: `/packages/{name}/versions/{version}.tar.gz` — trivial.
//! Listing: the package metadata JSON, whose `archive_url` fields get
//! rewritten.

use http::Method;
use proxy_core::{ArtifactIdentity, Ecosystem};
use regex::Regex;
use std::sync::LazyLock;

use crate::{Adapter, Disposition, Identified, RewriteContext};

static ARTIFACT_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/packages/(?P<name>[^/]+)/versions/(?P<version>[^/]+)\.tar\.gz$").unwrap());
static LISTING_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/api/packages/(?P<name>[^/]+)$").unwrap());

pub struct PubDevAdapter {
    pub upstream_base: String,
}

impl PubDevAdapter {
    pub fn new(upstream_base: impl Into<String>) -> Self {
        Self { upstream_base: upstream_base.into() }
    }
}

impl Adapter for PubDevAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Pub
    }

    fn classify(&self, method: &Method, path: &str) -> Disposition {
        if method != Method::GET {
            return Disposition::Unsupported;
        }
        if ARTIFACT_PATH.is_match(path) {
            Disposition::Artifact
        } else if LISTING_PATH.is_match(path) {
            Disposition::Listing
        } else {
            Disposition::Other
        }
    }

    fn identify(&self, path: &str) -> Option<Identified> {
        let caps = ARTIFACT_PATH.captures(path)?;
        let name = caps["name"].to_string();
        let version = caps["version"].to_string();
        let filename = format!("{name}-{version}.tar.gz");

        let identity = ArtifactIdentity::new(Ecosystem::Pub, name, version, filename);
        let upstream_url = format!("{}{}", self.upstream_base, path);
        Some(Identified { identity, upstream_url })
    }

    fn rewrite(&self, body: &[u8], ctx: &RewriteContext) -> Vec<u8> {
        match crate::rewrite::rewrite_json_urls(body, &self.upstream_base, ctx) {
            Some(rewritten) => rewritten,
            None => {
                tracing::warn!("pub: failed to parse package metadata, passing through unchanged");
                body.to_vec()
            }
        }
    }

    fn passthrough_url(&self, path: &str) -> String {
        format!("{}{}", self.upstream_base, path)
    }
}
