//! Composer (Packagist) adapter.
//!
//! Artifact: dist archives served at a vendor-defined path ending in `.zip`
//! or `.tar`, named `{vendor}-{package}-{version}-{ref}.{ext}` by Packagist's
//! dist URL convention. Listing: the p2 metadata JSON, whose `dist.url`
//! fields get rewritten.

use http::Method;
use proxy_core::{ArtifactIdentity, Ecosystem};
use regex::Regex;
use std::sync::LazyLock;

use crate::{Adapter, Disposition, Identified, RewriteContext};

static ARTIFACT_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/dists/(?P<vendor>[^/]+)/(?P<package>[^/]+)/(?P<filename>[^/]+-(?P<version>[^-/]+)-[^-/]+\.(?:zip|tar))$").unwrap());
static LISTING_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/p2/(?P<vendor>[^/]+)/(?P<package>[^/]+)\.json$").unwrap());

pub struct ComposerAdapter {
    pub upstream_base: String,
}

impl ComposerAdapter {
    pub fn new(upstream_base: impl Into<String>) -> Self {
        Self { upstream_base: upstream_base.into() }
    }
}

impl Adapter for ComposerAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Composer
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
        let vendor = caps["vendor"].to_string();
        let package = caps["package"].to_string();
        let version = caps["version"].to_string();
        let filename = caps["filename"].to_string();
        let name = format!("{vendor}/{package}");

        let identity = ArtifactIdentity::new(Ecosystem::Composer, name, version, filename).with_namespace(vendor);
        let upstream_url = format!("{}{}", self.upstream_base, path);
        Some(Identified { identity, upstream_url })
    }

    fn rewrite(&self, body: &[u8], ctx: &RewriteContext) -> Vec<u8> {
        match crate::rewrite::rewrite_json_urls(body, &self.upstream_base, ctx) {
            Some(rewritten) => rewritten,
            None => {
                tracing::warn!("composer: failed to parse p2 metadata, passing through unchanged");
                body.to_vec()
            }
        }
    }

    fn passthrough_url(&self, path: &str) -> String {
        format!("{}{}", self.upstream_base, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifies_dist_archive() {
        let adapter = ComposerAdapter::new("https://packagist.org");
        let identified = adapter.identify("/dists/symfony/console/console-v6.4.0-abcdef0.zip").unwrap();
        assert_eq!(identified.identity.name, "symfony/console");
        assert_eq!(identified.identity.version, "v6.4.0");
    }

    #[test]
    fn rewrites_dist_url_field() {
        let ctx = RewriteContext::new("https://cache.example.com", "/composer");
        let body = br#"{"packages":{"symfony/console":[{"version":"v6.4.0","dist":{"url":"https://packagist.org/dists/symfony/console/console-v6.4.0-abcdef0.zip"}}]}}"#;
        let out = ComposerAdapter::new("https://packagist.org").rewrite(body, &ctx);
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            value["packages"]["symfony/console"][0]["dist"]["url"],
            "https://cache.example.com/composer/dists/symfony/console/console-v6.4.0-abcdef0.zip"
        );
    }
}
