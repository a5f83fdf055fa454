//! npm registry adapter.
//!
//! Artifact: `/{pkg}/-/{filename}.tgz`, where `{pkg}` is percent-encoded when
//! scoped (`@babel%2Fcore`). Listing: `/{pkg}` — the package metadata
//! document, whose `versions[*].dist.tarball` fields get rewritten.

use http::Method;
use percent_encoding::percent_decode_str;
use proxy_core::{ArtifactIdentity, Ecosystem, encode_path_segment};
use regex::Regex;
use std::sync::LazyLock;

use crate::{Adapter, Disposition, Identified, RewriteContext};

static ARTIFACT_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/(?P<pkg>[^/]+)/-/(?P<filename>[^/]+\.tgz)$").unwrap());
static LISTING_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/(?P<pkg>[^/]+)$").unwrap());
static TARBALL_SUFFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/(?P<pkg>.+)/-/(?P<filename>[^/]+)$").unwrap());

pub struct NpmAdapter {
    pub upstream_base: String,
}

impl NpmAdapter {
    pub fn new(upstream_base: impl Into<String>) -> Self {
        Self { upstream_base: upstream_base.into() }
    }
}

fn decode_pkg(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

/// `core-7.23.0.tgz` with short name `core` -> `7.23.0`.
fn version_from_filename(short_name: &str, filename: &str) -> Option<String> {
    let stem = filename.strip_suffix(".tgz")?;
    let prefix = format!("{short_name}-");
    stem.strip_prefix(&prefix).map(str::to_string)
}

impl Adapter for NpmAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Npm
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
        let pkg = decode_pkg(&caps["pkg"]);
        let filename = caps["filename"].to_string();
        let short_name = pkg.rsplit('/').next().unwrap_or(&pkg);
        let version = version_from_filename(short_name, &filename)?;

        let namespace = pkg.rsplit_once('/').map(|(scope, _)| scope.to_string());
        let mut identity = ArtifactIdentity::new(Ecosystem::Npm, pkg.clone(), version, filename.clone());
        if let Some(ns) = namespace {
            identity = identity.with_namespace(ns);
        }

        let upstream_url = format!("{}/{}/-/{}", self.upstream_base, pkg, filename);
        Some(Identified { identity, upstream_url })
    }

    fn rewrite(&self, body: &[u8], ctx: &RewriteContext) -> Vec<u8> {
        let encode_pkg_segment = |suffix: &str| match TARBALL_SUFFIX.captures(suffix) {
            Some(caps) => format!("/{}/-/{}", encode_path_segment(&caps["pkg"]), &caps["filename"]),
            None => suffix.to_string(),
        };
        match crate::rewrite::rewrite_json_urls_with(body, &self.upstream_base, ctx, encode_pkg_segment) {
            Some(rewritten) => rewritten,
            None => {
                tracing::warn!("npm: failed to parse package metadata, passing through unchanged");
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

    fn adapter() -> NpmAdapter {
        NpmAdapter::new("https://registry.npmjs.org")
    }

    #[test]
    fn classifies_artifact_and_listing() {
        let a = adapter();
        assert_eq!(a.classify(&Method::GET, "/lodash/-/lodash-4.17.21.tgz"), Disposition::Artifact);
        assert_eq!(a.classify(&Method::GET, "/lodash"), Disposition::Listing);
        assert_eq!(a.classify(&Method::POST, "/lodash"), Disposition::Unsupported);
    }

    #[test]
    fn identifies_unscoped_package() {
        let identified = adapter().identify("/lodash/-/lodash-4.17.21.tgz").unwrap();
        assert_eq!(identified.identity.name, "lodash");
        assert_eq!(identified.identity.version, "4.17.21");
        assert_eq!(identified.upstream_url, "https://registry.npmjs.org/lodash/-/lodash-4.17.21.tgz");
    }

    #[test]
    fn identifies_scoped_package_and_sets_namespace() {
        let identified = adapter().identify("/@babel%2Fcore/-/core-7.23.0.tgz").unwrap();
        assert_eq!(identified.identity.name, "@babel/core");
        assert_eq!(identified.identity.namespace.as_deref(), Some("@babel"));
        assert_eq!(identified.identity.version, "7.23.0");
        assert_eq!(identified.identity.blob_key(), "npm/@babel/core/7.23.0/core-7.23.0.tgz");
    }

    #[test]
    fn rewrites_scoped_tarball_url() {
        let ctx = RewriteContext::new("https://cache.example.com", "/npm");
        let body = br#"{"name":"@babel/core","versions":{"7.23.0":{"dist":{"tarball":"https://registry.npmjs.org/@babel/core/-/core-7.23.0.tgz"}}}}"#;
        let out = adapter().rewrite(body, &ctx);
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            value["versions"]["7.23.0"]["dist"]["tarball"],
            "https://cache.example.com/npm/@babel%2Fcore/-/core-7.23.0.tgz"
        );
    }

    #[test]
    fn unparseable_body_is_passed_through() {
        let ctx = RewriteContext::new("https://cache.example.com", "/npm");
        let out = adapter().rewrite(b"not json", &ctx);
        assert_eq!(out, b"not json");
    }
}
