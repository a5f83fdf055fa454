//! OCI / Docker Distribution adapter.
//!
//! The one ecosystem with real protocol plumbing beyond path parsing:
//! it authenticates against the registry's bearer-token endpoint before each
//! upstream call, always answers with the mandatory
//! `Docker-Distribution-Api-Version: registry/2.0` header, and caches only
//! blobs — manifests are tag-mutable and always proxied live.

use http::Method;
use proxy_core::{ArtifactIdentity, Ecosystem};
use regex::Regex;
use std::sync::LazyLock;

use crate::{Adapter, Disposition, Identified, RewriteContext};

/// Value of the `Docker-Distribution-Api-Version` header every response must
/// carry, per the Docker Registry HTTP API v2 spec.
pub const API_VERSION_HEADER_VALUE: &str = "registry/2.0";

static BLOB_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/(?P<name>.+)/blobs/(?P<digest>sha256:[0-9a-f]{64})$").unwrap());
static MANIFEST_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/(?P<name>.+)/manifests/(?P<reference>[^/]+)$").unwrap());

pub struct OciAdapter {
    pub upstream_base: String,
}

impl OciAdapter {
    pub fn new(upstream_base: impl Into<String>) -> Self {
        Self { upstream_base: upstream_base.into() }
    }
}

/// A request for the bearer token handed out by the registry's
/// `WWW-Authenticate` challenge (`realm`, `service`, `scope` query params).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub realm: String,
    pub service: String,
    pub scope: String,
}

impl TokenRequest {
    /// Parses an OCI `WWW-Authenticate: Bearer realm="...",service="...",scope="..."`
    /// challenge header value.
    pub fn parse_challenge(header_value: &str) -> Option<Self> {
        let rest = header_value.strip_prefix("Bearer ")?;
        let mut realm = None;
        let mut service = None;
        let mut scope = None;
        for part in rest.split(',') {
            let (key, value) = part.trim().split_once('=')?;
            let value = value.trim_matches('"').to_string();
            match key {
                "realm" => realm = Some(value),
                "service" => service = Some(value),
                "scope" => scope = Some(value),
                _ => {}
            }
        }
        Some(TokenRequest {
            realm: realm?,
            service: service?,
            scope: scope?,
        })
    }

    pub fn token_url(&self) -> String {
        format!(
            "{}?service={}&scope={}",
            self.realm,
            percent_encoding::utf8_percent_encode(&self.service, percent_encoding::NON_ALPHANUMERIC),
            percent_encoding::utf8_percent_encode(&self.scope, percent_encoding::NON_ALPHANUMERIC)
        )
    }
}

impl Adapter for OciAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Oci
    }

    fn classify(&self, method: &Method, path: &str) -> Disposition {
        if path == "/" {
            return if *method == Method::GET { Disposition::Other } else { Disposition::Unsupported };
        }
        if *method != Method::GET && *method != Method::HEAD {
            return Disposition::Unsupported;
        }
        if BLOB_PATH.is_match(path) {
            Disposition::Artifact
        } else if MANIFEST_PATH.is_match(path) {
            // Manifests are tag-mutable, so they're never cached, but they
            // are still a known, proxied-live request shape.
            Disposition::Listing
        } else {
            Disposition::Other
        }
    }

    fn identify(&self, path: &str) -> Option<Identified> {
        let caps = BLOB_PATH.captures(path)?;
        let name = caps["name"].to_string();
        let digest = caps["digest"].to_string();

        let identity = ArtifactIdentity::new(Ecosystem::Oci, name, digest.clone(), digest);
        let upstream_url = format!("{}{}", self.upstream_base, path);
        Some(Identified { identity, upstream_url })
    }

    fn rewrite(&self, body: &[u8], _ctx: &RewriteContext) -> Vec<u8> {
        body.to_vec()
    }

    fn passthrough_url(&self, path: &str) -> String {
        format!("{}{}", self.upstream_base, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_check_is_not_an_artifact() {
        let adapter = OciAdapter::new("https://registry-1.docker.io/v2");
        assert_eq!(adapter.classify(&Method::GET, "/"), Disposition::Other);
    }

    #[test]
    fn blob_path_is_an_artifact() {
        let adapter = OciAdapter::new("https://registry-1.docker.io/v2");
        let digest = "sha256:9d48c3bd43c520dc2784e868a780e976b207cbf493eaff8896b226ed1c1af730";
        let path = format!("/library/nginx/blobs/{digest}");
        assert_eq!(adapter.classify(&Method::GET, &path), Disposition::Artifact);
        let identified = adapter.identify(&path).unwrap();
        assert_eq!(identified.identity.version, digest);
    }

    #[test]
    fn manifest_path_is_listing_not_artifact() {
        let adapter = OciAdapter::new("https://registry-1.docker.io/v2");
        assert_eq!(adapter.classify(&Method::GET, "/library/nginx/manifests/latest"), Disposition::Listing);
    }

    #[test]
    fn parses_bearer_challenge() {
        let header = r#"Bearer realm="https://auth.docker.io/token",service="registry.docker.io",scope="repository:library/nginx:pull""#;
        let req = TokenRequest::parse_challenge(header).unwrap();
        assert_eq!(req.realm, "https://auth.docker.io/token");
        assert_eq!(req.service, "registry.docker.io");
        assert_eq!(req.scope, "repository:library/nginx:pull");
    }
}
