//! PyPI adapter.
//!
//! Artifact: `/packages/{path…}` ending in a wheel or sdist filename. Listing:
//! the simple-index HTML pages and the JSON project API, both rewritten in
//! place — the HTML via a plain string replace (no HTML parser dependency),
//! the JSON via the shared document walker.

use http::Method;
use proxy_core::{ArtifactIdentity, Ecosystem};
use regex::Regex;
use std::sync::LazyLock;

use crate::{Adapter, Disposition, Identified, RewriteContext};

static WHEEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<name>[^/]+)-(?P<version>[^-]+)-(?P<pytag>[^-]+)-(?P<abi>[^-]+)-(?P<platform>[^-]+)\.whl$").unwrap());
static SDIST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(?P<name>[^/]+)-(?P<version>\d[^/]*?)\.(?:tar\.gz|zip|tar\.bz2|tar)$").unwrap());

pub struct PyPiAdapter {
    pub upstream_base: String,
}

impl PyPiAdapter {
    pub fn new(upstream_base: impl Into<String>) -> Self {
        Self { upstream_base: upstream_base.into() }
    }
}

fn parse_filename(filename: &str) -> Option<(String, String)> {
    if let Some(caps) = WHEEL.captures(filename) {
        return Some((caps["name"].to_string(), caps["version"].to_string()));
    }
    if let Some(caps) = SDIST.captures(filename) {
        return Some((caps["name"].to_string(), caps["version"].to_string()));
    }
    None
}

impl Adapter for PyPiAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::PyPi
    }

    fn classify(&self, method: &Method, path: &str) -> Disposition {
        if method != Method::GET {
            return Disposition::Unsupported;
        }
        if path.starts_with("/packages/") && parse_filename(path.rsplit('/').next().unwrap_or("")).is_some() {
            Disposition::Artifact
        } else if path.starts_with("/simple/") || path.starts_with("/pypi/") {
            Disposition::Listing
        } else {
            Disposition::Other
        }
    }

    fn identify(&self, path: &str) -> Option<Identified> {
        let filename = path.strip_prefix("/packages/")?.rsplit('/').next()?;
        let (name, version) = parse_filename(filename)?;

        let identity = ArtifactIdentity::new(Ecosystem::PyPi, name, version, filename.to_string());
        let upstream_url = format!("{}{}", self.upstream_base, path);
        Some(Identified { identity, upstream_url })
    }

    fn rewrite(&self, body: &[u8], ctx: &RewriteContext) -> Vec<u8> {
        if let Some(rewritten) = crate::rewrite::rewrite_json_urls(body, &self.upstream_base, ctx) {
            return rewritten;
        }
        match crate::rewrite::rewrite_text_urls(body, &self.upstream_base, ctx) {
            Some(rewritten) => rewritten,
            None => {
                tracing::warn!("pypi: failed to parse index document, passing through unchanged");
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

    fn adapter() -> PyPiAdapter {
        PyPiAdapter::new("https://files.pythonhosted.org")
    }

    #[test]
    fn classifies_wheel_artifact() {
        let a = adapter();
        assert_eq!(
            a.classify(&Method::GET, "/packages/ab/cd/requests-2.31.0-py3-none-any.whl"),
            Disposition::Artifact
        );
        assert_eq!(a.classify(&Method::GET, "/simple/requests/"), Disposition::Listing);
    }

    #[test]
    fn identifies_wheel() {
        let identified = adapter().identify("/packages/ab/cd/requests-2.31.0-py3-none-any.whl").unwrap();
        assert_eq!(identified.identity.name, "requests");
        assert_eq!(identified.identity.version, "2.31.0");
    }

    #[test]
    fn identifies_sdist() {
        let identified = adapter().identify("/packages/ab/cd/requests-2.31.0.tar.gz").unwrap();
        assert_eq!(identified.identity.name, "requests");
        assert_eq!(identified.identity.version, "2.31.0");
    }

    #[test]
    fn rewrites_simple_index_html() {
        let ctx = RewriteContext::new("https://cache.example.com", "/pypi");
        let body = br#"<a href="https://files.pythonhosted.org/packages/ab/cd/requests-2.31.0.tar.gz">requests-2.31.0.tar.gz</a>"#;
        let out = adapter().rewrite(body, &ctx);
        assert!(String::from_utf8(out).unwrap().contains("https://cache.example.com/pypi/packages/ab/cd/requests-2.31.0.tar.gz"));
    }
}
