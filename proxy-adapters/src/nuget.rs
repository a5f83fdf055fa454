//! NuGet adapter.
//!
//! Artifact: `/v3-flatcontainer/{id}/{version}/{filename}.nupkg` — trivial
//! extraction, but `{id}` is lowercased for storage (NuGet package ids are
//! case-insensitive and the flat container always serves them lowercased).
//! Listing: the v3 service index, whose resource URLs get rewritten.

use http::Method;
use proxy_core::{ArtifactIdentity, Ecosystem};
use regex::Regex;
use std::sync::LazyLock;

use crate::{Adapter, Disposition, Identified, RewriteContext};

static ARTIFACT_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/v3-flatcontainer/(?P<id>[^/]+)/(?P<version>[^/]+)/(?P<filename>[^/]+\.nupkg)$").unwrap());

pub struct NuGetAdapter {
    pub upstream_base: String,
}

impl NuGetAdapter {
    pub fn new(upstream_base: impl Into<String>) -> Self {
        Self { upstream_base: upstream_base.into() }
    }
}

impl Adapter for NuGetAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::NuGet
    }

    fn classify(&self, method: &Method, path: &str) -> Disposition {
        if method != Method::GET {
            return Disposition::Unsupported;
        }
        if ARTIFACT_PATH.is_match(path) {
            Disposition::Artifact
        } else if path == "/v3/index.json" {
            Disposition::Listing
        } else {
            Disposition::Other
        }
    }

    fn identify(&self, path: &str) -> Option<Identified> {
        let caps = ARTIFACT_PATH.captures(path)?;
        let id = caps["id"].to_lowercase();
        let version = caps["version"].to_string();
        let filename = caps["filename"].to_string();

        let identity = ArtifactIdentity::new(Ecosystem::NuGet, id, version, filename);
        let upstream_url = format!("{}{}", self.upstream_base, path);
        Some(Identified { identity, upstream_url })
    }

    fn rewrite(&self, body: &[u8], ctx: &RewriteContext) -> Vec<u8> {
        match crate::rewrite::rewrite_json_urls(body, &self.upstream_base, ctx) {
            Some(rewritten) => rewritten,
            None => {
                tracing::warn!("nuget: failed to parse service index, passing through unchanged");
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
    fn identifies_and_lowercases_id() {
        let adapter = NuGetAdapter::new("https://api.nuget.org/v3-flatcontainer");
        let identified = adapter.identify("/v3-flatcontainer/Newtonsoft.Json/13.0.3/newtonsoft.json.13.0.3.nupkg").unwrap();
        assert_eq!(identified.identity.name, "newtonsoft.json");
        assert_eq!(identified.identity.version, "13.0.3");
    }
}
