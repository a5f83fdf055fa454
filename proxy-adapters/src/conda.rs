//! Conda adapter.
//!
//! Artifact: `/{channel}/{arch}/{name}-{version}-{build}.{conda|tar.bz2}`.
//! The last two hyphen-separated segments of the stem are the version and
//! build string; everything before that is the package name. Channel/arch
//! become the blob namespace since conda build strings alone aren't globally
//! unique across channels.

use http::Method;
use proxy_core::{ArtifactIdentity, Ecosystem};
use regex::Regex;
use std::sync::LazyLock;

use crate::{Adapter, Disposition, Identified, RewriteContext};

static ARTIFACT_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(?P<channel>[^/]+)/(?P<arch>[^/]+)/(?P<stem>[^/]+)\.(?P<ext>conda|tar\.bz2)$").unwrap());

pub struct CondaAdapter {
    pub upstream_base: String,
}

impl CondaAdapter {
    pub fn new(upstream_base: impl Into<String>) -> Self {
        Self { upstream_base: upstream_base.into() }
    }
}

/// Splits `{name}-{version}-{build}` into its three parts.
fn split_stem(stem: &str) -> Option<(String, String, String)> {
    let mut parts: Vec<&str> = stem.split('-').collect();
    if parts.len() < 3 {
        return None;
    }
    let build = parts.pop().unwrap();
    let version = parts.pop().unwrap();
    let name = parts.join("-");
    Some((name, version.to_string(), build.to_string()))
}

impl Adapter for CondaAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Conda
    }

    fn classify(&self, method: &Method, path: &str) -> Disposition {
        if method != Method::GET {
            return Disposition::Unsupported;
        }
        if ARTIFACT_PATH.is_match(path) {
            Disposition::Artifact
        } else {
            Disposition::Other
        }
    }

    fn identify(&self, path: &str) -> Option<Identified> {
        let caps = ARTIFACT_PATH.captures(path)?;
        let channel = caps["channel"].to_string();
        let arch = caps["arch"].to_string();
        let stem = &caps["stem"];
        let ext = &caps["ext"];
        let (name, version, build) = split_stem(stem)?;
        let filename = format!("{stem}.{ext}");

        // Build strings repeat across channels; fold channel/arch/build into
        // an extended version so the stored tuple stays globally unique.
        let extended_version = format!("{version}-{build}-{channel}-{arch}");
        let identity = ArtifactIdentity::new(Ecosystem::Conda, name, extended_version, filename)
            .with_namespace(format!("{channel}/{arch}"));
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
    fn splits_name_version_build() {
        let (name, version, build) = split_stem("numpy-1.26.0-py311h64a7726_0").unwrap();
        assert_eq!(name, "numpy");
        assert_eq!(version, "1.26.0");
        assert_eq!(build, "py311h64a7726_0");
    }

    #[test]
    fn identifies_conda_artifact_with_extended_version() {
        let adapter = CondaAdapter::new("https://conda.anaconda.org");
        let identified = adapter.identify("/conda-forge/linux-64/numpy-1.26.0-py311h64a7726_0.conda").unwrap();
        assert_eq!(identified.identity.name, "numpy");
        assert_eq!(identified.identity.version, "1.26.0-py311h64a7726_0-conda-forge-linux-64");
        assert_eq!(identified.identity.namespace.as_deref(), Some("conda-forge/linux-64"));
    }
}
