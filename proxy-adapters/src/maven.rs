//! Maven Central (and compatible repository manager) adapter.
//!
//! Artifact: `/{g1}/…/{gN}/{artifact}/{version}/{filename}` with a known
//! extension (`jar`, `war`, `ear`, `pom`, `aar`, `klib`). The group id is the
//! dot-join of every path segment before the artifact/version pair.

use http::Method;
use proxy_core::{ArtifactIdentity, Ecosystem};
use regex::Regex;
use std::sync::LazyLock;

use crate::{Adapter, Disposition, Identified, RewriteContext};

const EXTENSIONS: &[&str] = &["jar", "war", "ear", "pom", "aar", "klib"];

static ARTIFACT_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/(?P<path>.+/(?P<artifact>[^/]+)/(?P<version>[^/]+)/(?P<filename>[^/]+\.(?:jar|war|ear|pom|aar|klib)))$").unwrap());

pub struct MavenAdapter {
    pub upstream_base: String,
}

impl MavenAdapter {
    pub fn new(upstream_base: impl Into<String>) -> Self {
        Self { upstream_base: upstream_base.into() }
    }
}

/// Parses a Maven repository path into `(group, artifact, version)`. Returns
/// `None` when the path is too short to contain a group prefix.
fn parse_coordinates(path: &str) -> Option<(String, String, String)> {
    let caps = ARTIFACT_PATH.captures(path)?;
    let full_path = &caps["path"];
    let artifact = caps["artifact"].to_string();
    let version = caps["version"].to_string();

    let segments: Vec<&str> = full_path.split('/').collect();
    // segments = [..group.., artifact, version, filename]
    if segments.len() < 4 {
        return None;
    }
    let group_segments = &segments[..segments.len() - 3];
    if group_segments.is_empty() {
        return None;
    }
    let group = group_segments.join(".");
    Some((group, artifact, version))
}

impl Adapter for MavenAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Maven
    }

    fn classify(&self, method: &Method, path: &str) -> Disposition {
        if method != Method::GET {
            return Disposition::Unsupported;
        }
        if EXTENSIONS.iter().any(|ext| path.ends_with(&format!(".{ext}"))) {
            Disposition::Artifact
        } else {
            Disposition::Other
        }
    }

    fn identify(&self, path: &str) -> Option<Identified> {
        let caps = ARTIFACT_PATH.captures(path)?;
        let filename = caps["filename"].to_string();
        let (group, artifact, version) = parse_coordinates(path)?;

        let identity = ArtifactIdentity::new(Ecosystem::Maven, artifact, version, filename).with_namespace(group);
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
