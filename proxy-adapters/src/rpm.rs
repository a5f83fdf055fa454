//! RPM/Yum adapter.
//!
//! Artifact: `…/{name}-{version}-{release}.{arch}.rpm`. The parsing regex is
//! carried over verbatim from the upstream tooling this proxy fronts,
//! including its known limitation: package names with a trailing numeric
//! suffix in the wrong place can defeat the `[^-]+` release group and the
//! filename fails to parse at all, falling back to pass-through proxying
//! rather than a cache miss.

use http::Method;
use proxy_core::{ArtifactIdentity, Ecosystem};
use regex::Regex;
use std::sync::LazyLock;

use crate::{Adapter, Disposition, Identified, RewriteContext};

static FILENAME: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^(.+)-([^-]+)-([^-]+)\.([^.]+)\.rpm$").unwrap());

pub struct RpmAdapter {
    pub upstream_base: String,
}

impl RpmAdapter {
    pub fn new(upstream_base: impl Into<String>) -> Self {
        Self { upstream_base: upstream_base.into() }
    }
}

/// `(name, version-release, arch)`, or `None` if the filename doesn't match
/// the regex above. Do not try to make this smarter; the behavior — including
/// its false negatives — is intentional.
pub fn parse_filename(filename: &str) -> Option<(String, String, String)> {
    let caps = FILENAME.captures(filename)?;
    let name = caps[1].to_string();
    let version = caps[2].to_string();
    let release = caps[3].to_string();
    let arch = caps[4].to_string();
    Some((name, format!("{version}-{release}"), arch))
}

impl Adapter for RpmAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Rpm
    }

    fn classify(&self, method: &Method, path: &str) -> Disposition {
        if method != Method::GET {
            return Disposition::Unsupported;
        }
        if path.ends_with(".rpm") {
            Disposition::Artifact
        } else {
            Disposition::Other
        }
    }

    fn identify(&self, path: &str) -> Option<Identified> {
        let filename = path.rsplit('/').next()?;
        let (name, version, arch) = parse_filename(filename)?;

        let identity = ArtifactIdentity::new(Ecosystem::Rpm, name, version, filename.to_string()).with_namespace(arch);
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
    fn parses_standard_filename() {
        let (name, version, arch) = parse_filename("nginx-1.24.0-1.fc39.x86_64.rpm").unwrap();
        assert_eq!(name, "nginx");
        assert_eq!(version, "1.24.0-1.fc39");
        assert_eq!(arch, "x86_64");
    }

    #[test]
    fn invalid_filename_does_not_parse() {
        assert!(parse_filename("invalid.rpm").is_none());
    }

    #[test]
    fn unparseable_artifact_identify_returns_none() {
        let adapter = RpmAdapter::new("https://mirror.example.com");
        assert!(adapter.identify("/path/to/invalid.rpm").is_none());
    }
}
