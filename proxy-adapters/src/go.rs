//! Go module proxy adapter.
//!
//! Artifact: `/{module}/@v/{version}.zip`, where `{module}` is escaped per
//! the Go module path convention: an exclamation mark followed by a letter
//! decodes to that letter uppercased (`!x` -> `X`), since module paths are
//! case-sensitive but must map onto case-insensitive filesystems.

use http::Method;
use proxy_core::{ArtifactIdentity, Ecosystem};
use regex::Regex;
use std::sync::LazyLock;

use crate::{Adapter, Disposition, Identified, RewriteContext};

static ARTIFACT_PATH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/(?P<module>.+)/@v/(?P<version>[^/]+)\.zip$").unwrap());

pub struct GoAdapter {
    pub upstream_base: String,
}

impl GoAdapter {
    pub fn new(upstream_base: impl Into<String>) -> Self {
        Self { upstream_base: upstream_base.into() }
    }
}

/// Decodes a Go module's escaped path: `!` followed by a letter unescapes to
/// that letter uppercased; everything else passes through unchanged.
pub fn decode_module_path(escaped: &str) -> String {
    let mut out = String::with_capacity(escaped.len());
    let mut chars = escaped.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '!' {
            if let Some(&next) = chars.peek() {
                out.push(next.to_ascii_uppercase());
                chars.next();
                continue;
            }
        }
        out.push(c);
    }
    out
}

impl Adapter for GoAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Go
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
        let module = decode_module_path(&caps["module"]);
        let version = caps["version"].to_string();
        let filename = format!("{version}.zip");

        let identity = ArtifactIdentity::new(Ecosystem::Go, module, version, filename);
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
    fn decodes_bang_escaped_segments() {
        assert_eq!(decode_module_path("github.com/!burnt!sushi/toml"), "github.com/BurntSushi/toml");
    }

    #[test]
    fn identifies_module_zip() {
        let adapter = GoAdapter::new("https://proxy.golang.org");
        let identified = adapter.identify("/github.com/!burnt!sushi/toml/@v/v1.3.2.zip").unwrap();
        assert_eq!(identified.identity.name, "github.com/BurntSushi/toml");
        assert_eq!(identified.identity.version, "v1.3.2");
    }
}
