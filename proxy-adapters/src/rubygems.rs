//! RubyGems adapter.
//!
//! Artifact: `/gems/{name}-{version}.gem`, split at the last hyphen whose
//! following segment starts with a digit (gem names may themselves contain
//! hyphens, e.g. `actionpack-page_caching`).

use http::Method;
use proxy_core::{ArtifactIdentity, Ecosystem};

use crate::{Adapter, Disposition, Identified, RewriteContext};

pub struct RubyGemsAdapter {
    pub upstream_base: String,
}

impl RubyGemsAdapter {
    pub fn new(upstream_base: impl Into<String>) -> Self {
        Self { upstream_base: upstream_base.into() }
    }
}

/// Splits `{name}-{version}` at the last hyphen followed by a digit.
pub fn split_name_version(stem: &str) -> Option<(String, String)> {
    let bytes = stem.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b == b'-' && bytes.get(i + 1).is_some_and(u8::is_ascii_digit) {
            // keep scanning for the LAST such hyphen
            let mut last = i;
            for (j, c) in bytes.iter().enumerate().skip(i + 1) {
                if *c == b'-' && bytes.get(j + 1).is_some_and(u8::is_ascii_digit) {
                    last = j;
                }
            }
            let name = &stem[..last];
            let version = &stem[last + 1..];
            if name.is_empty() || version.is_empty() {
                return None;
            }
            return Some((name.to_string(), version.to_string()));
        }
    }
    None
}

impl Adapter for RubyGemsAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::RubyGems
    }

    fn classify(&self, method: &Method, path: &str) -> Disposition {
        if method != Method::GET {
            return Disposition::Unsupported;
        }
        if path.starts_with("/gems/") && path.ends_with(".gem") {
            Disposition::Artifact
        } else {
            Disposition::Other
        }
    }

    fn identify(&self, path: &str) -> Option<Identified> {
        let filename = path.strip_prefix("/gems/")?;
        let stem = filename.strip_suffix(".gem")?;
        let (name, version) = split_name_version(stem)?;

        let identity = ArtifactIdentity::new(Ecosystem::RubyGems, name, version, filename.to_string());
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
    fn splits_simple_name() {
        assert_eq!(split_name_version("rails-7.1.0").unwrap(), ("rails".to_string(), "7.1.0".to_string()));
    }

    #[test]
    fn splits_hyphenated_name() {
        assert_eq!(
            split_name_version("actionpack-page_caching-1.2.3").unwrap(),
            ("actionpack-page_caching".to_string(), "1.2.3".to_string())
        );
    }

    #[test]
    fn identifies_gem_artifact() {
        let adapter = RubyGemsAdapter::new("https://rubygems.org");
        let identified = adapter.identify("/gems/rails-7.1.0.gem").unwrap();
        assert_eq!(identified.identity.name, "rails");
        assert_eq!(identified.identity.version, "7.1.0");
    }
}
