//! APT/Debian adapter.
//!
//! Artifact: `pool/…/{name}_{version}_{arch}.deb`, split on `_`.

use http::Method;
use proxy_core::{ArtifactIdentity, Ecosystem};

use crate::{Adapter, Disposition, Identified, RewriteContext};

pub struct DebianAdapter {
    pub upstream_base: String,
}

impl DebianAdapter {
    pub fn new(upstream_base: impl Into<String>) -> Self {
        Self { upstream_base: upstream_base.into() }
    }
}

fn split_filename(filename: &str) -> Option<(String, String, String)> {
    let stem = filename.strip_suffix(".deb")?;
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() != 3 {
        return None;
    }
    Some((parts[0].to_string(), parts[1].to_string(), parts[2].to_string()))
}

impl Adapter for DebianAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Debian
    }

    fn classify(&self, method: &Method, path: &str) -> Disposition {
        if method != Method::GET {
            return Disposition::Unsupported;
        }
        if path.contains("/pool/") && path.ends_with(".deb") {
            Disposition::Artifact
        } else {
            Disposition::Other
        }
    }

    fn identify(&self, path: &str) -> Option<Identified> {
        let filename = path.rsplit('/').next()?;
        let (name, version, arch) = split_filename(filename)?;

        let identity = ArtifactIdentity::new(Ecosystem::Debian, name, version, filename.to_string()).with_namespace(arch);
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
    fn splits_name_version_arch() {
        let (name, version, arch) = split_filename("curl_8.5.0-2_amd64.deb").unwrap();
        assert_eq!(name, "curl");
        assert_eq!(version, "8.5.0-2");
        assert_eq!(arch, "amd64");
    }

    #[test]
    fn identifies_pool_artifact() {
        let adapter = DebianAdapter::new("https://deb.debian.org/debian");
        let identified = adapter.identify("/pool/main/c/curl/curl_8.5.0-2_amd64.deb").unwrap();
        assert_eq!(identified.identity.name, "curl");
        assert_eq!(identified.identity.namespace.as_deref(), Some("amd64"));
    }
}
