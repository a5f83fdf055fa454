//! Hex (Erlang/Elixir) adapter.
//!
//! Artifact: `/tarballs/{name}-{version}.tar`, split the same way RubyGems
//! gem filenames are: last hyphen followed by a digit.

use http::Method;
use proxy_core::{ArtifactIdentity, Ecosystem};

use crate::rubygems::split_name_version;
use crate::{Adapter, Disposition, Identified, RewriteContext};

pub struct HexAdapter {
    pub upstream_base: String,
}

impl HexAdapter {
    pub fn new(upstream_base: impl Into<String>) -> Self {
        Self { upstream_base: upstream_base.into() }
    }
}

impl Adapter for HexAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Hex
    }

    fn classify(&self, method: &Method, path: &str) -> Disposition {
        if method != Method::GET {
            return Disposition::Unsupported;
        }
        if path.starts_with("/tarballs/") && path.ends_with(".tar") {
            Disposition::Artifact
        } else {
            Disposition::Other
        }
    }

    fn identify(&self, path: &str) -> Option<Identified> {
        let filename = path.strip_prefix("/tarballs/")?;
        let stem = filename.strip_suffix(".tar")?;
        let (name, version) = split_name_version(stem)?;

        let identity = ArtifactIdentity::new(Ecosystem::Hex, name, version, filename.to_string());
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
