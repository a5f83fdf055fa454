//! CRAN adapter.
//!
//! Artifact: `/src/contrib/{name}_{version}.tar.gz` or
//! `/bin/…/{name}_{version}.{zip|tgz}`, split at the last underscore.

use http::Method;
use proxy_core::{ArtifactIdentity, Ecosystem};

use crate::{Adapter, Disposition, Identified, RewriteContext};

const EXTENSIONS: &[&str] = &["tar.gz", "zip", "tgz"];

pub struct CranAdapter {
    pub upstream_base: String,
}

impl CranAdapter {
    pub fn new(upstream_base: impl Into<String>) -> Self {
        Self { upstream_base: upstream_base.into() }
    }
}

fn strip_known_extension(filename: &str) -> Option<(&str, &str)> {
    EXTENSIONS.iter().find_map(|ext| filename.strip_suffix(&format!(".{ext}")).map(|stem| (stem, *ext)))
}

fn split_filename(filename: &str) -> Option<(String, String)> {
    let (stem, _ext) = strip_known_extension(filename)?;
    let (name, version) = stem.rsplit_once('_')?;
    Some((name.to_string(), version.to_string()))
}

impl Adapter for CranAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Cran
    }

    fn classify(&self, method: &Method, path: &str) -> Disposition {
        if method != Method::GET {
            return Disposition::Unsupported;
        }
        let filename = path.rsplit('/').next().unwrap_or("");
        if (path.starts_with("/src/contrib/") || path.starts_with("/bin/")) && strip_known_extension(filename).is_some() {
            Disposition::Artifact
        } else {
            Disposition::Other
        }
    }

    fn identify(&self, path: &str) -> Option<Identified> {
        let filename = path.rsplit('/').next()?;
        let (name, version) = split_filename(filename)?;

        let identity = ArtifactIdentity::new(Ecosystem::Cran, name, version, filename.to_string());
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
    fn identifies_src_contrib_artifact() {
        let adapter = CranAdapter::new("https://cran.r-project.org");
        let identified = adapter.identify("/src/contrib/ggplot2_3.4.4.tar.gz").unwrap();
        assert_eq!(identified.identity.name, "ggplot2");
        assert_eq!(identified.identity.version, "3.4.4");
    }

    #[test]
    fn identifies_bin_zip_artifact() {
        let adapter = CranAdapter::new("https://cran.r-project.org");
        let identified = adapter.identify("/bin/windows/contrib/4.3/ggplot2_3.4.4.zip").unwrap();
        assert_eq!(identified.identity.version, "3.4.4");
    }
}
