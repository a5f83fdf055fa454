//! Conan adapter.
//!
//! Artifact: `/…/recipe|package/…/{filename}`, restricted to the three files
//! Conan actually wants cached (`conan_sources.tgz`, `conan_export.tgz`,
//! `conan_package.tgz`). Conan's own paths carry a recipe revision and,
//! for package artifacts, a package reference and package revision; none of
//! these are unique on their own, so they're folded into the stored version
//! string by underscore concatenation.

use http::Method;
use proxy_core::{ArtifactIdentity, Ecosystem};
use regex::Regex;
use std::sync::LazyLock;

use crate::{Adapter, Disposition, Identified, RewriteContext};

const CACHEABLE_FILES: &[&str] = &["conan_sources.tgz", "conan_export.tgz", "conan_package.tgz"];

static RECIPE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/v2/conans/(?P<name>[^/]+)/(?P<version>[^/]+)/(?P<user>[^/]+)/(?P<channel>[^/]+)/revisions/(?P<revision>[^/]+)/files/(?P<filename>[^/]+)$").unwrap()
});
static PACKAGE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^/v2/conans/(?P<name>[^/]+)/(?P<version>[^/]+)/(?P<user>[^/]+)/(?P<channel>[^/]+)/revisions/(?P<revision>[^/]+)/packages/(?P<pkgref>[^/]+)/revisions/(?P<pkgrev>[^/]+)/files/(?P<filename>[^/]+)$",
    )
    .unwrap()
});

pub struct ConanAdapter {
    pub upstream_base: String,
}

impl ConanAdapter {
    pub fn new(upstream_base: impl Into<String>) -> Self {
        Self { upstream_base: upstream_base.into() }
    }
}

fn is_cacheable_filename(filename: &str) -> bool {
    CACHEABLE_FILES.contains(&filename)
}

impl Adapter for ConanAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Conan
    }

    fn classify(&self, method: &Method, path: &str) -> Disposition {
        if method != Method::GET {
            return Disposition::Unsupported;
        }
        let filename = path.rsplit('/').next().unwrap_or("");
        if (RECIPE_PATH.is_match(path) || PACKAGE_PATH.is_match(path)) && is_cacheable_filename(filename) {
            Disposition::Artifact
        } else {
            Disposition::Other
        }
    }

    fn identify(&self, path: &str) -> Option<Identified> {
        let filename = path.rsplit('/').next()?;
        if !is_cacheable_filename(filename) {
            return None;
        }

        if let Some(caps) = PACKAGE_PATH.captures(path) {
            let name = caps["name"].to_string();
            let version = format!("{}_{}_{}", &caps["version"], &caps["pkgref"], &caps["pkgrev"]);
            let namespace = format!("{}/{}/{}", &caps["user"], &caps["channel"], &caps["revision"]);
            let identity = ArtifactIdentity::new(Ecosystem::Conan, name, version, filename.to_string()).with_namespace(namespace);
            let upstream_url = format!("{}{}", self.upstream_base, path);
            return Some(Identified { identity, upstream_url });
        }

        let caps = RECIPE_PATH.captures(path)?;
        let name = caps["name"].to_string();
        let version = format!("{}_{}", &caps["version"], &caps["revision"]);
        let namespace = format!("{}/{}", &caps["user"], &caps["channel"]);
        let identity = ArtifactIdentity::new(Ecosystem::Conan, name, version, filename.to_string()).with_namespace(namespace);
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
    fn identifies_recipe_source_artifact() {
        let adapter = ConanAdapter::new("https://center.conan.io");
        let identified = adapter
            .identify("/v2/conans/zlib/1.3.1/_/_/revisions/abc123/files/conan_sources.tgz")
            .unwrap();
        assert_eq!(identified.identity.name, "zlib");
        assert_eq!(identified.identity.version, "1.3.1_abc123");
    }

    #[test]
    fn identifies_package_binary_artifact() {
        let adapter = ConanAdapter::new("https://center.conan.io");
        let identified = adapter
            .identify("/v2/conans/zlib/1.3.1/_/_/revisions/abc123/packages/def456/revisions/ghi789/files/conan_package.tgz")
            .unwrap();
        assert_eq!(identified.identity.version, "1.3.1_def456_ghi789");
    }

    #[test]
    fn non_cacheable_filename_is_not_an_artifact() {
        let adapter = ConanAdapter::new("https://center.conan.io");
        assert!(adapter.identify("/v2/conans/zlib/1.3.1/_/_/revisions/abc123/files/conanfile.py").is_none());
    }
}
