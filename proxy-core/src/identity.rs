//! The stable identity tuple an adapter extracts from a request, and the pure
//! function that turns it into a blob-store key.

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

use crate::{Ecosystem, PackagePurl, VersionPurl};

/// `(ecosystem, name, version, filename)` plus an optional extra path
/// component (`namespace`) used only for blob-store placement — npm scopes,
/// Maven groups, Conda channels, and so on.
///
/// This is the one type every adapter's `identify()` produces and the cache
/// core's `GetOrFetch`/`GetOrFetchFromURL` consumes. Constructing one does not
/// touch the index or the blob store; it is a pure value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactIdentity {
    pub ecosystem: Ecosystem,
    pub namespace: Option<String>,
    pub name: String,
    pub version: String,
    pub filename: String,
}

impl ArtifactIdentity {
    pub fn new(
        ecosystem: Ecosystem,
        name: impl Into<String>,
        version: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            ecosystem,
            namespace: None,
            name: name.into(),
            version: version.into(),
            filename: filename.into(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn package_purl(&self) -> PackagePurl {
        PackagePurl::new(self.ecosystem, self.name.clone())
    }

    pub fn version_purl(&self) -> VersionPurl {
        VersionPurl::new(self.ecosystem, self.name.clone(), self.version.clone())
    }

    /// The deterministic blob-store key for this identity:
    /// `{ecosystem}/[{namespace}/]{name}/{version}/{filename}`.
    ///
    /// This is a pure function of the tuple — it is never read back from the
    /// index when a new artifact is stored.
    pub fn blob_key(&self) -> String {
        let mut segments: Vec<&str> = Vec::with_capacity(5);
        let eco = self.ecosystem.as_str();
        segments.push(eco);
        if let Some(ns) = self.namespace.as_deref() {
            segments.push(ns);
        }
        segments.push(self.name.as_str());
        segments.push(self.version.as_str());
        segments.push(self.filename.as_str());
        segments.join("/")
    }
}

/// Characters that must be percent-encoded when a package name is embedded in
/// a rewritten proxy URL path segment (scoped npm names contain `/`).
const PATH_SEGMENT: &AsciiSet = &CONTROLS.add(b'/').add(b'%').add(b'?').add(b'#');

/// Percent-encode a package name for use as a single URL path segment.
pub fn encode_path_segment(name: &str) -> String {
    utf8_percent_encode(name, PATH_SEGMENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_key_without_namespace() {
        let id = ArtifactIdentity::new(Ecosystem::Cargo, "serde", "1.0.0", "serde-1.0.0.crate");
        assert_eq!(id.blob_key(), "cargo/serde/1.0.0/serde-1.0.0.crate");
    }

    #[test]
    fn blob_key_with_namespace() {
        let id = ArtifactIdentity::new(Ecosystem::Npm, "core", "7.23.0", "core-7.23.0.tgz")
            .with_namespace("@babel");
        assert_eq!(id.blob_key(), "npm/@babel/core/7.23.0/core-7.23.0.tgz");
    }

    #[test]
    fn encodes_scoped_name_for_url() {
        assert_eq!(encode_path_segment("@babel/core"), "@babel%2Fcore");
    }
}
