//! Package URL ("PURL") identifiers used as primary keys into the index.
//!
//! A PURL here is deliberately simplified from the general `purl` spec: it is
//! just `pkg:{ecosystem}/{name}` for a package and `pkg:{ecosystem}/{name}@{version}`
//! for a version. `name` may itself contain slashes (scoped npm packages,
//! Maven group/artifact pairs) — it is never split or re-escaped when building
//! the PURL string, only when building a blob-store path (see [`crate::identity`]).

use std::fmt;

use crate::Ecosystem;

/// `pkg:{ecosystem}/{name}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PackagePurl {
    pub ecosystem: Ecosystem,
    pub name: String,
}

impl PackagePurl {
    pub fn new(ecosystem: Ecosystem, name: impl Into<String>) -> Self {
        Self {
            ecosystem,
            name: name.into(),
        }
    }
}

impl fmt::Display for PackagePurl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pkg:{}/{}", self.ecosystem, self.name)
    }
}

/// `pkg:{ecosystem}/{name}@{version}`
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct VersionPurl {
    pub ecosystem: Ecosystem,
    pub name: String,
    pub version: String,
}

impl VersionPurl {
    pub fn new(ecosystem: Ecosystem, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            ecosystem,
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn package(&self) -> PackagePurl {
        PackagePurl::new(self.ecosystem, self.name.clone())
    }
}

impl fmt::Display for VersionPurl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "pkg:{}/{}@{}", self.ecosystem, self.name, self.version)
    }
}
