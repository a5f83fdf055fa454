//! The fixed set of package ecosystems the proxy fronts.

use std::fmt;
use std::str::FromStr;

/// One of the package registries this proxy speaks the native protocol of.
///
/// The variant name doubles as the PURL type component and the blob-store
/// path prefix (see [`Ecosystem::as_str`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Npm,
    Cargo,
    Maven,
    PyPi,
    RubyGems,
    Hex,
    Conda,
    Debian,
    Rpm,
    Cran,
    Go,
    NuGet,
    Pub,
    Composer,
    Conan,
    Oci,
}

impl Ecosystem {
    /// All ecosystems the proxy mounts an adapter for.
    pub const ALL: [Ecosystem; 16] = [
        Ecosystem::Npm,
        Ecosystem::Cargo,
        Ecosystem::Maven,
        Ecosystem::PyPi,
        Ecosystem::RubyGems,
        Ecosystem::Hex,
        Ecosystem::Conda,
        Ecosystem::Debian,
        Ecosystem::Rpm,
        Ecosystem::Cran,
        Ecosystem::Go,
        Ecosystem::NuGet,
        Ecosystem::Pub,
        Ecosystem::Composer,
        Ecosystem::Conan,
        Ecosystem::Oci,
    ];

    /// Lowercase identifier used in PURLs and blob-store keys.
    pub fn as_str(self) -> &'static str {
        match self {
            Ecosystem::Npm => "npm",
            Ecosystem::Cargo => "cargo",
            Ecosystem::Maven => "maven",
            Ecosystem::PyPi => "pypi",
            Ecosystem::RubyGems => "gem",
            Ecosystem::Hex => "hex",
            Ecosystem::Conda => "conda",
            Ecosystem::Debian => "debian",
            Ecosystem::Rpm => "rpm",
            Ecosystem::Cran => "cran",
            Ecosystem::Go => "go",
            Ecosystem::NuGet => "nuget",
            Ecosystem::Pub => "pub",
            Ecosystem::Composer => "composer",
            Ecosystem::Conan => "conan",
            Ecosystem::Oci => "oci",
        }
    }

    /// HTTP mount prefix for this ecosystem's adapter, e.g. `/npm`.
    ///
    /// OCI is the one exception: it is mounted at the Docker-mandated `/v2`
    /// prefix rather than `/oci`.
    pub fn mount_prefix(self) -> &'static str {
        match self {
            Ecosystem::Oci => "/v2",
            other => match other {
                Ecosystem::Npm => "/npm",
                Ecosystem::Cargo => "/cargo",
                Ecosystem::Maven => "/maven",
                Ecosystem::PyPi => "/pypi",
                Ecosystem::RubyGems => "/gem",
                Ecosystem::Hex => "/hex",
                Ecosystem::Conda => "/conda",
                Ecosystem::Debian => "/debian",
                Ecosystem::Rpm => "/rpm",
                Ecosystem::Cran => "/cran",
                Ecosystem::Go => "/go",
                Ecosystem::NuGet => "/nuget",
                Ecosystem::Pub => "/pub",
                Ecosystem::Composer => "/composer",
                Ecosystem::Conan => "/conan",
                Ecosystem::Oci => unreachable!(),
            },
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown ecosystem: {0}")]
pub struct UnknownEcosystem(String);

impl FromStr for Ecosystem {
    type Err = UnknownEcosystem;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ecosystem::ALL
            .into_iter()
            .find(|e| e.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownEcosystem(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for eco in Ecosystem::ALL {
            assert_eq!(eco.as_str().parse::<Ecosystem>().unwrap(), eco);
        }
    }

    #[test]
    fn oci_mounts_at_v2() {
        assert_eq!(Ecosystem::Oci.mount_prefix(), "/v2");
    }
}
