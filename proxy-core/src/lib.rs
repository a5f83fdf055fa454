//! Identity and path primitives shared by every crate in the proxy.
//!
//! This crate has no I/O and no async dependencies. It exists so that the
//! blob-store key for a package/version/filename tuple is computed in
//! exactly one place, by pure functions that the cache core, the adapters,
//! and the operator tooling can all call independently and get the same
//! answer from.

mod ecosystem;
mod error;
mod identity;
mod purl;

pub use ecosystem::{Ecosystem, UnknownEcosystem};
pub use error::{NotFound, ProxyError};
pub use identity::{ArtifactIdentity, encode_path_segment};
pub use purl::{PackagePurl, VersionPurl};
