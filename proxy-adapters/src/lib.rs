//! Per-ecosystem HTTP adapters.
//!
//! Every adapter implements the same three-method shape instead of hand-
//! writing its own request multiplexer: `classify` decides what kind of
//! request this is, `identify` extracts the artifact tuple for cacheable
//! requests, `rewrite` patches upstream URLs embedded in a mutable metadata
//! document. The router (`proxy-server`) drives every adapter through this
//! one interface.

mod rewrite;

pub mod cargo;
pub mod conan;
pub mod composer;
pub mod conda;
pub mod cran;
pub mod debian;
pub mod go;
pub mod hex;
pub mod maven;
pub mod npm;
pub mod nuget;
pub mod oci;
pub mod pub_dev;
pub mod pypi;
pub mod rpm;
pub mod rubygems;

pub use rewrite::RewriteContext;

use proxy_core::{ArtifactIdentity, Ecosystem};

/// What an adapter decided about one incoming request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// An immutable artifact download. The router calls `identify` to get
    /// the tuple, then drives it through the cache core.
    Artifact,
    /// A mutable document that lists artifact URLs. The router fetches it
    /// live and runs it through `rewrite` before returning it.
    Listing,
    /// Anything else cacheable-adjacent but not itself cacheable (package
    /// metadata with no URLs to rewrite, auth endpoints, version checks).
    /// Proxied through untouched.
    Other,
    /// Method not allowed on this adapter's URL space.
    Unsupported,
}

/// The result of a successful `identify` call: the artifact tuple plus the
/// upstream URL to fetch it from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identified {
    pub identity: ArtifactIdentity,
    pub upstream_url: String,
}

/// Shared contract every ecosystem front-end implements.
pub trait Adapter: Send + Sync {
    fn ecosystem(&self) -> Ecosystem;

    /// `GET`/`HEAD` path (without the adapter's mount prefix) -> disposition.
    fn classify(&self, method: &http::Method, path: &str) -> Disposition;

    /// Extract the artifact tuple and build the upstream URL. Only called
    /// when `classify` returned [`Disposition::Artifact`]; `None` here is a
    /// `ClientBad` even though `classify` said this looked cacheable —
    /// it means the filename didn't parse under the ecosystem's naming rule.
    fn identify(&self, path: &str) -> Option<Identified>;

    /// Rewrite upstream artifact URLs embedded in `body` to point back at
    /// this proxy. Returns the original body unchanged if `body` doesn't
    /// parse — never fails the request.
    fn rewrite(&self, body: &[u8], ctx: &RewriteContext) -> Vec<u8>;

    /// The upstream URL to fetch for a [`Disposition::Listing`] or
    /// [`Disposition::Other`] request at `path`. Most adapters mirror the
    /// upstream's URL space exactly, so this is just `upstream_base + path`;
    /// cargo's sparse index is the one adapter whose own mount doesn't match
    /// the upstream's on-disk layout and overrides this.
    fn passthrough_url(&self, path: &str) -> String;
}
