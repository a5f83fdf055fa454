//! The error taxonomy shared by the cache core, the adapters, and the HTTP edge.
//!
//! See the design's error-handling section: each variant here carries both a
//! propagation rule (recovered locally and logged, vs. reported to the
//! client) and a fixed status code.

use std::fmt;

/// A request-scoped error, classified per the design's error kinds.
#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    /// Unparseable identity tuple, unsupported method, bad path.
    #[error("bad request: {0}")]
    ClientBad(String),

    /// Network failure or non-2xx status from the upstream registry.
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Blob write or open failure.
    #[error("storage error: {0}")]
    StorageTransient(String),
}

impl ProxyError {
    /// The HTTP status this error is reported to the client with.
    ///
    /// `IndexTransient`, `BlobDrift`, and `RewriteFailure` never reach this:
    /// they are recovered locally (logged, request still succeeds) and so
    /// have no corresponding client-visible status.
    pub fn status_code(&self) -> u16 {
        match self {
            ProxyError::ClientBad(_) => 400,
            ProxyError::UpstreamUnavailable(_) => 502,
            ProxyError::StorageTransient(_) => 502,
        }
    }

    /// The `error_type` label recorded on the upstream-error / storage-error
    /// metric counters.
    pub fn metric_label(&self) -> &'static str {
        match self {
            ProxyError::ClientBad(_) => "client_bad",
            ProxyError::UpstreamUnavailable(_) => "upstream_unavailable",
            ProxyError::StorageTransient(_) => "storage_transient",
        }
    }
}

/// A distinguished sentinel for "this key is not present in the blob store",
/// kept distinct from other I/O errors per the blob store contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotFound;

impl fmt::Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("key not found in blob store")
    }
}

impl std::error::Error for NotFound {}
