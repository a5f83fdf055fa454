//! Tower middleware that records per-request metrics: requests in
//! flight, and `(ecosystem, status, duration)` once a response (or error) is
//! ready. Caching itself happens inside each adapter's route handler — this
//! layer only observes what passed through.

pub mod future;
pub mod layer;
pub mod service;

pub use layer::MetricsLayer;
pub use service::MetricsService;
