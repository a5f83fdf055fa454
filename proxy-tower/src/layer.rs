//! Tower [`Layer`] that wraps a service with request metrics.

use tower::Layer;

use crate::service::MetricsService;

/// Adds the in-flight gauge and `(ecosystem, status, duration)` recording to
/// any service that accepts `http::Request<B>` and returns `http::Response<B>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsLayer;

impl MetricsLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for MetricsLayer {
    type Service = MetricsService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        MetricsService::new(inner)
    }
}
