//! Tower [`Service`] implementation recording request metrics.

use http::{Request, Response};
use proxy_core::Ecosystem;
use proxy_metrics::Timer;
use tower::Service;

use crate::future::MetricsFuture;

/// Wraps an inner service, incrementing the in-flight gauge before the call
/// and recording `(ecosystem, status, duration)` once it resolves.
#[derive(Debug, Clone)]
pub struct MetricsService<S> {
    inner: S,
}

impl<S> MetricsService<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }
}

/// Best-effort ecosystem label for a mount-prefixed request path, used only
/// for the metric dimension — falls back to `"unknown"` for anything that
/// doesn't match a known adapter prefix (health checks, metrics scrape).
pub fn ecosystem_label_for_path(path: &str) -> &'static str {
    Ecosystem::ALL
        .into_iter()
        .find(|eco| path.starts_with(eco.mount_prefix()))
        .map(Ecosystem::as_str)
        .unwrap_or("unknown")
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for MetricsService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
{
    type Response = Response<ResBody>;
    type Error = S::Error;
    type Future = MetricsFuture<S::Future>;

    fn poll_ready(&mut self, cx: &mut std::task::Context<'_>) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        let ecosystem = ecosystem_label_for_path(req.uri().path());
        proxy_metrics::in_flight_inc();
        MetricsFuture::new(self.inner.call(req), ecosystem, Timer::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::Empty;
    use tower::ServiceExt;

    #[test]
    fn maps_known_prefix_to_ecosystem_label() {
        assert_eq!(ecosystem_label_for_path("/npm/lodash"), "npm");
        assert_eq!(ecosystem_label_for_path("/v2/library/nginx/blobs/sha256:abc"), "oci");
        assert_eq!(ecosystem_label_for_path("/healthz"), "unknown");
    }

    #[tokio::test]
    async fn passes_request_through_and_returns_response() {
        let inner = tower::service_fn(|_req: Request<Empty<bytes::Bytes>>| async move {
            Ok::<_, std::convert::Infallible>(Response::builder().status(200).body(Empty::new()).unwrap())
        });
        let mut svc = MetricsService::new(inner);
        let req = Request::builder().uri("/npm/lodash").body(Empty::new()).unwrap();
        let response = svc.ready().await.unwrap().call(req).await.unwrap();
        assert_eq!(response.status(), 200);
    }
}
