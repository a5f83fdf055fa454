//! [`Future`] returned by [`MetricsService::call`](crate::service::MetricsService).

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use http::Response;
use pin_project::pin_project;
use proxy_metrics::Timer;

/// Wraps the inner service's future, decrementing the in-flight gauge and
/// recording `(ecosystem, status, duration)` exactly once, whatever the
/// outcome.
#[pin_project]
pub struct MetricsFuture<F> {
    #[pin]
    inner: F,
    ecosystem: &'static str,
    timer: Timer,
}

impl<F> MetricsFuture<F> {
    pub fn new(inner: F, ecosystem: &'static str, timer: Timer) -> Self {
        Self { inner, ecosystem, timer }
    }
}

impl<F, ResBody, E> Future for MetricsFuture<F>
where
    F: Future<Output = Result<Response<ResBody>, E>>,
{
    type Output = Result<Response<ResBody>, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let result = std::task::ready!(this.inner.poll(cx));

        proxy_metrics::in_flight_dec();
        let status = result.as_ref().map(|response| response.status().as_u16()).unwrap_or(0);
        proxy_metrics::record_request(this.ecosystem, status, this.timer.elapsed());

        Poll::Ready(result)
    }
}
