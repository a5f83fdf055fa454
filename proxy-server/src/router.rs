//! Assembles the top-level [`axum::Router`]: one nested sub-router per
//! ecosystem, plus the operational `/health` and `/metrics` routes.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::any;
use metrics_exporter_prometheus::PrometheusHandle;
use proxy_tower::MetricsLayer;

use crate::adapters::build_adapters;
use crate::handler::{root_handler, wildcard_handler};
use crate::state::{AdapterState, AppContext};

pub fn build_router(ctx: &AppContext, config: &proxy_config::Config, metrics_handle: PrometheusHandle) -> Router {
    let mut router = Router::new().route("/health", any(health_handler)).route("/metrics", any(metrics_handler)).with_state(metrics_handle);

    for (ecosystem, adapter) in build_adapters(config) {
        let state = AdapterState::new(ctx, adapter);
        let sub = Router::new()
            .route("/", any(root_handler))
            .route("/{*rest}", any(wildcard_handler))
            .with_state(state);
        router = router.nest(ecosystem.mount_prefix(), sub);
    }

    router.layer(MetricsLayer)
}

async fn health_handler() -> impl IntoResponse {
    "ok"
}

async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}
