//! The adapter request-disposition state machine, driven generically
//! over whichever [`proxy_adapters::Adapter`] a mount's [`AdapterState`] carries.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use http::{Method, StatusCode, header};
use proxy_adapters::{Adapter, Disposition, RewriteContext};
use proxy_core::{Ecosystem, ProxyError};
use tokio::io::AsyncReadExt;

use crate::state::AdapterState;

const DOCKER_API_VERSION_HEADER: &str = "Docker-Distribution-Api-Version";
const DOCKER_CONTENT_DIGEST_HEADER: &str = "Docker-Content-Digest";

pub async fn root_handler(State(state): State<Arc<AdapterState>>, method: Method) -> Response {
    dispatch(state, method, "/".to_string()).await
}

pub async fn wildcard_handler(State(state): State<Arc<AdapterState>>, method: Method, Path(rest): Path<String>) -> Response {
    dispatch(state, method, format!("/{rest}")).await
}

async fn dispatch(state: Arc<AdapterState>, method: Method, path: String) -> Response {
    // The OCI version check answers directly, never touching upstream.
    if state.adapter.ecosystem() == Ecosystem::Oci && path == "/" {
        return if method == Method::GET {
            Response::builder()
                .status(StatusCode::OK)
                .header(DOCKER_API_VERSION_HEADER, proxy_adapters::oci::API_VERSION_HEADER_VALUE)
                .body(Body::empty())
                .unwrap()
        } else {
            StatusCode::METHOD_NOT_ALLOWED.into_response()
        };
    }

    match state.adapter.classify(&method, &path) {
        Disposition::Unsupported => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        Disposition::Artifact => serve_artifact(&state, &method, &path).await,
        Disposition::Listing => serve_rewritten(&state, &path).await,
        Disposition::Other => serve_passthrough(&state, &path).await,
    }
}

async fn serve_artifact(state: &Arc<AdapterState>, method: &Method, path: &str) -> Response {
    let Some(identified) = state.adapter.identify(path) else {
        return proxy_error_response(ProxyError::ClientBad(format!("unrecognized artifact path: {path}")));
    };

    match state.cache.get_or_fetch_from_url(&identified.identity, &identified.upstream_url).await {
        Ok(artifact) => {
            let mut builder = Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_LENGTH, artifact.size)
                .header(header::ETAG, format!("\"{}\"", artifact.etag));
            if let Some(ct) = &artifact.content_type {
                builder = builder.header(header::CONTENT_TYPE, ct);
            }
            if state.adapter.ecosystem() == Ecosystem::Oci {
                builder = builder
                    .header(DOCKER_API_VERSION_HEADER, proxy_adapters::oci::API_VERSION_HEADER_VALUE)
                    .header(DOCKER_CONTENT_DIGEST_HEADER, format!("sha256:{}", artifact.etag));
            }

            if *method == Method::HEAD {
                return builder.body(Body::empty()).unwrap();
            }
            match proxy_cache::read_to_vec(artifact).await {
                Ok(bytes) => builder.body(Body::from(bytes)).unwrap(),
                Err(e) => proxy_error_response(ProxyError::StorageTransient(e.to_string())),
            }
        }
        Err(e) => proxy_error_response(e),
    }
}

/// Listing disposition: always fetched live (never cached — the document is
/// mutable), then rewritten before being returned.
async fn serve_rewritten(state: &Arc<AdapterState>, path: &str) -> Response {
    let url = state.adapter.passthrough_url(path);
    match state.fetcher.fetch(&url).await {
        Ok(mut fetched) => {
            let mut buf = Vec::new();
            if let Err(e) = fetched.reader.read_to_end(&mut buf).await {
                return proxy_error_response(ProxyError::UpstreamUnavailable(e.to_string()));
            }
            let ctx = RewriteContext::new(state.base_url.clone(), state.adapter.ecosystem().mount_prefix());
            let rewritten = state.adapter.rewrite(&buf, &ctx);

            let mut builder = Response::builder().status(StatusCode::OK);
            if let Some(ct) = fetched.content_type {
                builder = builder.header(header::CONTENT_TYPE, ct);
            }
            builder.body(Body::from(rewritten)).unwrap()
        }
        Err(e) => proxy_error_response(ProxyError::UpstreamUnavailable(e.to_string())),
    }
}

/// Other disposition: proxied through byte-for-byte, no cache, no rewrite.
async fn serve_passthrough(state: &Arc<AdapterState>, path: &str) -> Response {
    let url = state.adapter.passthrough_url(path);
    match state.fetcher.fetch(&url).await {
        Ok(mut fetched) => {
            let mut buf = Vec::new();
            if let Err(e) = fetched.reader.read_to_end(&mut buf).await {
                return proxy_error_response(ProxyError::UpstreamUnavailable(e.to_string()));
            }
            let mut builder = Response::builder().status(StatusCode::OK);
            if let Some(ct) = fetched.content_type {
                builder = builder.header(header::CONTENT_TYPE, ct);
            }
            if state.adapter.ecosystem() == Ecosystem::Oci {
                builder = builder.header(DOCKER_API_VERSION_HEADER, proxy_adapters::oci::API_VERSION_HEADER_VALUE);
            }
            builder.body(Body::from(buf)).unwrap()
        }
        Err(e) => proxy_error_response(ProxyError::UpstreamUnavailable(e.to_string())),
    }
}

fn proxy_error_response(err: ProxyError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    tracing::warn!(status = status.as_u16(), error = %err, "request failed");
    (status, err.to_string()).into_response()
}
