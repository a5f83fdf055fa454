//! Shared, per-process state the router hands to every adapter route.

use std::sync::Arc;

use proxy_cache::CacheCore;
use proxy_fetcher::Fetcher;

/// Collaborators every adapter route needs, independent of which ecosystem
/// it serves.
pub struct AppContext {
    pub cache: Arc<CacheCore>,
    pub fetcher: Arc<dyn Fetcher>,
    pub base_url: String,
}

/// Per-mount state: the context above plus the one [`proxy_adapters::Adapter`]
/// this route is dedicated to.
pub struct AdapterState {
    pub adapter: Arc<dyn proxy_adapters::Adapter>,
    pub cache: Arc<CacheCore>,
    pub fetcher: Arc<dyn Fetcher>,
    pub base_url: String,
}

impl AdapterState {
    pub fn new(ctx: &AppContext, adapter: Arc<dyn proxy_adapters::Adapter>) -> Arc<Self> {
        Arc::new(Self {
            adapter,
            cache: ctx.cache.clone(),
            fetcher: ctx.fetcher.clone(),
            base_url: ctx.base_url.clone(),
        })
    }
}
