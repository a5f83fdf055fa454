//! Re-exported for callers that want a cache-specific error alias; the actual
//! variants live in [`proxy_core::ProxyError`] so adapters and the cache core
//! share one taxonomy.

pub type CacheError = proxy_core::ProxyError;
