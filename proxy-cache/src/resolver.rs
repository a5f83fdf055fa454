//! The lazy counterpart to passing an upstream URL directly: a resolver is
//! only invoked when [`crate::CacheCore::get_or_fetch`] actually misses.

use async_trait::async_trait;
use proxy_core::ProxyError;

#[async_trait]
pub trait UrlResolver: Send + Sync {
    async fn resolve(&self) -> Result<String, ProxyError>;
}

/// A resolver that already knows its answer. Useful when a caller has a URL
/// in hand but wants to go through [`crate::CacheCore::get_or_fetch`] anyway
/// (e.g. generic code that's polymorphic over both primitives).
pub struct StaticUrl(pub String);

#[async_trait]
impl UrlResolver for StaticUrl {
    async fn resolve(&self) -> Result<String, ProxyError> {
        Ok(self.0.clone())
    }
}
