//! Shared helpers for the `rewrite` step.

use serde_json::Value;

/// What a rewriter needs to turn an upstream URL into a proxy URL.
#[derive(Debug, Clone)]
pub struct RewriteContext {
    /// e.g. `https://cache.example.com`, no trailing slash.
    pub base_url: String,
    /// e.g. `/npm`, no trailing slash.
    pub prefix: &'static str,
}

impl RewriteContext {
    pub fn new(base_url: impl Into<String>, prefix: &'static str) -> Self {
        Self {
            base_url: base_url.into(),
            prefix,
        }
    }

    /// `{base_url}{prefix}{path}`, where `path` already starts with `/`.
    pub fn proxy_url(&self, path: &str) -> String {
        format!("{}{}{}", self.base_url, self.prefix, path)
    }
}

/// Walks every string value in a JSON document, replacing ones that start
/// with `upstream_prefix` with `{ctx.proxy_url(suffix)}`. Preserves every
/// other field untouched, including arrays/objects/numbers.
///
/// Returns the rewritten document serialized back to bytes, or `None` if
/// `body` isn't valid JSON.
pub fn rewrite_json_urls(body: &[u8], upstream_prefix: &str, ctx: &RewriteContext) -> Option<Vec<u8>> {
    rewrite_json_urls_with(body, upstream_prefix, ctx, |suffix| suffix.to_string())
}

/// Like [`rewrite_json_urls`], but `transform` gets a chance to rewrite the
/// path suffix (e.g. to percent-encode a scoped package name) before it's
/// joined onto the proxy base URL.
pub fn rewrite_json_urls_with(body: &[u8], upstream_prefix: &str, ctx: &RewriteContext, transform: impl Fn(&str) -> String) -> Option<Vec<u8>> {
    let mut value: Value = serde_json::from_slice(body).ok()?;
    rewrite_value(&mut value, upstream_prefix, ctx, &transform);
    serde_json::to_vec(&value).ok()
}

fn rewrite_value(value: &mut Value, upstream_prefix: &str, ctx: &RewriteContext, transform: &impl Fn(&str) -> String) {
    match value {
        Value::String(s) => {
            if let Some(suffix) = s.strip_prefix(upstream_prefix) {
                *s = ctx.proxy_url(&transform(suffix));
            }
        }
        Value::Array(items) => {
            for item in items {
                rewrite_value(item, upstream_prefix, ctx, transform);
            }
        }
        Value::Object(map) => {
            for (_, v) in map.iter_mut() {
                rewrite_value(v, upstream_prefix, ctx, transform);
            }
        }
        _ => {}
    }
}

/// Rewrites every occurrence of `upstream_prefix` found in plain text (HTML
/// `href` attributes, in particular) to the proxy equivalent. Used for PyPI's
/// simple-index HTML, which is not JSON and not worth a full HTML parser for
/// the single thing we need to do to it.
pub fn rewrite_text_urls(body: &[u8], upstream_prefix: &str, ctx: &RewriteContext) -> Option<Vec<u8>> {
    let text = std::str::from_utf8(body).ok()?;
    if !text.contains(upstream_prefix) {
        return Some(body.to_vec());
    }
    let replacement = ctx.proxy_url("");
    Some(text.replace(upstream_prefix, &replacement).into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_nested_json_urls_and_preserves_other_fields() {
        let ctx = RewriteContext::new("https://cache.example.com", "/npm");
        let body = br#"{"name":"lodash","versions":{"4.17.21":{"dist":{"tarball":"https://registry.npmjs.org/lodash/-/lodash-4.17.21.tgz","shasum":"abc"}}}}"#;
        let out = rewrite_json_urls(body, "https://registry.npmjs.org", &ctx).unwrap();
        let value: Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(
            value["versions"]["4.17.21"]["dist"]["tarball"],
            "https://cache.example.com/npm/lodash/-/lodash-4.17.21.tgz"
        );
        assert_eq!(value["versions"]["4.17.21"]["dist"]["shasum"], "abc");
    }

    #[test]
    fn invalid_json_returns_none() {
        let ctx = RewriteContext::new("https://cache.example.com", "/npm");
        assert!(rewrite_json_urls(b"not json", "https://x", &ctx).is_none());
    }

    #[test]
    fn rewrites_plain_text_occurrences() {
        let ctx = RewriteContext::new("https://cache.example.com", "/pypi");
        let body = br#"<a href="https://files.pythonhosted.org/packages/abc/foo-1.0.tar.gz">foo-1.0.tar.gz</a>"#;
        let out = rewrite_text_urls(body, "https://files.pythonhosted.org", &ctx).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            r#"<a href="https://cache.example.com/pypi/packages/abc/foo-1.0.tar.gz">foo-1.0.tar.gz</a>"#
        );
    }
}
