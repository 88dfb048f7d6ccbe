//! Cache Key Module
//!
//! Derives the deterministic cache key for a request. The key is the literal
//! reconstructed request text, so it doubles as the payload forwarded to the
//! origin on a miss: identical forwarded requests produce identical keys by
//! construction.

/// Deterministic identifier for a cacheable request, never mutated after
/// creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build the key for a GET of `path` against `origin_host`.
    ///
    /// No normalization is applied: query-string ordering and path casing
    /// are significant, so textually different but semantically equivalent
    /// requests address distinct cache entries.
    pub fn for_get(path: &str, origin_host: &str) -> Self {
        Self(format!(
            "GET {} HTTP/1.1\r\nHost: {}\r\n\r\n",
            path, origin_host
        ))
    }

    /// The exact bytes sent to the origin when this key misses.
    pub fn request_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_requests_share_a_key() {
        let a = CacheKey::for_get("/products?id=1", "example.com");
        let b = CacheKey::for_get("/products?id=1", "example.com");
        assert_eq!(a, b);
    }

    #[test]
    fn test_distinct_paths_get_distinct_keys() {
        let a = CacheKey::for_get("/a", "example.com");
        let b = CacheKey::for_get("/b", "example.com");
        assert_ne!(a, b);
    }

    #[test]
    fn test_distinct_origins_get_distinct_keys() {
        let a = CacheKey::for_get("/a", "one.example.com");
        let b = CacheKey::for_get("/a", "two.example.com");
        assert_ne!(a, b);
    }

    #[test]
    fn test_query_order_is_not_normalized() {
        let a = CacheKey::for_get("/p?x=1&y=2", "example.com");
        let b = CacheKey::for_get("/p?y=2&x=1", "example.com");
        assert_ne!(a, b);
    }

    #[test]
    fn test_key_is_a_complete_forwardable_request() {
        let key = CacheKey::for_get("/x", "example.com");
        assert_eq!(
            key.as_str(),
            "GET /x HTTP/1.1\r\nHost: example.com\r\n\r\n"
        );
        assert!(key.request_bytes().ends_with(b"\r\n\r\n"));
    }
}
