//! Response Rewriting Module
//!
//! Splits a raw origin response into header block and body and stamps the
//! cache status header. Operates on bytes throughout; bodies may be binary
//! and must pass through unmodified.

use crate::{ProxyError, Result};
use std::fmt;

/// Header line name stamped onto every proxied response
pub const CACHE_STATUS_HEADER: &str = "X-Cache";

/// Whether a response was served from the cache store or freshly fetched
/// from the origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// Served from the cache store
    Hit,
    /// Fetched from the origin on this request
    Miss,
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheStatus::Hit => f.write_str("HIT"),
            CacheStatus::Miss => f.write_str("MISS"),
        }
    }
}

/// Rewrite `raw` so its header block carries exactly one `X-Cache` line.
///
/// Any existing `X-Cache` header is removed first, so rewriting an already
/// rewritten response replaces the line rather than duplicating it. The
/// body bytes are copied through untouched. A response with no `\r\n\r\n`
/// header/body separator is a `MalformedResponse`; callers degrade by
/// forwarding the raw bytes as-is.
pub fn rewrite_cache_status(raw: &[u8], status: CacheStatus) -> Result<Vec<u8>> {
    let sep = find_subslice(raw, b"\r\n\r\n").ok_or_else(|| {
        ProxyError::MalformedResponse("no header/body separator in origin response".to_string())
    })?;
    let header_block = &raw[..sep];
    let body = &raw[sep + 4..];

    let mut out = Vec::with_capacity(raw.len() + CACHE_STATUS_HEADER.len() + 8);
    let mut start = 0;
    while start < header_block.len() {
        let end = find_subslice(&header_block[start..], b"\r\n")
            .map(|pos| start + pos)
            .unwrap_or(header_block.len());
        let line = &header_block[start..end];
        if !is_cache_status_line(line) {
            out.extend_from_slice(line);
            out.extend_from_slice(b"\r\n");
        }
        start = end + 2;
    }
    out.extend_from_slice(format!("{}: {}\r\n", CACHE_STATUS_HEADER, status).as_bytes());
    out.extend_from_slice(b"\r\n");
    out.extend_from_slice(body);

    Ok(out)
}

/// Header line comparison is case-insensitive per HTTP
fn is_cache_status_line(line: &[u8]) -> bool {
    let name = CACHE_STATUS_HEADER.as_bytes();
    line.len() > name.len()
        && line[..name.len()].eq_ignore_ascii_case(name)
        && line[name.len()] == b':'
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
