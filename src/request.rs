//! Request Parsing Module
//!
//! Extracts the request line from raw bytes received on a client socket.

use crate::{ProxyError, Result};

/// Method and path extracted from a client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub path: String,
}

impl RequestLine {
    /// Parse raw client bytes into a request line.
    ///
    /// The input is decoded as UTF-8 text and split on whitespace; the first
    /// two tokens are method and path. Fewer than two tokens (or bytes that
    /// do not decode) is a malformed request: the session aborts without the
    /// origin ever being contacted. No side effects.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(raw).map_err(|_| {
            ProxyError::MalformedRequest("request bytes are not valid UTF-8".to_string())
        })?;

        let mut tokens = text.split_whitespace();
        match (tokens.next(), tokens.next()) {
            (Some(method), Some(path)) => Ok(Self {
                method: method.to_string(),
                path: path.to_string(),
            }),
            (Some(only), None) => Err(ProxyError::MalformedRequest(format!(
                "expected method and path, got single token {:?}",
                only
            ))),
            _ => Err(ProxyError::MalformedRequest("empty request".to_string())),
        }
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_request() {
        let line = RequestLine::parse(b"GET /index.html HTTP/1.1\r\nHost: example.com\r\n\r\n")
            .unwrap();
        assert_eq!(line.method, "GET");
        assert_eq!(line.path, "/index.html");
        assert!(line.is_get());
    }

    #[test]
    fn test_parse_bare_request_line() {
        let line = RequestLine::parse(b"GET /x HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(line.path, "/x");
    }

    #[test]
    fn test_single_token_is_malformed() {
        let err = RequestLine::parse(b"GET").unwrap_err();
        assert!(matches!(err, ProxyError::MalformedRequest(_)));
    }

    #[test]
    fn test_empty_input_is_malformed() {
        assert!(matches!(
            RequestLine::parse(b"   \r\n"),
            Err(ProxyError::MalformedRequest(_))
        ));
    }

    #[test]
    fn test_invalid_utf8_is_malformed() {
        assert!(matches!(
            RequestLine::parse(&[0xff, 0xfe, 0x20, 0x2f]),
            Err(ProxyError::MalformedRequest(_))
        ));
    }

    #[test]
    fn test_non_get_method_is_parsed() {
        let line = RequestLine::parse(b"POST /submit HTTP/1.1\r\n\r\n").unwrap();
        assert_eq!(line.method, "POST");
        assert!(!line.is_get());
    }
}
