//! Origin Forwarding Module
//!
//! Performs the network round-trip to the origin on a cache miss. Every
//! miss gets its own dedicated connection; the listener socket is never
//! reused for upstream traffic.

use crate::config::ProxyConfig;
use crate::{ProxyError, Result};
use bytes::Bytes;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

const READ_CHUNK_SIZE: usize = 4096;

/// Forwards reconstructed requests to the configured origin
pub struct OriginForwarder {
    host: String,
    port: u16,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl OriginForwarder {
    pub fn new(
        host: String,
        port: u16,
        connect_timeout: Duration,
        read_timeout: Duration,
    ) -> Self {
        Self {
            host,
            port,
            connect_timeout,
            read_timeout,
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Self {
        Self::new(
            config.origin_host.clone(),
            config.origin_port,
            config.connect_timeout,
            config.read_timeout,
        )
    }

    /// Send `request` to the origin and return the full response.
    ///
    /// The response is read in fixed-size chunks until the origin closes
    /// the connection (HTTP/1.0-style framing; no Content-Length or chunked
    /// accounting). Connect failures, DNS failures, and read timeouts all
    /// map to `OriginUnreachable`, and nothing from a failed fetch is ever
    /// eligible for caching.
    pub async fn fetch(&self, request: &[u8]) -> Result<Bytes> {
        let mut stream = match timeout(
            self.connect_timeout,
            TcpStream::connect((self.host.as_str(), self.port)),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(ProxyError::OriginUnreachable(format!(
                    "connect to {}:{} failed: {}",
                    self.host, self.port, e
                )))
            }
            Err(_) => {
                return Err(ProxyError::OriginUnreachable(format!(
                    "connect to {}:{} timed out after {:?}",
                    self.host, self.port, self.connect_timeout
                )))
            }
        };

        stream.write_all(request).await.map_err(|e| {
            ProxyError::OriginUnreachable(format!("failed to send request to origin: {}", e))
        })?;

        let mut response = Vec::new();
        let mut chunk = [0u8; READ_CHUNK_SIZE];
        loop {
            let n = match timeout(self.read_timeout, stream.read(&mut chunk)).await {
                Ok(Ok(n)) => n,
                Ok(Err(e)) => {
                    return Err(ProxyError::OriginUnreachable(format!(
                        "read from origin failed: {}",
                        e
                    )))
                }
                Err(_) => {
                    return Err(ProxyError::OriginUnreachable(format!(
                        "origin stalled; no data for {:?}",
                        self.read_timeout
                    )))
                }
            };
            if n == 0 {
                // Peer closed: end of response
                break;
            }
            response.extend_from_slice(&chunk[..n]);
        }

        debug!(
            "Fetched {} bytes from {}:{}",
            response.len(),
            self.host,
            self.port
        );
        Ok(Bytes::from(response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    async fn canned_origin(response: &'static [u8]) -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 1024];
            let _ = stream.read(&mut buf).await.unwrap();
            stream.write_all(response).await.unwrap();
            // Dropping the stream closes the connection, ending the response
        });
        addr
    }

    fn forwarder_for(addr: std::net::SocketAddr) -> OriginForwarder {
        OriginForwarder::new(
            addr.ip().to_string(),
            addr.port(),
            Duration::from_secs(1),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_fetch_reads_until_close() {
        let addr = canned_origin(b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi").await;
        let fetched = forwarder_for(addr)
            .fetch(b"GET /x HTTP/1.1\r\nHost: o\r\n\r\n")
            .await
            .unwrap();
        assert_eq!(&fetched[..], b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi");
    }

    #[tokio::test]
    async fn test_connection_refused_is_origin_unreachable() {
        // Bind then drop to get a port with nothing listening
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = forwarder_for(addr)
            .fetch(b"GET /x HTTP/1.1\r\nHost: o\r\n\r\n")
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::OriginUnreachable(_)));
    }

    #[tokio::test]
    async fn test_stalled_origin_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            // Hold the connection open without ever responding
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(stream);
        });

        let forwarder = OriginForwarder::new(
            addr.ip().to_string(),
            addr.port(),
            Duration::from_secs(1),
            Duration::from_millis(100),
        );
        let err = forwarder
            .fetch(b"GET /x HTTP/1.1\r\nHost: o\r\n\r\n")
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::OriginUnreachable(_)));
    }
}
