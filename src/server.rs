//! Server Module
//!
//! Binds the listener and runs the accept loop. Each accepted connection is
//! served on its own task, bounded by a semaphore so a stalled origin
//! cannot pile up unbounded sessions.

use crate::cache::CacheStore;
use crate::config::ProxyConfig;
use crate::session;
use crate::shutdown::ShutdownSignal;
use crate::{ProxyError, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;
use tracing::{debug, error, info};

/// The forward caching proxy server
pub struct ProxyServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    config: Arc<ProxyConfig>,
    cache: Arc<dyn CacheStore>,
    session_permits: Arc<Semaphore>,
}

impl ProxyServer {
    /// Bind the listening socket
    pub async fn bind(config: ProxyConfig, cache: Arc<dyn CacheStore>) -> Result<Self> {
        let addr = format!("{}:{}", config.bind_address, config.listen_port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ProxyError::IoError(format!("Failed to bind {}: {}", addr, e)))?;
        let local_addr = listener.local_addr()?;
        info!("Listening on {}", local_addr);

        Ok(Self {
            listener,
            local_addr,
            session_permits: Arc::new(Semaphore::new(config.max_concurrent_sessions)),
            config: Arc::new(config),
            cache,
        })
    }

    /// Actual bound address (differs from the configured one for port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Run the accept loop until the shutdown signal fires.
    ///
    /// Session-level failures are logged and contained; they never
    /// terminate the loop. In-flight sessions run to completion after
    /// shutdown; there is no cooperative cancellation of an ongoing fetch.
    pub async fn run(self, mut shutdown_signal: ShutdownSignal) -> Result<()> {
        info!("Waiting for requests...");

        loop {
            tokio::select! {
                accept_result = self.listener.accept() => {
                    match accept_result {
                        Ok((stream, client_addr)) => {
                            debug!("Request accepted from {}", client_addr);

                            // Saturation pauses accepting: backpressure, not rejection
                            let permit = match self.session_permits.clone().acquire_owned().await {
                                Ok(permit) => permit,
                                Err(_) => break,
                            };

                            let config = self.config.clone();
                            let cache = self.cache.clone();
                            tokio::spawn(async move {
                                let _permit = permit;
                                if let Err(e) =
                                    session::handle_session(stream, client_addr, config, cache).await
                                {
                                    match &e {
                                        ProxyError::MalformedRequest(_)
                                        | ProxyError::TimeoutError(_) => {
                                            debug!("Session from {} aborted: {}", client_addr, e)
                                        }
                                        _ => error!("Session from {} failed: {}", client_addr, e),
                                    }
                                }
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }
                _ = shutdown_signal.wait_for_shutdown() => {
                    info!("Shutdown signal received, stopping accept loop");
                    break;
                }
            }
        }

        info!("Proxy server stopped");
        Ok(())
    }
}
