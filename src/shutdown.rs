//! Graceful Shutdown Module
//!
//! Broadcast-based shutdown signalling: the coordinator listens for
//! SIGINT/SIGTERM and fans the signal out to the accept loop. In-flight
//! sessions run to completion or to an I/O error.

use crate::{ProxyError, Result};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Shutdown coordinator owning the broadcast channel
pub struct ShutdownCoordinator {
    sender: broadcast::Sender<()>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    /// Get a signal handle for a component to wait on
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            receiver: self.sender.subscribe(),
        }
    }

    /// Block until SIGINT or SIGTERM arrives, then notify all subscribers
    pub async fn listen_for_signals(&self) -> Result<()> {
        let mut sigint = signal::unix::signal(signal::unix::SignalKind::interrupt())
            .map_err(|e| ProxyError::SystemError(format!("Failed to create SIGINT handler: {}", e)))?;
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .map_err(|e| ProxyError::SystemError(format!("Failed to create SIGTERM handler: {}", e)))?;

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT, initiating graceful shutdown");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, initiating graceful shutdown");
            }
        }

        self.initiate();
        Ok(())
    }

    /// Fan the shutdown signal out to all subscribers
    pub fn initiate(&self) {
        if let Err(e) = self.sender.send(()) {
            // No components listening; normal if the server already stopped
            debug!("Shutdown signal not sent (no active receivers): {}", e);
        }
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle a component holds to learn about shutdown
pub struct ShutdownSignal {
    receiver: broadcast::Receiver<()>,
}

impl ShutdownSignal {
    /// Resolve once shutdown has been signalled.
    ///
    /// A closed channel counts as shutdown: if the coordinator is gone
    /// there is nothing left to wait for.
    pub async fn wait_for_shutdown(&mut self) {
        let _ = self.receiver.recv().await;
    }
}
