//! Graceful shutdown handling for the color service
//!
//! Handles SIGTERM and SIGINT signals for clean shutdown:
//! - Readiness starts failing
//! - The public listener stops accepting connections
//! - In-flight requests are drained within the configured timeout

use tokio::sync::watch;
use tracing::info;

/// Receiving half of the shutdown fan-out
///
/// Cloned and handed to every server that must stop on shutdown.
#[derive(Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Wait for shutdown signal
    pub async fn wait(&mut self) {
        while !*self.receiver.borrow() {
            if self.receiver.changed().await.is_err() {
                // Sender dropped, treat as shutdown
                break;
            }
        }
    }
}

/// Controller for triggering shutdown
pub struct ShutdownController {
    sender: watch::Sender<bool>,
}

impl ShutdownController {
    /// Trigger shutdown
    pub fn shutdown(&self) {
        let _ = self.sender.send(true);
        info!("Shutdown signal sent");
    }
}

/// Create a new shutdown signal pair
///
/// Returns (controller, signal) where:
/// - controller: Used to trigger shutdown
/// - signal: Cloned and passed to components that need to listen
pub fn shutdown_channel() -> (ShutdownController, ShutdownSignal) {
    let (sender, receiver) = watch::channel(false);
    (ShutdownController { sender }, ShutdownSignal { receiver })
}

/// Registered OS termination signal handlers
///
/// Installed during startup so a registration failure aborts the process
/// before any listener is bound.
#[cfg(unix)]
pub struct TerminationSignals {
    sigterm: tokio::signal::unix::Signal,
    sigint: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl TerminationSignals {
    /// Register SIGTERM and SIGINT handlers
    pub fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigterm: signal(SignalKind::terminate())?,
            sigint: signal(SignalKind::interrupt())?,
        })
    }

    /// Wait for SIGTERM or SIGINT
    ///
    /// Returns the signal name that was received.
    pub async fn recv(mut self) -> &'static str {
        tokio::select! {
            _ = self.sigterm.recv() => {
                info!("Received SIGTERM");
                "SIGTERM"
            }
            _ = self.sigint.recv() => {
                info!("Received SIGINT");
                "SIGINT"
            }
        }
    }
}

/// Ctrl+C handler (Windows)
#[cfg(not(unix))]
pub struct TerminationSignals;

#[cfg(not(unix))]
impl TerminationSignals {
    pub fn install() -> std::io::Result<Self> {
        Ok(Self)
    }

    pub async fn recv(self) -> &'static str {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to wait for Ctrl+C, shutting down");
        } else {
            info!("Received Ctrl+C");
        }
        "CTRL_C"
    }
}
