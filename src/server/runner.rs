//! Dual-listener server lifecycle
//!
//! Starting: the admin listener is bound first (best-effort), then the public
//! listener (fatal on failure). Running: entered once the public listener is
//! bound. ShuttingDown: readiness flips before the public listener stops
//! accepting, then in-flight requests drain within the shutdown timeout.

use crate::server::admin::build_admin_router;
use crate::server::color::build_public_router;
use crate::server::context::ServiceContext;
use crate::server::lifecycle::ServiceState;
use crate::server::shutdown::shutdown_channel;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("failed to bind public listener on {addr}: {source}")]
    PublicBind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("public server failed: {0}")]
    Serve(#[source] std::io::Error),

    #[error("graceful shutdown did not complete within {0:?}")]
    ShutdownTimeout(Duration),
}

/// Bind both listeners from the context's config and serve until `shutdown`
/// resolves
pub async fn run<F>(ctx: Arc<ServiceContext>, shutdown: F) -> Result<(), RunError>
where
    F: Future<Output = ()> + Send,
{
    let admin_addr = SocketAddr::from(([0, 0, 0, 0], ctx.config.admin_port));
    info!(addr = %admin_addr, "Starting admin server");
    let admin = match TcpListener::bind(admin_addr).await {
        Ok(listener) => Some(listener),
        Err(e) => {
            // Admin surface is best-effort; the public service still starts
            warn!(addr = %admin_addr, error = %e, "Failed to bind admin listener");
            None
        }
    };

    let public_addr = SocketAddr::from(([0, 0, 0, 0], ctx.config.port));
    info!(addr = %public_addr, "Starting HTTP");
    let public = TcpListener::bind(public_addr)
        .await
        .map_err(|source| RunError::PublicBind {
            addr: public_addr,
            source,
        })?;

    serve(ctx, public, admin, shutdown).await
}

/// Serve on already-bound listeners until `shutdown` resolves, then drain
pub async fn serve<F>(
    ctx: Arc<ServiceContext>,
    public: TcpListener,
    admin: Option<TcpListener>,
    shutdown: F,
) -> Result<(), RunError>
where
    F: Future<Output = ()> + Send,
{
    let admin_handle = admin.map(|listener| spawn_admin(listener, ctx.clone()));

    let (shutdown_controller, mut public_signal) = shutdown_channel();
    let public_router = build_public_router(ctx.clone());
    let mut public_handle = tokio::spawn(async move {
        axum::serve(public, public_router)
            .with_graceful_shutdown(async move { public_signal.wait().await })
            .await
    });

    ctx.lifecycle.set_state(ServiceState::Running);
    info!("Ready to serve requests");

    tokio::select! {
        _ = shutdown => {}
        result = &mut public_handle => {
            ctx.lifecycle.set_state(ServiceState::ShuttingDown);
            stop_admin(admin_handle);
            let err = match flatten(result) {
                Ok(()) => std::io::Error::other("public server stopped unexpectedly"),
                Err(e) => e,
            };
            error!(error = %err, "Public server exited before shutdown was requested");
            return Err(RunError::Serve(err));
        }
    }

    // Readiness must fail before the listener stops accepting
    ctx.lifecycle.set_state(ServiceState::ShuttingDown);
    info!("Shutting down...");
    shutdown_controller.shutdown();

    let timeout = ctx.config.shutdown_timeout;
    let drained = tokio::time::timeout(timeout, &mut public_handle).await;
    stop_admin(admin_handle);

    match drained {
        Ok(result) => {
            flatten(result).map_err(RunError::Serve)?;
            info!("Graceful shutdown complete.");
            Ok(())
        }
        Err(_) => {
            public_handle.abort();
            error!(timeout = ?timeout, "Graceful shutdown timed out");
            Err(RunError::ShutdownTimeout(timeout))
        }
    }
}

fn spawn_admin(listener: TcpListener, ctx: Arc<ServiceContext>) -> JoinHandle<()> {
    let router = build_admin_router(ctx);
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "Admin server listening");
    }
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            warn!(error = %e, "Admin server failed");
        }
    })
}

/// The admin listener keeps answering probes during the drain and is only
/// stopped once the public listener is done
fn stop_admin(handle: Option<JoinHandle<()>>) {
    if let Some(handle) = handle {
        handle.abort();
    }
}

fn flatten(
    result: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> std::io::Result<()> {
    result.map_err(std::io::Error::other)?
}
