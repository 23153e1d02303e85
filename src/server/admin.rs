//! Administrative endpoints, served on their own listener
//!
//! - `/about` - service name, build version and hostname
//! - `/live` - Liveness probe
//! - `/ready` - Readiness probe
//! - `/metrics` - Prometheus metrics in text format

use crate::server::color::render_json;
use crate::server::context::ServiceContext;
use crate::server::health;
use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use std::sync::Arc;

pub const SERVICE_NAME: &str = "color";

/// Build version, overridable at compile time with `COLOR_VERSION`
pub const VERSION: &str = match option_env!("COLOR_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AboutResponse {
    pub name: String,
    pub version: String,
    pub hostname: String,
}

/// Ask the OS for the host name, or an empty string if it is not valid UTF-8
pub fn hostname() -> String {
    gethostname::gethostname()
        .into_string()
        .map(|name| name.trim().to_string())
        .unwrap_or_default()
}

async fn about() -> Response {
    let response = AboutResponse {
        name: SERVICE_NAME.to_string(),
        version: VERSION.to_string(),
        hostname: hostname(),
    };
    render_json(StatusCode::OK, &response)
}

/// Prometheus metrics handler
async fn metrics(State(ctx): State<Arc<ServiceContext>>) -> impl IntoResponse {
    match ctx.metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {}", e),
        )
            .into_response(),
    }
}

/// Build the router for the admin listener
pub fn build_admin_router(ctx: Arc<ServiceContext>) -> Router {
    Router::new()
        .route("/about", get(about))
        .route("/live", get(health::live))
        .route("/ready", get(health::ready))
        .route("/metrics", get(self::metrics))
        .with_state(ctx)
}
