//! HTTP servers for the color service
//!
//! Two independent listeners share one read-only `ServiceContext`:
//! - public: `/next`
//! - admin: `/about`, `/live`, `/ready`, `/metrics`
//!
//! Also provides graceful shutdown handling for SIGTERM/SIGINT.

pub mod admin;
pub mod color;
pub mod context;
pub mod health;
pub mod lifecycle;
pub mod metrics;
pub mod runner;
pub mod shutdown;

pub use admin::{build_admin_router, AboutResponse, SERVICE_NAME, VERSION};
pub use color::{build_public_router, ColorResponse, ErrorResponse};
pub use context::ServiceContext;
pub use health::HealthChecks;
pub use lifecycle::{ServiceLifecycle, ServiceState};
pub use metrics::{create_metrics, ServiceMetrics, SharedMetrics};
pub use runner::{run, serve, RunError};
pub use shutdown::{shutdown_channel, ShutdownController, ShutdownSignal, TerminationSignals};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[path = "color_test.rs"]
mod color_tests;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[path = "admin_test.rs"]
mod admin_tests;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[path = "runner_test.rs"]
mod runner_tests;

#[cfg(test)]
#[path = "shutdown_test.rs"]
mod shutdown_tests;
