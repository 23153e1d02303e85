use color::config::Config;
use color::random::HttpRandomClient;
use color::server::{create_metrics, run, ServiceContext, TerminationSignals};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!(version = color::server::VERSION, "Starting color service");

    let signals = match TerminationSignals::install() {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "Failed to register signal handlers");
            return Err(e.into());
        }
    };

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };

    info!(
        url = %config.random_service_base_url,
        "Initializing external random service"
    );
    let random = Arc::new(HttpRandomClient::new(
        config.random_service_base_url.clone(),
    ));

    let metrics = create_metrics()
        .map_err(|e| anyhow::anyhow!("Failed to create metrics registry: {}", e))?;
    info!("Prometheus metrics registry initialized");

    let ctx = Arc::new(ServiceContext::new(config, random, metrics));

    let shutdown = async move {
        let signal = signals.recv().await;
        info!(signal = signal, "Initiating graceful shutdown");
    };

    if let Err(e) = run(ctx, shutdown).await {
        error!(error = %e, "Color service terminated abnormally");
        return Err(e.into());
    }

    Ok(())
}
