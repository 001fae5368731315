use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::{net::TcpListener, signal};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use building_energy_service::{
    api::{self, AppState},
    config::Config,
    dataset::Dataset,
    db::DataFiles,
    query::QueryService,
    status::{CsvStatusStore, StatusService},
    telemetry::{self, generator::GeneratorConfig},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env (ignore error if file absent; env vars may be set externally)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    let files = DataFiles::in_dir(&config.data_dir);

    // One-time bootstrap: generate the dataset unless it is already on disk
    let generator = GeneratorConfig {
        rooms: config.topology.rooms(),
        start: config.dataset_start,
        end: config.dataset_end,
        seed: config.generator_seed,
        tariff: config.tariff,
    };
    telemetry::bootstrap(&files, &generator).context("failed to bootstrap dataset")?;

    // The reading set is immutable from here on; load it once and share it
    let dataset = Dataset::load(&files.readings)
        .with_context(|| format!("failed to load {}", files.readings.display()))?;

    let status = StatusService::new(Arc::new(CsvStatusStore::new(&files.status)));
    let query = QueryService::new(dataset, status.clone(), config.topology.clone(), config.tariff);

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!(
        addr = %addr,
        tariff = config.tariff.rate_per_kwh,
        carbon_factor = config.tariff.carbon_g_per_kwh,
        "HTTP server listening"
    );

    axum::serve(listener, api::router(AppState { query, status }))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
