use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod api;
mod config;
mod db;
mod error;
mod export;
mod i18n;
mod ingestion;
mod service;

use crate::config::AppConfig;
use crate::db::Database;
use crate::ingestion::PdfiumTextExtractor;
use crate::service::StatementService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    init_logging();

    info!(
        "Starting statement service v{}",
        env!("CARGO_PKG_VERSION")
    );

    let config = Arc::new(AppConfig::load()?);
    info!(
        host = %config.server.host,
        port = config.server.port,
        data_dir = %config.storage.data_dir.display(),
        "Configuration loaded"
    );

    // Ensure data directory exists
    std::fs::create_dir_all(&config.storage.data_dir)?;

    // Initialize database
    let db_path = config.storage.database_path();
    let db = Arc::new(Database::open(&db_path)?);
    info!(path = %db_path.display(), "Database initialized");

    // Uploads fail at extraction time without it, but the rest of the API still works
    if let Err(e) = ingestion::pdf::create_pdfium() {
        warn!(error = %e, "PDFium is not available; statement extraction will fail");
    }

    let metrics = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!(error = %e, "Failed to install Prometheus recorder");
            None
        }
    };

    // Initialize the service
    let service = Arc::new(StatementService::new(
        config.clone(),
        db,
        Arc::new(PdfiumTextExtractor),
    )?);

    match service.recover_interrupted_batches().await {
        Ok(count) if count > 0 => info!(count, "Marked interrupted batches as failed"),
        Err(e) => warn!(error = %e, "Interrupted batch recovery failed"),
        _ => {}
    }

    // Start batch retention worker
    let shutdown = CancellationToken::new();
    let retention = StatementService::start_retention_worker(service.clone(), shutdown.clone());

    let app = api::router(service, metrics);

    // Start the server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    shutdown.cancel();
    if let Err(e) = retention.await {
        warn!(error = %e, "Retention worker did not stop cleanly");
    }
    info!("Shutdown complete");

    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM, cancelling background workers.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
    shutdown.cancel();
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let format = fmt::format()
        .with_target(true)
        .with_thread_ids(true)
        .compact();

    // Use RUST_LOG if set, otherwise default to info level for our crate
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("statement_service=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().event_format(format))
        .with(filter)
        .init();
}
