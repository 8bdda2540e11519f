//! leadvault - lead ingestion server.
//!
//! Owns the store handle for the life of the process: opened and migrated
//! before the listener binds, closed after the server drains.

use std::sync::Arc;

use axum::http::Request;
use clap::Parser;
use leadvault_serve::{AppState, Config, LogFormat, router};
use leadvault_store::DuckStore;
use tower_http::trace::TraceLayer;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Lead ingestion server.
#[derive(Parser, Debug)]
#[command(name = "leadvault")]
#[command(about = "HTTP server for durable, idempotent lead ingestion", long_about = None)]
struct Args {
    #[command(flatten)]
    config: Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let Args { config } = Args::parse();

    init_tracing(config.log_format);
    config.validate()?;

    let store = match &config.db_path {
        Some(path) => DuckStore::open_persistent(path)?,
        None => {
            tracing::warn!("LEADVAULT_DB_PATH not set; leads are kept in memory only");
            DuckStore::open()?
        }
    };
    store.ensure_schema()?;

    let cors = config.cors_layer()?;
    let bind_addr = config.bind_addr.clone();
    tracing::info!(
        bind_addr = %bind_addr,
        db_path = ?config.db_path,
        cors_origins = ?config.cors_origins,
        max_body_bytes = config.max_body_bytes,
        "configuration loaded"
    );

    let state = AppState::new(config, Arc::new(store.clone()));

    let app = router(state)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                tracing::span!(
                    Level::INFO,
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
        .layer(cors);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(addr = %bind_addr, "starting server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    if let Err(err) = store.close() {
        tracing::warn!(error = %err, "lead store was not closed cleanly");
    }

    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
