//! Application state and configuration.

use std::path::PathBuf;
use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue, Method, header};
use leadvault_ingest::Ingestor;
use leadvault_store::LeadGateway;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::routes::{IDEMPOTENCY_KEY_HEADER, REQUEST_ID_HEADER};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

/// Server configuration, read from flags or environment.
#[derive(Debug, Clone, clap::Args)]
pub struct Config {
    /// Server bind address.
    #[arg(long, env = "LEADVAULT_BIND_ADDR", default_value = "0.0.0.0:8080")]
    pub bind_addr: String,

    /// DuckDB database file. Leads are kept in memory when unset.
    #[arg(long, env = "LEADVAULT_DB_PATH")]
    pub db_path: Option<PathBuf>,

    /// Comma-separated allowed CORS origins; `*` allows any origin.
    #[arg(
        long,
        env = "LEADVAULT_CORS_ORIGINS",
        default_value = "*",
        value_delimiter = ','
    )]
    pub cors_origins: Vec<String>,

    /// Largest accepted request body, in bytes.
    #[arg(long, env = "LEADVAULT_MAX_BODY_BYTES", default_value_t = 1024 * 1024)]
    pub max_body_bytes: usize,

    #[arg(long, env = "LEADVAULT_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
            db_path: None,
            cors_origins: vec!["*".to_string()],
            max_body_bytes: 1024 * 1024,
            log_format: LogFormat::Text,
        }
    }
}

impl Config {
    /// Reject configurations the server cannot start with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.bind_addr.trim().is_empty() {
            anyhow::bail!("LEADVAULT_BIND_ADDR must not be empty");
        }
        if self.max_body_bytes == 0 {
            anyhow::bail!("LEADVAULT_MAX_BODY_BYTES must be greater than zero");
        }
        self.cors_layer()?;
        Ok(())
    }

    /// Build the CORS policy for the configured origins.
    pub fn cors_layer(&self) -> anyhow::Result<CorsLayer> {
        let origins: Vec<&str> = self
            .cors_origins
            .iter()
            .map(|origin| origin.trim())
            .filter(|origin| !origin.is_empty())
            .collect();

        let allow_origin = if origins.is_empty() || origins.contains(&"*") {
            AllowOrigin::from(Any)
        } else {
            let values = origins
                .iter()
                .map(|origin| {
                    HeaderValue::from_str(origin)
                        .map_err(|_| anyhow::anyhow!("invalid CORS origin: {origin:?}"))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            AllowOrigin::list(values)
        };

        Ok(CorsLayer::new()
            .allow_origin(allow_origin)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([
                header::CONTENT_TYPE,
                HeaderName::from_static(IDEMPOTENCY_KEY_HEADER),
                HeaderName::from_static(REQUEST_ID_HEADER),
            ]))
    }
}

/// Shared application state available to all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub ingestor: Ingestor,
    pub config: Arc<Config>,
}

impl AppState {
    /// The gateway handle is owned by the caller's startup/shutdown sequence.
    pub fn new(config: Config, gateway: Arc<dyn LeadGateway>) -> Self {
        Self {
            ingestor: Ingestor::new(gateway),
            config: Arc::new(config),
        }
    }
}
