//! leadvault serve - HTTP boundary for lead ingestion.
//!
//! Decodes submissions, reads the `Idempotency-Key` and `X-Request-Id`
//! headers, runs the [`Ingestor`](leadvault_ingest::Ingestor), and maps its
//! outcome to a status code. Failures are answered with a generic body; the
//! cause is only logged.
//!
//! # Architecture
//!
//! - **AppState**: Shared application state (ingestor over an explicit store handle, configuration)
//! - **Routes**: `POST /api/leads`, `GET /health`

mod error;
mod routes;
mod state;

pub use self::error::ApiError;
pub use self::routes::{IDEMPOTENCY_KEY_HEADER, REQUEST_ID_HEADER, router};
pub use self::state::{AppState, Config, LogFormat};
