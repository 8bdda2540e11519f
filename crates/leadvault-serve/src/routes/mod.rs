//! API route definitions.

mod health;
mod leads;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};

use crate::state::AppState;

/// Header carrying the client's idempotency key.
pub const IDEMPOTENCY_KEY_HEADER: &str = "idempotency-key";

/// Header carrying the client's request correlation id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Build the complete API router.
///
/// - `GET /health` - Health check
/// - `POST /api/leads` - Submit a lead
pub fn router(state: AppState) -> Router {
    let body_limit = DefaultBodyLimit::max(state.config.max_body_bytes);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/leads", post(leads::create_lead))
        .layer(body_limit)
        .with_state(state)
}
