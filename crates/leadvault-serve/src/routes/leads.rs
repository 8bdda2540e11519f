//! Lead submission endpoint.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderMap, StatusCode};
use leadvault_core::Submission;
use leadvault_ingest::IngestOutcome;
use serde_json::Value;

use super::{IDEMPOTENCY_KEY_HEADER, REQUEST_ID_HEADER};
use crate::error::ApiError;
use crate::state::AppState;

/// `POST /api/leads`
///
/// Any JSON object is accepted. Responds 201 for a new lead and 409 when the
/// idempotency key already belongs to a lead; both carry
/// `{"leadId": ..., "deduplicated": ...}` and both mean the lead is stored.
pub async fn create_lead(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<IngestOutcome>), ApiError> {
    let Json(value) = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge
        } else {
            ApiError::BadRequest(rejection.body_text())
        }
    })?;
    let submission =
        Submission::from_value(value).map_err(|err| ApiError::BadRequest(err.to_string()))?;

    let idempotency_key = header_value(&headers, IDEMPOTENCY_KEY_HEADER).or_else(|| {
        submission
            .idempotency_key_hint()
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_owned)
    });
    let request_id = header_value(&headers, REQUEST_ID_HEADER);

    let outcome = state
        .ingestor
        .ingest(&submission, idempotency_key.as_deref(), request_id.as_deref())
        .await?;

    let status = if outcome.deduplicated {
        StatusCode::CONFLICT
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(outcome)))
}

/// Trimmed header value; missing, non-UTF-8 and blank values are `None`.
fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}
