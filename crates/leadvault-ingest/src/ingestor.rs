//! The write protocol for one submission: raw capture first, then the
//! normalized lead, with idempotency conflicts resolved to the original lead.

use std::sync::Arc;

use chrono::Utc;
use leadvault_core::{LeadFields, LeadId, LeadStatus, NewLead, NewRawCapture, Submission};
use leadvault_store::{LeadGateway, StoreError};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};

/// Result of a successful ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestOutcome {
    pub lead_id: LeadId,
    /// True when the idempotency key already belonged to a stored lead and
    /// `lead_id` is that lead's id.
    pub deduplicated: bool,
}

/// Why an ingestion failed. For logs only; never shown to clients.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("raw capture failed: {0}")]
    RawCapture(#[source] StoreError),

    #[error("normalized insert failed: {0}")]
    Normalize(#[source] StoreError),

    #[error("lookup of existing lead failed: {0}")]
    Lookup(#[source] StoreError),

    /// The key conflicted on insert but no lead holds it.
    #[error("idempotency key {key:?} conflicted but no existing lead was found")]
    MissingDuplicate { key: String },
}

/// Runs the ingestion write sequence against a [`LeadGateway`].
///
/// Holds no state between calls; concurrent submissions with the same key
/// are arbitrated solely by the store's uniqueness constraints. Nothing is
/// retried.
#[derive(Clone)]
pub struct Ingestor {
    gateway: Arc<dyn LeadGateway>,
}

impl Ingestor {
    pub fn new(gateway: Arc<dyn LeadGateway>) -> Self {
        Self { gateway }
    }

    pub fn gateway(&self) -> &Arc<dyn LeadGateway> {
        &self.gateway
    }

    /// Persist one submission.
    ///
    /// 1. Generate a fresh [`LeadId`].
    /// 2. Insert the raw capture. An idempotency conflict here means the raw
    ///    data is already stored and is ignored; any other failure aborts.
    /// 3. Insert the normalized lead under the same id. On an idempotency
    ///    conflict, return the existing lead's id with `deduplicated = true`.
    ///
    /// The raw capture is always written before the lead, so a failure in
    /// step 3 still leaves the submission durable.
    pub async fn ingest(
        &self,
        submission: &Submission,
        idempotency_key: Option<&str>,
        request_id: Option<&str>,
    ) -> Result<IngestOutcome, IngestError> {
        let id = LeadId::generate();
        let created_at = Utc::now();
        let payload = submission.to_value();

        let raw = NewRawCapture {
            id,
            payload: payload.clone(),
            idempotency_key: idempotency_key.map(str::to_owned),
            request_id: request_id.map(str::to_owned),
            created_at,
        };
        match self.gateway.insert_raw_capture(raw).await {
            Ok(()) => debug!(lead_id = %id, "raw capture stored"),
            Err(err) if err.is_idempotency_conflict() => {
                debug!(lead_id = %id, ?idempotency_key, "raw capture already stored for key");
            }
            Err(err) => {
                error!(
                    lead_id = %id,
                    ?idempotency_key,
                    ?request_id,
                    %payload,
                    error = %err,
                    "raw capture failed"
                );
                return Err(IngestError::RawCapture(err));
            }
        }

        let lead = NewLead {
            id,
            fields: LeadFields::from_submission(submission),
            idempotency_key: idempotency_key.map(str::to_owned),
            request_id: request_id.map(str::to_owned),
            status: LeadStatus::New,
            created_at,
        };
        match self.gateway.insert_lead(lead).await {
            Ok(()) => {
                info!(lead_id = %id, ?idempotency_key, ?request_id, "lead ingested");
                Ok(IngestOutcome {
                    lead_id: id,
                    deduplicated: false,
                })
            }
            Err(err) if err.is_idempotency_conflict() => match idempotency_key {
                Some(key) => self.resolve_duplicate(id, key, request_id, &payload).await,
                // A NULL key cannot conflict; the store reported something else.
                None => {
                    error!(
                        lead_id = %id,
                        ?request_id,
                        %payload,
                        error = %err,
                        "normalized insert failed"
                    );
                    Err(IngestError::Normalize(err))
                }
            },
            Err(err) => {
                error!(
                    lead_id = %id,
                    ?idempotency_key,
                    ?request_id,
                    %payload,
                    error = %err,
                    "normalized insert failed"
                );
                Err(IngestError::Normalize(err))
            }
        }
    }

    /// Map a losing insert onto the lead that won the key.
    ///
    /// `discarded` is the id generated for this attempt; its raw capture (if
    /// any) stays behind as audit data. `payload` is logged on failure.
    async fn resolve_duplicate(
        &self,
        discarded: LeadId,
        key: &str,
        request_id: Option<&str>,
        payload: &Value,
    ) -> Result<IngestOutcome, IngestError> {
        match self.gateway.find_lead_by_idempotency_key(key).await {
            Ok(Some(existing)) => {
                info!(
                    lead_id = %existing.id,
                    discarded_id = %discarded,
                    idempotency_key = key,
                    ?request_id,
                    "duplicate submission resolved to existing lead"
                );
                Ok(IngestOutcome {
                    lead_id: existing.id,
                    deduplicated: true,
                })
            }
            Ok(None) => {
                error!(
                    alarm = true,
                    discarded_id = %discarded,
                    idempotency_key = key,
                    ?request_id,
                    %payload,
                    "idempotency conflict but no lead holds the key"
                );
                Err(IngestError::MissingDuplicate {
                    key: key.to_owned(),
                })
            }
            Err(err) => {
                error!(
                    discarded_id = %discarded,
                    idempotency_key = key,
                    ?request_id,
                    %payload,
                    error = %err,
                    "lookup of existing lead failed"
                );
                Err(IngestError::Lookup(err))
            }
        }
    }
}
