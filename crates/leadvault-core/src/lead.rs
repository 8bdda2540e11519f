//! Lead identity, workflow status, and the two persisted row shapes.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::LeadFields;

/// Canonical external identity of a lead.
///
/// The same id is written to the raw capture row and the normalized lead row
/// of one submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeadId(Uuid);

impl LeadId {
    /// Draw a fresh random id. Never derived from client-supplied data.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl FromStr for LeadId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.hyphenated().fmt(f)
    }
}

#[derive(Debug, Error)]
#[error("unknown lead status: {0:?}")]
pub struct UnknownStatus(pub String);

/// Workflow status of a normalized lead.
///
/// Ingestion only writes [`LeadStatus::New`]; the other states are set by
/// downstream CRM tooling and exist here so stored rows can be read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    #[default]
    New,
    Contacted,
    Qualified,
    Converted,
    Lost,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Contacted => "contacted",
            Self::Qualified => "qualified",
            Self::Converted => "converted",
            Self::Lost => "lost",
        }
    }
}

impl FromStr for LeadStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "contacted" => Ok(Self::Contacted),
            "qualified" => Ok(Self::Qualified),
            "converted" => Ok(Self::Converted),
            "lost" => Ok(Self::Lost),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Insert value for the `raw_captures` table.
///
/// `payload` is the submission body verbatim; it is never interpreted.
#[derive(Debug, Clone)]
pub struct NewRawCapture {
    pub id: LeadId,
    pub payload: serde_json::Value,
    pub idempotency_key: Option<String>,
    pub request_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A stored raw capture row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCapture {
    pub id: LeadId,
    pub payload: serde_json::Value,
    pub idempotency_key: Option<String>,
    pub request_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Insert value for the `leads` table.
#[derive(Debug, Clone)]
pub struct NewLead {
    pub id: LeadId,
    pub fields: LeadFields,
    pub idempotency_key: Option<String>,
    pub request_id: Option<String>,
    pub status: LeadStatus,
    pub created_at: DateTime<Utc>,
}

/// A stored normalized lead row.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedLead {
    pub id: LeadId,
    #[serde(flatten)]
    pub fields: LeadFields,
    pub idempotency_key: Option<String>,
    pub request_id: Option<String>,
    pub status: LeadStatus,
    /// Owner assigned by downstream CRM tooling. Ingestion leaves it empty.
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
}
