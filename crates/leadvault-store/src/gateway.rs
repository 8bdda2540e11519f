//! The storage primitives the ingestion path depends on.

use async_trait::async_trait;
use leadvault_core::{NewLead, NewRawCapture, NormalizedLead};

use crate::StoreError;

/// Insert and lookup primitives over the `raw_captures` and `leads` tables.
///
/// Implementations must report uniqueness rejections as
/// [`StoreError::UniqueViolation`] naming the violated columns, and every
/// other failure as some other variant. Each call is a single round-trip
/// with no retries.
#[async_trait]
pub trait LeadGateway: Send + Sync {
    /// Insert one raw capture row.
    async fn insert_raw_capture(&self, capture: NewRawCapture) -> Result<(), StoreError>;

    /// Insert one normalized lead row.
    async fn insert_lead(&self, lead: NewLead) -> Result<(), StoreError>;

    /// Find the normalized lead holding `key`.
    ///
    /// Must observe every insert committed before the call began.
    async fn find_lead_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<NormalizedLead>, StoreError>;

    /// Cheap liveness probe for health reporting.
    async fn ping(&self) -> Result<(), StoreError>;
}
