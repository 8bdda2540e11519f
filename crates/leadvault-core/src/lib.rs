pub mod lead;
pub mod schema;
pub mod submission;

pub use lead::{
    LeadId, LeadStatus, NewLead, NewRawCapture, NormalizedLead, RawCapture, UnknownStatus,
};
pub use schema::is_idempotency_key_field;
pub use submission::{FIELD_NAMES, LeadFields, NotAnObject, Submission};
