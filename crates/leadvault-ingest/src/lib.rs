//! Ingestion coordinator for externally submitted leads.

mod ingestor;

pub use ingestor::{IngestError, IngestOutcome, Ingestor};
