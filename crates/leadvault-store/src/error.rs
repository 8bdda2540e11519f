use std::collections::BTreeSet;

use leadvault_core::is_idempotency_key_field;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write. `fields` are the columns
    /// the engine reported as violated; it may be empty if the engine did
    /// not name them.
    #[error("unique constraint violated on {fields:?}")]
    UniqueViolation { fields: BTreeSet<String> },

    #[cfg(feature = "duckdb")]
    #[error("duckdb error: {0}")]
    DuckDb(#[from] ::duckdb::Error),

    #[error("payload serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("blocking storage task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("storage connection lock poisoned")]
    Poisoned,

    #[error("{0}")]
    Other(String),
}

/// The only branch the ingestion path takes on a storage failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass<'a> {
    DuplicateKey { fields: &'a BTreeSet<String> },
    Other,
}

impl StoreError {
    pub fn unique_violation<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::UniqueViolation {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn class(&self) -> FailureClass<'_> {
        match self {
            Self::UniqueViolation { fields } => FailureClass::DuplicateKey { fields },
            _ => FailureClass::Other,
        }
    }

    /// True only for a unique violation that names an idempotency key column.
    ///
    /// Violations on any other column (including the primary key) are not
    /// duplicates of a prior submission and must be treated as failures.
    pub fn is_idempotency_conflict(&self) -> bool {
        match self.class() {
            FailureClass::DuplicateKey { fields } => {
                fields.iter().any(|field| is_idempotency_key_field(field))
            }
            FailureClass::Other => false,
        }
    }
}
