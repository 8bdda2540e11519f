//! Storage gateway: insert/lookup primitives and constraint-failure classification.

pub mod classify;
mod error;
mod gateway;

pub use error::{FailureClass, StoreError};
pub use gateway::LeadGateway;

#[cfg(feature = "duckdb")]
mod duck;
#[cfg(feature = "duckdb")]
pub use duck::DuckStore;
