//! Shared types for the comanda services
//!
//! Data models and the unified error type used by the service crate and
//! by any frontend that talks to the store directly.

pub mod error;
pub mod models;
pub mod types;

// Re-exports
pub use error::{ServiceError, ServiceResult};
pub use serde::{Deserialize, Serialize};
pub use types::Timestamp;
