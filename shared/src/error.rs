//! Unified error type for the comanda services
//!
//! Four failure kinds cover everything the core can report:
//!
//! - [`ServiceError::NotFound`]: a referenced table/order/stock item is absent
//! - [`ServiceError::InvalidInput`]: non-positive quantity, empty item list,
//!   discount exceeding subtotal
//! - [`ServiceError::Conflict`]: the operation is valid but the current state
//!   forbids it (removing a table that still holds orders, closing with
//!   insufficient payment, splitting a non-merged table)
//! - [`ServiceError::StoreUnavailable`]: the underlying store call failed
//!
//! None of these are swallowed; every service call surfaces them to the
//! caller. No automatic retries are performed on store failures.

use thiserror::Error;

/// Unified error type for all service operations
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ServiceError {
    /// Referenced entity does not exist
    #[error("{resource} not found")]
    NotFound { resource: String },

    /// Input failed validation
    #[error("invalid input: {message}")]
    InvalidInput { message: String },

    /// Current state forbids the operation
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Store call failed or timed out
    #[error("store unavailable: {message}")]
    StoreUnavailable { message: String },
}

impl ServiceError {
    // ========== Convenient constructors ==========

    /// Create a NotFound error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create an InvalidInput error
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a Conflict error
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Create a StoreUnavailable error
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    /// True when the error is a NotFound
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_resource() {
        let err = ServiceError::not_found("table 5");
        assert_eq!(err.to_string(), "table 5 not found");
        assert!(err.is_not_found());
    }

    #[test]
    fn conflict_display() {
        let err = ServiceError::conflict("table still has orders");
        assert_eq!(err.to_string(), "conflict: table still has orders");
    }
}
