//! Common types for the shared crate

/// Timestamp type (Unix milliseconds, resolved by the store at write time)
pub type Timestamp = i64;
