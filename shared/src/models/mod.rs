//! Data models
//!
//! Shared between the service crate and frontends (via the store).
//! All records serialize to plain JSON documents; store-assigned ids live
//! outside the record and are re-attached on read.

pub mod menu_item;
pub mod order;
pub mod recipe;
pub mod settlement;
pub mod stock_item;
pub mod table;

// Re-exports
pub use menu_item::*;
pub use order::*;
pub use recipe::*;
pub use settlement::*;
pub use stock_item::*;
pub use table::*;
