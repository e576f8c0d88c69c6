//! Settlement (closed-tab) model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::order::LineItem;

/// Historical record written once when a tab is fully closed.
///
/// Immutable after creation and independent of the live table/order
/// records; it snapshots everything needed to reprint the bill.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    pub table_number: String,
    pub customer_name: String,
    /// Flattened line items of every order on the tab at close time
    pub items: Vec<LineItem>,
    pub subtotal: f64,
    pub discount: f64,
    pub total: f64,
    pub paid_total: f64,
    pub received: f64,
    pub change_due: f64,
    pub closed_at: DateTime<Utc>,
}
