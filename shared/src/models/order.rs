//! Order (pedido) model

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// One line of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl LineItem {
    pub fn new(name: impl Into<String>, quantity: u32) -> Self {
        Self {
            name: name.into(),
            quantity,
            note: None,
        }
    }
}

/// A batch of line items added to a tab at one time.
///
/// `table_number` always references a currently valid table number.
/// `origin_table_number` is provenance: set when the order's table is
/// absorbed into a merge, cleared once a split consumes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Store-assigned key, absent until persisted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub table_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_table_number: Option<String>,
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub delivered: bool,
    #[serde(default)]
    pub created_at: Timestamp,
}

impl Order {
    /// New undelivered order for a table
    pub fn new(table_number: impl Into<String>, items: Vec<LineItem>) -> Self {
        Self {
            id: None,
            table_number: table_number.into(),
            origin_table_number: None,
            items,
            delivered: false,
            created_at: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omits_absent_provenance_and_note() {
        let order = Order::new("5", vec![LineItem::new("Coca-Cola", 2)]);
        let value = serde_json::to_value(&order).unwrap();
        assert!(value.get("origin_table_number").is_none());
        assert!(value["items"][0].get("note").is_none());
        assert_eq!(value["delivered"], false);
    }

    #[test]
    fn provenance_round_trips() {
        let mut order = Order::new("5-7", vec![LineItem::new("RedBull", 1)]);
        order.origin_table_number = Some("5".into());
        let back: Order = serde_json::from_value(serde_json::to_value(&order).unwrap()).unwrap();
        assert_eq!(back.origin_table_number.as_deref(), Some("5"));
    }
}
