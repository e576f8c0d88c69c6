//! Stock item model

use serde::{Deserialize, Serialize};

/// Stock entry, keyed in the store by its name.
///
/// Quantity never goes below zero; reaching zero removes the entry and,
/// when the linkage fields are present, the linked menu entry as well.
/// That cascade is committed, not transactional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockItem {
    pub name: String,
    pub quantity: f64,
    pub unit: String,
    #[serde(default)]
    pub minimum_quantity: f64,
    /// Menu category of the linked menu entry, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_category: Option<String>,
    /// Key of the linked menu entry within its category, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub menu_key: Option<String>,
}

impl StockItem {
    pub fn new(name: impl Into<String>, quantity: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quantity,
            unit: unit.into(),
            minimum_quantity: 0.0,
            menu_category: None,
            menu_key: None,
        }
    }

    /// True when both linkage fields are present
    pub fn menu_link(&self) -> Option<(&str, &str)> {
        match (self.menu_category.as_deref(), self.menu_key.as_deref()) {
            (Some(category), Some(key)) => Some((category, key)),
            _ => None,
        }
    }

    /// At or below the configured minimum
    pub fn is_low(&self) -> bool {
        self.quantity <= self.minimum_quantity
    }
}
