//! Menu item model

use serde::{Deserialize, Serialize};

/// Menu entry, keyed in the store by (category, key).
///
/// Read-only from the core's perspective except for the cascade deletion
/// triggered when a linked stock item reaches zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name: String,
    #[serde(default)]
    pub unit_price: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    #[serde(default)]
    pub description: String,
}

impl MenuItem {
    pub fn new(name: impl Into<String>, unit_price: f64) -> Self {
        Self {
            name: name.into(),
            unit_price,
            images: Vec::new(),
            description: String::new(),
        }
    }
}
