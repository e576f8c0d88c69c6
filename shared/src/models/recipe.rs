//! Recipe sheet model

use serde::{Deserialize, Serialize};

/// One ingredient line of a recipe sheet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeComponent {
    pub name: String,
    pub quantity: f64,
    #[serde(default)]
    pub unit: String,
}

/// Ingredient sheet recorded for a menu item.
///
/// Informational only: delivery deduction consults the combo table, never
/// recipe sheets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub menu_item: String,
    pub components: Vec<RecipeComponent>,
}
