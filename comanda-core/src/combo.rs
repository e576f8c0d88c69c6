//! Combo expansion
//!
//! A combo is a composite menu item that deducts several stock items when
//! delivered. The mapping is a static table from composite name to its
//! components with a per-unit quantity.

use std::collections::HashMap;

/// Static mapping: composite item name -> ordered (component, qty per unit)
#[derive(Debug, Clone)]
pub struct ComboTable {
    entries: HashMap<String, Vec<(String, f64)>>,
}

impl ComboTable {
    /// Empty table; every item passes through unchanged
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Build from explicit entries
    pub fn from_entries(
        entries: impl IntoIterator<Item = (String, Vec<(String, f64)>)>,
    ) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn is_combo(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Expand an ordered quantity of `name` into stock deductions.
    ///
    /// Known composites yield their component list scaled by the ordered
    /// quantity; anything else passes through as a single-element list.
    /// The uniform shape lets callers treat combos and plain items alike.
    pub fn expand(&self, name: &str, quantity: u32) -> Vec<(String, f64)> {
        match self.entries.get(name) {
            Some(components) => components
                .iter()
                .map(|(component, per_unit)| (component.clone(), per_unit * quantity as f64))
                .collect(),
            None => vec![(name.to_string(), quantity as f64)],
        }
    }
}

impl Default for ComboTable {
    /// The house combos
    fn default() -> Self {
        let energetico = vec![
            ("Água de coco".to_string(), 1.0),
            ("RedBull".to_string(), 1.0),
            ("Coca-Cola".to_string(), 1.0),
        ];
        Self::from_entries([
            ("Combo Energético".to_string(), energetico.clone()),
            ("Combo caipirinha".to_string(), energetico),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_combo_scales_components() {
        let combos = ComboTable::default();
        let expanded = combos.expand("Combo Energético", 3);
        assert_eq!(
            expanded,
            vec![
                ("Água de coco".to_string(), 3.0),
                ("RedBull".to_string(), 3.0),
                ("Coca-Cola".to_string(), 3.0),
            ]
        );
    }

    #[test]
    fn non_combo_passes_through() {
        let combos = ComboTable::default();
        assert_eq!(
            combos.expand("Coca-Cola", 2),
            vec![("Coca-Cola".to_string(), 2.0)]
        );
        assert!(!combos.is_combo("Coca-Cola"));
    }

    #[test]
    fn empty_table_passes_everything_through() {
        let combos = ComboTable::empty();
        assert!(!combos.is_combo("Combo Energético"));
        assert_eq!(
            combos.expand("Combo Energético", 2),
            vec![("Combo Energético".to_string(), 2.0)]
        );
    }

    #[test]
    fn custom_per_unit_quantities_multiply() {
        let combos = ComboTable::from_entries([(
            "Dose dupla".to_string(),
            vec![("Cachaça".to_string(), 2.0), ("Limão".to_string(), 0.5)],
        )]);
        assert_eq!(
            combos.expand("Dose dupla", 2),
            vec![("Cachaça".to_string(), 4.0), ("Limão".to_string(), 1.0)]
        );
    }
}
