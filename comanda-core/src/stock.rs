//! Stock ledger
//!
//! Tracks named stock items (quantity, unit, minimum threshold, linked menu
//! entry). Quantity is floored at zero; an entry reaching zero is removed
//! and, when linkage metadata exists, its menu entry is removed with it.
//! The two removals are a committed cascade, not a transaction: stock
//! removal always happens, menu removal only when the linkage is present.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use shared::models::{MenuItem, Recipe, StockItem};
use shared::{ServiceError, ServiceResult};

use crate::store::{StoreGateway, UpdateOps, path};

/// Stock service over the injected store handle
#[derive(Clone)]
pub struct StockLedger {
    store: Arc<dyn StoreGateway>,
}

impl StockLedger {
    pub fn new(store: Arc<dyn StoreGateway>) -> Self {
        Self { store }
    }

    /// Read one stock entry
    pub async fn get_item(&self, name: &str) -> ServiceResult<Option<StockItem>> {
        let value = self.store.read_once(&path::stock_item(name)).await?;
        Ok(value.and_then(|v| serde_json::from_value(v).ok()))
    }

    /// Add quantity to an item, creating it when absent.
    ///
    /// Existing entries keep their unit and minimum unless new values are
    /// supplied. The whole record is overwrite-set, already merged.
    pub async fn add_stock(
        &self,
        name: &str,
        quantity: f64,
        unit: Option<&str>,
        minimum: Option<f64>,
    ) -> ServiceResult<StockItem> {
        if !(quantity > 0.0) {
            return Err(ServiceError::invalid(format!(
                "stock quantity must be positive, got {quantity}"
            )));
        }

        let existing = self.get_item(name).await?;
        let item = match existing {
            Some(mut current) => {
                current.quantity += quantity;
                if let Some(unit) = unit {
                    current.unit = unit.to_string();
                }
                if let Some(minimum) = minimum {
                    current.minimum_quantity = minimum;
                }
                current
            }
            None => {
                let mut item = StockItem::new(name, quantity, unit.unwrap_or("unidades"));
                item.minimum_quantity = minimum.unwrap_or(0.0);
                item
            }
        };

        let value = serde_json::to_value(&item)
            .map_err(|e| ServiceError::invalid(format!("unserializable stock item: {e}")))?;
        self.store.write(&path::stock_item(name), value).await?;
        info!(item = name, quantity = item.quantity, "stock added");
        Ok(item)
    }

    /// Store ops deducting `amount` from an existing item, with the zero
    /// cascade folded in. Returns `None` (after a warning) when the item does
    /// not exist, matching the lenient delivery path.
    pub(crate) async fn deduction_ops(
        &self,
        name: &str,
        amount: f64,
    ) -> ServiceResult<Option<UpdateOps>> {
        let Some(item) = self.get_item(name).await? else {
            warn!(item = name, "item missing from stock, skipping deduction");
            return Ok(None);
        };
        Ok(Some(Self::deplete_ops(&item, amount)))
    }

    /// Ops taking `amount` off `item`: quantity write above zero, entry
    /// removal plus menu cascade at zero
    fn deplete_ops(item: &StockItem, amount: f64) -> UpdateOps {
        let remaining = (item.quantity - amount).max(0.0);
        if remaining > 0.0 {
            vec![(
                path::stock_field(&item.name, "quantity"),
                Some(Value::from(remaining)),
            )]
        } else {
            let mut ops = vec![(path::stock_item(&item.name), None)];
            if let Some((category, key)) = item.menu_link() {
                ops.push((path::menu_entry(category, key), None));
            }
            ops
        }
    }

    /// Deduct `amount` from an item. `NotFound` when the item is absent;
    /// callers must not assume a silent no-op. Returns the new quantity
    /// (0 means the entry was removed).
    pub async fn decrement_stock(&self, name: &str, amount: f64) -> ServiceResult<f64> {
        let item = self
            .get_item(name)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("stock item {name}")))?;
        let remaining = (item.quantity - amount).max(0.0);
        self.store.update(Self::deplete_ops(&item, amount)).await?;
        if remaining <= 0.0 {
            info!(item = name, "stock depleted, entry removed");
        }
        Ok(remaining)
    }

    /// Correction path: set the quantity directly. Zero or below triggers
    /// the same cascade removal, using the caller-supplied category over the
    /// stored linkage when they differ.
    pub async fn set_quantity(
        &self,
        name: &str,
        quantity: f64,
        category: Option<&str>,
    ) -> ServiceResult<()> {
        let item = self
            .get_item(name)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("stock item {name}")))?;

        if quantity > 0.0 {
            self.store
                .update(vec![(
                    path::stock_field(name, "quantity"),
                    Some(Value::from(quantity)),
                )])
                .await?;
            return Ok(());
        }

        let mut ops: UpdateOps = vec![(path::stock_item(name), None)];
        let cascade_category = category.or(item.menu_category.as_deref());
        if let (Some(category), Some(key)) = (cascade_category, item.menu_key.as_deref()) {
            ops.push((path::menu_entry(category, key), None));
        }
        self.store.update(ops).await?;
        info!(item = name, "stock zeroed, entry removed");
        Ok(())
    }

    /// Ops returning `amount` to an existing item. `None` (after a warning)
    /// when the item no longer exists; cancelled orders do not resurrect
    /// removed stock entries.
    pub(crate) async fn restock_ops(
        &self,
        name: &str,
        amount: f64,
    ) -> ServiceResult<Option<UpdateOps>> {
        let Some(item) = self.get_item(name).await? else {
            warn!(item = name, "item missing from stock, skipping restock");
            return Ok(None);
        };
        Ok(Some(vec![(
            path::stock_field(name, "quantity"),
            Some(Value::from(item.quantity + amount)),
        )]))
    }

    /// Delete a stock entry and its menu entry
    pub async fn remove_item(&self, name: &str, category: &str) -> ServiceResult<()> {
        let item = self
            .get_item(name)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("stock item {name}")))?;
        let mut ops: UpdateOps = vec![(path::stock_item(name), None)];
        if let Some(key) = item.menu_key.as_deref() {
            ops.push((path::menu_entry(category, key), None));
        }
        self.store.update(ops).await?;
        Ok(())
    }

    /// Create a menu entry for a stock-managed item
    pub async fn add_menu_item(
        &self,
        name: &str,
        unit_price: f64,
        image: Option<&str>,
        category: &str,
        key: &str,
    ) -> ServiceResult<()> {
        let mut entry = MenuItem::new(name, unit_price.max(0.0));
        entry.description = "Adicionado via controle de estoque".to_string();
        if let Some(image) = image {
            entry.images.push(image.to_string());
        }
        let value = serde_json::to_value(&entry)
            .map_err(|e| ServiceError::invalid(format!("unserializable menu item: {e}")))?;
        self.store.write(&path::menu_entry(category, key), value).await
    }

    /// Record the ingredient sheet of a menu item. Informational only:
    /// delivery deduction goes through the combo table, not recipes.
    pub async fn add_recipe(&self, recipe: &Recipe) -> ServiceResult<()> {
        if recipe.components.is_empty() {
            return Err(ServiceError::invalid("recipe needs at least one component"));
        }
        let value = serde_json::to_value(recipe)
            .map_err(|e| ServiceError::invalid(format!("unserializable recipe: {e}")))?;
        self.store
            .write(&path::recipe(&recipe.menu_item), value)
            .await?;
        info!(item = %recipe.menu_item, "recipe recorded");
        Ok(())
    }

    /// Record which menu entry a stock item cascades to
    pub async fn link_menu(&self, name: &str, category: &str, key: &str) -> ServiceResult<()> {
        if self.get_item(name).await?.is_none() {
            return Err(ServiceError::not_found(format!("stock item {name}")));
        }
        self.store
            .update(vec![
                (
                    path::stock_field(name, "menu_category"),
                    Some(Value::from(category)),
                ),
                (path::stock_field(name, "menu_key"), Some(Value::from(key))),
            ])
            .await
    }
}

/// Decode a `stock/` subscription snapshot into items, id order
pub fn stock_from_snapshot(snapshot: Option<&Value>) -> Vec<StockItem> {
    snapshot
        .and_then(Value::as_object)
        .map(|map| {
            map.values()
                .filter_map(|v| serde_json::from_value(v.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Items at or below their minimum threshold. Pure re-derivation: consumers
/// call this on every snapshot instead of patching previous results.
pub fn low_stock(items: &[StockItem]) -> Vec<&StockItem> {
    items.iter().filter(|item| item.is_low()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use shared::models::RecipeComponent;

    fn ledger() -> (Arc<MemoryStore>, StockLedger) {
        let store = Arc::new(MemoryStore::new());
        let ledger = StockLedger::new(store.clone());
        (store, ledger)
    }

    #[tokio::test]
    async fn add_stock_creates_then_accumulates() {
        let (_, ledger) = ledger();
        let created = ledger
            .add_stock("Coca-Cola", 10.0, Some("latas"), Some(2.0))
            .await
            .unwrap();
        assert_eq!(created.quantity, 10.0);

        // Second add without unit/minimum keeps the existing ones
        let merged = ledger.add_stock("Coca-Cola", 5.0, None, None).await.unwrap();
        assert_eq!(merged.quantity, 15.0);
        assert_eq!(merged.unit, "latas");
        assert_eq!(merged.minimum_quantity, 2.0);
    }

    #[tokio::test]
    async fn add_stock_rejects_non_positive_quantity() {
        let (_, ledger) = ledger();
        let err = ledger.add_stock("Coca-Cola", 0.0, None, None).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn decrement_clamps_at_zero_and_removes_entry() {
        let (store, ledger) = ledger();
        ledger.add_stock("RedBull", 3.0, None, None).await.unwrap();

        let remaining = ledger.decrement_stock("RedBull", 5.0).await.unwrap();
        assert_eq!(remaining, 0.0);
        assert_eq!(store.read_once("stock/RedBull").await.unwrap(), None);
    }

    #[tokio::test]
    async fn zero_cascades_to_linked_menu_entry() {
        let (store, ledger) = ledger();
        ledger.add_stock("RedBull", 2.0, None, None).await.unwrap();
        ledger
            .add_menu_item("RedBull", 12.0, None, "Bebidas", "redbull_1")
            .await
            .unwrap();
        ledger.link_menu("RedBull", "Bebidas", "redbull_1").await.unwrap();

        ledger.decrement_stock("RedBull", 2.0).await.unwrap();
        assert_eq!(store.read_once("stock/RedBull").await.unwrap(), None);
        assert_eq!(store.read_once("menu/Bebidas/redbull_1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn unlinked_item_removes_stock_only() {
        let (store, ledger) = ledger();
        ledger.add_stock("Gelo", 1.0, Some("kg"), None).await.unwrap();
        store
            .write("menu/Extras/gelo_1", json!({"name": "Gelo", "unit_price": 1.0}))
            .await
            .unwrap();

        ledger.decrement_stock("Gelo", 1.0).await.unwrap();
        assert_eq!(store.read_once("stock/Gelo").await.unwrap(), None);
        // No linkage metadata: the menu entry survives
        assert!(store.read_once("menu/Extras/gelo_1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn decrement_missing_item_is_not_found() {
        let (_, ledger) = ledger();
        let err = ledger.decrement_stock("Inexistente", 1.0).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn set_quantity_zero_uses_caller_category_for_cascade() {
        let (store, ledger) = ledger();
        ledger.add_stock("Limão", 10.0, Some("kg"), None).await.unwrap();
        ledger
            .add_menu_item("Limão", 3.0, None, "Drinks", "limao_1")
            .await
            .unwrap();
        // Stored linkage points at a stale category; the caller's wins
        ledger.link_menu("Limão", "Antiga", "limao_1").await.unwrap();

        ledger.set_quantity("Limão", 0.0, Some("Drinks")).await.unwrap();
        assert_eq!(store.read_once("stock/Limão").await.unwrap(), None);
        assert_eq!(store.read_once("menu/Drinks/limao_1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn set_quantity_positive_is_a_plain_correction() {
        let (_, ledger) = ledger();
        ledger.add_stock("Coca-Cola", 10.0, None, None).await.unwrap();
        ledger.set_quantity("Coca-Cola", 4.0, None).await.unwrap();
        let item = ledger.get_item("Coca-Cola").await.unwrap().unwrap();
        assert_eq!(item.quantity, 4.0);
    }

    #[tokio::test]
    async fn set_quantity_missing_item_is_not_found() {
        let (_, ledger) = ledger();
        let err = ledger.set_quantity("Inexistente", 5.0, None).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn add_recipe_persists_ingredient_sheet() {
        let (store, ledger) = ledger();
        let recipe = Recipe {
            menu_item: "Caipirinha".into(),
            components: vec![
                RecipeComponent {
                    name: "Cachaça".into(),
                    quantity: 0.05,
                    unit: "L".into(),
                },
                RecipeComponent {
                    name: "Limão".into(),
                    quantity: 1.0,
                    unit: "unidades".into(),
                },
            ],
        };
        ledger.add_recipe(&recipe).await.unwrap();

        let stored = store.read_once("recipes/Caipirinha").await.unwrap().unwrap();
        assert_eq!(stored["components"][0]["name"], "Cachaça");
        assert_eq!(stored["components"][1]["quantity"], 1.0);
    }

    #[tokio::test]
    async fn add_recipe_rejects_empty_component_list() {
        let (_, ledger) = ledger();
        let recipe = Recipe {
            menu_item: "Vazia".into(),
            components: Vec::new(),
        };
        let err = ledger.add_recipe(&recipe).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn low_stock_is_rederived_from_snapshot() {
        let (store, ledger) = ledger();
        ledger.add_stock("Coca-Cola", 10.0, None, Some(2.0)).await.unwrap();
        ledger.add_stock("RedBull", 1.0, None, Some(2.0)).await.unwrap();

        let snapshot = store.read_once("stock").await.unwrap();
        let items = stock_from_snapshot(snapshot.as_ref());
        let low = low_stock(&items);
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].name, "RedBull");
    }
}
