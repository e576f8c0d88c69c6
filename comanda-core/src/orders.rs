//! Order ledger
//!
//! Orders attach to a table by its display number. Marking an order
//! delivered deducts stock (combos expanded first); the deduction happens
//! exactly once per order, enforced by a compare-and-set on the delivered
//! flag rather than a read-then-write race. Toggling back to undelivered
//! never restocks; the compensating action for a cancelled order is
//! [`OrderLedger::remove_order`], which does.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use shared::models::{LineItem, Order};
use shared::{ServiceError, ServiceResult};

use crate::combo::ComboTable;
use crate::stock::StockLedger;
use crate::store::{StoreGateway, UpdateOps, path, server_timestamp};

/// Order service over the injected store handle
#[derive(Clone)]
pub struct OrderLedger {
    store: Arc<dyn StoreGateway>,
    stock: StockLedger,
    combos: ComboTable,
}

impl OrderLedger {
    pub fn new(store: Arc<dyn StoreGateway>, combos: ComboTable) -> Self {
        Self {
            stock: StockLedger::new(store.clone()),
            store,
            combos,
        }
    }

    /// Read one order
    pub async fn get_order(&self, order_id: &str) -> ServiceResult<Order> {
        let value = self
            .store
            .read_once(&path::order(order_id))
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("order {order_id}")))?;
        let mut order: Order = serde_json::from_value(value)
            .map_err(|e| ServiceError::invalid(format!("malformed order {order_id}: {e}")))?;
        order.id = Some(order_id.to_string());
        Ok(order)
    }

    /// Persist a new undelivered order. Returns the generated id.
    pub async fn place_order(
        &self,
        table_number: &str,
        items: Vec<LineItem>,
    ) -> ServiceResult<String> {
        if items.is_empty() {
            return Err(ServiceError::invalid("order needs at least one line item"));
        }
        if let Some(item) = items.iter().find(|item| item.quantity == 0) {
            return Err(ServiceError::invalid(format!(
                "line item {} has zero quantity",
                item.name
            )));
        }

        let order = Order::new(table_number, items);
        let mut value = serde_json::to_value(&order)
            .map_err(|e| ServiceError::invalid(format!("unserializable order: {e}")))?;
        value["created_at"] = server_timestamp();

        let id = self.store.generate_key(path::ORDERS).await?;
        self.store.write(&path::order(&id), value).await?;
        info!(order = %id, table = table_number, "order placed");
        Ok(id)
    }

    /// Toggle the delivered flag.
    ///
    /// false -> true deducts stock for every line item (combos expanded),
    /// folded with the flag write into one guarded atomic update so two
    /// concurrent deliveries cannot deduct twice. Re-asserting the current
    /// state is a no-op. true -> false clears the flag without restocking.
    pub async fn set_delivered(&self, order_id: &str, delivered: bool) -> ServiceResult<()> {
        let order = self.get_order(order_id).await?;
        if order.delivered == delivered {
            return Ok(());
        }

        let flag_path = path::order_field(order_id, "delivered");
        if !delivered {
            // No restock on the way back down
            self.store
                .update(vec![(flag_path, Some(Value::Bool(false)))])
                .await?;
            return Ok(());
        }

        let mut ops: UpdateOps = vec![(flag_path.clone(), Some(Value::Bool(true)))];
        for (name, amount) in self.aggregate_deductions(&order.items) {
            if let Some(item_ops) = self.stock.deduction_ops(&name, amount).await? {
                ops.extend(item_ops);
            }
        }

        let committed = self
            .store
            .compare_and_update(&flag_path, &Value::Bool(false), ops)
            .await?;
        if committed {
            info!(order = %order_id, "order delivered, stock deducted");
        } else {
            // Someone else delivered first; their deduction stands
            warn!(order = %order_id, "delivery raced, skipping duplicate deduction");
        }
        Ok(())
    }

    /// Cancel an order: return every line item to stock, then delete it,
    /// as one atomic update
    pub async fn remove_order(&self, order_id: &str) -> ServiceResult<()> {
        let order = self.get_order(order_id).await?;

        let mut ops: UpdateOps = Vec::new();
        for (name, amount) in self.aggregate_deductions(&order.items) {
            if let Some(item_ops) = self.stock.restock_ops(&name, amount).await? {
                ops.extend(item_ops);
            }
        }
        ops.push((path::order(order_id), None));
        self.store.update(ops).await?;
        info!(order = %order_id, "order removed, stock returned");
        Ok(())
    }

    /// All orders currently tagged to `table_number`, insertion order
    pub async fn orders_for_table(&self, table_number: &str) -> ServiceResult<Vec<Order>> {
        let snapshot = self.store.read_once(path::ORDERS).await?;
        let mut orders = orders_from_snapshot(snapshot.as_ref());
        orders.retain(|order| order.table_number == table_number);
        Ok(orders)
    }

    /// Delete every order on a table without restocking (used by tab close
    /// and table removal)
    pub async fn remove_orders_for_table(&self, table_number: &str) -> ServiceResult<()> {
        let orders = self.orders_for_table(table_number).await?;
        if orders.is_empty() {
            return Ok(());
        }
        let ops: UpdateOps = orders
            .iter()
            .filter_map(|order| order.id.as_deref())
            .map(|id| (path::order(id), None))
            .collect();
        self.store.update(ops).await
    }

    /// Combine expansions of every line item per stock name, so one atomic
    /// update never writes the same path twice
    fn aggregate_deductions(&self, items: &[LineItem]) -> BTreeMap<String, f64> {
        let mut totals: BTreeMap<String, f64> = BTreeMap::new();
        for item in items {
            for (name, amount) in self.combos.expand(&item.name, item.quantity) {
                *totals.entry(name).or_insert(0.0) += amount;
            }
        }
        totals
    }
}

/// Decode an `orders/` subscription snapshot, ids re-attached, insertion
/// (push-key) order
pub fn orders_from_snapshot(snapshot: Option<&Value>) -> Vec<Order> {
    let Some(map) = snapshot.and_then(Value::as_object) else {
        return Vec::new();
    };
    let mut orders: Vec<Order> = map
        .iter()
        .filter_map(|(id, value)| {
            let mut order: Order = serde_json::from_value(value.clone()).ok()?;
            order.id = Some(id.clone());
            Some(order)
        })
        .collect();
    orders.sort_by(|a, b| a.id.cmp(&b.id));
    orders
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn ledger() -> (Arc<MemoryStore>, OrderLedger, StockLedger) {
        let store = Arc::new(MemoryStore::new());
        let orders = OrderLedger::new(store.clone(), ComboTable::default());
        let stock = StockLedger::new(store.clone());
        (store, orders, stock)
    }

    #[tokio::test]
    async fn place_order_persists_with_server_timestamp() {
        let (_, orders, _) = ledger();
        let id = orders
            .place_order("5", vec![LineItem::new("Coca-Cola", 2)])
            .await
            .unwrap();
        let order = orders.get_order(&id).await.unwrap();
        assert_eq!(order.table_number, "5");
        assert!(!order.delivered);
        assert!(order.created_at > 0);
    }

    #[tokio::test]
    async fn place_order_rejects_empty_and_zero_quantity() {
        let (_, orders, _) = ledger();
        let err = orders.place_order("5", vec![]).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput { .. }));

        let err = orders
            .place_order("5", vec![LineItem::new("Coca-Cola", 0)])
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput { .. }));
    }

    #[tokio::test]
    async fn delivery_deducts_plain_item_stock() {
        let (_, orders, stock) = ledger();
        stock.add_stock("Coca-Cola", 10.0, None, None).await.unwrap();
        let id = orders
            .place_order("5", vec![LineItem::new("Coca-Cola", 2)])
            .await
            .unwrap();

        orders.set_delivered(&id, true).await.unwrap();
        let item = stock.get_item("Coca-Cola").await.unwrap().unwrap();
        assert_eq!(item.quantity, 8.0);
    }

    #[tokio::test]
    async fn delivery_expands_combos_into_component_deductions() {
        let (_, orders, stock) = ledger();
        stock.add_stock("Água de coco", 5.0, None, None).await.unwrap();
        stock.add_stock("RedBull", 5.0, None, None).await.unwrap();
        stock.add_stock("Coca-Cola", 8.0, None, None).await.unwrap();

        let id = orders
            .place_order("7", vec![LineItem::new("Combo Energético", 1)])
            .await
            .unwrap();
        orders.set_delivered(&id, true).await.unwrap();

        assert_eq!(stock.get_item("Água de coco").await.unwrap().unwrap().quantity, 4.0);
        assert_eq!(stock.get_item("RedBull").await.unwrap().unwrap().quantity, 4.0);
        assert_eq!(stock.get_item("Coca-Cola").await.unwrap().unwrap().quantity, 7.0);
    }

    #[tokio::test]
    async fn combo_and_plain_item_deductions_are_merged() {
        let (_, orders, stock) = ledger();
        stock.add_stock("Água de coco", 5.0, None, None).await.unwrap();
        stock.add_stock("RedBull", 5.0, None, None).await.unwrap();
        stock.add_stock("Coca-Cola", 8.0, None, None).await.unwrap();

        // Coca-Cola appears both directly and inside the combo
        let id = orders
            .place_order(
                "7",
                vec![
                    LineItem::new("Combo Energético", 2),
                    LineItem::new("Coca-Cola", 3),
                ],
            )
            .await
            .unwrap();
        orders.set_delivered(&id, true).await.unwrap();

        assert_eq!(stock.get_item("Coca-Cola").await.unwrap().unwrap().quantity, 3.0);
        assert_eq!(stock.get_item("RedBull").await.unwrap().unwrap().quantity, 3.0);
    }

    #[tokio::test]
    async fn repeated_delivery_does_not_double_deduct() {
        let (_, orders, stock) = ledger();
        stock.add_stock("Coca-Cola", 10.0, None, None).await.unwrap();
        let id = orders
            .place_order("5", vec![LineItem::new("Coca-Cola", 2)])
            .await
            .unwrap();

        orders.set_delivered(&id, true).await.unwrap();
        orders.set_delivered(&id, true).await.unwrap();
        let item = stock.get_item("Coca-Cola").await.unwrap().unwrap();
        assert_eq!(item.quantity, 8.0);
    }

    #[tokio::test]
    async fn undelivering_does_not_restock() {
        let (_, orders, stock) = ledger();
        stock.add_stock("Coca-Cola", 10.0, None, None).await.unwrap();
        let id = orders
            .place_order("5", vec![LineItem::new("Coca-Cola", 2)])
            .await
            .unwrap();

        orders.set_delivered(&id, true).await.unwrap();
        orders.set_delivered(&id, false).await.unwrap();

        let order = orders.get_order(&id).await.unwrap();
        assert!(!order.delivered);
        // One-way deduction: the stock stays where delivery left it
        let item = stock.get_item("Coca-Cola").await.unwrap().unwrap();
        assert_eq!(item.quantity, 8.0);
    }

    #[tokio::test]
    async fn delivery_tolerates_missing_stock_entries() {
        let (_, orders, _) = ledger();
        let id = orders
            .place_order("5", vec![LineItem::new("Item fantasma", 1)])
            .await
            .unwrap();
        orders.set_delivered(&id, true).await.unwrap();
        assert!(orders.get_order(&id).await.unwrap().delivered);
    }

    #[tokio::test]
    async fn remove_order_restocks_and_deletes() {
        let (store, orders, stock) = ledger();
        stock.add_stock("Coca-Cola", 8.0, None, None).await.unwrap();
        let id = orders
            .place_order("5", vec![LineItem::new("Coca-Cola", 2)])
            .await
            .unwrap();

        orders.remove_order(&id).await.unwrap();
        let item = stock.get_item("Coca-Cola").await.unwrap().unwrap();
        assert_eq!(item.quantity, 10.0);
        assert_eq!(store.read_once(&path::order(&id)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn remove_missing_order_is_not_found() {
        let (_, orders, _) = ledger();
        let err = orders.remove_order("no-such-order").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn orders_for_table_filters_by_number() {
        let (_, orders, _) = ledger();
        orders
            .place_order("5", vec![LineItem::new("Coca-Cola", 1)])
            .await
            .unwrap();
        orders
            .place_order("7", vec![LineItem::new("RedBull", 1)])
            .await
            .unwrap();

        let on_five = orders.orders_for_table("5").await.unwrap();
        assert_eq!(on_five.len(), 1);
        assert_eq!(on_five[0].items[0].name, "Coca-Cola");
    }
}
