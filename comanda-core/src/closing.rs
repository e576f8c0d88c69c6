//! Tab closing engine
//!
//! Totals are computed from the live orders against the *current* menu
//! prices; an item missing from the menu prices at zero rather than
//! failing. A full close deletes the tab's orders (no restock:
//! delivered orders already consumed stock, undelivered ones are
//! discarded), writes an immutable settlement and closes the table, all in
//! one atomic update. A partial payment only moves the balances and leaves
//! the table open.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::info;

use shared::models::{LineItem, MenuItem, Order, PaymentRecord, Settlement, TableStatus};
use shared::{ServiceError, ServiceResult};

use crate::money::{round_f64, to_decimal};
use crate::store::{StoreGateway, UpdateOps, path};

// ==================== Pure computation ====================

/// Combined totals of a tab before and after discount
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TabTotals {
    pub subtotal: f64,
    pub total: f64,
}

/// Price per item name from a `menu/` snapshot (category -> key -> item)
pub fn price_index(menu: Option<&Value>) -> HashMap<String, f64> {
    let mut prices = HashMap::new();
    let Some(categories) = menu.and_then(Value::as_object) else {
        return prices;
    };
    for entries in categories.values() {
        let Some(entries) = entries.as_object() else {
            continue;
        };
        for value in entries.values() {
            if let Ok(item) = serde_json::from_value::<MenuItem>(value.clone()) {
                prices.insert(item.name, item.unit_price);
            }
        }
    }
    prices
}

/// Σ quantity × current unit price; a missing menu entry contributes 0
pub fn order_total(items: &[LineItem], prices: &HashMap<String, f64>) -> f64 {
    let sum = items.iter().fold(Decimal::ZERO, |acc, item| {
        let unit_price = to_decimal(prices.get(&item.name).copied().unwrap_or(0.0));
        acc + unit_price * Decimal::from(item.quantity)
    });
    round_f64(sum)
}

/// Subtotal over every order, total floored at zero after discount
pub fn tab_totals(orders: &[Order], prices: &HashMap<String, f64>, discount: f64) -> TabTotals {
    let subtotal = orders.iter().fold(Decimal::ZERO, |acc, order| {
        acc + to_decimal(order_total(&order.items, prices))
    });
    let total = (subtotal - to_decimal(discount)).max(Decimal::ZERO);
    TabTotals {
        subtotal: round_f64(subtotal),
        total: round_f64(total),
    }
}

/// Outstanding amount after applying a payment, floored at zero
pub fn remaining(total: f64, previously_paid: f64, new_payment: f64) -> f64 {
    let left = to_decimal(total) - (to_decimal(previously_paid) + to_decimal(new_payment));
    round_f64(left.max(Decimal::ZERO))
}

/// Change due for cash handed over; never negative
pub fn change_due(received: f64, remaining: f64) -> f64 {
    round_f64((to_decimal(received) - to_decimal(remaining)).max(Decimal::ZERO))
}

/// Whether the cash handed over covers what is left to pay
pub fn is_payment_sufficient(received: f64, remaining: f64) -> bool {
    to_decimal(received) >= to_decimal(remaining)
}

/// Per-person share when splitting the bill
pub fn share(total: f64, split_count: u32) -> f64 {
    round_f64(to_decimal(total) / Decimal::from(split_count.max(1)))
}

// ==================== Service ====================

/// Closing service over the injected store handle
#[derive(Clone)]
pub struct ClosingService {
    store: Arc<dyn StoreGateway>,
}

impl ClosingService {
    pub fn new(store: Arc<dyn StoreGateway>) -> Self {
        Self { store }
    }

    async fn load_tab(
        &self,
        table_id: &str,
    ) -> ServiceResult<(shared::models::Table, Vec<Order>, HashMap<String, f64>)> {
        let table = crate::tables::TableService::new(self.store.clone())
            .get_table(table_id)
            .await?;
        let number = table.number();
        let orders_snapshot = self.store.read_once(path::ORDERS).await?;
        let orders: Vec<Order> = crate::orders::orders_from_snapshot(orders_snapshot.as_ref())
            .into_iter()
            .filter(|order| order.table_number == number)
            .collect();
        let menu = self.store.read_once(path::MENU).await?;
        Ok((table, orders, price_index(menu.as_ref())))
    }

    /// Fully close a tab.
    ///
    /// Rejects a negative payment or a discount above the subtotal
    /// (`InvalidInput`) and an insufficient received amount (`Conflict`). On success the orders are
    /// deleted, a settlement is written and the table closes with zeroed
    /// outstanding balance, all in one atomic update.
    pub async fn close_tab(
        &self,
        table_id: &str,
        discount: f64,
        new_payment: f64,
        received: f64,
    ) -> ServiceResult<Settlement> {
        if new_payment < 0.0 {
            return Err(ServiceError::invalid(
                "payment must not be negative",
            ));
        }
        let (table, orders, prices) = self.load_tab(table_id).await?;
        if !table.is_open() {
            return Err(ServiceError::conflict(format!(
                "table {} is already closed",
                table.number()
            )));
        }

        let totals = tab_totals(&orders, &prices, discount);
        if discount > totals.subtotal {
            return Err(ServiceError::invalid(format!(
                "discount {discount:.2} exceeds subtotal {:.2}",
                totals.subtotal
            )));
        }
        // What is still due before this payment; earlier installments count
        let due = remaining(totals.total, table.paid_amount, 0.0);
        if !is_payment_sufficient(received, due) {
            return Err(ServiceError::conflict(format!(
                "received {received:.2} does not cover remaining {due:.2}"
            )));
        }

        let change = change_due(received, due);
        let paid_total = round_f64(to_decimal(table.paid_amount) + to_decimal(new_payment));
        let settlement = Settlement {
            table_number: table.number(),
            customer_name: table.customer_name(),
            items: orders.iter().flat_map(|o| o.items.clone()).collect(),
            subtotal: totals.subtotal,
            discount,
            total: totals.total,
            paid_total,
            received,
            change_due: change,
            closed_at: Utc::now(),
        };
        let settlement_value = serde_json::to_value(&settlement)
            .map_err(|e| ServiceError::invalid(format!("unserializable settlement: {e}")))?;
        let settlement_id = self.store.generate_key(path::SETTLEMENTS).await?;

        // Orders are discarded without restock: delivered ones already
        // consumed stock, undelivered ones are written off
        let mut ops: UpdateOps = orders
            .iter()
            .filter_map(|order| order.id.as_deref())
            .map(|id| (path::order(id), None))
            .collect();
        ops.push((path::settlement(&settlement_id), Some(settlement_value)));
        ops.extend([
            (
                path::table_field(table_id, "status"),
                Some(serde_json::to_value(TableStatus::Closed).unwrap_or(Value::Null)),
            ),
            (
                path::table_field(table_id, "paid_amount"),
                Some(Value::from(paid_total)),
            ),
            (
                path::table_field(table_id, "outstanding_amount"),
                Some(Value::from(0.0)),
            ),
            (
                path::table_field(table_id, "received_amount"),
                Some(Value::from(received)),
            ),
            (
                path::table_field(table_id, "change_due"),
                Some(Value::from(change)),
            ),
            (
                path::table_field(table_id, "discount"),
                Some(Value::from(discount)),
            ),
        ]);

        self.store.update(ops).await?;
        info!(table = %settlement.table_number, total = settlement.total, "tab closed");
        Ok(settlement)
    }

    /// Record a payment that does not cover the tab.
    ///
    /// The table stays open, balances move, a payment record is appended;
    /// no settlement is written and no order is touched. Returns the
    /// outstanding amount.
    pub async fn register_partial_payment(
        &self,
        table_id: &str,
        discount: f64,
        new_payment: f64,
        received: f64,
    ) -> ServiceResult<f64> {
        if new_payment <= 0.0 {
            return Err(ServiceError::invalid(
                "partial payment must be greater than zero",
            ));
        }
        let (table, orders, prices) = self.load_tab(table_id).await?;
        if !table.is_open() {
            return Err(ServiceError::conflict(format!(
                "table {} is already closed",
                table.number()
            )));
        }

        let totals = tab_totals(&orders, &prices, discount);
        if discount > totals.subtotal {
            return Err(ServiceError::invalid(format!(
                "discount {discount:.2} exceeds subtotal {:.2}",
                totals.subtotal
            )));
        }
        let left_to_pay = remaining(totals.total, table.paid_amount, new_payment);
        if left_to_pay <= 0.0 {
            return Err(ServiceError::conflict(
                "payment covers the tab, close it instead",
            ));
        }

        let paid_total = round_f64(to_decimal(table.paid_amount) + to_decimal(new_payment));
        // Change against the installment only, not the whole tab
        let change = change_due(received, new_payment);

        let mut history = table.payment_history.clone();
        history.push(PaymentRecord {
            amount: new_payment,
            received,
            at: Utc::now().timestamp_millis(),
        });
        let history_value = serde_json::to_value(&history)
            .map_err(|e| ServiceError::invalid(format!("unserializable history: {e}")))?;

        self.store
            .update(vec![
                (
                    path::table_field(table_id, "paid_amount"),
                    Some(Value::from(paid_total)),
                ),
                (
                    path::table_field(table_id, "outstanding_amount"),
                    Some(Value::from(left_to_pay)),
                ),
                (
                    path::table_field(table_id, "received_amount"),
                    Some(Value::from(received)),
                ),
                (
                    path::table_field(table_id, "change_due"),
                    Some(Value::from(change)),
                ),
                (
                    path::table_field(table_id, "discount"),
                    Some(Value::from(discount)),
                ),
                (
                    path::table_field(table_id, "payment_history"),
                    Some(history_value),
                ),
            ])
            .await?;
        info!(
            table = %table.number(),
            paid = new_payment,
            outstanding = left_to_pay,
            "partial payment registered"
        );
        Ok(left_to_pay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices(entries: &[(&str, f64)]) -> HashMap<String, f64> {
        entries
            .iter()
            .map(|(name, price)| (name.to_string(), *price))
            .collect()
    }

    #[test]
    fn order_total_prices_missing_items_at_zero() {
        let items = vec![LineItem::new("Coca-Cola", 2), LineItem::new("Fantasma", 5)];
        let lookup = prices(&[("Coca-Cola", 7.5)]);
        assert_eq!(order_total(&items, &lookup), 15.0);
    }

    #[test]
    fn tab_total_floors_at_zero_under_heavy_discount() {
        let orders = vec![Order::new("5", vec![LineItem::new("Coca-Cola", 2)])];
        let lookup = prices(&[("Coca-Cola", 5.0)]);
        let totals = tab_totals(&orders, &lookup, 50.0);
        assert_eq!(totals.subtotal, 10.0);
        assert_eq!(totals.total, 0.0);
    }

    #[test]
    fn remaining_and_change_never_go_negative() {
        assert_eq!(remaining(25.0, 10.0, 20.0), 0.0);
        assert_eq!(change_due(10.0, 25.0), 0.0);
        assert_eq!(change_due(30.0, 25.0), 5.0);
    }

    #[test]
    fn sufficiency_is_received_vs_remaining() {
        assert!(is_payment_sufficient(25.0, 25.0));
        assert!(is_payment_sufficient(26.0, 25.0));
        assert!(!is_payment_sufficient(24.99, 25.0));
    }

    #[test]
    fn share_divides_and_guards_zero() {
        assert_eq!(share(30.0, 3), 10.0);
        assert_eq!(share(25.0, 2), 12.5);
        assert_eq!(share(25.0, 0), 25.0);
    }
}
