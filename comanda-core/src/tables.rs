//! Table merge/split engine
//!
//! Two open tables merge into one synthetic table whose identity carries
//! both constituents; every order on either table is re-tagged with the
//! merged number and stamped with its origin. A split partitions the orders
//! back by that provenance and recreates the two simple tables. Both
//! directions commit as ONE atomic multi-path update so no client ever
//! observes a half-merged floor.

use std::sync::Arc;

use serde_json::Value;
use tracing::info;

use shared::models::{Order, Table, TableIdentity, TableStatus};
use shared::{ServiceError, ServiceResult};

use crate::orders::orders_from_snapshot;
use crate::store::{StoreGateway, UpdateOps, path, server_timestamp};

/// Vertical offset applied to the two tables recreated by a split
const SPLIT_OFFSET_Y: f64 = 50.0;

/// Table service over the injected store handle
#[derive(Clone)]
pub struct TableService {
    store: Arc<dyn StoreGateway>,
}

impl TableService {
    pub fn new(store: Arc<dyn StoreGateway>) -> Self {
        Self { store }
    }

    /// Read one table
    pub async fn get_table(&self, table_id: &str) -> ServiceResult<Table> {
        let value = self
            .store
            .read_once(&path::table(table_id))
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("table {table_id}")))?;
        let mut table: Table = serde_json::from_value(value)
            .map_err(|e| ServiceError::invalid(format!("malformed table {table_id}: {e}")))?;
        table.id = Some(table_id.to_string());
        Ok(table)
    }

    /// All tables, id order
    pub async fn list_tables(&self) -> ServiceResult<Vec<Table>> {
        let snapshot = self.store.read_once(path::TABLES).await?;
        Ok(tables_from_snapshot(snapshot.as_ref()))
    }

    /// Open a new simple table. The number must be free among open tables.
    pub async fn add_table(
        &self,
        number: &str,
        customer_name: &str,
        pos_x: f64,
        pos_y: f64,
    ) -> ServiceResult<String> {
        if number.trim().is_empty() {
            return Err(ServiceError::invalid("table number must not be empty"));
        }
        let taken = self
            .list_tables()
            .await?
            .iter()
            .any(|t| t.is_open() && t.number() == number);
        if taken {
            return Err(ServiceError::conflict(format!(
                "table number {number} is already open"
            )));
        }

        let table = Table::open(
            TableIdentity::Simple {
                number: number.to_string(),
                name: customer_name.to_string(),
            },
            pos_x,
            pos_y,
        );
        let id = self.store.generate_key(path::TABLES).await?;
        self.store
            .write(&path::table(&id), table_value(&table)?)
            .await?;
        info!(table = number, "table opened");
        Ok(id)
    }

    /// Move a table on the floor plan
    pub async fn move_table(&self, table_id: &str, pos_x: f64, pos_y: f64) -> ServiceResult<()> {
        self.get_table(table_id).await?;
        self.store
            .update(vec![
                (path::table_field(table_id, "pos_x"), Some(Value::from(pos_x))),
                (path::table_field(table_id, "pos_y"), Some(Value::from(pos_y))),
            ])
            .await
    }

    /// Merge table B into table A, producing one merged table.
    ///
    /// The merged table inherits A's position and a fresh open state; every
    /// order on either number is re-tagged to the merged number, keeping its
    /// first origin. A's record is overwritten, B's is deleted, all in one
    /// atomic update.
    pub async fn merge(&self, table_id_a: &str, table_id_b: &str) -> ServiceResult<String> {
        if table_id_a == table_id_b {
            return Err(ServiceError::conflict("cannot merge a table with itself"));
        }
        let table_a = self.get_table(table_id_a).await?;
        let table_b = self.get_table(table_id_b).await?;

        for table in [&table_a, &table_b] {
            if !table.is_open() {
                return Err(ServiceError::conflict(format!(
                    "table {} is closed",
                    table.number()
                )));
            }
            if table.identity.is_merged() {
                return Err(ServiceError::conflict(format!(
                    "table {} is already merged",
                    table.number()
                )));
            }
        }

        let (number_a, name_a) = (table_a.number(), table_a.customer_name());
        let (number_b, name_b) = (table_b.number(), table_b.customer_name());

        let mut merged = Table::open(
            TableIdentity::Merged {
                left_number: number_a.clone(),
                right_number: number_b.clone(),
                left_name: name_a,
                right_name: name_b,
            },
            table_a.pos_x,
            table_a.pos_y,
        );
        merged.created_at = table_a.created_at;
        let merged_number = merged.number();

        let snapshot = self.store.read_once(path::ORDERS).await?;
        let mut ops: UpdateOps = Vec::new();
        for order in orders_from_snapshot(snapshot.as_ref()) {
            if order.table_number != number_a && order.table_number != number_b {
                continue;
            }
            let Some(order_id) = order.id.as_deref() else {
                continue;
            };
            ops.push((
                path::order_field(order_id, "table_number"),
                Some(Value::from(merged_number.clone())),
            ));
            // First merge wins: provenance survives repeated merges
            if order.origin_table_number.is_none() {
                ops.push((
                    path::order_field(order_id, "origin_table_number"),
                    Some(Value::from(order.table_number.clone())),
                ));
            }
        }
        ops.push((path::table(table_id_a), Some(table_value(&merged)?)));
        ops.push((path::table(table_id_b), None));

        self.store.update(ops).await?;
        info!(merged = %merged_number, "tables merged");
        Ok(merged_number)
    }

    /// Split a merged table back into its two constituents.
    ///
    /// Orders go to the side their provenance names (missing provenance
    /// defaults to the left). When that leaves the right side empty while
    /// the left has orders, the ceiling-half of the left's orders (insertion
    /// order) moves right, so a merge-then-split is never silently lossy.
    pub async fn split(&self, table_id: &str) -> ServiceResult<(String, String)> {
        let table = self.get_table(table_id).await?;
        let TableIdentity::Merged {
            left_number,
            right_number,
            left_name,
            right_name,
        } = table.identity.clone()
        else {
            return Err(ServiceError::conflict(format!(
                "table {} is not a merged table",
                table.number()
            )));
        };
        let merged_number = table.number();

        let snapshot = self.store.read_once(path::ORDERS).await?;
        let on_merged: Vec<Order> = orders_from_snapshot(snapshot.as_ref())
            .into_iter()
            .filter(|order| order.table_number == merged_number)
            .collect();

        let (mut left_orders, mut right_orders): (Vec<Order>, Vec<Order>) = on_merged
            .into_iter()
            .partition(|order| order.origin_table_number.as_deref() != Some(right_number.as_str()));
        if right_orders.is_empty() && !left_orders.is_empty() {
            // Provenance never made it in; halve by insertion order instead
            // of losing the right side
            let keep = left_orders.len() / 2;
            right_orders = left_orders.split_off(keep);
        }

        let left_table = Table::open(
            TableIdentity::Simple {
                number: left_number,
                name: left_name,
            },
            table.pos_x,
            table.pos_y - SPLIT_OFFSET_Y,
        );
        let right_table = Table::open(
            TableIdentity::Simple {
                number: right_number,
                name: right_name,
            },
            table.pos_x,
            table.pos_y + SPLIT_OFFSET_Y,
        );

        let left_id = self.store.generate_key(path::TABLES).await?;
        let right_id = self.store.generate_key(path::TABLES).await?;

        let mut ops: UpdateOps = vec![
            (path::table(&left_id), Some(table_value(&left_table)?)),
            (path::table(&right_id), Some(table_value(&right_table)?)),
        ];
        for (orders, target) in [
            (&left_orders, left_table.number()),
            (&right_orders, right_table.number()),
        ] {
            for order in orders {
                let Some(order_id) = order.id.as_deref() else {
                    continue;
                };
                ops.push((
                    path::order_field(order_id, "table_number"),
                    Some(Value::from(target.clone())),
                ));
                // Provenance is consumed by the split
                if order.origin_table_number.is_some() {
                    ops.push((path::order_field(order_id, "origin_table_number"), None));
                }
            }
        }
        ops.push((path::table(table_id), None));

        self.store.update(ops).await?;
        info!(merged = %merged_number, "table split");
        Ok((left_id, right_id))
    }

    /// Remove a table. Open tables must hold no orders at all; closed
    /// tables must hold no undelivered orders. Remaining orders are deleted
    /// with the table.
    pub async fn remove_table(&self, table_id: &str) -> ServiceResult<()> {
        let table = self.get_table(table_id).await?;
        let number = table.number();

        let snapshot = self.store.read_once(path::ORDERS).await?;
        let table_orders: Vec<Order> = orders_from_snapshot(snapshot.as_ref())
            .into_iter()
            .filter(|order| order.table_number == number)
            .collect();

        match table.status {
            TableStatus::Open if !table_orders.is_empty() => {
                return Err(ServiceError::conflict(format!(
                    "cannot remove open table {number}: it still has orders"
                )));
            }
            TableStatus::Closed if table_orders.iter().any(|o| !o.delivered) => {
                return Err(ServiceError::conflict(format!(
                    "cannot remove table {number}: it still has undelivered orders"
                )));
            }
            _ => {}
        }

        let mut ops: UpdateOps = table_orders
            .iter()
            .filter_map(|order| order.id.as_deref())
            .map(|id| (path::order(id), None))
            .collect();
        ops.push((path::table(table_id), None));
        self.store.update(ops).await?;
        info!(table = %number, "table removed");
        Ok(())
    }
}

/// Serialize a table for a store write, with the server-resolved timestamp
/// spliced in for fresh records
fn table_value(table: &Table) -> ServiceResult<Value> {
    let mut value = serde_json::to_value(table)
        .map_err(|e| ServiceError::invalid(format!("unserializable table: {e}")))?;
    if table.created_at == 0 {
        value["created_at"] = server_timestamp();
    }
    Ok(value)
}

/// Decode a `tables/` subscription snapshot, ids re-attached
pub fn tables_from_snapshot(snapshot: Option<&Value>) -> Vec<Table> {
    let Some(map) = snapshot.and_then(Value::as_object) else {
        return Vec::new();
    };
    map.iter()
        .filter_map(|(id, value)| {
            let mut table: Table = serde_json::from_value(value.clone()).ok()?;
            table.id = Some(id.clone());
            Some(table)
        })
        .collect()
}
