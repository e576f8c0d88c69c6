//! Store path layout
//!
//! The document tree is addressed by slash-separated paths:
//!
//! ```text
//! tables/{id}                 -> Table
//! orders/{id}                 -> Order
//! stock/{name}                -> StockItem
//! menu/{category}/{key}       -> MenuItem
//! settlements/{id}            -> Settlement
//! recipes/{menu item}         -> Recipe
//! .info/connected             -> bool, maintained by the store
//! ```

/// Tables collection
pub const TABLES: &str = "tables";
/// Orders collection
pub const ORDERS: &str = "orders";
/// Stock collection, keyed by item name
pub const STOCK: &str = "stock";
/// Menu tree, keyed by category then entry key
pub const MENU: &str = "menu";
/// Immutable settlement history
pub const SETTLEMENTS: &str = "settlements";
/// Recipe sheets, keyed by menu item name
pub const RECIPES: &str = "recipes";
/// Connectivity flag maintained by the store itself
pub const INFO_CONNECTED: &str = ".info/connected";

pub fn table(id: &str) -> String {
    format!("{TABLES}/{id}")
}

pub fn order(id: &str) -> String {
    format!("{ORDERS}/{id}")
}

pub fn order_field(id: &str, field: &str) -> String {
    format!("{ORDERS}/{id}/{field}")
}

pub fn stock_item(name: &str) -> String {
    format!("{STOCK}/{name}")
}

pub fn stock_field(name: &str, field: &str) -> String {
    format!("{STOCK}/{name}/{field}")
}

pub fn menu_entry(category: &str, key: &str) -> String {
    format!("{MENU}/{category}/{key}")
}

pub fn table_field(id: &str, field: &str) -> String {
    format!("{TABLES}/{id}/{field}")
}

pub fn settlement(id: &str) -> String {
    format!("{SETTLEMENTS}/{id}")
}

pub fn recipe(menu_item: &str) -> String {
    format!("{RECIPES}/{menu_item}")
}
