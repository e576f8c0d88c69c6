//! Comanda core - restaurant tab management services
//!
//! # Architecture
//!
//! The core sits between any number of UI clients and a realtime key-value
//! document store. Every mutation that must be observed whole (merge, split,
//! delivery stock deduction, tab closing) is issued as one atomic multi-path
//! update; listeners receive full snapshots and re-derive state from scratch.
//!
//! # Module structure
//!
//! ```text
//! comanda-core/src/
//! ├── config.rs      # Environment configuration
//! ├── logger.rs      # Tracing setup
//! ├── state.rs       # AppState: injected store handle + service facades
//! ├── store/         # Store gateway contract + in-memory implementation
//! ├── stock.rs       # Stock ledger (add, decrement, zero cascade)
//! ├── combo.rs       # Composite item expansion
//! ├── orders.rs      # Order ledger (place, deliver, remove)
//! ├── tables.rs      # Table merge/split engine
//! ├── closing.rs     # Tab closing and partial payments
//! └── money.rs       # Decimal money arithmetic
//! ```

pub mod closing;
pub mod combo;
pub mod config;
pub mod logger;
pub mod money;
pub mod orders;
pub mod state;
pub mod stock;
pub mod store;
pub mod tables;

// Re-export public types
pub use closing::ClosingService;
pub use combo::ComboTable;
pub use config::Config;
pub use orders::OrderLedger;
pub use state::AppState;
pub use stock::StockLedger;
pub use store::{MemoryStore, StoreGateway, Subscription};
pub use tables::TableService;

/// Load `.env` and initialize logging. Call once at process start.
pub fn setup_environment() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let config = Config::from_env();
    logger::init_logger(&config);
    Ok(())
}
