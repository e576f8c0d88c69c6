//! Application state
//!
//! One explicitly constructed handle owns the store client and the service
//! facades; its lifecycle belongs to the top-level process. There is no
//! lazily-initialized global connection.

use std::sync::Arc;

use shared::ServiceResult;

use crate::closing::ClosingService;
use crate::combo::ComboTable;
use crate::config::Config;
use crate::orders::OrderLedger;
use crate::stock::StockLedger;
use crate::store::{StoreGateway, wait_for_connection};
use crate::tables::TableService;

/// Service facades over one injected store handle
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn StoreGateway>,
    pub stock: StockLedger,
    pub orders: OrderLedger,
    pub tables: TableService,
    pub closing: ClosingService,
}

impl AppState {
    /// Wait for the store to report reachable, then wire up the services
    pub async fn initialize(
        config: Config,
        store: Arc<dyn StoreGateway>,
    ) -> ServiceResult<Self> {
        wait_for_connection(store.as_ref(), config.connect_timeout()).await?;
        Ok(Self::with_store(config, store))
    }

    /// Wire services without the connectivity wait (tests, in-process store)
    pub fn with_store(config: Config, store: Arc<dyn StoreGateway>) -> Self {
        Self {
            stock: StockLedger::new(store.clone()),
            orders: OrderLedger::new(store.clone(), ComboTable::default()),
            tables: TableService::new(store.clone()),
            closing: ClosingService::new(store.clone()),
            config,
            store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn initialize_waits_for_connection_then_wires_services() {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::initialize(Config::default(), store).await.unwrap();
        let id = state.tables.add_table("5", "Ana", 0.0, 0.0).await.unwrap();
        assert_eq!(state.tables.get_table(&id).await.unwrap().number(), "5");
    }
}
