//! Store gateway
//!
//! Thin contract over the external realtime document store. The store is a
//! shared mutable JSON tree addressed by slash-separated paths; the only
//! atomicity primitive it offers is a multi-path update committed
//! indivisibly, optionally guarded by a compare-and-set on a single path.
//! The core never splits a must-be-atomic operation into sequential writes.
//!
//! Subscriptions are long-lived and push the *full current snapshot* of the
//! watched path on every change, never a diff; consumers re-derive their
//! state from scratch on each delivery and tear the subscription down by
//! dropping it.

pub mod memory;
pub mod path;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use shared::{ServiceError, ServiceResult};

pub use memory::MemoryStore;

/// One multi-path update: `None` at a path deletes it
pub type UpdateOps = Vec<(String, Option<Value>)>;

/// Contract over the external document store
#[async_trait]
pub trait StoreGateway: Send + Sync {
    /// Read the value at `path`, `None` when absent
    async fn read_once(&self, path: &str) -> ServiceResult<Option<Value>>;

    /// Watch `path`; the current snapshot is delivered immediately and a
    /// fresh full snapshot follows every change until the subscription is
    /// dropped
    fn subscribe(&self, path: &str) -> Subscription;

    /// Full overwrite of the value at `path`
    async fn write(&self, path: &str, value: Value) -> ServiceResult<()>;

    /// Apply every op indivisibly; other readers observe all or none
    async fn update(&self, ops: UpdateOps) -> ServiceResult<()>;

    /// Conditional form of [`update`](Self::update): commits only when the
    /// value at `guard_path` equals `expected`. Returns whether it committed.
    async fn compare_and_update(
        &self,
        guard_path: &str,
        expected: &Value,
        ops: UpdateOps,
    ) -> ServiceResult<bool>;

    /// Delete the value at `path`
    async fn remove(&self, path: &str) -> ServiceResult<()>;

    /// Server-assigned unique, chronologically sortable key under a
    /// collection path
    async fn generate_key(&self, parent: &str) -> ServiceResult<String>;
}

/// Sentinel resolved by the store to the commit-time Unix-millis timestamp
pub fn server_timestamp() -> Value {
    json!({ ".sv": "timestamp" })
}

/// Live subscription to one path. Dropping it tears the listener down.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Option<Value>>,
    _guard: SubscriptionGuard,
}

impl Subscription {
    pub(crate) fn new(
        rx: mpsc::UnboundedReceiver<Option<Value>>,
        guard: SubscriptionGuard,
    ) -> Self {
        Self { rx, _guard: guard }
    }

    /// Next full snapshot; `None` when the store side has gone away
    pub async fn recv(&mut self) -> Option<Option<Value>> {
        self.rx.recv().await
    }

    /// Non-blocking variant of [`recv`](Self::recv)
    pub fn try_recv(&mut self) -> Option<Option<Value>> {
        self.rx.try_recv().ok()
    }
}

/// Removes the listener registration on drop
pub(crate) struct SubscriptionGuard {
    pub(crate) id: u64,
    pub(crate) watchers: std::sync::Arc<dashmap::DashMap<u64, memory::Watcher>>,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.watchers.remove(&self.id);
    }
}

/// Wait until the store reports itself reachable at `.info/connected`.
///
/// Does not retry anything on behalf of the caller; a write issued after
/// this resolves can still fail and that failure propagates as-is.
pub async fn wait_for_connection(
    store: &dyn StoreGateway,
    timeout: Duration,
) -> ServiceResult<()> {
    let mut sub = store.subscribe(path::INFO_CONNECTED);
    let wait = async {
        while let Some(snapshot) = sub.recv().await {
            if snapshot == Some(Value::Bool(true)) {
                return Ok(());
            }
        }
        Err(ServiceError::unavailable("store connection watch closed"))
    };
    match tokio::time::timeout(timeout, wait).await {
        Ok(result) => result,
        Err(_) => Err(ServiceError::unavailable(
            "timed out waiting for store connection",
        )),
    }
}
