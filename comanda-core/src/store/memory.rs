//! In-memory store implementation
//!
//! Backs tests and single-node deployments. The whole tree lives behind one
//! RwLock, which is what makes the multi-path update indivisible: every op
//! of an update is applied under the same write guard, and watchers are
//! notified only after the guard is released.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rand::Rng;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

use shared::ServiceResult;

use super::{StoreGateway, Subscription, SubscriptionGuard, UpdateOps, path};

/// Push-id alphabet, ASCII ordered so generated keys sort chronologically
const PUSH_CHARS: &[u8] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

/// One registered listener
pub(crate) struct Watcher {
    pub(crate) path: String,
    pub(crate) tx: mpsc::UnboundedSender<Option<Value>>,
}

/// In-process document store
pub struct MemoryStore {
    root: RwLock<Value>,
    watchers: Arc<DashMap<u64, Watcher>>,
    next_watcher: AtomicU64,
    /// (last push millis, last random tail) for collision-safe push ids
    push_state: Mutex<(i64, [u8; 12])>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let store = Self {
            root: RwLock::new(Value::Object(Map::new())),
            watchers: Arc::new(DashMap::new()),
            next_watcher: AtomicU64::new(1),
            push_state: Mutex::new((0, [0u8; 12])),
        };
        // An in-process store is always reachable
        {
            let mut root = store.root.write();
            set_at(&mut root, path::INFO_CONNECTED, Value::Bool(true));
        }
        store
    }

    /// Apply ops under one write guard, then notify watchers
    fn commit(&self, ops: UpdateOps) {
        let now = Utc::now().timestamp_millis();
        let mut changed = Vec::with_capacity(ops.len());
        {
            let mut root = self.root.write();
            for (op_path, value) in ops {
                match value {
                    Some(v) if !v.is_null() => {
                        set_at(&mut root, &op_path, resolve_timestamps(v, now));
                    }
                    _ => remove_at(&mut root, &op_path),
                }
                changed.push(op_path);
            }
        }
        self.notify(&changed);
    }

    fn notify(&self, changed: &[String]) {
        let root = self.root.read();
        for entry in self.watchers.iter() {
            let watcher = entry.value();
            if changed.iter().any(|c| paths_related(&watcher.path, c)) {
                let snapshot = get_at(&root, &watcher.path).cloned();
                // A closed receiver is cleaned up on Subscription drop
                let _ = watcher.tx.send(snapshot);
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StoreGateway for MemoryStore {
    async fn read_once(&self, path: &str) -> ServiceResult<Option<Value>> {
        Ok(get_at(&self.root.read(), path).cloned())
    }

    fn subscribe(&self, path: &str) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        // Deliver the current snapshot before any change
        let _ = tx.send(get_at(&self.root.read(), path).cloned());
        let id = self.next_watcher.fetch_add(1, Ordering::Relaxed);
        self.watchers.insert(
            id,
            Watcher {
                path: path.to_string(),
                tx,
            },
        );
        Subscription::new(
            rx,
            SubscriptionGuard {
                id,
                watchers: Arc::clone(&self.watchers),
            },
        )
    }

    async fn write(&self, path: &str, value: Value) -> ServiceResult<()> {
        self.commit(vec![(path.to_string(), Some(value))]);
        Ok(())
    }

    async fn update(&self, ops: UpdateOps) -> ServiceResult<()> {
        self.commit(ops);
        Ok(())
    }

    async fn compare_and_update(
        &self,
        guard_path: &str,
        expected: &Value,
        ops: UpdateOps,
    ) -> ServiceResult<bool> {
        let now = Utc::now().timestamp_millis();
        let mut changed = Vec::with_capacity(ops.len());
        {
            let mut root = self.root.write();
            if get_at(&root, guard_path) != Some(expected) {
                return Ok(false);
            }
            for (op_path, value) in ops {
                match value {
                    Some(v) if !v.is_null() => {
                        set_at(&mut root, &op_path, resolve_timestamps(v, now));
                    }
                    _ => remove_at(&mut root, &op_path),
                }
                changed.push(op_path);
            }
        }
        self.notify(&changed);
        Ok(true)
    }

    async fn remove(&self, path: &str) -> ServiceResult<()> {
        self.commit(vec![(path.to_string(), None)]);
        Ok(())
    }

    async fn generate_key(&self, _parent: &str) -> ServiceResult<String> {
        let now = Utc::now().timestamp_millis();
        let mut state = self.push_state.lock();
        if now == state.0 {
            // Same millisecond: increment the previous tail so keys stay
            // unique and ordered
            for i in (0..12).rev() {
                if state.1[i] < 63 {
                    state.1[i] += 1;
                    break;
                }
                state.1[i] = 0;
            }
        } else {
            let mut rng = rand::thread_rng();
            for slot in state.1.iter_mut() {
                *slot = rng.gen_range(0..64);
            }
            state.0 = now;
        }

        let mut key = String::with_capacity(20);
        let mut ts = now;
        let mut prefix = [0u8; 8];
        for slot in prefix.iter_mut().rev() {
            *slot = (ts % 64) as u8;
            ts /= 64;
        }
        for idx in prefix {
            key.push(PUSH_CHARS[idx as usize] as char);
        }
        for idx in state.1 {
            key.push(PUSH_CHARS[idx as usize] as char);
        }
        Ok(key)
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn get_at<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in segments(path) {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn set_at(root: &mut Value, path: &str, value: Value) {
    let parts: Vec<&str> = segments(path).collect();
    let mut current = root;
    for (i, segment) in parts.iter().enumerate() {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let map = current.as_object_mut().expect("just normalized to object");
        if i == parts.len() - 1 {
            map.insert(segment.to_string(), value);
            return;
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
    }
}

/// Remove the value at `path`, pruning parents left empty
fn remove_at(root: &mut Value, path: &str) {
    let parts: Vec<&str> = segments(path).collect();
    remove_recursive(root, &parts);
}

fn remove_recursive(node: &mut Value, parts: &[&str]) -> bool {
    let Some(map) = node.as_object_mut() else {
        return false;
    };
    match parts {
        [] => false,
        [last] => {
            map.remove(*last);
            map.is_empty()
        }
        [head, rest @ ..] => {
            if let Some(child) = map.get_mut(*head)
                && remove_recursive(child, rest)
            {
                map.remove(*head);
            }
            map.is_empty()
        }
    }
}

/// Replace server-timestamp sentinels with the commit-time millis
fn resolve_timestamps(value: Value, now: i64) -> Value {
    match value {
        Value::Object(map) => {
            if map.len() == 1 && map.get(".sv").and_then(Value::as_str) == Some("timestamp") {
                return Value::from(now);
            }
            Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, resolve_timestamps(v, now)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .map(|v| resolve_timestamps(v, now))
                .collect(),
        ),
        other => other,
    }
}

/// True when one path is an ancestor of the other (or they are equal)
fn paths_related(a: &str, b: &str) -> bool {
    let mut left = segments(a);
    let mut right = segments(b);
    loop {
        match (left.next(), right.next()) {
            (Some(l), Some(r)) if l == r => continue,
            (Some(_), Some(_)) => return false,
            _ => return true,
        }
    }
}
