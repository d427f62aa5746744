//! In-process table backend.
//!
//! `MemoryTables` keeps rows in a map of JSON arrays and fans change
//! events out to matching subscriptions. It backs the demo and every
//! feed test; it also lets tests inject failures and count fetches.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use edudash_protocol::ChangeEvent;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::{Query, RealtimeError, Subscription, SubscriptionSpec, TableBackend};

/// Events buffered per subscription before new ones are dropped.
const SUBSCRIPTION_BUFFER: usize = 64;

struct Subscriber {
    id: u64,
    spec: SubscriptionSpec,
    tx: mpsc::Sender<ChangeEvent>,
}

#[derive(Default)]
struct Inner {
    tables: HashMap<String, Vec<Value>>,
    subscribers: Vec<Subscriber>,
    next_id: u64,
    next_row: u64,
    fetches: usize,
    failing: bool,
}

impl Inner {
    /// Drops subscribers whose [`Subscription`] has been released.
    fn prune(&mut self) {
        self.subscribers.retain(|s| !s.tx.is_closed());
    }

    fn publish(&mut self, event: ChangeEvent) {
        self.prune();
        for sub in self.subscribers.iter().filter(|s| s.spec.matches(&event)) {
            match sub.tx.try_send(event.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        subscription = sub.id,
                        table = %event.table,
                        "subscriber lagging, event dropped"
                    );
                }
                Err(TrySendError::Closed(_)) => {}
            }
        }
    }
}

/// A shared in-memory table store.
///
/// Cloning is cheap and every clone sees the same tables.
#[derive(Clone, Default)]
pub struct MemoryTables {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the contents of `table` without emitting events.
    pub fn seed(&self, table: &str, rows: Vec<Value>) {
        self.lock().tables.insert(table.to_string(), rows);
    }

    /// Appends a row and emits an insert event.
    ///
    /// Missing `id` and `created_at` columns are filled in. Ids are
    /// `row-<n>`; timestamps are zero-padded sequence numbers so they sort
    /// in insertion order.
    pub fn insert_row(&self, table: &str, mut row: Value) -> Value {
        let mut inner = self.lock();
        inner.next_row += 1;
        let seq = inner.next_row;
        if let Some(obj) = row.as_object_mut() {
            obj.entry("id").or_insert_with(|| Value::String(format!("row-{seq}")));
            obj.entry("created_at")
                .or_insert_with(|| Value::String(format!("{seq:020}")));
        }
        inner
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row.clone());
        inner.publish(ChangeEvent::insert(table, row.clone()));
        row
    }

    /// Merges `patch` into the row with `id` and emits an update event.
    /// Returns the new row, or `None` if no row has that id.
    pub fn update_row(&self, table: &str, id: &str, patch: Value) -> Option<Value> {
        let mut inner = self.lock();
        let rows = inner.tables.get_mut(table)?;
        let row = rows.iter_mut().find(|r| row_has_id(r, id))?;
        let old = row.clone();
        if let (Some(dst), Value::Object(src)) = (row.as_object_mut(), patch) {
            dst.extend(src);
        }
        let new = row.clone();
        inner.publish(ChangeEvent::update(table, old, new.clone()));
        Some(new)
    }

    /// Removes the row with `id` and emits a delete event.
    pub fn delete_row(&self, table: &str, id: &str) -> Option<Value> {
        let mut inner = self.lock();
        let rows = inner.tables.get_mut(table)?;
        let index = rows.iter().position(|r| row_has_id(r, id))?;
        let old = rows.remove(index);
        inner.publish(ChangeEvent::delete(table, old.clone()));
        Some(old)
    }

    /// Delivers an arbitrary event without touching the stored rows.
    pub fn publish(&self, event: ChangeEvent) {
        self.lock().publish(event);
    }

    /// Rows currently stored in `table`, in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Value> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    /// Number of subscriptions that have not been released.
    pub fn active_subscriptions(&self) -> usize {
        let mut inner = self.lock();
        inner.prune();
        inner.subscribers.len()
    }

    /// Number of `fetch` calls served (including failed ones).
    pub fn fetch_count(&self) -> usize {
        self.lock().fetches
    }

    /// Makes every subsequent `fetch` fail until switched off.
    pub fn set_failing(&self, failing: bool) {
        self.lock().failing = failing;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn row_has_id(row: &Value, id: &str) -> bool {
    row.get("id").and_then(Value::as_str) == Some(id)
}

impl TableBackend for MemoryTables {
    async fn fetch(&self, query: &Query) -> Result<Vec<Value>, RealtimeError> {
        let mut inner = self.lock();
        inner.fetches += 1;
        if inner.failing {
            return Err(RealtimeError::Fetch(format!("{} unavailable", query.table)));
        }
        let rows = inner.tables.get(&query.table).map(Vec::as_slice).unwrap_or_default();
        Ok(query.apply(rows))
    }

    async fn subscribe(&self, spec: SubscriptionSpec) -> Result<Subscription, RealtimeError> {
        let (tx, rx) = mpsc::channel(SUBSCRIPTION_BUFFER);
        let mut inner = self.lock();
        inner.next_id += 1;
        let id = inner.next_id;
        inner.subscribers.push(Subscriber {
            id,
            spec: spec.clone(),
            tx,
        });
        tracing::debug!(subscription = id, topic = %spec.topic(), "subscribed");
        Ok(Subscription::new(id, spec, rx))
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, RealtimeError> {
        Ok(self.insert_row(table, row))
    }
}
