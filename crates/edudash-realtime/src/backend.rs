//! The tabular backend hook.
//!
//! Feeds need three things from the data service: a filtered read, a
//! change subscription over the same scope, and an insert. Everything
//! else (auth, storage, schema) stays on the service side.

use std::future::Future;
use std::sync::Arc;

use edudash_protocol::ChangeEvent;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::{Query, RealtimeError, SubscriptionSpec};

/// A table service with push change notifications.
///
/// `Send + Sync + 'static` because one backend is shared by every feed
/// task, and feeds spawn fetches onto their own tasks.
pub trait TableBackend: Send + Sync + 'static {
    /// Runs a one-shot read and returns the matching rows in order.
    fn fetch(&self, query: &Query) -> impl Future<Output = Result<Vec<Value>, RealtimeError>> + Send;

    /// Opens a change subscription over `spec`.
    ///
    /// The subscription stays open until the returned [`Subscription`] is
    /// dropped.
    fn subscribe(
        &self,
        spec: SubscriptionSpec,
    ) -> impl Future<Output = Result<Subscription, RealtimeError>> + Send;

    /// Inserts `row` into `table` and returns the stored row (with any
    /// server-assigned columns filled in).
    fn insert(
        &self,
        table: &str,
        row: Value,
    ) -> impl Future<Output = Result<Value, RealtimeError>> + Send;
}

impl<B: TableBackend> TableBackend for Arc<B> {
    fn fetch(&self, query: &Query) -> impl Future<Output = Result<Vec<Value>, RealtimeError>> + Send {
        (**self).fetch(query)
    }

    fn subscribe(
        &self,
        spec: SubscriptionSpec,
    ) -> impl Future<Output = Result<Subscription, RealtimeError>> + Send {
        (**self).subscribe(spec)
    }

    fn insert(
        &self,
        table: &str,
        row: Value,
    ) -> impl Future<Output = Result<Value, RealtimeError>> + Send {
        (**self).insert(table, row)
    }
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// A live stream of change events for one [`SubscriptionSpec`].
///
/// Dropping it releases the subscription: the backend notices the closed
/// channel and tears down its side (for the hosted backend, that means
/// leaving the channel on the socket).
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    spec: SubscriptionSpec,
    events: mpsc::Receiver<ChangeEvent>,
}

impl Subscription {
    /// Wraps the receiving half of a backend's event channel.
    pub fn new(id: u64, spec: SubscriptionSpec, events: mpsc::Receiver<ChangeEvent>) -> Self {
        Self { id, spec, events }
    }

    /// Waits for the next change. `None` once the backend side has ended.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        self.events.recv().await
    }

    /// Returns an already-delivered change without waiting.
    pub fn try_next(&mut self) -> Option<ChangeEvent> {
        self.events.try_recv().ok()
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn spec(&self) -> &SubscriptionSpec {
        &self.spec
    }
}

/// Next event from an optional subscription; pends forever when there is
/// none, so it can sit in a `select!` unconditionally.
pub(crate) async fn next_event(subscription: &mut Option<Subscription>) -> Option<ChangeEvent> {
    match subscription {
        Some(sub) => sub.next().await,
        None => std::future::pending().await,
    }
}
