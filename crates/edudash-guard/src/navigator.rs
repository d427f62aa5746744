//! Navigation sinks.
//!
//! Guards decide *where* to go; a [`Navigator`] performs the move. In a
//! browser that would push onto the history stack. Here the reference
//! implementation, [`History`], records every navigation in order so both
//! the app shell and the tests can read it back.

use std::sync::{Arc, Mutex, MutexGuard};

use edudash_protocol::Route;

/// Receives navigation requests from guards.
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, route: &Route);
}

/// A shared, append-only navigation history.
///
/// Cloning yields another handle to the same history.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Arc<Mutex<Vec<Route>>>,
}

impl History {
    /// Starts a history at `initial`.
    pub fn starting_at(initial: Route) -> Self {
        Self {
            entries: Arc::new(Mutex::new(vec![initial])),
        }
    }

    pub fn push(&self, route: Route) {
        self.lock().push(route);
    }

    /// The route the user is on now.
    pub fn current(&self) -> Option<Route> {
        self.lock().last().cloned()
    }

    /// Every route visited, oldest first.
    pub fn entries(&self) -> Vec<Route> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// A panic while holding the lock can't leave a `Vec<Route>` in a
    /// broken state, so a poisoned lock is simply recovered.
    fn lock(&self) -> MutexGuard<'_, Vec<Route>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Navigator for History {
    fn navigate(&self, route: &Route) {
        tracing::info!(%route, "navigate");
        self.push(route.clone());
    }
}
