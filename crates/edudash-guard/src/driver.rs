//! Runs a guard against live providers.
//!
//! The guard itself is synchronous and pure-ish; the driver is the
//! effect loop around it. It re-evaluates on every snapshot change (not
//! on every render), hands navigations to a [`Navigator`], and publishes
//! the current [`GuardState`] for whoever renders the page.

use edudash_session::{AdminSnapshot, SessionSnapshot};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::{Guard, GuardError, GuardState, GuardView, Navigator};

/// Handle to a running guard.
///
/// Dropping the handle stops the guard: the page was unmounted, so its
/// redirects must stop too.
pub struct GuardHandle {
    state: watch::Receiver<GuardState>,
    task: JoinHandle<()>,
}

impl GuardHandle {
    /// The guard's current state.
    pub fn state(&self) -> GuardState {
        *self.state.borrow()
    }

    /// Renders the page for the current state.
    pub fn view<T>(&self, children: impl FnOnce() -> T) -> GuardView<T> {
        self.state().render(children)
    }

    /// Observes state changes.
    pub fn subscribe(&self) -> watch::Receiver<GuardState> {
        self.state.clone()
    }

    /// Waits until the guard has left `Pending`.
    ///
    /// # Errors
    /// [`GuardError::ProviderClosed`] if the providers stopped first.
    pub async fn settled(&self) -> Result<GuardState, GuardError> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(|s| s.is_settled())
            .await
            .map_err(|_| GuardError::ProviderClosed)?;
        Ok(*state)
    }

    /// Returns `true` once the driver task has ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for GuardHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawns a driver task for `guard`.
///
/// The task ends when either provider closes or when the handle is
/// dropped.
pub fn spawn_guard<G, N>(
    guard: G,
    session: watch::Receiver<SessionSnapshot>,
    admin: watch::Receiver<AdminSnapshot>,
    navigator: N,
) -> GuardHandle
where
    G: Guard,
    N: Navigator,
{
    let (state_tx, state_rx) = watch::channel(GuardState::Pending);
    let task = tokio::spawn(drive(guard, session, admin, navigator, state_tx));
    GuardHandle {
        state: state_rx,
        task,
    }
}

async fn drive<G: Guard, N: Navigator>(
    mut guard: G,
    mut session: watch::Receiver<SessionSnapshot>,
    mut admin: watch::Receiver<AdminSnapshot>,
    navigator: N,
    state: watch::Sender<GuardState>,
) {
    let name = guard.name();
    tracing::debug!(guard = name, "guard started");

    loop {
        // Snapshot borrows hold a read lock; keep them out of any await.
        let transition = {
            let s = session.borrow_and_update();
            let a = admin.borrow_and_update();
            guard.observe(&s, &a)
        };

        // The redirect lands before the new state is visible.
        if let Some(route) = transition.navigate {
            tracing::info!(guard = name, %route, "redirecting");
            navigator.navigate(&route);
        }

        state.send_if_modified(|current| {
            if *current == transition.state {
                false
            } else {
                tracing::debug!(guard = name, from = %current, to = %transition.state, "guard transition");
                *current = transition.state;
                true
            }
        });

        tokio::select! {
            changed = session.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            changed = admin.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            () = state.closed() => break,
        }
    }

    tracing::debug!(guard = name, "guard stopped");
}
