//! Provider actors: keep one session snapshot current.
//!
//! Each provider runs in its own Tokio task and owns its snapshot
//! exclusively. The outside world talks to it through a command channel
//! and observes it through a `watch` channel. That replaces a global
//! mutable "current user" with an explicit object handed to whoever needs
//! it.
//!
//! ## Lifecycle
//!
//! ```text
//! spawn() ──→ [loading] ──(first resolve)──→ [resolved]
//!                                               │  ↑
//!                         AuthEvent / sign_out  │  │ publish
//!                                               ▼  │
//!                                           (re-resolve)
//!
//! shutdown() or last handle dropped ──→ task ends, watchers see "closed"
//! ```

use tokio::sync::{mpsc, oneshot, watch};

use crate::{AdminSnapshot, AuthEvent, IdentityBackend, ProviderState, SessionError, SessionSnapshot};

/// Command channel size. Auth events are rare; this only needs to absorb
/// a short burst while a resolution is in flight.
const COMMAND_CHANNEL_SIZE: usize = 16;

/// The general session provider: identity + role.
pub type SessionProvider = Provider<SessionSnapshot>;

/// The admin session provider: identity + admin privilege.
pub type AdminSessionProvider = Provider<AdminSnapshot>;

/// Commands accepted by a provider actor.
enum ProviderCommand {
    /// The auth service reported a state change.
    Notify(AuthEvent),
    /// Clear the snapshot without calling the backend.
    Clear { reply: oneshot::Sender<()> },
    /// End the session on the backend, then clear the snapshot.
    SignOut {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    /// Stop the actor.
    Shutdown,
}

/// Handle to a running provider.
///
/// Cheap to clone: it's an `mpsc::Sender` and a `watch::Receiver`. The
/// actor stops when [`shutdown`](Self::shutdown) is called or when every
/// handle has been dropped.
#[derive(Clone)]
pub struct Provider<S: ProviderState> {
    commands: mpsc::Sender<ProviderCommand>,
    state: watch::Receiver<S>,
}

impl<S: ProviderState> Provider<S> {
    /// Spawns the provider actor and starts the first identity check.
    ///
    /// The snapshot starts in its loading state and flips to resolved
    /// exactly once, when that first check completes (successfully or not).
    pub fn spawn<B: IdentityBackend>(backend: B) -> Self {
        let (state_tx, state_rx) = watch::channel(S::initial());
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_CHANNEL_SIZE);

        let actor = ProviderActor {
            backend,
            state: state_tx,
            commands: cmd_rx,
        };
        tokio::spawn(actor.run());

        Self {
            commands: cmd_tx,
            state: state_rx,
        }
    }

    /// Returns a receiver that observes every snapshot change.
    pub fn subscribe(&self) -> watch::Receiver<S> {
        self.state.clone()
    }

    /// Returns the current snapshot.
    pub fn snapshot(&self) -> S {
        self.state.borrow().clone()
    }

    /// Waits until the first resolution has finished and returns the
    /// resolved snapshot.
    ///
    /// # Errors
    /// [`SessionError::Closed`] if the provider stopped before resolving.
    pub async fn ready(&self) -> Result<S, SessionError> {
        let mut rx = self.state.clone();
        let snapshot = rx
            .wait_for(|s| !s.is_loading())
            .await
            .map_err(|_| SessionError::Closed)?;
        Ok(snapshot.clone())
    }

    /// Forwards an auth state change to the provider.
    pub async fn notify(&self, event: AuthEvent) -> Result<(), SessionError> {
        self.commands
            .send(ProviderCommand::Notify(event))
            .await
            .map_err(|_| SessionError::Closed)
    }

    /// Clears the snapshot locally, as a `SignedOut` event would, and
    /// returns once the cleared snapshot is published.
    ///
    /// Use this to mirror a sign-out already performed through another
    /// provider.
    pub async fn clear(&self) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(ProviderCommand::Clear { reply: reply_tx })
            .await
            .map_err(|_| SessionError::Closed)?;
        reply_rx.await.map_err(|_| SessionError::Closed)
    }

    /// Signs out on the backend and clears the snapshot.
    ///
    /// The snapshot is cleared even when the backend call fails; the
    /// backend error is still returned so the caller can report it.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(ProviderCommand::SignOut { reply: reply_tx })
            .await
            .map_err(|_| SessionError::Closed)?;
        reply_rx.await.map_err(|_| SessionError::Closed)?
    }

    /// Stops the provider. Watchers observe the channel closing.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.commands
            .send(ProviderCommand::Shutdown)
            .await
            .map_err(|_| SessionError::Closed)
    }

    /// Returns `true` once the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// The actor state. Runs inside a Tokio task.
struct ProviderActor<S: ProviderState, B: IdentityBackend> {
    backend: B,
    state: watch::Sender<S>,
    commands: mpsc::Receiver<ProviderCommand>,
}

impl<S: ProviderState, B: IdentityBackend> ProviderActor<S, B> {
    async fn run(mut self) {
        tracing::debug!(provider = S::NAME, "provider started");

        let first = S::resolve(&self.backend).await;
        self.publish(first);
        tracing::info!(provider = S::NAME, "initial identity check resolved");

        while let Some(cmd) = self.commands.recv().await {
            match cmd {
                ProviderCommand::Notify(AuthEvent::SignedOut) => {
                    tracing::info!(provider = S::NAME, "signed out");
                    self.publish(S::cleared());
                }
                ProviderCommand::Notify(event) => {
                    tracing::debug!(provider = S::NAME, ?event, "refreshing");
                    // The previous snapshot stays visible until the new
                    // one is ready, so consumers never see a gap.
                    let next = S::resolve(&self.backend).await;
                    self.publish(next);
                }
                ProviderCommand::Clear { reply } => {
                    tracing::info!(provider = S::NAME, "cleared");
                    self.publish(S::cleared());
                    let _ = reply.send(());
                }
                ProviderCommand::SignOut { reply } => {
                    let result = self.backend.sign_out().await;
                    if let Err(e) = &result {
                        tracing::warn!(provider = S::NAME, error = %e, "backend sign-out failed");
                    }
                    self.publish(S::cleared());
                    let _ = reply.send(result);
                }
                ProviderCommand::Shutdown => {
                    tracing::info!(provider = S::NAME, "provider shutting down");
                    break;
                }
            }
        }

        tracing::debug!(provider = S::NAME, "provider stopped");
    }

    /// Replaces the snapshot, notifying watchers only on a real change.
    fn publish(&self, next: S) {
        self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}
