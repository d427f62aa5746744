//! Integration tests for the session and admin-session providers.
//!
//! A scripted backend stands in for the hosted auth service. Its identity
//! check can be held open with a `Notify` gate, which lets the tests look
//! at the provider while it is still loading.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use edudash_protocol::{Identity, Role, UserId};
use edudash_session::{
    AdminSessionProvider, AuthEvent, IdentityBackend, SessionError, SessionProvider,
    SessionStatus,
};
use tokio::sync::{Mutex, Notify};

// =========================================================================
// Scripted backend
// =========================================================================

#[derive(Default)]
struct ScriptedBackend {
    identity: Mutex<Option<Identity>>,
    role: Mutex<Option<Role>>,
    admin: Mutex<bool>,
    fail_identity: Mutex<bool>,
    fail_sign_out: Mutex<bool>,
    /// When set, `current_identity` waits for a notification first.
    gate: Mutex<Option<Arc<Notify>>>,
    identity_calls: AtomicUsize,
    sign_out_calls: AtomicUsize,
}

impl ScriptedBackend {
    fn signed_in(id: &str, role: Role, admin: bool) -> Arc<Self> {
        let backend = Self::default();
        *backend.identity.try_lock().unwrap() = Some(Identity::new(id));
        *backend.role.try_lock().unwrap() = Some(role);
        *backend.admin.try_lock().unwrap() = admin;
        Arc::new(backend)
    }

    fn anonymous() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn gated(self: &Arc<Self>) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.try_lock().unwrap() = Some(Arc::clone(&notify));
        notify
    }
}

impl IdentityBackend for ScriptedBackend {
    async fn current_identity(&self) -> Result<Option<Identity>, SessionError> {
        self.identity_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gate.lock().await.clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if *self.fail_identity.lock().await {
            return Err(SessionError::Backend("auth service unreachable".into()));
        }
        Ok(self.identity.lock().await.clone())
    }

    async fn fetch_role(&self, _user: &UserId) -> Result<Option<Role>, SessionError> {
        Ok(self.role.lock().await.clone())
    }

    async fn is_admin(&self, _user: &UserId) -> Result<bool, SessionError> {
        Ok(*self.admin.lock().await)
    }

    async fn sign_out(&self) -> Result<(), SessionError> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail_sign_out.lock().await {
            return Err(SessionError::Backend("revoke failed".into()));
        }
        *self.identity.lock().await = None;
        Ok(())
    }
}

async fn within<T>(fut: impl std::future::Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(2), fut)
        .await
        .expect("timed out")
}

// =========================================================================
// SessionProvider
// =========================================================================

#[tokio::test]
async fn test_session_starts_loading_until_check_completes() {
    let backend = ScriptedBackend::signed_in("u-1", Role::Tutor, false);
    let gate = backend.gated();

    let provider = SessionProvider::spawn(Arc::clone(&backend));

    // The check is parked on the gate: still unknown, not anonymous.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(provider.snapshot().status(), SessionStatus::Loading);

    gate.notify_one();
    let snap = within(provider.ready()).await.unwrap();

    assert!(!snap.loading);
    assert_eq!(snap.identity, Some(Identity::new("u-1")));
    assert_eq!(snap.role, Some(Role::Tutor));
}

#[tokio::test]
async fn test_session_identity_failure_resolves_as_anonymous() {
    let backend = ScriptedBackend::signed_in("u-1", Role::Student, false);
    *backend.fail_identity.lock().await = true;

    let provider = SessionProvider::spawn(backend);
    let snap = within(provider.ready()).await.unwrap();

    assert_eq!(snap.status(), SessionStatus::Anonymous);
    assert!(snap.role.is_none());
}

#[tokio::test]
async fn test_session_loading_flips_exactly_once() {
    let backend = ScriptedBackend::signed_in("u-1", Role::Student, false);
    let provider = SessionProvider::spawn(Arc::clone(&backend));
    let mut rx = provider.subscribe();

    within(provider.ready()).await.unwrap();

    // Later refreshes must never put the snapshot back into loading.
    *backend.role.lock().await = Some(Role::Tutor);
    provider.notify(AuthEvent::UserUpdated).await.unwrap();
    within(rx.wait_for(|s| s.role == Some(Role::Tutor)))
        .await
        .unwrap();

    *backend.identity.lock().await = None;
    provider.notify(AuthEvent::TokenRefreshed).await.unwrap();
    let snap = within(rx.wait_for(|s| s.identity.is_none()))
        .await
        .unwrap()
        .clone();
    assert!(!snap.loading);
}

#[tokio::test]
async fn test_session_refresh_keeps_old_snapshot_until_resolved() {
    let backend = ScriptedBackend::signed_in("u-1", Role::Student, false);
    let provider = SessionProvider::spawn(Arc::clone(&backend));
    within(provider.ready()).await.unwrap();

    let gate = backend.gated();
    *backend.identity.lock().await = Some(Identity::new("u-2"));
    provider.notify(AuthEvent::SignedIn).await.unwrap();

    // Refresh in flight: still showing u-1, no flicker to anonymous.
    tokio::time::sleep(Duration::from_millis(20)).await;
    let during = provider.snapshot();
    assert_eq!(during.identity, Some(Identity::new("u-1")));
    assert!(!during.loading);

    gate.notify_one();
    let mut rx = provider.subscribe();
    within(rx.wait_for(|s| s.identity == Some(Identity::new("u-2"))))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_session_signed_out_event_clears_without_backend_call() {
    let backend = ScriptedBackend::signed_in("u-1", Role::Student, false);
    let provider = SessionProvider::spawn(Arc::clone(&backend));
    within(provider.ready()).await.unwrap();
    let calls_before = backend.identity_calls.load(Ordering::SeqCst);

    provider.notify(AuthEvent::SignedOut).await.unwrap();
    let mut rx = provider.subscribe();
    within(rx.wait_for(|s| s.identity.is_none())).await.unwrap();

    assert_eq!(backend.identity_calls.load(Ordering::SeqCst), calls_before);
}

#[tokio::test]
async fn test_session_sign_out_clears_even_when_backend_fails() {
    let backend = ScriptedBackend::signed_in("u-1", Role::Student, false);
    *backend.fail_sign_out.lock().await = true;
    let provider = SessionProvider::spawn(Arc::clone(&backend));
    within(provider.ready()).await.unwrap();

    let result = within(provider.sign_out()).await;

    assert!(matches!(result, Err(SessionError::Backend(_))));
    assert_eq!(provider.snapshot().status(), SessionStatus::Anonymous);
    assert_eq!(backend.sign_out_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_session_shutdown_closes_watchers() {
    let provider = SessionProvider::spawn(ScriptedBackend::anonymous());
    within(provider.ready()).await.unwrap();
    let mut rx = provider.subscribe();

    provider.shutdown().await.unwrap();

    // `changed()` errors once the sender side (the actor) is gone.
    assert!(within(rx.changed()).await.is_err());
    assert!(matches!(
        provider.notify(AuthEvent::SignedIn).await,
        Err(SessionError::Closed)
    ));
}

// =========================================================================
// AdminSessionProvider
// =========================================================================

#[tokio::test]
async fn test_admin_provider_reports_privilege() {
    let backend = ScriptedBackend::signed_in("root", Role::Admin, true);
    let provider = AdminSessionProvider::spawn(backend);

    let snap = within(provider.ready()).await.unwrap();

    assert!(snap.is_admin);
    assert_eq!(snap.identity, Some(Identity::new("root")));
}

#[tokio::test]
async fn test_admin_provider_is_independent_of_session_provider() {
    let backend = ScriptedBackend::signed_in("u-1", Role::Student, false);
    let session = SessionProvider::spawn(Arc::clone(&backend));
    within(session.ready()).await.unwrap();

    // The admin provider has its own lifecycle: spawned later, it starts
    // loading regardless of the session provider's state.
    let gate = backend.gated();
    let admin = AdminSessionProvider::spawn(Arc::clone(&backend));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(admin.snapshot().loading);
    assert!(!session.snapshot().loading);

    gate.notify_one();
    let snap = within(admin.ready()).await.unwrap();
    assert!(!snap.is_admin);
}

#[tokio::test]
async fn test_admin_provider_anonymous_is_not_admin() {
    let provider = AdminSessionProvider::spawn(ScriptedBackend::anonymous());

    let snap = within(provider.ready()).await.unwrap();

    assert!(!snap.is_admin);
    assert!(snap.identity.is_none());
}

#[tokio::test]
async fn test_admin_provider_clear_is_visible_on_return() {
    let backend = ScriptedBackend::signed_in("root", Role::Admin, true);
    let provider = AdminSessionProvider::spawn(Arc::clone(&backend));
    within(provider.ready()).await.unwrap();
    let calls_before = backend.identity_calls.load(Ordering::SeqCst);

    within(provider.clear()).await.unwrap();

    let snap = provider.snapshot();
    assert!(!snap.is_admin);
    assert!(snap.identity.is_none());
    assert!(!snap.loading);
    assert_eq!(backend.identity_calls.load(Ordering::SeqCst), calls_before);
    assert_eq!(backend.sign_out_calls.load(Ordering::SeqCst), 0);
}
