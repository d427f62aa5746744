//! Integration tests for guard drivers.
//!
//! The providers are replaced by bare `watch` channels so each test can
//! script the exact sequence of snapshots a guard sees.

use std::time::Duration;

use edudash_guard::{
    AdminLayout, DashboardRedirector, GuardError, GuardState, GuardView, History,
    ProtectedRoute, Requirement, spawn_guard,
};
use edudash_protocol::{Identity, Role, Route};
use edudash_session::{AdminSnapshot, SessionSnapshot};
use tokio::sync::watch;

// =========================================================================
// Helpers
// =========================================================================

fn channels() -> (
    watch::Sender<SessionSnapshot>,
    watch::Receiver<SessionSnapshot>,
    watch::Sender<AdminSnapshot>,
    watch::Receiver<AdminSnapshot>,
) {
    let (s_tx, s_rx) = watch::channel(SessionSnapshot::loading());
    let (a_tx, a_rx) = watch::channel(AdminSnapshot::loading());
    (s_tx, s_rx, a_tx, a_rx)
}

fn student() -> SessionSnapshot {
    SessionSnapshot::signed_in(Identity::new("s-1"), Some(Role::Student))
}

fn not_admin() -> AdminSnapshot {
    AdminSnapshot::signed_in(Identity::new("s-1"), false)
}

/// Gives the driver task a chance to process the latest change.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

// =========================================================================
// ProtectedRoute
// =========================================================================

#[tokio::test]
async fn test_protected_route_renders_loading_for_every_loading_tick() {
    let (s_tx, s_rx, a_tx, a_rx) = channels();
    let history = History::starting_at(Route::Tutor);
    let handle = spawn_guard(
        ProtectedRoute::new(Requirement::role(Role::Tutor)),
        s_rx,
        a_rx,
        history.clone(),
    );

    // Session resolves first, admin still loading: still pending.
    settle().await;
    assert_eq!(handle.view(|| "tutor page"), GuardView::Loading);
    s_tx.send_replace(SessionSnapshot::signed_in(Identity::new("t-1"), Some(Role::Tutor)));
    settle().await;
    assert_eq!(handle.view(|| "tutor page"), GuardView::Loading);
    assert_eq!(history.entries(), vec![Route::Tutor]);

    a_tx.send_replace(AdminSnapshot::signed_in(Identity::new("t-1"), false));
    let state = handle.settled().await.unwrap();

    assert_eq!(state, GuardState::Authorized);
    assert_eq!(handle.view(|| "tutor page"), GuardView::Children("tutor page"));
}

#[tokio::test]
async fn test_protected_route_student_on_tutor_page_redirects_to_student() {
    let (s_tx, s_rx, a_tx, a_rx) = channels();
    let history = History::starting_at(Route::Tutor);
    let handle = spawn_guard(
        ProtectedRoute::new(Requirement::role(Role::Tutor)),
        s_rx,
        a_rx,
        history.clone(),
    );

    s_tx.send_replace(student());
    a_tx.send_replace(not_admin());
    let state = handle.settled().await.unwrap();
    settle().await;

    assert_eq!(state, GuardState::Unauthorized);
    assert_eq!(handle.view(|| "tutor page"), GuardView::Nothing);
    assert_eq!(history.entries(), vec![Route::Tutor, Route::Student]);
}

#[tokio::test]
async fn test_protected_route_repeated_snapshots_do_not_duplicate_navigation() {
    let (s_tx, s_rx, a_tx, a_rx) = channels();
    let history = History::default();
    let handle = spawn_guard(
        ProtectedRoute::new(Requirement::role(Role::Tutor)),
        s_rx,
        a_rx,
        history.clone(),
    );

    s_tx.send_replace(student());
    a_tx.send_replace(not_admin());
    handle.settled().await.unwrap();
    settle().await;

    // Same decision re-entered several times.
    for _ in 0..3 {
        s_tx.send_replace(student());
        a_tx.send_replace(not_admin());
        settle().await;
    }

    assert_eq!(history.entries(), vec![Route::Student]);
}

#[tokio::test]
async fn test_protected_route_admin_required_without_identity_goes_to_login() {
    let (s_tx, s_rx, a_tx, a_rx) = channels();
    let history = History::default();
    let handle = spawn_guard(
        ProtectedRoute::new(Requirement::role(Role::Admin)),
        s_rx,
        a_rx,
        history.clone(),
    );

    s_tx.send_replace(SessionSnapshot::anonymous());
    a_tx.send_replace(AdminSnapshot::anonymous());
    handle.settled().await.unwrap();
    settle().await;

    assert_eq!(history.entries(), vec![Route::Login]);
}

#[tokio::test]
async fn test_protected_route_sign_out_after_authorization_redirects() {
    let (s_tx, s_rx, a_tx, a_rx) = channels();
    let history = History::default();
    let handle = spawn_guard(
        ProtectedRoute::new(Requirement::role(Role::Student)),
        s_rx,
        a_rx,
        history.clone(),
    );
    s_tx.send_replace(student());
    a_tx.send_replace(not_admin());
    assert_eq!(handle.settled().await.unwrap(), GuardState::Authorized);

    s_tx.send_replace(SessionSnapshot::anonymous());
    a_tx.send_replace(AdminSnapshot::anonymous());
    settle().await;

    assert_eq!(handle.state(), GuardState::Unauthorized);
    assert_eq!(history.entries(), vec![Route::Login]);
}

// =========================================================================
// AdminLayout
// =========================================================================

#[tokio::test]
async fn test_admin_layout_non_admin_goes_to_login() {
    let (_s_tx, s_rx, a_tx, a_rx) = channels();
    let history = History::default();
    let handle = spawn_guard(AdminLayout::new(), s_rx, a_rx, history.clone());

    a_tx.send_replace(AdminSnapshot::signed_in(Identity::new("t-1"), false));
    handle.settled().await.unwrap();
    settle().await;

    assert_eq!(history.entries(), vec![Route::Login]);
    assert_eq!(handle.view(|| "admin"), GuardView::Nothing);
}

// =========================================================================
// DashboardRedirector
// =========================================================================

#[tokio::test]
async fn test_dashboard_sends_student_to_student_page() {
    let (s_tx, s_rx, _a_tx, a_rx) = channels();
    let history = History::starting_at(Route::Dashboard);
    let handle = spawn_guard(DashboardRedirector::new(), s_rx, a_rx, history.clone());

    s_tx.send_replace(student());
    handle.settled().await.unwrap();
    settle().await;

    assert_eq!(history.entries(), vec![Route::Dashboard, Route::Student]);
}

#[tokio::test]
async fn test_dashboard_unrecognized_role_stays_put() {
    let (s_tx, s_rx, _a_tx, a_rx) = channels();
    let history = History::starting_at(Route::Dashboard);
    let handle = spawn_guard(DashboardRedirector::new(), s_rx, a_rx, history.clone());

    s_tx.send_replace(SessionSnapshot::signed_in(
        Identity::new("p-1"),
        Some(Role::from("parent")),
    ));
    handle.settled().await.unwrap();
    settle().await;

    assert_eq!(history.entries(), vec![Route::Dashboard]);
    assert!(!handle.is_finished());
}

// =========================================================================
// Lifecycle
// =========================================================================

#[tokio::test]
async fn test_guard_stops_when_provider_closes() {
    let (s_tx, s_rx, _a_tx, a_rx) = channels();
    let handle = spawn_guard(DashboardRedirector::new(), s_rx, a_rx, History::default());

    drop(s_tx);

    let result = handle.settled().await;
    assert!(matches!(result, Err(GuardError::ProviderClosed)));
    settle().await;
    assert!(handle.is_finished());
}

#[tokio::test]
async fn test_dropping_handle_stops_redirects() {
    let (s_tx, s_rx, _a_tx, a_rx) = channels();
    let history = History::default();
    let handle = spawn_guard(DashboardRedirector::new(), s_rx, a_rx, history.clone());

    drop(handle);
    settle().await;
    s_tx.send_replace(student());
    settle().await;

    assert!(history.is_empty());
}
