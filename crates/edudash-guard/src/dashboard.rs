//! `DashboardRedirector`: `/dashboard` sends each role to its own page.
//!
//! The redirector never renders content. It waits for the session,
//! looks the role up in the dispatch table, and navigates.

use edudash_protocol::{Role, Route};
use edudash_session::{AdminSnapshot, SessionSnapshot};

use crate::state::NavigationLatch;
use crate::{Decision, Guard, Transition};

/// The outcome of a dashboard lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// Session still loading.
    Wait,
    /// Navigate here.
    Go(Route),
    /// The role has no dashboard. Terminal: no navigation happens.
    Stuck(Role),
}

/// Guard for the `/dashboard` dispatcher.
#[derive(Debug, Default)]
pub struct DashboardRedirector {
    latch: NavigationLatch,
    /// The role last reported as stuck, so the error is logged once per
    /// distinct role rather than on every observation.
    reported: Option<Role>,
}

impl DashboardRedirector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pure dispatch. Signed in with no role at all is treated like an
    /// unrecognized role.
    pub fn target(session: &SessionSnapshot) -> Dispatch {
        if session.loading {
            return Dispatch::Wait;
        }
        if session.identity.is_none() {
            return Dispatch::Go(Route::Login);
        }
        let role = session.role.clone().unwrap_or_else(|| Role::Other(String::new()));
        match role.dashboard() {
            Some(route) => Dispatch::Go(route),
            None => Dispatch::Stuck(role),
        }
    }
}

impl Guard for DashboardRedirector {
    fn name(&self) -> &'static str {
        "dashboard"
    }

    fn observe(&mut self, session: &SessionSnapshot, _admin: &AdminSnapshot) -> Transition {
        let decision = match Self::target(session) {
            Dispatch::Wait => Decision::pending(),
            Dispatch::Go(route) => {
                self.reported = None;
                Decision::redirect(route)
            }
            Dispatch::Stuck(role) => {
                if self.reported.as_ref() != Some(&role) {
                    tracing::error!(
                        user_id = ?session.user_id(),
                        role = %role,
                        "unrecognized role, no dashboard to redirect to"
                    );
                    self.reported = Some(role);
                }
                Decision::stay()
            }
        };

        // Never Authorized: the dispatcher has no content of its own.
        self.latch.step(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GuardState;
    use edudash_protocol::Identity;

    fn signed_in(role: Option<Role>) -> SessionSnapshot {
        SessionSnapshot::signed_in(Identity::new("u-1"), role)
    }

    #[test]
    fn test_target_dispatch_table() {
        assert_eq!(
            DashboardRedirector::target(&signed_in(Some(Role::Student))),
            Dispatch::Go(Route::Student)
        );
        assert_eq!(
            DashboardRedirector::target(&signed_in(Some(Role::Tutor))),
            Dispatch::Go(Route::Tutor)
        );
        assert_eq!(
            DashboardRedirector::target(&signed_in(Some(Role::Admin))),
            Dispatch::Go(Route::Admin)
        );
    }

    #[test]
    fn test_target_loading_waits() {
        assert_eq!(
            DashboardRedirector::target(&SessionSnapshot::loading()),
            Dispatch::Wait
        );
    }

    #[test]
    fn test_target_anonymous_goes_to_login() {
        assert_eq!(
            DashboardRedirector::target(&SessionSnapshot::anonymous()),
            Dispatch::Go(Route::Login)
        );
    }

    #[test]
    fn test_target_unrecognized_role_is_stuck() {
        assert_eq!(
            DashboardRedirector::target(&signed_in(Some(Role::from("parent")))),
            Dispatch::Stuck(Role::Other("parent".into()))
        );
    }

    #[test]
    fn test_observe_stuck_never_navigates() {
        let mut redirector = DashboardRedirector::new();
        let session = signed_in(Some(Role::from("parent")));

        let first = redirector.observe(&session, &AdminSnapshot::anonymous());
        let second = redirector.observe(&session, &AdminSnapshot::anonymous());

        assert_eq!(first.navigate, None);
        assert_eq!(second.navigate, None);
        assert_eq!(first.state, GuardState::Unauthorized);
    }

    #[test]
    fn test_observe_navigates_once_per_target() {
        let mut redirector = DashboardRedirector::new();
        let session = signed_in(Some(Role::Tutor));

        let first = redirector.observe(&session, &AdminSnapshot::loading());
        let second = redirector.observe(&session, &AdminSnapshot::loading());

        assert_eq!(first.navigate, Some(Route::Tutor));
        assert_eq!(second.navigate, None);
    }
}
