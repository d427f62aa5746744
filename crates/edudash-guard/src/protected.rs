//! `ProtectedRoute`: role-gated pages.
//!
//! Decision table, evaluated top to bottom:
//!
//! | condition                                  | state        | navigate            |
//! |--------------------------------------------|--------------|---------------------|
//! | session or admin session loading           | Pending      | -                   |
//! | admin required, admin check negative       | Unauthorized | `redirect_to`       |
//! | no identity                                | Unauthorized | `/login`            |
//! | role required, actual role differs         | Unauthorized | actual role's route |
//! | role required, actual role has no route    | Unauthorized | `redirect_to`       |
//! | otherwise                                  | Authorized   | -                   |
//!
//! A student who opens `/tutor` is sent to `/student`, not to the login
//! page: they are signed in, just in the wrong place.

use edudash_protocol::Role;
use edudash_protocol::Route;
use edudash_session::{AdminSnapshot, SessionSnapshot};

use crate::state::NavigationLatch;
use crate::{Decision, Guard, Transition};

/// What a protected page demands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    /// The role the page is for. `None` admits any signed-in principal.
    pub role: Option<Role>,
    /// Fallback destination when the admin check fails or the actual role
    /// has no dashboard. Defaults to `/login`.
    pub redirect_to: Route,
}

impl Requirement {
    /// Any signed-in principal.
    pub fn signed_in() -> Self {
        Self {
            role: None,
            redirect_to: Route::Login,
        }
    }

    /// Exactly `role`.
    pub fn role(role: Role) -> Self {
        Self {
            role: Some(role),
            redirect_to: Route::Login,
        }
    }

    /// Overrides the fallback redirect.
    pub fn redirect_to(mut self, route: Route) -> Self {
        self.redirect_to = route;
        self
    }
}

impl Default for Requirement {
    fn default() -> Self {
        Self::signed_in()
    }
}

/// Guard for a page that requires a signed-in principal with a role.
#[derive(Debug)]
pub struct ProtectedRoute {
    requirement: Requirement,
    latch: NavigationLatch,
}

impl ProtectedRoute {
    pub fn new(requirement: Requirement) -> Self {
        Self {
            requirement,
            latch: NavigationLatch::default(),
        }
    }

    pub fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    /// Evaluates the decision table. Pure: no logging of navigation, no
    /// state.
    pub fn decide(&self, session: &SessionSnapshot, admin: &AdminSnapshot) -> Decision {
        if session.loading || admin.loading {
            return Decision::pending();
        }

        let req = &self.requirement;

        if req.role.as_ref().is_some_and(Role::is_admin) {
            if session.role.as_ref().is_some_and(Role::is_admin) && !admin.is_admin {
                tracing::warn!(
                    user_id = ?session.user_id(),
                    "session role is admin but admin check is negative"
                );
            }
            return if admin.is_admin && admin.identity.is_some() {
                Decision::authorized()
            } else {
                Decision::redirect(req.redirect_to.clone())
            };
        }

        if session.identity.is_none() {
            return Decision::redirect(Route::Login);
        }

        match (&req.role, &session.role) {
            (None, _) => Decision::authorized(),
            (Some(required), Some(actual)) if required == actual => Decision::authorized(),
            (Some(_), actual) => {
                let target = actual
                    .as_ref()
                    .and_then(Role::dashboard)
                    .unwrap_or_else(|| req.redirect_to.clone());
                Decision::redirect(target)
            }
        }
    }
}

impl Guard for ProtectedRoute {
    fn name(&self) -> &'static str {
        "protected-route"
    }

    fn observe(&mut self, session: &SessionSnapshot, admin: &AdminSnapshot) -> Transition {
        let decision = self.decide(session, admin);
        self.latch.step(decision)
    }
}
