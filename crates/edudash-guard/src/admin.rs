//! `AdminLayout`: the admin-only section.
//!
//! Only one privileged role exists, so there's no role fan-out here: any
//! resolved state that isn't a confirmed admin goes to `/login`.

use edudash_protocol::Route;
use edudash_session::{AdminSnapshot, SessionSnapshot};

use crate::state::NavigationLatch;
use crate::{Decision, Guard, Transition};

/// Guard for everything under `/admin`.
#[derive(Debug, Default)]
pub struct AdminLayout {
    latch: NavigationLatch,
}

impl AdminLayout {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pending while the admin session loads; authorized only for a
    /// signed-in admin.
    ///
    /// The general session is not consulted: the admin session has its
    /// own identity check.
    pub fn decide(&self, admin: &AdminSnapshot) -> Decision {
        if admin.loading {
            Decision::pending()
        } else if admin.identity.is_some() && admin.is_admin {
            Decision::authorized()
        } else {
            Decision::redirect(Route::Login)
        }
    }
}

impl Guard for AdminLayout {
    fn name(&self) -> &'static str {
        "admin-layout"
    }

    fn observe(&mut self, _session: &SessionSnapshot, admin: &AdminSnapshot) -> Transition {
        let decision = self.decide(admin);
        self.latch.step(decision)
    }
}
