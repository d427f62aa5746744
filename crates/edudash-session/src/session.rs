//! Session snapshots: what the providers publish.
//!
//! A snapshot is an immutable picture of "who is signed in" at one moment.
//! Providers replace the whole snapshot at once, so a consumer never sees
//! an identity from one resolution paired with a role from another.

use std::future::Future;

use edudash_protocol::{Identity, Role, UserId};

use crate::IdentityBackend;

// ---------------------------------------------------------------------------
// SessionStatus
// ---------------------------------------------------------------------------

/// The three ways a consumer can read a snapshot.
///
/// ```text
///   Loading ──(first resolution)──→ Anonymous ⇄ Authenticated
/// ```
///
/// `Loading` is only ever the first state. Once a provider has resolved,
/// later refreshes go straight from one resolved state to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// Resolution in progress. Unknown, NOT signed out.
    Loading,
    /// Resolved: nobody is signed in.
    Anonymous,
    /// Resolved: a principal is signed in.
    Authenticated,
}

// ---------------------------------------------------------------------------
// SessionSnapshot
// ---------------------------------------------------------------------------

/// Identity, role, and loading flag of the general session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// The signed-in principal, if any.
    pub identity: Option<Identity>,
    /// The principal's role. `None` when nobody is signed in or when the
    /// profile has no role set.
    pub role: Option<Role>,
    /// `true` until the first identity check has finished.
    pub loading: bool,
}

impl SessionSnapshot {
    /// The state every provider starts in.
    pub fn loading() -> Self {
        Self {
            identity: None,
            role: None,
            loading: true,
        }
    }

    /// A resolved snapshot with nobody signed in.
    pub fn anonymous() -> Self {
        Self {
            identity: None,
            role: None,
            loading: false,
        }
    }

    /// A resolved snapshot for `identity` with an optional role.
    pub fn signed_in(identity: Identity, role: Option<Role>) -> Self {
        Self {
            identity: Some(identity),
            role,
            loading: false,
        }
    }

    pub fn status(&self) -> SessionStatus {
        match (self.loading, &self.identity) {
            (true, _) => SessionStatus::Loading,
            (false, None) => SessionStatus::Anonymous,
            (false, Some(_)) => SessionStatus::Authenticated,
        }
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.identity.as_ref().map(|i| &i.id)
    }
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self::loading()
    }
}

// ---------------------------------------------------------------------------
// AdminSnapshot
// ---------------------------------------------------------------------------

/// Identity, admin privilege, and loading flag of the admin session.
///
/// Resolved independently of [`SessionSnapshot`]. When both have resolved
/// they should agree: a session whose role is `admin` should have an admin
/// snapshot with `is_admin == true`. Guards trust this snapshot for admin
/// decisions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminSnapshot {
    pub identity: Option<Identity>,
    pub is_admin: bool,
    pub loading: bool,
}

impl AdminSnapshot {
    pub fn loading() -> Self {
        Self {
            identity: None,
            is_admin: false,
            loading: true,
        }
    }

    pub fn anonymous() -> Self {
        Self {
            identity: None,
            is_admin: false,
            loading: false,
        }
    }

    pub fn signed_in(identity: Identity, is_admin: bool) -> Self {
        Self {
            identity: Some(identity),
            is_admin,
            loading: false,
        }
    }

    pub fn status(&self) -> SessionStatus {
        match (self.loading, &self.identity) {
            (true, _) => SessionStatus::Loading,
            (false, None) => SessionStatus::Anonymous,
            (false, Some(_)) => SessionStatus::Authenticated,
        }
    }
}

impl Default for AdminSnapshot {
    fn default() -> Self {
        Self::loading()
    }
}

// ---------------------------------------------------------------------------
// ProviderState
// ---------------------------------------------------------------------------

/// A snapshot type a [`Provider`](crate::Provider) knows how to resolve.
///
/// Both providers share one actor implementation; this trait is what makes
/// them differ. `resolve` never fails: backend errors are logged and
/// folded into an anonymous (or non-admin) snapshot.
pub trait ProviderState: Clone + PartialEq + Send + Sync + 'static {
    /// Short name used in log lines.
    const NAME: &'static str;

    /// The unresolved starting state.
    fn initial() -> Self;

    /// The resolved "nobody signed in" state.
    fn cleared() -> Self;

    /// `true` while the first resolution is still running.
    fn is_loading(&self) -> bool;

    /// Runs the identity check against `backend`.
    fn resolve<B: IdentityBackend>(backend: &B) -> impl Future<Output = Self> + Send;
}

impl ProviderState for SessionSnapshot {
    const NAME: &'static str = "session";

    fn initial() -> Self {
        Self::loading()
    }

    fn cleared() -> Self {
        Self::anonymous()
    }

    fn is_loading(&self) -> bool {
        self.loading
    }

    async fn resolve<B: IdentityBackend>(backend: &B) -> Self {
        let identity = match backend.current_identity().await {
            Ok(Some(identity)) => identity,
            Ok(None) => return Self::anonymous(),
            Err(e) => {
                tracing::warn!(error = %e, "identity check failed, treating as signed out");
                return Self::anonymous();
            }
        };

        let role = match backend.fetch_role(&identity.id).await {
            Ok(role) => role,
            Err(e) => {
                tracing::warn!(
                    user_id = %identity.id,
                    error = %e,
                    "role lookup failed"
                );
                None
            }
        };

        Self::signed_in(identity, role)
    }
}

impl ProviderState for AdminSnapshot {
    const NAME: &'static str = "admin-session";

    fn initial() -> Self {
        Self::loading()
    }

    fn cleared() -> Self {
        Self::anonymous()
    }

    fn is_loading(&self) -> bool {
        self.loading
    }

    async fn resolve<B: IdentityBackend>(backend: &B) -> Self {
        let identity = match backend.current_identity().await {
            Ok(Some(identity)) => identity,
            Ok(None) => return Self::anonymous(),
            Err(e) => {
                tracing::warn!(error = %e, "admin identity check failed");
                return Self::anonymous();
            }
        };

        let is_admin = match backend.is_admin(&identity.id).await {
            Ok(flag) => flag,
            Err(e) => {
                tracing::warn!(
                    user_id = %identity.id,
                    error = %e,
                    "admin privilege check failed, assuming not admin"
                );
                false
            }
        };

        Self::signed_in(identity, is_admin)
    }
}
