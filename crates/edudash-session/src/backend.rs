//! Identity backend hook.
//!
//! edudash doesn't implement authentication. The hosted auth service owns
//! credentials, tokens and profiles; the client only asks it three things:
//! who is signed in, what is their role, and are they an admin.
//!
//! [`IdentityBackend`] captures exactly those questions. The providers
//! call it; production wires in the hosted service, tests wire in a
//! scripted double.

use std::future::Future;
use std::sync::Arc;

use edudash_protocol::{Identity, Role, UserId};

use crate::SessionError;

/// Answers identity and privilege questions for the providers.
///
/// # Trait bounds
///
/// - `Send + Sync` so the backend can be shared between the session
///   provider task and the admin provider task.
/// - `'static` because it lives as long as the providers do.
///
/// The returned futures must be `Send` so the providers can run on any
/// Tokio worker thread.
///
/// # Example
///
/// ```rust
/// use edudash_protocol::{Identity, Role, UserId};
/// use edudash_session::{IdentityBackend, SessionError};
///
/// /// Everyone is the same signed-in student. Demo only.
/// struct AlwaysStudent;
///
/// impl IdentityBackend for AlwaysStudent {
///     async fn current_identity(&self) -> Result<Option<Identity>, SessionError> {
///         Ok(Some(Identity::new("demo-student")))
///     }
///
///     async fn fetch_role(&self, _user: &UserId) -> Result<Option<Role>, SessionError> {
///         Ok(Some(Role::Student))
///     }
///
///     async fn is_admin(&self, _user: &UserId) -> Result<bool, SessionError> {
///         Ok(false)
///     }
///
///     async fn sign_out(&self) -> Result<(), SessionError> {
///         Ok(())
///     }
/// }
/// ```
pub trait IdentityBackend: Send + Sync + 'static {
    /// Returns the currently signed-in principal, or `None`.
    fn current_identity(
        &self,
    ) -> impl Future<Output = Result<Option<Identity>, SessionError>> + Send;

    /// Looks up the role stored for `user`. `None` means the profile has
    /// no role set.
    fn fetch_role(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Option<Role>, SessionError>> + Send;

    /// The separate privilege check used by the admin session.
    fn is_admin(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<bool, SessionError>> + Send;

    /// Ends the session on the backend.
    fn sign_out(&self) -> impl Future<Output = Result<(), SessionError>> + Send;
}

/// Lets an `Arc<B>` be used wherever a backend is expected, so the same
/// backend can feed both providers.
impl<B: IdentityBackend> IdentityBackend for Arc<B> {
    fn current_identity(
        &self,
    ) -> impl Future<Output = Result<Option<Identity>, SessionError>> + Send {
        (**self).current_identity()
    }

    fn fetch_role(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<Option<Role>, SessionError>> + Send {
        (**self).fetch_role(user)
    }

    fn is_admin(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<bool, SessionError>> + Send {
        (**self).is_admin(user)
    }

    fn sign_out(&self) -> impl Future<Output = Result<(), SessionError>> + Send {
        (**self).sign_out()
    }
}

/// An auth state change reported by the hosted auth service.
///
/// Every event except `SignedOut` makes the providers re-run their
/// identity check. `SignedOut` clears the snapshot without asking the
/// backend anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
    UserUpdated,
}

impl AuthEvent {
    /// Parses the event names used by the hosted auth service
    /// (`SIGNED_IN`, `SIGNED_OUT`, ...). Unknown names yield `None`.
    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "SIGNED_IN" | "INITIAL_SESSION" => Some(Self::SignedIn),
            "SIGNED_OUT" => Some(Self::SignedOut),
            "TOKEN_REFRESHED" => Some(Self::TokenRefreshed),
            "USER_UPDATED" => Some(Self::UserUpdated),
            _ => None,
        }
    }
}
