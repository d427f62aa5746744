//! Guard states, render output, and the navigation latch.

use edudash_protocol::Route;
use edudash_session::{AdminSnapshot, SessionSnapshot};

// ---------------------------------------------------------------------------
// GuardState
// ---------------------------------------------------------------------------

/// Where a guard is in its decision.
///
/// - **Pending**: at least one provider it depends on is still loading.
///   The guard renders a loading placeholder and never its children.
/// - **Unauthorized**: resolved, access denied. Renders nothing; the
///   accompanying navigation does the redirect.
/// - **Authorized**: resolved, access granted. Renders children unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GuardState {
    #[default]
    Pending,
    Unauthorized,
    Authorized,
}

impl GuardState {
    /// Produces the view for this state.
    ///
    /// `children` is only called when authorized, so protected content
    /// is never even built while the decision is pending or negative.
    pub fn render<T>(self, children: impl FnOnce() -> T) -> GuardView<T> {
        match self {
            Self::Pending => GuardView::Loading,
            Self::Unauthorized => GuardView::Nothing,
            Self::Authorized => GuardView::Children(children()),
        }
    }

    pub fn is_settled(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for GuardState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "Pending"),
            Self::Unauthorized => write!(f, "Unauthorized"),
            Self::Authorized => write!(f, "Authorized"),
        }
    }
}

/// What a guard renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardView<T> {
    /// Loading placeholder.
    Loading,
    /// Render nothing at all.
    Nothing,
    /// The protected content.
    Children(T),
}

// ---------------------------------------------------------------------------
// Decision / Transition
// ---------------------------------------------------------------------------

/// The pure result of evaluating a guard against two snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub state: GuardState,
    /// Where the user should be sent, if anywhere.
    pub redirect: Option<Route>,
}

impl Decision {
    pub fn pending() -> Self {
        Self {
            state: GuardState::Pending,
            redirect: None,
        }
    }

    pub fn authorized() -> Self {
        Self {
            state: GuardState::Authorized,
            redirect: None,
        }
    }

    pub fn redirect(route: Route) -> Self {
        Self {
            state: GuardState::Unauthorized,
            redirect: Some(route),
        }
    }

    /// Denied without navigating anywhere.
    pub fn stay() -> Self {
        Self {
            state: GuardState::Unauthorized,
            redirect: None,
        }
    }
}

/// The output of one stateful guard step.
///
/// `navigate` is `Some` only when the decision changed since the last
/// step, so feeding the same snapshots twice never produces a second
/// navigation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub state: GuardState,
    pub navigate: Option<Route>,
}

// ---------------------------------------------------------------------------
// Guard trait
// ---------------------------------------------------------------------------

/// A state machine that turns snapshots into a [`Transition`].
///
/// Implemented by every guard in this crate so the driver can run any of
/// them. `Send + 'static` because guards are moved into driver tasks.
pub trait Guard: Send + 'static {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// One step: evaluate, then emit navigation only on change.
    fn observe(&mut self, session: &SessionSnapshot, admin: &AdminSnapshot) -> Transition;
}

// ---------------------------------------------------------------------------
// NavigationLatch
// ---------------------------------------------------------------------------

/// Remembers the last redirect a guard emitted.
///
/// This is what makes navigation idempotent: the same decision observed
/// again produces no output. The latch resets when the guard authorizes
/// or settles without a redirect, so a later denial navigates again.
#[derive(Debug, Default)]
pub(crate) struct NavigationLatch {
    last: Option<Route>,
}

impl NavigationLatch {
    pub(crate) fn step(&mut self, decision: Decision) -> Transition {
        let navigate = match (&decision.state, decision.redirect) {
            // Pending never navigates and never clears the latch: the
            // loading window must not cause a repeat on resolution.
            (GuardState::Pending, _) => None,
            (_, Some(route)) => {
                if self.last.as_ref() == Some(&route) {
                    None
                } else {
                    self.last = Some(route.clone());
                    Some(route)
                }
            }
            (_, None) => {
                self.last = None;
                None
            }
        };

        Transition {
            state: decision.state,
            navigate,
        }
    }
}
