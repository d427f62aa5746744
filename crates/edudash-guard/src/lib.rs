//! Route guards for edudash.
//!
//! Guards turn session snapshots into two outputs: what to render and
//! where (if anywhere) to navigate. Each guard is an explicit state
//! machine so its transitions can be tested without a UI:
//!
//! ```text
//!   Pending ──(providers resolved)──→ Unauthorized ──→ navigate(route)
//!                                 └──→ Authorized   ──→ render children
//! ```
//!
//! # Key types
//!
//! - [`ProtectedRoute`]: role-gated page; wrong role goes to its own dashboard
//! - [`AdminLayout`]: admin-only section; anything else goes to `/login`
//! - [`DashboardRedirector`]: `/dashboard` → the role's dashboard
//! - [`Navigator`] / [`History`]: where navigations are sent
//! - [`spawn_guard`] / [`GuardHandle`]: run a guard against live providers

mod admin;
mod dashboard;
mod driver;
mod error;
mod navigator;
mod protected;
mod state;

pub use admin::AdminLayout;
pub use dashboard::{DashboardRedirector, Dispatch};
pub use driver::{GuardHandle, spawn_guard};
pub use error::GuardError;
pub use navigator::{History, Navigator};
pub use protected::{ProtectedRoute, Requirement};
pub use state::{Decision, Guard, GuardState, GuardView, Transition};
