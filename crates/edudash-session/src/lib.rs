//! Session providers for edudash.
//!
//! This crate answers one question for the rest of the client: "who is
//! signed in, and what may they do?" It does so with two independent
//! providers:
//!
//! 1. **[`SessionProvider`]**: identity + role + loading flag.
//! 2. **[`AdminSessionProvider`]**: identity + admin privilege + loading
//!    flag, checked separately with its own lifecycle.
//!
//! Both run as small Tokio actors and publish snapshots through a
//! `watch` channel. Consumers must treat `loading == true` as "unknown",
//! never as "signed out".
//!
//! # How it fits in the stack
//!
//! ```text
//! Guard Layer (above)    ← observes snapshots, decides navigation
//!     ↕
//! Session Layer (this crate)
//!     ↕
//! IdentityBackend        ← hosted auth service (or a test double)
//! ```

mod backend;
mod error;
mod provider;
mod session;

pub use backend::{AuthEvent, IdentityBackend};
pub use error::SessionError;
pub use provider::{AdminSessionProvider, Provider, SessionProvider};
pub use session::{AdminSnapshot, ProviderState, SessionSnapshot, SessionStatus};
