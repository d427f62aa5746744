//! Error types for the session layer.

/// Errors that can occur while resolving or changing the session.
///
/// Identity-check failures are never surfaced to guards: the providers
/// log them and publish "no identity" instead. These errors only reach
/// callers of explicit actions like [`sign_out`](crate::SessionProvider::sign_out).
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The identity backend failed or returned something unusable.
    #[error("identity backend error: {0}")]
    Backend(String),

    /// The provider task has stopped; no further commands are accepted.
    #[error("session provider closed")]
    Closed,
}
