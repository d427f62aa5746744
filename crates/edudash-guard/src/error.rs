//! Error types for the guard layer.

/// Errors that can occur while running a guard.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    /// A session provider stopped while the guard was still watching it.
    #[error("session provider closed")]
    ProviderClosed,
}
