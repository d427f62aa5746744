//! Unified error type for the edudash client.

use edudash_guard::GuardError;
use edudash_protocol::ProtocolError;
use edudash_realtime::RealtimeError;
use edudash_session::SessionError;
use edudash_summarizer::SummarizerError;

use crate::ConfigError;

/// Top-level error that wraps all crate-specific errors.
///
/// `#[from]` on each variant lets `?` convert sub-crate errors, so code
/// built on the `edudash` crate handles a single error type.
#[derive(Debug, thiserror::Error)]
pub enum EduError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Guard(#[from] GuardError),

    #[error(transparent)]
    Realtime(#[from] RealtimeError),

    #[error(transparent)]
    Summarizer(#[from] SummarizerError),

    /// The operation needs a signed-in user.
    #[error("not signed in")]
    NotSignedIn,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_session_error() {
        let err: EduError = SessionError::Backend("down".into()).into();
        assert!(matches!(err, EduError::Session(_)));
        assert!(err.to_string().contains("down"));
    }

    #[test]
    fn test_from_realtime_error() {
        let err: EduError = RealtimeError::NoConversation.into();
        assert!(matches!(err, EduError::Realtime(_)));
    }

    #[test]
    fn test_from_guard_error() {
        let err: EduError = GuardError::ProviderClosed.into();
        assert!(matches!(err, EduError::Guard(_)));
    }

    #[test]
    fn test_from_config_error() {
        let err: EduError = ConfigError::Missing("EDUDASH_ANON_KEY").into();
        assert_eq!(err.to_string(), "missing environment variable EDUDASH_ANON_KEY");
    }
}
