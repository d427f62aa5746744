//! Error types for the realtime layer.

use edudash_protocol::ProtocolError;

/// Errors that can occur while fetching, subscribing, or inserting.
///
/// Feeds don't surface fetch errors to their consumers: they log them and
/// keep the previous items. These errors reach callers of explicit
/// operations (`post`, direct backend calls).
#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    /// The backend answered a read or write with an error.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// The change feed refused or dropped the subscription.
    #[error("subscribe failed: {0}")]
    Subscribe(String),

    /// A row or frame didn't match the expected shape.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// HTTP transport failure.
    #[cfg(feature = "hosted")]
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// WebSocket transport failure.
    #[cfg(feature = "hosted")]
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A chat operation needs a conversation but none is selected.
    #[error("no conversation selected")]
    NoConversation,

    /// A chat message with neither text nor an image.
    #[error("message is empty")]
    EmptyMessage,

    /// The feed task has stopped.
    #[error("feed closed")]
    Closed,
}
