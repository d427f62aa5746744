//! Shared records for edudash.
//!
//! This crate defines the data every other layer speaks in:
//!
//! - **Identifiers** ([`UserId`], [`ConversationId`]) and the
//!   authenticated principal ([`Identity`]).
//! - **Authorization vocabulary** ([`Role`], [`Route`]): which dashboard a
//!   principal belongs on.
//! - **Records** ([`ChatMessage`], [`LeaderboardEntry`]) mirrored from the
//!   backend tables.
//! - **Change feed events** ([`ChangeEvent`]) pushed by live subscriptions.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) for frames and rows.
//!
//! ```text
//! Session / Guard / Realtime (above)  ← consume these types
//!     ↕
//! Protocol (this crate)               ← shapes + serialization
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ChangeEvent, ChangeKind, ChatMessage, ChatRole, ConversationId, Identity,
    LeaderboardEntry, Role, Route, UserId,
};
