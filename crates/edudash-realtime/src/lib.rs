//! Live data feeds for edudash.
//!
//! Every feed follows the same pattern: fetch a snapshot, then keep it
//! current from a change subscription scoped to the same key.
//!
//! ```text
//!  key change ──→ release old subscription
//!             ──→ fetch snapshot (tagged with a generation)
//!             ──→ subscribe (same scope)
//!                      │
//!       change events ─┴─→ merge into local state ──→ watch channel
//! ```
//!
//! # Key types
//!
//! - [`TableBackend`]: the tabular query + change feed service
//! - [`Query`] / [`SubscriptionSpec`]: what to read, what to watch
//! - [`Subscription`]: a live change stream, released on drop
//! - [`MemoryTables`]: in-process backend for demos and tests
//! - `HostedTables`: REST reads and a WebSocket change feed (feature `hosted`)
//! - [`ChatMessagesFeed`] / [`LeaderboardFeed`]: the two feeds

mod backend;
mod chat;
mod config;
mod error;
mod feed;
#[cfg(feature = "hosted")]
mod hosted;
mod leaderboard;
mod memory;
mod query;
#[cfg(feature = "hosted")]
mod socket;

pub use backend::{Subscription, TableBackend};
pub use chat::ChatMessagesFeed;
pub use config::FeedConfig;
pub use error::RealtimeError;
pub use feed::FeedState;
#[cfg(feature = "hosted")]
pub use hosted::{HostedConfig, HostedTables};
pub use leaderboard::LeaderboardFeed;
pub use memory::MemoryTables;
pub use query::{Filter, Order, Query, SubscriptionSpec};
