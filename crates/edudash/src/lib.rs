//! # edudash
//!
//! Client core for an education platform with student, tutor and admin
//! dashboards.
//!
//! The crate wires the layers underneath it into one [`App`]:
//!
//! ```text
//! App (this crate)      ← routes, visits, feed and summarizer access
//!     ↕
//! Guard                 ← who may see which page
//!     ↕
//! Session               ← who is signed in, with which role
//!     ↕
//! Realtime / Summarizer ← live tables, document processing
//!     ↕
//! Protocol              ← shared records and codec
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edudash::prelude::*;
//!
//! // Implement IdentityBackend for your auth service, then:
//! // let app = AppBuilder::new()
//! //     .config(ClientConfig::from_env()?)
//! //     .build(my_identity, MemoryTables::new());
//! // let page = app.visit(Route::Dashboard).await?;
//! ```

mod app;
mod config;
mod error;
mod routes;
pub mod telemetry;

pub use app::{App, AppBuilder, Page};
pub use config::{ClientConfig, ConfigError};
pub use error::EduError;
pub use routes::{RouteKind, RouteTable};

pub mod prelude {
    pub use crate::{App, AppBuilder, ClientConfig, ConfigError, EduError, Page, RouteKind, RouteTable};

    pub use edudash_guard::{
        AdminLayout, DashboardRedirector, GuardState, GuardView, History, Navigator,
        ProtectedRoute, Requirement,
    };
    pub use edudash_protocol::{
        ChangeEvent, ChangeKind, ChatMessage, ChatRole, ConversationId, Identity,
        LeaderboardEntry, Role, Route, UserId,
    };
    pub use edudash_realtime::{
        ChatMessagesFeed, FeedConfig, FeedState, HostedConfig, HostedTables, LeaderboardFeed,
        MemoryTables, Query, RealtimeError, SubscriptionSpec, TableBackend,
    };
    pub use edudash_session::{
        AdminSessionProvider, AdminSnapshot, AuthEvent, IdentityBackend, SessionError,
        SessionProvider, SessionSnapshot,
    };
    pub use edudash_summarizer::{DocumentSummary, ProcessResponse, SummarizerClient, Upload};
}
