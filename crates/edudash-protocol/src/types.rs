//! Core record types shared by every edudash layer.
//!
//! These are the shapes that come back from the hosted backend: identities,
//! roles, routes, chat messages, leaderboard rows and change-feed events.
//! The client never mutates them in place on the server's behalf; it holds
//! read-only cached copies and replaces them when the backend says so.

// Serde derives give us JSON conversion for free. The column names used by
// the backend tables are snake_case, which matches Rust field names, so most
// structs need no renaming at all.
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use std::fmt;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for an authenticated principal.
///
/// The backend hands out UUID strings. We keep them as opaque strings in a
/// newtype so a `UserId` can never be passed where a `ConversationId` is
/// expected, even though both are `String` underneath.
///
/// `#[serde(transparent)]` serializes `UserId("abc")` as just `"abc"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Creates a `UserId` from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the raw identifier.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A unique identifier for a chat conversation.
///
/// Same newtype pattern as [`UserId`]. Conversations scope both the
/// snapshot query and the live subscription of the chat feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The authenticated principal returned by the identity backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Who this is.
    pub id: UserId,

    /// Contact address, when the backend exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: UserId::new(id),
            email: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Role
// ---------------------------------------------------------------------------

/// The role that governs which dashboard a principal may use.
///
/// Roles are stored as free-form strings in the profile table. Anything
/// that isn't one of the three known values is kept verbatim in
/// [`Role::Other`] rather than rejected, so the dashboard redirector can
/// log exactly what it received.
///
/// `#[serde(from = "String", into = "String")]` routes serialization
/// through the `From` impls below: `Role::Tutor` becomes `"tutor"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Student,
    Tutor,
    Admin,
    /// A role string the client does not recognize.
    Other(String),
}

impl Role {
    /// Returns the dashboard route for this role.
    ///
    /// This is the role → route dispatch table used both by the dashboard
    /// redirector and by route guards when a user lands on the wrong
    /// dashboard. Unrecognized roles have no route.
    pub fn dashboard(&self) -> Option<Route> {
        match self {
            Self::Student => Some(Route::Student),
            Self::Tutor => Some(Route::Tutor),
            Self::Admin => Some(Route::Admin),
            Self::Other(_) => None,
        }
    }

    /// Returns the wire form of the role.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Student => "student",
            Self::Tutor => "tutor",
            Self::Admin => "admin",
            Self::Other(raw) => raw,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl From<String> for Role {
    fn from(raw: String) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "student" => Self::Student,
            "tutor" => Self::Tutor,
            "admin" => Self::Admin,
            _ => Self::Other(raw),
        }
    }
}

impl From<&str> for Role {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Route
// ---------------------------------------------------------------------------

/// A navigable location in the web client.
///
/// The fixed routes are enumerated so guards can match on them; anything
/// else (for example a custom `redirect_to`) is carried as a raw path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum Route {
    /// `/`: the public landing page.
    Home,
    /// `/about`
    About,
    /// `/login`: also the fallback redirect target.
    #[default]
    Login,
    /// `/student`: student dashboard.
    Student,
    /// `/tutor`: tutor dashboard.
    Tutor,
    /// `/admin`: admin dashboard.
    Admin,
    /// `/dashboard`: role dispatcher.
    Dashboard,
    /// Any other path.
    Path(String),
}

impl Route {
    /// Returns the URL path for this route.
    pub fn path(&self) -> &str {
        match self {
            Self::Home => "/",
            Self::About => "/about",
            Self::Login => "/login",
            Self::Student => "/student",
            Self::Tutor => "/tutor",
            Self::Admin => "/admin",
            Self::Dashboard => "/dashboard",
            Self::Path(p) => p,
        }
    }

    /// Parses a URL path. Trailing slashes are ignored, so `/tutor/` is
    /// the tutor dashboard. Unknown paths become [`Route::Path`].
    pub fn parse(path: &str) -> Self {
        let trimmed = path.trim();
        let normalized = match trimmed.trim_end_matches('/') {
            "" => "/",
            p => p,
        };
        match normalized {
            "/" => Self::Home,
            "/about" => Self::About,
            "/login" => Self::Login,
            "/student" => Self::Student,
            "/tutor" => Self::Tutor,
            "/admin" => Self::Admin,
            "/dashboard" => Self::Dashboard,
            other => Self::Path(other.to_string()),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

// ---------------------------------------------------------------------------
// Chat messages
// ---------------------------------------------------------------------------

/// Who wrote a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One row of the `messages` table.
///
/// Messages are scoped to a conversation AND a user. The feed orders them
/// by `created_at` ascending; the backend emits RFC 3339 timestamps, which
/// sort correctly as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub conversation_id: ConversationId,
    pub user_id: UserId,
    pub role: ChatRole,
    pub content: String,
    /// Optional image attachment reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub created_at: String,
}

// ---------------------------------------------------------------------------
// Leaderboard
// ---------------------------------------------------------------------------

/// One row of the `leaderboard` table.
///
/// `rank` is server-assigned (1 = highest score) and never recomputed on
/// the client. `full_name` and `registration_id` are denormalized display
/// fields copied from the profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub id: String,
    pub user_id: UserId,
    pub score: f64,
    pub rank: u32,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub registration_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Change feed
// ---------------------------------------------------------------------------

/// The kind of row change a subscription reports.
///
/// The backend spells these in upper case (`"INSERT"`), matching the
/// Postgres trigger vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// A single notification from a change feed subscription.
///
/// Rows are kept as raw JSON (`serde_json::Value`) because the feed layer
/// is generic over tables; consumers decode them into their record type
/// with [`ChangeEvent::decode_record`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    #[serde(rename = "type")]
    pub kind: ChangeKind,

    /// The table the change happened in.
    pub table: String,

    /// The row after the change. Absent for deletes.
    #[serde(default)]
    pub record: Option<serde_json::Value>,

    /// The row before the change (updates and deletes). Depending on the
    /// table's replica identity this may only contain the primary key.
    #[serde(default)]
    pub old_record: Option<serde_json::Value>,
}

impl ChangeEvent {
    /// Builds an insert event for `record`.
    pub fn insert(table: impl Into<String>, record: serde_json::Value) -> Self {
        Self {
            kind: ChangeKind::Insert,
            table: table.into(),
            record: Some(record),
            old_record: None,
        }
    }

    /// Builds an update event.
    pub fn update(
        table: impl Into<String>,
        old_record: serde_json::Value,
        record: serde_json::Value,
    ) -> Self {
        Self {
            kind: ChangeKind::Update,
            table: table.into(),
            record: Some(record),
            old_record: Some(old_record),
        }
    }

    /// Builds a delete event.
    pub fn delete(table: impl Into<String>, old_record: serde_json::Value) -> Self {
        Self {
            kind: ChangeKind::Delete,
            table: table.into(),
            record: None,
            old_record: Some(old_record),
        }
    }

    /// Decodes the post-change row into `T`.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidMessage`] when the event carries no row,
    /// [`ProtocolError::Decode`] when the row doesn't match `T`.
    pub fn decode_record<T: DeserializeOwned>(&self) -> Result<T, ProtocolError> {
        let record = self.record.as_ref().ok_or_else(|| {
            ProtocolError::InvalidMessage(format!(
                "{} event on {} has no record",
                self.kind, self.table
            ))
        })?;
        T::deserialize(record).map_err(ProtocolError::Decode)
    }

    /// Returns the `id` column of whichever row the event carries.
    pub fn row_id(&self) -> Option<&str> {
        self.record
            .as_ref()
            .or(self.old_record.as_ref())
            .and_then(|row| row.get("id"))
            .and_then(|id| id.as_str())
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Tests for record types and their JSON shapes.
    //!
    //! The backend defines the column names; a mismatch here means rows
    //! silently fail to decode, so each shape gets pinned down.

    use super::*;
    use serde_json::json;

    // =====================================================================
    // Identity types
    // =====================================================================

    #[test]
    fn test_user_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&UserId::new("u-1")).unwrap();
        assert_eq!(json, "\"u-1\"");
    }

    #[test]
    fn test_identity_without_email_omits_field() {
        let json = serde_json::to_value(Identity::new("u-1")).unwrap();
        assert_eq!(json, json!({ "id": "u-1" }));
    }

    // =====================================================================
    // Role
    // =====================================================================

    #[test]
    fn test_role_from_known_strings() {
        assert_eq!(Role::from("student"), Role::Student);
        assert_eq!(Role::from("Tutor"), Role::Tutor);
        assert_eq!(Role::from(" admin "), Role::Admin);
    }

    #[test]
    fn test_role_unknown_string_is_preserved() {
        assert_eq!(Role::from("parent"), Role::Other("parent".into()));
        assert_eq!(Role::from("parent").dashboard(), None);
    }

    #[test]
    fn test_role_serializes_as_lowercase_string() {
        let json = serde_json::to_string(&Role::Tutor).unwrap();
        assert_eq!(json, "\"tutor\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn test_role_dashboard_table() {
        assert_eq!(Role::Student.dashboard(), Some(Route::Student));
        assert_eq!(Role::Tutor.dashboard(), Some(Route::Tutor));
        assert_eq!(Role::Admin.dashboard(), Some(Route::Admin));
    }

    // =====================================================================
    // Route
    // =====================================================================

    #[test]
    fn test_route_parse_known_paths() {
        assert_eq!(Route::parse("/"), Route::Home);
        assert_eq!(Route::parse(""), Route::Home);
        assert_eq!(Route::parse("/about"), Route::About);
        assert_eq!(Route::parse("/tutor/"), Route::Tutor);
        assert_eq!(Route::parse("/dashboard"), Route::Dashboard);
    }

    #[test]
    fn test_route_parse_unknown_path_is_kept() {
        assert_eq!(
            Route::parse("/courses/42"),
            Route::Path("/courses/42".into())
        );
    }

    #[test]
    fn test_route_display_is_path() {
        assert_eq!(Route::Login.to_string(), "/login");
        assert_eq!(Route::Path("/x".into()).to_string(), "/x");
    }

    // =====================================================================
    // Records
    // =====================================================================

    #[test]
    fn test_chat_message_decodes_backend_row() {
        let row = json!({
            "id": "m-1",
            "conversation_id": "c-1",
            "user_id": "u-1",
            "role": "assistant",
            "content": "Photosynthesis converts light into energy.",
            "image_url": null,
            "created_at": "2024-03-01T10:00:00Z"
        });
        let msg: ChatMessage = serde_json::from_value(row).unwrap();
        assert_eq!(msg.role, ChatRole::Assistant);
        assert_eq!(msg.conversation_id, ConversationId::new("c-1"));
        assert!(msg.image_url.is_none());
    }

    #[test]
    fn test_leaderboard_entry_tolerates_missing_display_fields() {
        let row = json!({ "id": "l-1", "user_id": "u-1", "score": 88.5, "rank": 1 });
        let entry: LeaderboardEntry = serde_json::from_value(row).unwrap();
        assert_eq!(entry.rank, 1);
        assert!(entry.full_name.is_none());
    }

    // =====================================================================
    // ChangeEvent
    // =====================================================================

    #[test]
    fn test_change_event_kind_is_uppercase_on_wire() {
        let event = ChangeEvent::insert("messages", json!({ "id": "m-1" }));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "INSERT");
        assert_eq!(json["table"], "messages");
    }

    #[test]
    fn test_change_event_decode_record_without_row_fails() {
        let event = ChangeEvent::delete("messages", json!({ "id": "m-1" }));
        let result = event.decode_record::<ChatMessage>();
        assert!(matches!(result, Err(ProtocolError::InvalidMessage(_))));
    }

    #[test]
    fn test_change_event_row_id_falls_back_to_old_record() {
        let event = ChangeEvent::delete("messages", json!({ "id": "m-9" }));
        assert_eq!(event.row_id(), Some("m-9"));
    }
}
