//! A classroom in one process: a tutor and two students against
//! in-memory tables.
//!
//! ```text
//! RUST_LOG=edudash=debug,info cargo run -p classroom
//! ```

use std::time::Duration;

use edudash::prelude::*;
use edudash::telemetry;
use serde_json::json;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// One signed-in user with a fixed role.
struct Seat {
    id: &'static str,
    role: Role,
}

impl IdentityBackend for Seat {
    async fn current_identity(&self) -> Result<Option<Identity>, SessionError> {
        Ok(Some(Identity::new(self.id)))
    }

    async fn fetch_role(&self, _user: &UserId) -> Result<Option<Role>, SessionError> {
        Ok(Some(self.role.clone()))
    }

    async fn is_admin(&self, _user: &UserId) -> Result<bool, SessionError> {
        Ok(self.role.is_admin())
    }

    async fn sign_out(&self) -> Result<(), SessionError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), EduError> {
    telemetry::init();

    let tables = MemoryTables::new();
    tables.seed(
        "leaderboard",
        vec![
            json!({ "id": "lb-1", "user_id": "ana", "score": 920.0, "rank": 1, "full_name": "Ana" }),
            json!({ "id": "lb-2", "user_id": "ben", "score": 870.5, "rank": 2, "full_name": "Ben" }),
        ],
    );

    let ana = AppBuilder::new().build(Seat { id: "ana", role: Role::Student }, tables.clone());
    let tutor = AppBuilder::new().build(Seat { id: "tess", role: Role::Tutor }, tables.clone());

    // Guards
    for route in [Route::Dashboard, Route::Tutor, Route::Admin] {
        let page = ana.visit(route.clone()).await?;
        tracing::info!(%route, ?page, "ana visited");
    }
    let page = tutor.visit(Route::Student).await?;
    tracing::info!(?page, history = ?tutor.history().entries(), "tutor visited /student");

    // Chat
    let chat = ana.chat(Some(ConversationId::new("algebra"))).await?;
    chat.ready().await?;
    chat.post("How do I factor x^2 - 9?", None).await?;
    tables.insert_row(
        "messages",
        json!({
            "conversation_id": "algebra",
            "user_id": "ana",
            "role": "assistant",
            "content": "Difference of squares: (x - 3)(x + 3).",
        }),
    );
    let mut messages = chat.subscribe();
    let _ = tokio::time::timeout(Duration::from_secs(1), messages.wait_for(|s| s.len() == 2)).await;
    for message in chat.state().items {
        tracing::info!(role = ?message.role, content = %message.content, "chat");
    }

    // Leaderboard
    let board = ana.leaderboard();
    board.ready().await?;
    tables.insert_row(
        "leaderboard",
        json!({ "user_id": "cora", "score": 990.0, "rank": 1, "full_name": "Cora" }),
    );
    let mut ranks = board.subscribe();
    let _ = tokio::time::timeout(Duration::from_secs(1), ranks.wait_for(|s| s.len() == 3)).await;
    for entry in board.state().items {
        tracing::info!(rank = entry.rank, user_id = %entry.user_id, score = entry.score, "leaderboard");
    }

    chat.shutdown().await?;
    board.shutdown().await?;
    ana.shutdown().await?;
    tutor.shutdown().await?;
    Ok(())
}
