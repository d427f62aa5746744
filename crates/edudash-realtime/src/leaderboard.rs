//! `LeaderboardFeed`: the top of the leaderboard, re-read on every change.
//!
//! The leaderboard is small and ranks are assigned server-side, so the
//! feed never patches rows locally. Any change event on the table
//! triggers a full re-fetch.
//!
//! Re-fetches can overlap. Each one is numbered; a result is applied only
//! if it is newer than the last applied one, so a slow early fetch can't
//! overwrite a fast later one.

use std::collections::HashSet;
use std::sync::Arc;

use edudash_protocol::{Codec, JsonCodec, LeaderboardEntry};
use serde_json::Value;
use tokio::sync::{mpsc, watch};

use crate::backend::next_event;
use crate::{
    FeedConfig, FeedState, Query, RealtimeError, Subscription, SubscriptionSpec, TableBackend,
};

enum LeaderboardCommand {
    Refresh,
    Shutdown,
}

struct FetchResult {
    seq: u64,
    rows: Result<Vec<Value>, RealtimeError>,
}

/// Handle to a running leaderboard feed.
#[derive(Clone)]
pub struct LeaderboardFeed {
    commands: mpsc::Sender<LeaderboardCommand>,
    state: watch::Receiver<FeedState<LeaderboardEntry>>,
}

impl LeaderboardFeed {
    /// Spawns the feed: subscribe to the table, then fetch the first page.
    pub fn spawn<B: TableBackend>(backend: B, config: FeedConfig) -> Self {
        let (state_tx, state_rx) = watch::channel(FeedState::loading(None));
        let (cmd_tx, cmd_rx) = mpsc::channel(config.command_channel_size);
        let (results_tx, results_rx) = mpsc::channel(config.command_channel_size);

        let actor = LeaderboardActor {
            backend: Arc::new(backend),
            config,
            codec: JsonCodec,
            state: state_tx,
            commands: cmd_rx,
            results_tx,
            results: results_rx,
            issued: 0,
            applied: 0,
            subscription: None,
        };
        tokio::spawn(actor.run());

        Self {
            commands: cmd_tx,
            state: state_rx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<FeedState<LeaderboardEntry>> {
        self.state.clone()
    }

    pub fn state(&self) -> FeedState<LeaderboardEntry> {
        self.state.borrow().clone()
    }

    /// Waits for the first fetch to finish.
    pub async fn ready(&self) -> Result<FeedState<LeaderboardEntry>, RealtimeError> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(|s| !s.loading)
            .await
            .map_err(|_| RealtimeError::Closed)?;
        Ok(state.clone())
    }

    /// Re-reads the leaderboard without waiting for a change event.
    pub async fn refresh(&self) -> Result<(), RealtimeError> {
        self.commands
            .send(LeaderboardCommand::Refresh)
            .await
            .map_err(|_| RealtimeError::Closed)
    }

    pub async fn shutdown(&self) -> Result<(), RealtimeError> {
        self.commands
            .send(LeaderboardCommand::Shutdown)
            .await
            .map_err(|_| RealtimeError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// Keeps the best-ranked row per user, in rank order.
fn dedupe_by_user(mut entries: Vec<LeaderboardEntry>) -> Vec<LeaderboardEntry> {
    entries.sort_by_key(|e| e.rank);
    let mut seen = HashSet::new();
    entries.retain(|e| seen.insert(e.user_id.clone()));
    entries
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct LeaderboardActor<B: TableBackend> {
    backend: Arc<B>,
    config: FeedConfig,
    codec: JsonCodec,
    state: watch::Sender<FeedState<LeaderboardEntry>>,
    commands: mpsc::Receiver<LeaderboardCommand>,
    results_tx: mpsc::Sender<FetchResult>,
    results: mpsc::Receiver<FetchResult>,
    /// Sequence number of the last fetch started.
    issued: u64,
    /// Sequence number of the last fetch applied.
    applied: u64,
    subscription: Option<Subscription>,
}

impl<B: TableBackend> LeaderboardActor<B> {
    async fn run(mut self) {
        let spec = SubscriptionSpec::table(&self.config.leaderboard_table);
        match self.backend.subscribe(spec).await {
            Ok(sub) => self.subscription = Some(sub),
            Err(e) => tracing::warn!(error = %e, "leaderboard subscription failed"),
        }
        self.fetch();

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(LeaderboardCommand::Refresh) => self.fetch(),
                    Some(LeaderboardCommand::Shutdown) | None => break,
                },
                Some(result) = self.results.recv() => self.apply(result),
                event = next_event(&mut self.subscription) => match event {
                    Some(event) => {
                        tracing::debug!(kind = %event.kind, "leaderboard changed, refetching");
                        self.fetch();
                    }
                    None => {
                        tracing::warn!("leaderboard change feed ended");
                        self.subscription = None;
                    }
                },
            }
        }

        tracing::debug!("leaderboard feed stopped");
    }

    fn fetch(&mut self) {
        self.issued += 1;
        let seq = self.issued;
        let query = Query::table(&self.config.leaderboard_table)
            .order_asc("rank")
            .limit(self.config.leaderboard_page_size);
        let backend = Arc::clone(&self.backend);
        let results = self.results_tx.clone();
        tokio::spawn(async move {
            let rows = backend.fetch(&query).await;
            let _ = results.send(FetchResult { seq, rows }).await;
        });
    }

    fn apply(&mut self, result: FetchResult) {
        if result.seq <= self.applied {
            tracing::debug!(seq = result.seq, applied = self.applied, "discarding stale leaderboard");
            return;
        }
        self.applied = result.seq;

        let decoded = result
            .rows
            .and_then(|rows| self.codec.decode_rows::<LeaderboardEntry>(rows).map_err(RealtimeError::from));

        self.state.send_if_modified(|state| {
            let was_loading = std::mem::replace(&mut state.loading, false);
            match decoded {
                Ok(entries) => {
                    let entries = dedupe_by_user(entries);
                    if entries == state.items {
                        return was_loading;
                    }
                    state.items = entries;
                    true
                }
                Err(e) => {
                    tracing::warn!(error = %e, "leaderboard fetch failed");
                    was_loading
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edudash_protocol::UserId;

    fn entry(id: &str, user: &str, rank: u32) -> LeaderboardEntry {
        LeaderboardEntry {
            id: id.into(),
            user_id: UserId::new(user),
            score: 100.0 - f64::from(rank),
            rank,
            full_name: None,
            registration_id: None,
        }
    }

    #[test]
    fn test_dedupe_by_user_keeps_best_rank() {
        let out = dedupe_by_user(vec![
            entry("a", "u-1", 3),
            entry("b", "u-2", 2),
            entry("c", "u-1", 1),
        ]);

        let ids: Vec<_> = out.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b"]);
    }
}
