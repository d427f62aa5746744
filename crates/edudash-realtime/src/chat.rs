//! `ChatMessagesFeed`: the messages of one conversation, kept live.
//!
//! The feed is an actor. It owns the message list and the change
//! subscription, and publishes a [`FeedState`] through a `watch` channel.
//!
//! ## Key changes
//!
//! Selecting a conversation bumps a generation counter, drops the old
//! subscription (which releases it on the backend), opens a new one, and
//! spawns the snapshot fetch. The fetch runs on its own task so the actor
//! keeps serving commands; when it completes, its result is applied only
//! if its generation is still current.
//!
//! ```text
//! set_conversation(c) ──→ gen += 1, drop old subscription
//!                     ──→ subscribe(messages, conversation_id = c)
//!                     ──→ spawn fetch(gen)
//!
//! change event ──→ snapshot pending? ──yes──→ backlog
//!                                    ──no───→ merge
//! fetch(gen) done ──→ gen current? ──yes──→ replace items, replay backlog
//!                                  ──no───→ discard
//! ```
//!
//! ## Isolation
//!
//! The subscription is filtered by conversation, but the feed checks the
//! owner of every inserted row again: a message from another user never
//! enters the list.

use std::sync::Arc;

use edudash_protocol::{
    ChangeEvent, ChangeKind, ChatMessage, ChatRole, Codec, ConversationId, JsonCodec,
    ProtocolError, UserId,
};
use serde_json::{Value, json};
use tokio::sync::{mpsc, oneshot, watch};

use crate::backend::next_event;
use crate::{
    FeedConfig, FeedState, Filter, Query, RealtimeError, Subscription, SubscriptionSpec, TableBackend,
};

/// Commands accepted by the chat actor.
enum ChatCommand {
    /// Replies once the new key is visible in the published state.
    SetConversation {
        conversation: Option<ConversationId>,
        reply: oneshot::Sender<()>,
    },
    Post {
        content: String,
        image_url: Option<String>,
        reply: oneshot::Sender<Result<ChatMessage, RealtimeError>>,
    },
    Shutdown,
}

/// A finished snapshot fetch, tagged with the generation it was issued for.
struct Snapshot {
    generation: u64,
    rows: Result<Vec<Value>, RealtimeError>,
}

/// Handle to a running chat feed.
#[derive(Clone)]
pub struct ChatMessagesFeed {
    commands: mpsc::Sender<ChatCommand>,
    state: watch::Receiver<FeedState<ChatMessage>>,
}

impl ChatMessagesFeed {
    /// Spawns the feed for `user`, starting on `conversation` if given.
    pub fn spawn<B: TableBackend>(backend: B, user: UserId, conversation: Option<ConversationId>) -> Self {
        Self::spawn_with_config(backend, user, conversation, FeedConfig::default())
    }

    pub fn spawn_with_config<B: TableBackend>(
        backend: B,
        user: UserId,
        conversation: Option<ConversationId>,
        config: FeedConfig,
    ) -> Self {
        let initial = match &conversation {
            Some(c) => FeedState::loading(Some(c.to_string())),
            None => FeedState::idle(),
        };
        let (state_tx, state_rx) = watch::channel(initial);
        let (cmd_tx, cmd_rx) = mpsc::channel(config.command_channel_size);
        let (snap_tx, snap_rx) = mpsc::channel(config.command_channel_size);

        let actor = ChatActor {
            backend: Arc::new(backend),
            user,
            config,
            codec: JsonCodec,
            state: state_tx,
            commands: cmd_rx,
            snapshots_tx: snap_tx,
            snapshots: snap_rx,
            conversation: None,
            generation: 0,
            snapshot_pending: false,
            backlog: Vec::new(),
            subscription: None,
        };
        tokio::spawn(actor.run(conversation));

        Self {
            commands: cmd_tx,
            state: state_rx,
        }
    }

    /// Returns a receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<FeedState<ChatMessage>> {
        self.state.clone()
    }

    /// Returns the current state.
    pub fn state(&self) -> FeedState<ChatMessage> {
        self.state.borrow().clone()
    }

    /// Waits until the snapshot for the current conversation has landed
    /// (or failed) and returns the state at that point.
    pub async fn ready(&self) -> Result<FeedState<ChatMessage>, RealtimeError> {
        let mut rx = self.state.clone();
        let state = rx
            .wait_for(|s| !s.loading)
            .await
            .map_err(|_| RealtimeError::Closed)?;
        Ok(state.clone())
    }

    /// Switches to another conversation, or to none.
    ///
    /// Returns once the state carries the new key, so a following
    /// [`ready`](Self::ready) waits for the new conversation's snapshot.
    pub async fn set_conversation(&self, conversation: Option<ConversationId>) -> Result<(), RealtimeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(ChatCommand::SetConversation {
                conversation,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RealtimeError::Closed)?;
        reply_rx.await.map_err(|_| RealtimeError::Closed)
    }

    /// Posts a user message to the current conversation and returns the
    /// stored row.
    ///
    /// # Errors
    /// - [`RealtimeError::NoConversation`] if no conversation is selected
    /// - [`RealtimeError::EmptyMessage`] if there is neither text nor image
    /// - whatever the backend insert returns
    pub async fn post(&self, content: impl Into<String>, image_url: Option<String>) -> Result<ChatMessage, RealtimeError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(ChatCommand::Post {
                content: content.into(),
                image_url,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RealtimeError::Closed)?;
        reply_rx.await.map_err(|_| RealtimeError::Closed)?
    }

    /// Stops the feed and releases its subscription.
    pub async fn shutdown(&self) -> Result<(), RealtimeError> {
        self.commands
            .send(ChatCommand::Shutdown)
            .await
            .map_err(|_| RealtimeError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

// ---------------------------------------------------------------------------
// Actor
// ---------------------------------------------------------------------------

struct ChatActor<B: TableBackend> {
    backend: Arc<B>,
    user: UserId,
    config: FeedConfig,
    codec: JsonCodec,
    state: watch::Sender<FeedState<ChatMessage>>,
    commands: mpsc::Receiver<ChatCommand>,
    snapshots_tx: mpsc::Sender<Snapshot>,
    snapshots: mpsc::Receiver<Snapshot>,
    conversation: Option<ConversationId>,
    generation: u64,
    /// `true` between a key change and the matching snapshot.
    snapshot_pending: bool,
    /// Change events that arrived while the snapshot was in flight.
    backlog: Vec<ChangeEvent>,
    subscription: Option<Subscription>,
}

impl<B: TableBackend> ChatActor<B> {
    async fn run(mut self, initial: Option<ConversationId>) {
        tracing::debug!(user_id = %self.user, "chat feed started");
        self.select_conversation(initial).await;

        loop {
            tokio::select! {
                cmd = self.commands.recv() => match cmd {
                    Some(ChatCommand::SetConversation { conversation, reply }) => {
                        self.select_conversation(conversation).await;
                        let _ = reply.send(());
                    }
                    Some(ChatCommand::Post { content, image_url, reply }) => {
                        let result = self.post(content, image_url).await;
                        let _ = reply.send(result);
                    }
                    Some(ChatCommand::Shutdown) | None => break,
                },
                Some(snapshot) = self.snapshots.recv() => self.apply_snapshot(snapshot),
                event = next_event(&mut self.subscription) => match event {
                    Some(event) => self.on_event(event),
                    None => {
                        tracing::warn!(user_id = %self.user, "chat change feed ended");
                        self.subscription = None;
                    }
                },
            }
        }

        tracing::debug!(user_id = %self.user, "chat feed stopped");
    }

    async fn select_conversation(&mut self, conversation: Option<ConversationId>) {
        self.generation += 1;
        // Dropping the subscription releases it.
        self.subscription = None;
        self.backlog.clear();
        self.conversation = conversation.clone();

        let Some(conversation) = conversation else {
            self.snapshot_pending = false;
            self.state.send_replace(FeedState::idle());
            return;
        };

        tracing::info!(
            user_id = %self.user,
            conversation_id = %conversation,
            generation = self.generation,
            "loading conversation"
        );
        self.snapshot_pending = true;
        self.state
            .send_replace(FeedState::loading(Some(conversation.to_string())));

        let spec = SubscriptionSpec::table(&self.config.messages_table)
            .filter(Filter::eq("conversation_id", conversation.as_str()));
        match self.backend.subscribe(spec).await {
            Ok(sub) => self.subscription = Some(sub),
            Err(e) => {
                tracing::warn!(conversation_id = %conversation, error = %e, "chat subscription failed");
            }
        }

        let query = Query::table(&self.config.messages_table)
            .eq("conversation_id", conversation.as_str())
            .eq("user_id", self.user.as_str())
            .order_asc("created_at");
        let backend = Arc::clone(&self.backend);
        let results = self.snapshots_tx.clone();
        let generation = self.generation;
        tokio::spawn(async move {
            let rows = backend.fetch(&query).await;
            let _ = results.send(Snapshot { generation, rows }).await;
        });
    }

    fn apply_snapshot(&mut self, snapshot: Snapshot) {
        if snapshot.generation != self.generation {
            tracing::debug!(
                stale = snapshot.generation,
                current = self.generation,
                "discarding stale chat snapshot"
            );
            return;
        }
        self.snapshot_pending = false;

        let decoded = snapshot
            .rows
            .and_then(|rows| self.codec.decode_rows::<ChatMessage>(rows).map_err(RealtimeError::from));
        let backlog = std::mem::take(&mut self.backlog);

        self.state.send_modify(|state| {
            match decoded {
                Ok(messages) => state.items = messages,
                Err(e) => {
                    tracing::warn!(user_id = %self.user, error = %e, "chat snapshot failed");
                }
            }
            state.loading = false;
        });

        for event in backlog {
            self.on_event(event);
        }
    }

    fn on_event(&mut self, event: ChangeEvent) {
        if self.snapshot_pending {
            self.backlog.push(event);
            return;
        }
        let Some(conversation) = &self.conversation else {
            return;
        };

        match event.kind {
            ChangeKind::Insert | ChangeKind::Update => {
                let message: ChatMessage = match event.decode_record() {
                    Ok(m) => m,
                    Err(e) => {
                        tracing::warn!(error = %e, "undecodable chat row");
                        return;
                    }
                };
                if message.user_id != self.user || message.conversation_id != *conversation {
                    tracing::debug!(message_id = %message.id, "ignoring message outside this feed");
                    return;
                }
                let is_insert = event.kind == ChangeKind::Insert;
                self.state.send_if_modified(|state| {
                    match state.items.iter().position(|m| m.id == message.id) {
                        Some(_) if is_insert => false,
                        Some(index) => {
                            state.items[index] = message;
                            true
                        }
                        None if is_insert => {
                            state.items.push(message);
                            true
                        }
                        None => false,
                    }
                });
            }
            ChangeKind::Delete => {
                let Some(id) = event.row_id() else {
                    return;
                };
                self.state.send_if_modified(|state| {
                    let before = state.items.len();
                    state.items.retain(|m| m.id != id);
                    state.items.len() != before
                });
            }
        }
    }

    async fn post(&mut self, content: String, image_url: Option<String>) -> Result<ChatMessage, RealtimeError> {
        let conversation = self.conversation.clone().ok_or(RealtimeError::NoConversation)?;
        if content.trim().is_empty() && image_url.is_none() {
            return Err(RealtimeError::EmptyMessage);
        }

        let mut row = json!({
            "conversation_id": conversation,
            "user_id": self.user,
            "role": ChatRole::User,
            "content": content,
        });
        if let Some(url) = image_url {
            row["image_url"] = Value::String(url);
        }

        let stored = self.backend.insert(&self.config.messages_table, row).await?;
        let message: ChatMessage =
            serde_json::from_value(stored.clone()).map_err(ProtocolError::Decode)?;
        tracing::info!(message_id = %message.id, conversation_id = %conversation, "message posted");

        // The change feed will deliver the same row; the id check drops it.
        self.on_event(ChangeEvent::insert(&self.config.messages_table, stored));
        Ok(message)
    }
}
