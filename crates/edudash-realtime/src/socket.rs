//! Change-feed socket: one WebSocket per subscription.
//!
//! The hosted change feed speaks a Phoenix-channels dialect: every frame
//! is a JSON object `{topic, event, payload, ref}`. A subscription joins
//! one topic, asks for `postgres_changes` on one table (optionally
//! filtered), heartbeats on the `phoenix` topic, and leaves when the
//! consumer drops its [`Subscription`](crate::Subscription).
//!
//! ```text
//! connect ──→ phx_join ──(phx_reply ok)──→ [streaming]
//!                                              │
//!        heartbeat every N seconds ────────────┤
//!        postgres_changes ──→ ChangeEvent ─────┤
//!        consumer dropped ──→ phx_leave, close ┘
//! ```
//!
//! There is no automatic reconnect: if the socket dies the event channel
//! closes and the owning feed keeps its last state.

use std::time::Duration;

use edudash_protocol::{ChangeEvent, Codec, JsonCodec};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::{RealtimeError, SubscriptionSpec};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long to wait for the server to acknowledge a join.
const JOIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Protocol version announced in the connect URL.
const PROTOCOL_VSN: &str = "1.0.0";

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// One channel frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct PhoenixFrame {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

impl PhoenixFrame {
    fn new(topic: impl Into<String>, event: &str, payload: Value, reference: u64) -> Self {
        Self {
            topic: topic.into(),
            event: event.to_string(),
            payload,
            reference: Some(reference.to_string()),
        }
    }

    /// `Some(true)` for an ok reply, `Some(false)` for an error reply,
    /// `None` if this isn't a reply at all.
    fn reply_ok(&self) -> Option<bool> {
        (self.event == "phx_reply").then(|| self.payload.get("status") == Some(&json!("ok")))
    }
}

/// Builds the join payload for a postgres-changes subscription.
pub(crate) fn join_payload(spec: &SubscriptionSpec, schema: &str, access_token: &str) -> Value {
    let mut change = json!({
        "event": "*",
        "schema": schema,
        "table": spec.table,
    });
    if let Some(filter) = &spec.filter {
        change["filter"] = Value::String(filter.to_filter_string());
    }
    json!({
        "config": {
            "broadcast": { "self": false },
            "presence": { "key": "" },
            "postgres_changes": [change],
        },
        "access_token": access_token,
    })
}

/// Turns the service's HTTP base URL into its realtime socket URL.
pub(crate) fn websocket_url(base_url: &str, api_key: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{base}/realtime/v1/websocket?apikey={api_key}&vsn={PROTOCOL_VSN}")
}

// ---------------------------------------------------------------------------
// ChannelSocket
// ---------------------------------------------------------------------------

/// Everything a socket task needs to open one subscription.
#[derive(Debug, Clone)]
pub(crate) struct SocketParams {
    pub url: String,
    pub schema: String,
    pub access_token: String,
    pub heartbeat: Duration,
}

/// A joined channel. Owned by its task once [`run`](Self::run) starts.
pub(crate) struct ChannelSocket {
    id: u64,
    ws: WsStream,
    topic: String,
    heartbeat: Duration,
    next_ref: u64,
    codec: JsonCodec,
}

impl ChannelSocket {
    /// Connects and joins `spec`'s topic, waiting for the server's ack.
    ///
    /// # Errors
    /// [`RealtimeError::WebSocket`] if the connection fails,
    /// [`RealtimeError::Subscribe`] if the join is refused, times out, or
    /// the socket closes first.
    pub async fn join(id: u64, params: &SocketParams, spec: &SubscriptionSpec) -> Result<Self, RealtimeError> {
        let (ws, _response) = tokio_tungstenite::connect_async(params.url.as_str()).await?;
        let mut socket = Self {
            id,
            ws,
            topic: spec.topic(),
            heartbeat: params.heartbeat,
            next_ref: 0,
            codec: JsonCodec,
        };

        let topic = socket.topic.clone();
        let payload = join_payload(spec, &params.schema, &params.access_token);
        let join_ref = socket.send(&topic, "phx_join", payload).await?;

        tokio::time::timeout(JOIN_TIMEOUT, socket.await_reply(join_ref))
            .await
            .map_err(|_| RealtimeError::Subscribe(format!("join of {topic} timed out")))??;

        tracing::debug!(subscription = id, topic = %socket.topic, "channel joined");
        Ok(socket)
    }

    /// Reads frames until the reply to `reference` arrives.
    async fn await_reply(&mut self, reference: u64) -> Result<(), RealtimeError> {
        let wanted = reference.to_string();
        while let Some(frame) = self.next_frame().await? {
            if frame.reference.as_deref() != Some(wanted.as_str()) {
                continue;
            }
            match frame.reply_ok() {
                Some(true) => return Ok(()),
                Some(false) => {
                    return Err(RealtimeError::Subscribe(format!(
                        "join of {} refused: {}",
                        self.topic, frame.payload
                    )));
                }
                None => {}
            }
        }
        Err(RealtimeError::Subscribe(format!(
            "socket closed before {} was joined",
            self.topic
        )))
    }

    /// Pumps change events into `events` until the consumer goes away or
    /// the socket ends.
    pub async fn run(mut self, events: mpsc::Sender<ChangeEvent>) {
        let mut ticker = tokio::time::interval(self.heartbeat);
        // The first tick fires immediately; the join just proved liveness.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = events.closed() => {
                    self.leave().await;
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.send("phoenix", "heartbeat", json!({})).await {
                        tracing::warn!(subscription = self.id, error = %e, "heartbeat failed");
                        break;
                    }
                }
                frame = self.next_frame() => match frame {
                    Ok(Some(frame)) => {
                        if !self.dispatch(frame, &events).await {
                            break;
                        }
                    }
                    Ok(None) => {
                        tracing::info!(subscription = self.id, topic = %self.topic, "socket closed by server");
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(subscription = self.id, error = %e, "socket error");
                        break;
                    }
                },
            }
        }

        tracing::debug!(subscription = self.id, "channel task stopped");
    }

    /// Handles one inbound frame. Returns `false` when the channel is over.
    async fn dispatch(&mut self, frame: PhoenixFrame, events: &mpsc::Sender<ChangeEvent>) -> bool {
        if frame.topic != self.topic {
            return true;
        }
        match frame.event.as_str() {
            "postgres_changes" => {
                let data = frame.payload.get("data").cloned().unwrap_or(Value::Null);
                match serde_json::from_value::<ChangeEvent>(data) {
                    Ok(event) => {
                        if events.send(event).await.is_err() {
                            self.leave().await;
                            return false;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(subscription = self.id, error = %e, "undecodable change event");
                    }
                }
                true
            }
            "phx_error" | "phx_close" => {
                tracing::warn!(subscription = self.id, event = %frame.event, "channel ended by server");
                false
            }
            _ => true,
        }
    }

    async fn leave(&mut self) {
        let topic = self.topic.clone();
        if let Err(e) = self.send(&topic, "phx_leave", json!({})).await {
            tracing::debug!(subscription = self.id, error = %e, "leave not delivered");
        }
        let _ = self.ws.close(None).await;
        tracing::debug!(subscription = self.id, topic = %topic, "channel left");
    }

    /// Sends one frame and returns its `ref`.
    async fn send(&mut self, topic: &str, event: &str, payload: Value) -> Result<u64, RealtimeError> {
        self.next_ref += 1;
        let reference = self.next_ref;
        let frame = PhoenixFrame::new(topic, event, payload, reference);
        let bytes = self.codec.encode(&frame)?;
        let text = String::from_utf8(bytes)
            .map_err(|e| RealtimeError::Subscribe(format!("frame is not utf-8: {e}")))?;
        self.ws.send(Message::Text(text.into())).await?;
        Ok(reference)
    }

    /// Next decodable frame, skipping control messages and garbage.
    async fn next_frame(&mut self) -> Result<Option<PhoenixFrame>, RealtimeError> {
        loop {
            let data = match self.ws.next().await {
                Some(Ok(Message::Text(text))) => text.as_bytes().to_vec(),
                Some(Ok(Message::Binary(data))) => data.to_vec(),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            };
            match self.codec.decode::<PhoenixFrame>(&data) {
                Ok(frame) => return Ok(Some(frame)),
                Err(e) => {
                    tracing::warn!(subscription = self.id, error = %e, "dropping malformed frame");
                }
            }
        }
    }
}
