//! The hosted table service: REST reads and writes plus a WebSocket
//! change feed.
//!
//! Reads go to `{url}/rest/v1/{table}` with the query encoded as
//! PostgREST-style parameters. Every request carries the project's
//! public API key, and a bearer credential (the signed-in user's access
//! token when known, else the API key itself).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use edudash_protocol::ChangeEvent;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::socket::{ChannelSocket, SocketParams, websocket_url};
use crate::{Query, RealtimeError, Subscription, SubscriptionSpec, TableBackend};

/// Events buffered per subscription between the socket task and the feed.
const SUBSCRIPTION_BUFFER: usize = 64;

/// Connection settings for the hosted service.
#[derive(Debug, Clone)]
pub struct HostedConfig {
    /// Base URL of the project, e.g. `https://xyz.example.co`.
    pub url: String,

    /// Public (anon) API key.
    pub api_key: String,

    /// The signed-in user's access token, if any.
    pub access_token: Option<String>,

    /// How often the change-feed socket sends a heartbeat.
    ///
    /// Default: 30 seconds.
    pub heartbeat_interval: Duration,

    /// Database schema the tables live in.
    ///
    /// Default: `public`.
    pub schema: String,
}

impl HostedConfig {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            access_token: None,
            heartbeat_interval: Duration::from_secs(30),
            schema: "public".to_string(),
        }
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    /// The bearer credential sent with every request.
    fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.api_key)
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{table}", self.url.trim_end_matches('/'))
    }
}

/// [`TableBackend`] over the hosted service.
pub struct HostedTables {
    http: reqwest::Client,
    config: HostedConfig,
    next_id: AtomicU64,
}

impl HostedTables {
    pub fn new(config: HostedConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Uses a caller-built HTTP client (custom TLS, timeouts, proxies).
    pub fn with_client(http: reqwest::Client, config: HostedConfig) -> Self {
        Self {
            http,
            config,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &HostedConfig {
        &self.config
    }

    fn socket_params(&self) -> SocketParams {
        SocketParams {
            url: websocket_url(&self.config.url, &self.config.api_key),
            schema: self.config.schema.clone(),
            access_token: self.config.bearer().to_string(),
            heartbeat: self.config.heartbeat_interval,
        }
    }
}

/// Maps a non-2xx response to [`RealtimeError::Fetch`] with its body.
async fn ensure_success(resp: reqwest::Response) -> Result<reqwest::Response, RealtimeError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(RealtimeError::Fetch(format!("status {}: {body}", status.as_u16())))
}

impl TableBackend for HostedTables {
    async fn fetch(&self, query: &Query) -> Result<Vec<Value>, RealtimeError> {
        tracing::debug!(table = %query.table, query = %query.to_query_string(), "fetching rows");
        let resp = self
            .http
            .get(self.config.rest_url(&query.table))
            .query(&query.params())
            .header("apikey", &self.config.api_key)
            .bearer_auth(self.config.bearer())
            .send()
            .await?;
        let rows: Vec<Value> = ensure_success(resp).await?.json().await?;
        Ok(rows)
    }

    async fn subscribe(&self, spec: SubscriptionSpec) -> Result<Subscription, RealtimeError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let socket = ChannelSocket::join(id, &self.socket_params(), &spec).await?;

        let (tx, rx) = mpsc::channel::<ChangeEvent>(SUBSCRIPTION_BUFFER);
        tokio::spawn(socket.run(tx));

        tracing::info!(subscription = id, topic = %spec.topic(), "subscribed");
        Ok(Subscription::new(id, spec, rx))
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, RealtimeError> {
        let resp = self
            .http
            .post(self.config.rest_url(table))
            .header("apikey", &self.config.api_key)
            .header("Prefer", "return=representation")
            .bearer_auth(self.config.bearer())
            .json(&row)
            .send()
            .await?;
        let mut rows: Vec<Value> = ensure_success(resp).await?.json().await?;
        if rows.is_empty() {
            return Err(RealtimeError::Fetch(format!("insert into {table} returned no row")));
        }
        Ok(rows.swap_remove(0))
    }
}
