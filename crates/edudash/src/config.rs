//! Client configuration.
//!
//! Everything has a default suitable for a local backend. Deployments
//! override it through `EDUDASH_*` environment variables:
//!
//! | variable                          | field                   |
//! |-----------------------------------|-------------------------|
//! | `EDUDASH_BACKEND_URL`             | `backend_url` (required)|
//! | `EDUDASH_ANON_KEY`                | `anon_key` (required)   |
//! | `EDUDASH_SUMMARIZER_ENDPOINT`     | `summarizer_endpoint`   |
//! | `EDUDASH_LEADERBOARD_PAGE_SIZE`   | `leaderboard_page_size` |
//! | `EDUDASH_HEARTBEAT_SECS`          | `heartbeat_interval`    |
//! | `EDUDASH_DEFAULT_REDIRECT`        | `default_redirect`      |

use std::str::FromStr;
use std::time::Duration;

use edudash_protocol::Route;
use edudash_realtime::{FeedConfig, HostedConfig};

/// Errors from reading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

/// Settings for one client instance.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the hosted backend.
    pub backend_url: String,

    /// Public API key of the backend project.
    pub anon_key: String,

    /// Full URL of the document-processing endpoint.
    ///
    /// Default: `{backend_url}/functions/v1/process-document`.
    pub summarizer_endpoint: String,

    /// Rows per leaderboard snapshot.
    ///
    /// Default: 50.
    pub leaderboard_page_size: usize,

    /// Change-feed socket heartbeat.
    ///
    /// Default: 30 seconds.
    pub heartbeat_interval: Duration,

    /// Where protected pages send users they can't place anywhere else.
    ///
    /// Default: `/login`.
    pub default_redirect: Route,
}

const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:54321";

fn summarizer_endpoint_for(backend_url: &str) -> String {
    format!("{}/functions/v1/process-document", backend_url.trim_end_matches('/'))
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            anon_key: String::new(),
            summarizer_endpoint: summarizer_endpoint_for(DEFAULT_BACKEND_URL),
            leaderboard_page_size: 50,
            heartbeat_interval: Duration::from_secs(30),
            default_redirect: Route::Login,
        }
    }
}

impl ClientConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads the configuration through `lookup`, which maps a variable
    /// name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &'static str| lookup(name).filter(|v| !v.trim().is_empty());
        let require = |name: &'static str| get(name).ok_or(ConfigError::Missing(name));

        let backend_url = require("EDUDASH_BACKEND_URL")?;
        let anon_key = require("EDUDASH_ANON_KEY")?;
        let defaults = Self::default();

        let summarizer_endpoint = get("EDUDASH_SUMMARIZER_ENDPOINT")
            .unwrap_or_else(|| summarizer_endpoint_for(&backend_url));
        let leaderboard_page_size = match get("EDUDASH_LEADERBOARD_PAGE_SIZE") {
            Some(v) => parse_positive::<usize>("EDUDASH_LEADERBOARD_PAGE_SIZE", &v)?,
            None => defaults.leaderboard_page_size,
        };
        let heartbeat_interval = match get("EDUDASH_HEARTBEAT_SECS") {
            Some(v) => Duration::from_secs(parse_positive::<u64>("EDUDASH_HEARTBEAT_SECS", &v)?),
            None => defaults.heartbeat_interval,
        };
        let default_redirect = match get("EDUDASH_DEFAULT_REDIRECT") {
            Some(v) if v.starts_with('/') => Route::parse(&v),
            Some(v) => {
                return Err(ConfigError::Invalid {
                    name: "EDUDASH_DEFAULT_REDIRECT",
                    value: v,
                });
            }
            None => defaults.default_redirect,
        };

        Ok(Self {
            backend_url,
            anon_key,
            summarizer_endpoint,
            leaderboard_page_size,
            heartbeat_interval,
            default_redirect,
        })
    }

    /// Feed settings derived from this configuration.
    pub fn feed_config(&self) -> FeedConfig {
        FeedConfig {
            leaderboard_page_size: self.leaderboard_page_size,
            ..FeedConfig::default()
        }
    }

    /// Hosted backend settings derived from this configuration.
    pub fn hosted_config(&self) -> HostedConfig {
        HostedConfig::new(&self.backend_url, &self.anon_key).heartbeat_interval(self.heartbeat_interval)
    }
}

fn parse_positive<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    match value.trim().parse::<T>() {
        Ok(n) if n > T::default() => Ok(n),
        _ => Err(ConfigError::Invalid {
            name,
            value: value.to_string(),
        }),
    }
}
