//! Feed configuration.

/// Table names and limits used by the feeds.
///
/// The defaults match the hosted schema; tests and demos can point the
/// feeds at other tables.
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Table holding chat messages.
    pub messages_table: String,

    /// Table holding leaderboard rows.
    pub leaderboard_table: String,

    /// Maximum leaderboard rows fetched per snapshot.
    ///
    /// Default: 50.
    pub leaderboard_page_size: usize,

    /// Capacity of each feed's command channel.
    pub command_channel_size: usize,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            messages_table: "messages".to_string(),
            leaderboard_table: "leaderboard".to_string(),
            leaderboard_page_size: 50,
            command_channel_size: 32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feed_config_default() {
        let config = FeedConfig::default();
        assert_eq!(config.messages_table, "messages");
        assert_eq!(config.leaderboard_table, "leaderboard");
        assert_eq!(config.leaderboard_page_size, 50);
    }
}
