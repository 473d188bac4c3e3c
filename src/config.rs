//! Configuration and settings management
//!
//! Loads settings from config files and environment variables and defines
//! Telegram API retry constants.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use teloxide::types::{ChatId, Recipient};

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Telegram Bot API token
    #[serde(rename = "bot_token")]
    pub telegram_token: String,

    /// Chat that receives submissions for review
    #[serde(rename = "admin_chat_id")]
    pub moderator_chat_id: i64,

    /// Public channel for approved listings: `@username` or numeric id
    pub channel_id: String,
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use account_market_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Local overrides, not checked into git
            .add_source(File::with_name("config/local").required(false))
            // Eg. `APP__CHANNEL_ID=@market ./target/app`
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Plain `BOT_TOKEN`, `ADMIN_CHAT_ID`, `CHANNEL_ID`; empty values count as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?
            .try_deserialize()
    }

    /// Moderator chat as a Telegram chat id
    #[must_use]
    pub const fn moderator_chat(&self) -> ChatId {
        ChatId(self.moderator_chat_id)
    }

    /// Channel as a send target
    #[must_use]
    pub fn channel_recipient(&self) -> Recipient {
        parse_recipient(&self.channel_id)
    }

    /// Public link to the channel, if it has a username
    #[must_use]
    pub fn channel_link(&self) -> Option<String> {
        self.channel_id
            .trim()
            .strip_prefix('@')
            .filter(|name| !name.is_empty())
            .map(|name| format!("https://t.me/{name}"))
    }
}

/// Interprets a chat reference as either a numeric id or a `@username`.
#[must_use]
pub fn parse_recipient(raw: &str) -> Recipient {
    let raw = raw.trim();
    raw.parse::<i64>().map_or_else(
        |_| {
            let name = raw.trim_start_matches('@');
            Recipient::ChannelUsername(format!("@{name}"))
        },
        |id| Recipient::Id(ChatId(id)),
    )
}

// Telegram API retry configuration
/// Maximum retry attempts for a Telegram API call
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;
/// Initial backoff between retries
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Upper bound for backoff between retries
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;
