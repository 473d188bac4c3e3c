//! Outbound messaging.
//!
//! Handlers talk to Telegram only through [`MessagingGateway`], which keeps the
//! conversation and moderation flows testable without a network.

use crate::utils::{is_transient, retry_telegram_operation, wait_out_flood_control};
use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{ChatId, InlineKeyboardMarkup, MessageId, Recipient};
use teloxide::RequestError;
use thiserror::Error;
use tokio::sync::OnceCell;

/// Errors raised by the messaging gateway
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Telegram rejected the request or could not be reached
    #[error("Telegram request failed: {0}")]
    Telegram(#[from] RequestError),
    /// The bot account has no public username
    #[error("bot has no username")]
    MissingUsername,
}

/// Messaging operations the bot core depends on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Send a text message, optionally with inline buttons
    async fn send_text(
        &self,
        to: Recipient,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId, GatewayError>;

    /// Replace the text (and buttons) of an existing message
    async fn edit_text(
        &self,
        chat: ChatId,
        message: MessageId,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<(), GatewayError>;

    /// The bot's own public username, without `@`
    async fn bot_username(&self) -> Result<String, GatewayError>;
}

/// [`MessagingGateway`] backed by the Telegram Bot API.
///
/// Transient failures are retried with backoff; the bot username is fetched
/// once and cached.
pub struct TelegramGateway {
    bot: Bot,
    username: OnceCell<String>,
}

impl TelegramGateway {
    /// Wraps a bot client
    #[must_use]
    pub fn new(bot: Bot) -> Self {
        Self {
            bot,
            username: OnceCell::new(),
        }
    }
}

#[async_trait]
impl MessagingGateway for TelegramGateway {
    async fn send_text(
        &self,
        to: Recipient,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<MessageId, GatewayError> {
        let message = retry_telegram_operation(
            || async {
                let mut req = self.bot.send_message(to.clone(), text.clone());
                if let Some(markup) = &keyboard {
                    req = req.reply_markup(markup.clone());
                }
                wait_out_flood_control(req.await).await
            },
            is_transient,
        )
        .await?;
        Ok(message.id)
    }

    async fn edit_text(
        &self,
        chat: ChatId,
        message: MessageId,
        text: String,
        keyboard: Option<InlineKeyboardMarkup>,
    ) -> Result<(), GatewayError> {
        retry_telegram_operation(
            || async {
                let mut req = self.bot.edit_message_text(chat, message, text.clone());
                if let Some(markup) = &keyboard {
                    req = req.reply_markup(markup.clone());
                }
                wait_out_flood_control(req.await).await
            },
            is_transient,
        )
        .await?;
        Ok(())
    }

    async fn bot_username(&self) -> Result<String, GatewayError> {
        let name = self
            .username
            .get_or_try_init(|| async {
                let me = retry_telegram_operation(
                    || async { wait_out_flood_control(self.bot.get_me().await).await },
                    is_transient,
                )
                .await?;
                me.user
                    .username
                    .clone()
                    .ok_or(GatewayError::MissingUsername)
            })
            .await?;
        Ok(name.clone())
    }
}
