//! Seller conversation: platform, handle, followers, price, confirmation.

use crate::bot::moderation;
use crate::bot::state::{MarketDialogue, State};
use crate::bot::views;
use crate::bot::{MarketContext, MessageRef};
use crate::market::listing::parse_followers;
use crate::market::{CallbackAction, Draft, Platform, Price, Seller};
use anyhow::{anyhow, Result};
use teloxide::types::{InlineKeyboardMarkup, Recipient};
use teloxide::utils::command::BotCommands;
use tracing::{debug, info, warn};

/// Supported commands for the bot
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Supported commands:")]
pub enum Command {
    /// Start (or restart) listing an account
    #[command(description = "List an account for sale.")]
    Start(String),
    /// Show command help
    #[command(description = "Show this help.")]
    Help,
    /// Check bot health
    #[command(description = "Check bot health.")]
    Healthcheck,
}

async fn set_state(dialogue: &MarketDialogue, state: State) -> Result<()> {
    dialogue
        .update(state)
        .await
        .map_err(|e| anyhow!(e.to_string()))
}

// `exit` fails with `DialogueNotFound` on chats the storage has never seen
async fn clear_state(dialogue: &MarketDialogue) -> Result<()> {
    set_state(dialogue, State::Idle).await
}

async fn reply(
    ctx: &MarketContext,
    dialogue: &MarketDialogue,
    text: impl Into<String>,
    keyboard: Option<InlineKeyboardMarkup>,
) -> Result<()> {
    ctx.gateway
        .send_text(Recipient::Id(dialogue.chat_id()), text.into(), keyboard)
        .await?;
    Ok(())
}

/// Starts a fresh conversation, discarding any progress.
///
/// With `restart` the seller first gets a reset notice, as when arriving
/// through the "Back to Menu" deep link.
///
/// # Errors
///
/// Returns an error if a message cannot be sent or the dialogue update fails.
pub async fn start(ctx: &MarketContext, dialogue: &MarketDialogue, restart: bool) -> Result<()> {
    moderation::cancel_pending(ctx, dialogue.chat_id()).await;
    clear_state(dialogue).await?;
    if restart {
        reply(ctx, dialogue, views::SESSION_RESET, None).await?;
    }
    reply(ctx, dialogue, views::WELCOME, Some(views::platform_keyboard())).await?;
    set_state(dialogue, State::Platform).await
}

/// "Edit Again": the summary message turns back into the platform choice.
///
/// # Errors
///
/// Returns an error if the message cannot be edited or the dialogue update fails.
pub async fn restart_in_place(
    ctx: &MarketContext,
    dialogue: &MarketDialogue,
    origin: MessageRef,
) -> Result<()> {
    moderation::cancel_pending(ctx, dialogue.chat_id()).await;
    clear_state(dialogue).await?;
    ctx.gateway
        .edit_text(
            origin.chat,
            origin.message,
            views::WELCOME.to_string(),
            Some(views::platform_keyboard()),
        )
        .await?;
    set_state(dialogue, State::Platform).await
}

/// Handles a plain text message according to the current stage.
///
/// Invalid follower counts and prices are answered with a re-prompt and leave
/// the stage and the accepted fields untouched.
///
/// # Errors
///
/// Returns an error if Telegram calls or dialogue storage fail.
pub async fn handle_text(ctx: &MarketContext, dialogue: &MarketDialogue, text: &str) -> Result<()> {
    // A rejection prompt takes the next text in its chat, whatever the form stage
    if let Some(pending) = ctx.rejections.take(dialogue.chat_id()).await {
        return moderation::submit_reason(ctx, dialogue.chat_id(), pending.listing_id, text).await;
    }

    let state = dialogue
        .get_or_default()
        .await
        .map_err(|e| anyhow!(e.to_string()))?;

    match state {
        State::Idle => reply(ctx, dialogue, views::IDLE_HINT, None).await,
        State::Platform | State::Confirmation { .. } => {
            reply(ctx, dialogue, views::USE_BUTTONS, None).await
        }
        State::AccountHandle { platform } => {
            reply(ctx, dialogue, views::ASK_FOLLOWERS, None).await?;
            set_state(
                dialogue,
                State::Followers {
                    platform,
                    account_handle: text.to_string(),
                },
            )
            .await
        }
        State::Followers {
            platform,
            account_handle,
        } => match parse_followers(text) {
            Ok(follower_count) => {
                reply(ctx, dialogue, views::ASK_PRICE, None).await?;
                set_state(
                    dialogue,
                    State::Price {
                        platform,
                        account_handle,
                        follower_count,
                    },
                )
                .await
            }
            Err(e) => {
                debug!("Chat {}: {}", dialogue.chat_id(), e);
                reply(ctx, dialogue, views::INVALID_FOLLOWERS, None).await
            }
        },
        State::Price {
            platform,
            account_handle,
            follower_count,
        } => match Price::parse(text) {
            Ok(price) => {
                let draft = Draft {
                    platform,
                    account_handle,
                    follower_count,
                    price,
                };
                reply(
                    ctx,
                    dialogue,
                    views::summary(&draft),
                    Some(views::confirmation_keyboard()),
                )
                .await?;
                set_state(dialogue, State::Confirmation { draft }).await
            }
            Err(e) => {
                debug!("Chat {}: {}", dialogue.chat_id(), e);
                reply(ctx, dialogue, views::INVALID_PRICE, None).await
            }
        },
    }
}

/// Handles an inline button press that was already decoded.
///
/// # Errors
///
/// Returns an error if Telegram calls, the store or dialogue storage fail.
pub async fn handle_callback(
    ctx: &MarketContext,
    dialogue: &MarketDialogue,
    from: Seller,
    origin: MessageRef,
    action: CallbackAction,
) -> Result<()> {
    match action {
        CallbackAction::Platform(platform) => select_platform(ctx, dialogue, origin, platform).await,
        CallbackAction::Confirm => confirm(ctx, dialogue, from, origin).await,
        CallbackAction::Restart => restart_in_place(ctx, dialogue, origin).await,
        CallbackAction::Approve(id) => moderation::approve(ctx, origin, id).await,
        CallbackAction::Reject(id) => moderation::reject(ctx, origin, id).await,
    }
}

async fn select_platform(
    ctx: &MarketContext,
    dialogue: &MarketDialogue,
    origin: MessageRef,
    platform: Platform,
) -> Result<()> {
    let state = dialogue.get().await.map_err(|e| anyhow!(e.to_string()))?;
    if state != Some(State::Platform) {
        return stale_context(ctx, dialogue).await;
    }

    ctx.gateway
        .edit_text(
            origin.chat,
            origin.message,
            views::platform_selected(platform),
            None,
        )
        .await?;
    set_state(dialogue, State::AccountHandle { platform }).await
}

async fn confirm(
    ctx: &MarketContext,
    dialogue: &MarketDialogue,
    seller: Seller,
    origin: MessageRef,
) -> Result<()> {
    let Some(State::Confirmation { draft }) =
        dialogue.get().await.map_err(|e| anyhow!(e.to_string()))?
    else {
        return stale_context(ctx, dialogue).await;
    };

    let listing = ctx.store.insert_new(draft, seller).await?;

    let delivered = ctx
        .gateway
        .send_text(
            Recipient::Id(ctx.settings.moderator_chat()),
            views::submission(&listing),
            Some(views::moderation_keyboard(&listing.id)),
        )
        .await;
    if let Err(e) = delivered {
        // Nothing reached the moderator: drop the entry, keep the summary confirmable
        ctx.store.remove(&listing.id).await;
        reply(ctx, dialogue, views::SUBMIT_FAILED, None).await?;
        return Err(anyhow!("Failed to forward listing {} to moderator: {e}", listing.id));
    }

    info!(
        "Listing {} submitted by user {} ({} {})",
        listing.id, listing.seller.id, listing.platform, listing.price
    );
    clear_state(dialogue).await?;

    let keyboard = match ctx.gateway.bot_username().await {
        Ok(name) => views::back_to_menu_keyboard(&name),
        Err(e) => {
            warn!("Could not build restart link: {}", e);
            None
        }
    };
    ctx.gateway
        .edit_text(
            origin.chat,
            origin.message,
            views::SUBMITTED.to_string(),
            keyboard,
        )
        .await?;
    Ok(())
}

/// A button or message arrived that the current dialogue cannot explain.
async fn stale_context(ctx: &MarketContext, dialogue: &MarketDialogue) -> Result<()> {
    info!("Chat {}: action without matching session, resetting", dialogue.chat_id());
    clear_state(dialogue).await?;
    reply(ctx, dialogue, views::GENERIC_ERROR, None).await
}
