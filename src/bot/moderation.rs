//! Moderator workflow: approve publishes, reject collects a reason.
//!
//! Listings leave the store exactly once. The removal is the claim: whoever
//! removes the entry performs the disposition, later actions see "not found".
//!
//! A pending rejection is kept apart from the chat's form dialogue, so the
//! moderator can fill in a listing of their own without losing it.

use crate::bot::views;
use crate::bot::{MarketContext, MessageRef};
use crate::market::ListingId;
use anyhow::Result;
use std::collections::HashMap;
use teloxide::types::{ChatId, InlineKeyboardMarkup, Recipient};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Reject was pressed and the moderator owes a reason.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingRejection {
    /// Listing being rejected
    pub listing_id: ListingId,
    /// Submission message, now showing the reason prompt
    pub prompt: MessageRef,
}

/// Pending rejections, at most one per chat.
#[derive(Debug, Default)]
pub struct PendingRejections {
    by_chat: Mutex<HashMap<ChatId, PendingRejection>>,
}

impl PendingRejections {
    /// Records `pending` for `chat`, returning the one it supersedes
    pub async fn replace(
        &self,
        chat: ChatId,
        pending: PendingRejection,
    ) -> Option<PendingRejection> {
        self.by_chat.lock().await.insert(chat, pending)
    }

    /// Removes and returns the pending rejection of `chat`
    pub async fn take(&self, chat: ChatId) -> Option<PendingRejection> {
        self.by_chat.lock().await.remove(&chat)
    }

    /// Whether `chat` owes a reason
    pub async fn contains(&self, chat: ChatId) -> bool {
        self.by_chat.lock().await.contains_key(&chat)
    }
}

/// Whether `chat` is the configured moderator chat
#[must_use]
pub fn is_moderator_chat(ctx: &MarketContext, chat: ChatId) -> bool {
    chat == ctx.settings.moderator_chat()
}

async fn edit_origin(
    ctx: &MarketContext,
    origin: MessageRef,
    text: String,
    keyboard: Option<InlineKeyboardMarkup>,
) {
    if let Err(e) = ctx
        .gateway
        .edit_text(origin.chat, origin.message, text, keyboard)
        .await
    {
        warn!("Failed to update moderator message: {}", e);
    }
}

/// Publishes a listing to the channel and notifies the seller.
///
/// If the channel post fails the listing goes back into the store so the
/// moderator can retry.
///
/// # Errors
///
/// Returns an error only if a listing could not be put back after a failed post.
pub async fn approve(ctx: &MarketContext, origin: MessageRef, id: ListingId) -> Result<()> {
    if !is_moderator_chat(ctx, origin.chat) {
        warn!("Ignoring approve of {} from chat {}", id, origin.chat);
        return Ok(());
    }

    let Some(listing) = ctx.store.remove(&id).await else {
        info!("Approve on unknown listing {}", id);
        edit_origin(ctx, origin, views::NOT_FOUND.to_string(), None).await;
        return Ok(());
    };

    if let Err(e) = ctx
        .gateway
        .send_text(
            ctx.settings.channel_recipient(),
            views::channel_post(&listing),
            None,
        )
        .await
    {
        error!("Failed to publish listing {}: {}", id, e);
        ctx.store.restore(listing).await?;
        edit_origin(
            ctx,
            origin,
            views::publish_failed(&id),
            Some(views::moderation_keyboard(&id)),
        )
        .await;
        return Ok(());
    }

    info!("Listing {} published", id);
    edit_origin(ctx, origin, views::published(&id), None).await;

    let link = ctx.settings.channel_link();
    if let Err(e) = ctx
        .gateway
        .send_text(
            Recipient::Id(listing.seller.chat()),
            views::published_notice(link.as_deref()),
            None,
        )
        .await
    {
        warn!("Could not notify seller {} about listing {}: {}", listing.seller.id, id, e);
    }
    Ok(())
}

/// Asks the moderator for a rejection reason.
///
/// The listing stays live until the reason arrives. A rejection still pending
/// in the same chat is abandoned and its submission gets its buttons back.
///
/// # Errors
///
/// Returns an error if the moderator message cannot be edited.
pub async fn reject(ctx: &MarketContext, origin: MessageRef, id: ListingId) -> Result<()> {
    if !is_moderator_chat(ctx, origin.chat) {
        warn!("Ignoring reject of {} from chat {}", id, origin.chat);
        return Ok(());
    }

    if ctx.store.get(&id).await.is_none() {
        info!("Reject on unknown listing {}", id);
        edit_origin(ctx, origin, views::NOT_FOUND.to_string(), None).await;
        return Ok(());
    }

    ctx.gateway
        .edit_text(origin.chat, origin.message, views::ask_reject_reason(&id), None)
        .await?;
    let pending = PendingRejection {
        listing_id: id.clone(),
        prompt: origin,
    };
    if let Some(previous) = ctx.rejections.replace(origin.chat, pending).await {
        if previous.listing_id != id {
            restore_buttons(ctx, previous).await;
        }
    }
    Ok(())
}

/// Abandons the rejection pending in `chat`, if any.
pub async fn cancel_pending(ctx: &MarketContext, chat: ChatId) {
    if let Some(pending) = ctx.rejections.take(chat).await {
        restore_buttons(ctx, pending).await;
    }
}

async fn restore_buttons(ctx: &MarketContext, pending: PendingRejection) {
    let Some(listing) = ctx.store.get(&pending.listing_id).await else {
        return;
    };
    info!("Rejection of {} abandoned, listing back to review", listing.id);
    edit_origin(
        ctx,
        pending.prompt,
        views::submission(&listing),
        Some(views::moderation_keyboard(&listing.id)),
    )
    .await;
}

/// Relays the moderator's reason to the seller and drops the listing.
///
/// The listing is removed even if the seller cannot be reached.
///
/// # Errors
///
/// Returns an error if the moderator cannot be answered.
pub async fn submit_reason(
    ctx: &MarketContext,
    moderator_chat: ChatId,
    listing_id: ListingId,
    reason: &str,
) -> Result<()> {
    let moderator = Recipient::Id(moderator_chat);

    let Some(listing) = ctx.store.remove(&listing_id).await else {
        info!("Rejection reason for listing {} that is gone", listing_id);
        ctx.gateway
            .send_text(moderator, views::NOT_FOUND.to_string(), None)
            .await?;
        return Ok(());
    };

    if let Err(e) = ctx
        .gateway
        .send_text(
            Recipient::Id(listing.seller.chat()),
            views::rejection_notice(reason),
            None,
        )
        .await
    {
        warn!(
            "Could not deliver rejection of {} to seller {}: {}",
            listing_id, listing.seller.id, e
        );
    }
    info!("Listing {} rejected", listing_id);

    ctx.gateway
        .send_text(moderator, views::REASON_SENT.to_string(), None)
        .await?;
    Ok(())
}
