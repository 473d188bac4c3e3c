//! Marketplace UI components
//!
//! Contains keyboards and text messages for sellers and the moderator.

use crate::market::{CallbackAction, Draft, Listing, ListingId, Platform};
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Greeting with the platform choice
pub const WELCOME: &str = "🔖 Welcome to Account Marketplace!\nPlease choose a platform:";
/// Sent before the greeting on `/start restart`
pub const SESSION_RESET: &str = "🔄 Session reset successfully!";
/// Follower count prompt
pub const ASK_FOLLOWERS: &str = "🔢 Enter number of followers:";
/// Follower count re-prompt
pub const INVALID_FOLLOWERS: &str = "⚠️ Please enter a valid number!";
/// Price prompt
pub const ASK_PRICE: &str = "💰 Enter price in USD:";
/// Price re-prompt
pub const INVALID_PRICE: &str = "❌ Invalid price! Please enter a number greater than 1.";
/// Shown to the seller once the listing reached the moderator
pub const SUBMITTED: &str = "📬 Your ad has been submitted for review!";
/// The moderator chat could not be reached on confirm
pub const SUBMIT_FAILED: &str =
    "⚠️ Could not submit your ad right now. Please press Confirm & Send again.";
/// Moderator acted on an unknown or already handled listing
pub const NOT_FOUND: &str = "❌ Ad not found!";
/// Confirmation to the moderator after a rejection
pub const REASON_SENT: &str = "✅ Rejection reason sent.";
/// Missing or stale conversation context
pub const GENERIC_ERROR: &str = "❌ Error processing request!";
/// Text received outside a conversation
pub const IDLE_HINT: &str = "Send /start to list an account for sale.";
/// Text received while buttons are expected
pub const USE_BUTTONS: &str = "👆 Please use the buttons above.";
/// Moderation button pressed outside the moderator chat
pub const NOT_ALLOWED: &str = "⛔️ Only the moderator can do that.";

/// Platform choice keyboard, one button per row
#[must_use]
pub fn platform_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(Platform::ALL.into_iter().map(|p| {
        vec![InlineKeyboardButton::callback(
            p.name(),
            CallbackAction::Platform(p).encode(),
        )]
    }))
}

/// Summary keyboard
#[must_use]
pub fn confirmation_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![InlineKeyboardButton::callback(
            "✅ Confirm & Send",
            CallbackAction::Confirm.encode(),
        )],
        vec![InlineKeyboardButton::callback(
            "✏️ Edit Again",
            CallbackAction::Restart.encode(),
        )],
    ])
}

/// Approve/reject keyboard attached to a submission
#[must_use]
pub fn moderation_keyboard(id: &ListingId) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("✅ Approve", CallbackAction::Approve(id.clone()).encode()),
        InlineKeyboardButton::callback("❌ Reject", CallbackAction::Reject(id.clone()).encode()),
    ]])
}

/// Deep link that restarts the conversation, as a single URL button
#[must_use]
pub fn back_to_menu_keyboard(bot_username: &str) -> Option<InlineKeyboardMarkup> {
    let url = format!("https://t.me/{bot_username}?start=restart").parse().ok()?;
    Some(InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::url("🏠 Back to Menu", url),
    ]]))
}

/// Prompt after a platform was picked
#[must_use]
pub fn platform_selected(platform: Platform) -> String {
    format!("📌 Selected platform: {platform}\nPlease enter the account @username:")
}

/// Summary shown before confirmation
#[must_use]
pub fn summary(draft: &Draft) -> String {
    format!(
        "📋 Ad Summary:\n\
         • Platform: {}\n\
         • Username: @{}\n\
         • Followers: {}\n\
         • Price: {}",
        draft.platform, draft.account_handle, draft.follower_count, draft.price
    )
}

/// Submission as sent to the moderator
#[must_use]
pub fn submission(listing: &Listing) -> String {
    let body = serde_json::to_string_pretty(listing).unwrap_or_else(|_| format!("{listing:#?}"));
    format!("📮 New Ad Submission:\n{body}")
}

/// Public announcement posted to the channel
#[must_use]
pub fn channel_post(listing: &Listing) -> String {
    let seller = listing
        .seller
        .username
        .as_deref()
        .map_or_else(|| "not provided".to_string(), |name| format!("@{name}"));
    format!(
        "🛒 New Account Listing:\n\n\
         📌 Platform: {}\n\
         🆔 Username: @{}\n\
         👥 Followers: {}\n\
         💰 Price: {}\n\
         🤝 Seller: {seller}",
        listing.platform, listing.account_handle, listing.follower_count, listing.price
    )
}

/// Moderator's message after approval
#[must_use]
pub fn published(id: &ListingId) -> String {
    format!("✅ Ad {id} published!")
}

/// Moderator's message when the channel post failed
#[must_use]
pub fn publish_failed(id: &ListingId) -> String {
    format!("⚠️ Could not publish ad {id}. It is still pending, try again.")
}

/// Seller notice after approval
#[must_use]
pub fn published_notice(channel_link: Option<&str>) -> String {
    channel_link.map_or_else(
        || "🎉 Your ad has been published!".to_string(),
        |link| format!("🎉 Your ad has been published!\n🔗 View ad: {link}"),
    )
}

/// Moderator prompt after pressing reject
#[must_use]
pub fn ask_reject_reason(id: &ListingId) -> String {
    format!("📝 Please enter rejection reason for ad {id}:")
}

/// Seller notice after rejection
#[must_use]
pub fn rejection_notice(reason: &str) -> String {
    format!("❌ Your ad was rejected!\n📝 Reason: {reason}")
}
