/// Outbound messaging gateway
pub mod gateway;
/// Seller conversation handlers
pub mod handlers;
/// Moderator approve/reject workflow
pub mod moderation;
/// Dispatcher wiring and update routing
pub mod runner;
/// Dialogue state
pub mod state;
/// Keyboards and texts
pub mod views;

use crate::config::Settings;
use crate::market::ListingStore;
use gateway::MessagingGateway;
use moderation::PendingRejections;
use std::sync::Arc;
use teloxide::types::{ChatId, MessageId};

pub use gateway::{GatewayError, TelegramGateway};
pub use state::{MarketDialogue, State};

/// Shared collaborators handed to every handler
#[derive(Clone)]
pub struct MarketContext {
    /// Outbound messaging
    pub gateway: Arc<dyn MessagingGateway>,
    /// Live listings
    pub store: Arc<dyn ListingStore>,
    /// Static configuration
    pub settings: Arc<Settings>,
    /// Rejections waiting for a reason
    pub rejections: Arc<PendingRejections>,
}

impl MarketContext {
    /// Bundles the collaborators
    #[must_use]
    pub fn new(
        gateway: Arc<dyn MessagingGateway>,
        store: Arc<dyn ListingStore>,
        settings: Arc<Settings>,
    ) -> Self {
        Self {
            gateway,
            store,
            settings,
            rejections: Arc::new(PendingRejections::default()),
        }
    }
}

/// Message that carried a pressed inline button
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageRef {
    /// Chat the message lives in
    pub chat: ChatId,
    /// Message id within the chat
    pub message: MessageId,
}
