#![deny(missing_docs)]
//! Account Marketplace bot.
//!
//! Walks sellers through a listing form, routes finished listings to a
//! moderator and publishes approved ones to a public channel.

/// Telegram bot: dialogue state, handlers, gateway and runtime
pub mod bot;
/// Configuration management
pub mod config;
/// Marketplace domain: listings, store and callback codec
pub mod market;
/// Retry helpers for Telegram API calls
pub mod utils;
