//! Listing records and the validation rules for seller input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use teloxide::types::{ChatId, UserId};
use thiserror::Error;
use uuid::Uuid;

/// Minimum accepted price (exclusive), in USD.
pub const MIN_PRICE: f64 = 1.0;

/// Seller input that failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// Follower count is not a non-negative integer
    #[error("invalid follower count: {0:?}")]
    Followers(String),
    /// Price is not a number greater than the minimum
    #[error("invalid price: {0:?}")]
    Price(String),
    /// Unknown platform code
    #[error("unknown platform: {0:?}")]
    Platform(String),
}

/// Social platform an account belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    /// Instagram
    Instagram,
    /// Twitter
    Twitter,
    /// Telegram
    Telegram,
}

impl Platform {
    /// All platforms in the order they are offered to sellers.
    pub const ALL: [Self; 3] = [Self::Instagram, Self::Twitter, Self::Telegram];

    /// Lowercase code used in callback payloads.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Instagram => "instagram",
            Self::Twitter => "twitter",
            Self::Telegram => "telegram",
        }
    }

    /// Display-cased name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Instagram => "Instagram",
            Self::Twitter => "Twitter",
            Self::Telegram => "Telegram",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Platform {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.code() == s)
            .ok_or_else(|| InputError::Platform(s.to_string()))
    }
}

/// Opaque listing identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(String);

impl ListingId {
    /// Generates a fresh random identifier (32 lowercase hex characters).
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wraps an identifier received from a callback payload.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Asking price in USD, always greater than [`MIN_PRICE`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Price(f64);

impl Price {
    /// Parses seller input into a price.
    ///
    /// # Errors
    ///
    /// Returns [`InputError::Price`] if the text is not a finite number
    /// strictly greater than [`MIN_PRICE`].
    pub fn parse(text: &str) -> Result<Self, InputError> {
        let trimmed = text.trim();
        let amount = trimmed.strip_prefix('$').unwrap_or(trimmed);
        match amount.parse::<f64>() {
            Ok(value) if value.is_finite() && value > MIN_PRICE => Ok(Self(value)),
            _ => Err(InputError::Price(text.to_string())),
        }
    }

    /// Raw amount.
    #[must_use]
    pub const fn amount(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}", self.0)
    }
}

impl From<Price> for String {
    fn from(price: Price) -> Self {
        price.to_string()
    }
}

impl TryFrom<String> for Price {
    type Error = InputError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

/// Parses seller input into a follower count.
///
/// # Errors
///
/// Returns [`InputError::Followers`] for non-integers and negative values.
pub fn parse_followers(text: &str) -> Result<u64, InputError> {
    let trimmed = text.trim();
    let count = match trimmed.strip_prefix('-') {
        // Negative zero is still zero
        Some(digits) if !digits.starts_with('+') => {
            digits.parse::<u64>().ok().filter(|n| *n == 0)
        }
        Some(_) => None,
        None => trimmed.parse::<u64>().ok(),
    };
    count.ok_or_else(|| InputError::Followers(text.to_string()))
}

/// Seller identity captured at confirmation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seller {
    /// Telegram user id, also the private chat used for notifications
    pub id: UserId,
    /// Public `@username`, if the seller has one
    pub username: Option<String>,
}

/// Fully filled form awaiting the seller's confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Draft {
    /// Platform
    pub platform: Platform,
    /// Account handle, verbatim
    pub account_handle: String,
    /// Follower count
    pub follower_count: u64,
    /// Asking price
    pub price: Price,
}

/// A confirmed listing awaiting moderation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    /// Identifier, also used in moderation callbacks
    pub id: ListingId,
    /// Platform
    pub platform: Platform,
    /// Account handle, verbatim
    pub account_handle: String,
    /// Follower count
    pub follower_count: u64,
    /// Asking price
    pub price: Price,
    /// Submitting user
    pub seller: Seller,
    /// Confirmation time
    pub submitted_at: DateTime<Utc>,
}

impl Seller {
    /// Private chat with the seller
    #[must_use]
    pub fn chat(&self) -> ChatId {
        ChatId::from(self.id)
    }
}

impl Listing {
    /// Builds a listing from a confirmed draft.
    #[must_use]
    pub fn from_draft(id: ListingId, draft: Draft, seller: Seller) -> Self {
        Self {
            id,
            platform: draft.platform,
            account_handle: draft.account_handle,
            follower_count: draft.follower_count,
            price: draft.price,
            seller,
            submitted_at: Utc::now(),
        }
    }
}
