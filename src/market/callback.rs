//! Inline button payloads.
//!
//! Every callback payload the bot emits is produced by [`CallbackAction::encode`]
//! and parsed back exactly once at the dispatcher boundary.

use crate::market::listing::{ListingId, Platform};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const CONFIRM: &str = "confirm";
const RESTART: &str = "restart";
const APPROVE_PREFIX: &str = "approve_";
const REJECT_PREFIX: &str = "reject_";

/// Callback payload that does not map to any known action.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown callback data: {0:?}")]
pub struct UnknownCallback(pub String);

/// Action carried by an inline button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// Seller picked a platform
    Platform(Platform),
    /// Seller confirmed the summary
    Confirm,
    /// Seller asked to start over
    Restart,
    /// Moderator approved a listing
    Approve(ListingId),
    /// Moderator rejected a listing
    Reject(ListingId),
}

impl CallbackAction {
    /// Wire form of the action.
    #[must_use]
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Whether only the moderator may trigger this action.
    #[must_use]
    pub const fn is_moderation(&self) -> bool {
        matches!(self, Self::Approve(_) | Self::Reject(_))
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Platform(p) => f.write_str(p.code()),
            Self::Confirm => f.write_str(CONFIRM),
            Self::Restart => f.write_str(RESTART),
            Self::Approve(id) => write!(f, "{APPROVE_PREFIX}{id}"),
            Self::Reject(id) => write!(f, "{REJECT_PREFIX}{id}"),
        }
    }
}

impl FromStr for CallbackAction {
    type Err = UnknownCallback;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        match data {
            CONFIRM => return Ok(Self::Confirm),
            RESTART => return Ok(Self::Restart),
            _ => {}
        }
        if let Ok(platform) = data.parse::<Platform>() {
            return Ok(Self::Platform(platform));
        }
        if let Some(id) = data.strip_prefix(APPROVE_PREFIX).filter(|id| !id.is_empty()) {
            return Ok(Self::Approve(ListingId::new(id)));
        }
        if let Some(id) = data.strip_prefix(REJECT_PREFIX).filter(|id| !id.is_empty()) {
            return Ok(Self::Reject(ListingId::new(id)));
        }
        Err(UnknownCallback(data.to_string()))
    }
}
