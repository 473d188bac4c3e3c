use crate::market::{Draft, Platform};
use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

/// Dialogue handle used by all handlers
pub type MarketDialogue = Dialogue<State, InMemStorage<State>>;

/// Represents the current state of a chat's listing form
///
/// Each form stage carries exactly the fields accepted so far.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
pub enum State {
    /// No conversation in progress
    #[default]
    Idle,
    /// Waiting for a platform button
    Platform,
    /// Waiting for the account handle
    AccountHandle {
        /// Chosen platform
        platform: Platform,
    },
    /// Waiting for the follower count
    Followers {
        /// Chosen platform
        platform: Platform,
        /// Account handle
        account_handle: String,
    },
    /// Waiting for the price
    Price {
        /// Chosen platform
        platform: Platform,
        /// Account handle
        account_handle: String,
        /// Follower count
        follower_count: u64,
    },
    /// Summary shown, waiting for confirm or restart
    Confirmation {
        /// Complete form
        draft: Draft,
    },
}
