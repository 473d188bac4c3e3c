/// Inline button payload codec
pub mod callback;
/// Listing records and input validation
pub mod listing;
/// In-memory listing store
pub mod store;

pub use callback::CallbackAction;
pub use listing::{Draft, InputError, Listing, ListingId, Platform, Price, Seller};
pub use store::{InMemoryListingStore, ListingStore, StoreError};
