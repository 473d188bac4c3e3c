//! Listing store
//!
//! Holds confirmed listings between seller confirmation and moderator
//! disposition. Entries are never persisted and never evicted.

use crate::market::listing::{Draft, Listing, ListingId, Seller};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

/// Attempts at drawing a fresh id before giving up.
const MAX_ID_ATTEMPTS: usize = 8;

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Every generated identifier collided with a live listing
    #[error("could not allocate a unique listing id after {0} attempts")]
    IdExhausted(usize),
    /// A listing with this id is already live
    #[error("listing {0} is already live")]
    Occupied(ListingId),
}

/// Interface for listing stores
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Allocates a fresh identifier and stores the listing built from `draft`.
    ///
    /// Allocation and insertion happen under one lock, so two live listings
    /// never share an id.
    async fn insert_new(&self, draft: Draft, seller: Seller) -> Result<Listing, StoreError>;
    /// Looks up a live listing
    async fn get(&self, id: &ListingId) -> Option<Listing>;
    /// Removes a listing, returning it if it was still live
    async fn remove(&self, id: &ListingId) -> Option<Listing>;
    /// Puts back a listing taken out with [`ListingStore::remove`]
    async fn restore(&self, listing: Listing) -> Result<(), StoreError>;
    /// Number of live listings
    async fn len(&self) -> usize;
}

/// In-process listing store.
#[derive(Default)]
pub struct InMemoryListingStore {
    listings: RwLock<HashMap<ListingId, Listing>>,
}

impl InMemoryListingStore {
    /// Creates an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn insert_with<F>(
        &self,
        draft: Draft,
        seller: Seller,
        mut next_id: F,
    ) -> Result<Listing, StoreError>
    where
        F: FnMut() -> ListingId + Send,
    {
        let mut listings = self.listings.write().await;
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = next_id();
            if listings.contains_key(&id) {
                warn!("Listing id collision on {id}, drawing another");
                continue;
            }
            let listing = Listing::from_draft(id.clone(), draft, seller);
            listings.insert(id, listing.clone());
            debug!("Stored listing {} ({} live)", listing.id, listings.len());
            return Ok(listing);
        }
        Err(StoreError::IdExhausted(MAX_ID_ATTEMPTS))
    }
}

#[async_trait]
impl ListingStore for InMemoryListingStore {
    async fn insert_new(&self, draft: Draft, seller: Seller) -> Result<Listing, StoreError> {
        self.insert_with(draft, seller, ListingId::generate).await
    }

    async fn get(&self, id: &ListingId) -> Option<Listing> {
        self.listings.read().await.get(id).cloned()
    }

    async fn remove(&self, id: &ListingId) -> Option<Listing> {
        self.listings.write().await.remove(id)
    }

    async fn restore(&self, listing: Listing) -> Result<(), StoreError> {
        let mut listings = self.listings.write().await;
        if listings.contains_key(&listing.id) {
            return Err(StoreError::Occupied(listing.id));
        }
        listings.insert(listing.id.clone(), listing);
        Ok(())
    }

    async fn len(&self) -> usize {
        self.listings.read().await.len()
    }
}
