use std::sync::Arc;

use chrono::Utc;

use crate::app::Result;
use crate::domain::Feed;
use crate::store::Store;

/// Picks which feed to poll next.
///
/// A feed is stamped fetched when it is claimed, before any network
/// traffic, so a slow or failing feed cannot hold up the rotation. A
/// failed fetch is not retried early; the feed waits for its next turn.
pub struct FeedScheduler<S: Store> {
    store: Arc<S>,
}

impl<S: Store> FeedScheduler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Claim the least-recently-fetched feed.
    ///
    /// The returned feed carries its `last_fetched_at` from before this
    /// claim. Fails with `NoFeeds` when nothing is registered.
    pub fn next_feed(&self) -> Result<Feed> {
        self.store.claim_next_feed(Utc::now())
    }
}
