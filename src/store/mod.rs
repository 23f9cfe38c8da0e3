pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::{Feed, FeedFollow, Post, PostWithFeed, User};

pub use sqlite::SqliteStore;

/// Persistence boundary for users, feeds and posts.
///
/// Constraint violations surface as typed errors so callers never inspect
/// driver messages: `DuplicateUser`, `DuplicateFeed` and `DuplicateUrl`.
pub trait Store {
    // User operations
    fn add_user(&self, user: &User) -> Result<i64>;
    fn get_user(&self, id: i64) -> Result<Option<User>>;
    fn get_user_by_name(&self, name: &str) -> Result<Option<User>>;
    fn get_all_users(&self) -> Result<Vec<User>>;

    // Feed operations
    fn add_feed(&self, feed: &Feed) -> Result<i64>;
    fn get_feed(&self, id: i64) -> Result<Option<Feed>>;
    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>>;
    fn get_all_feeds(&self) -> Result<Vec<Feed>>;

    /// Atomically pick the least-recently-fetched feed (never-fetched first)
    /// and stamp it fetched at `now`. Returns the row as it was before the
    /// stamp, or `NoFeeds` when nothing is registered.
    fn claim_next_feed(&self, now: DateTime<Utc>) -> Result<Feed>;

    /// Stamp a known feed fetched. `last_fetched_at` never moves backwards.
    fn mark_feed_fetched(&self, id: i64, now: DateTime<Utc>) -> Result<()>;

    // Follow operations
    /// Subscribe a user to a feed, failing with `AlreadyFollowing` when the
    /// pair is already stored.
    fn follow_feed(&self, user_id: i64, feed_id: i64) -> Result<FeedFollow>;
    /// Fails with `NotFollowing` when there is nothing to remove.
    fn unfollow_feed(&self, user_id: i64, feed_id: i64) -> Result<()>;
    fn get_follows_for_user(&self, user_id: i64) -> Result<Vec<FeedFollow>>;

    // Post operations
    /// Insert a post, failing with `DuplicateUrl` when its URL is stored.
    fn create_post(&self, post: &Post) -> Result<()>;
    fn get_post_by_url(&self, url: &str) -> Result<Option<Post>>;
    /// Newest posts from the feeds `user_id` follows, undated posts last.
    fn get_posts_for_user(&self, user_id: i64, limit: usize) -> Result<Vec<PostWithFeed>>;

    /// Remove every user; feeds, follows and posts go with them by cascade.
    fn reset(&self) -> Result<()>;
}
