use chrono::{DateTime, Utc};

/// A user's subscription to a feed, with both names resolved.
#[derive(Debug, Clone)]
pub struct FeedFollow {
    pub id: i64,
    pub user_id: i64,
    pub feed_id: i64,
    pub user_name: String,
    pub feed_name: String,
    pub feed_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
