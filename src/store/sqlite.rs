use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use rusqlite_migration::{Migrations, M};

use crate::app::{GatorError, Result};
use crate::domain::{Feed, FeedFollow, Post, PostWithFeed, User};
use crate::store::Store;

const USER_COLUMNS: &str = "id, name, created_at, updated_at";
const FEED_COLUMNS: &str = "id, name, url, user_id, last_fetched_at, created_at, updated_at";
const POST_COLUMNS: &str =
    "id, feed_id, title, url, description, published_at, created_at, updated_at";
const FOLLOW_SELECT: &str =
    "SELECT ff.id, ff.user_id, ff.feed_id, u.name, f.name, f.url, ff.created_at, ff.updated_at
     FROM feed_follows ff
     JOIN users u ON u.id = ff.user_id
     JOIN feeds f ON f.id = ff.feed_id";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![
            M::up(include_str!("../../migrations/001-initial/up.sql")),
            M::up(include_str!("../../migrations/002-feed-follows/up.sql")),
        ]);

        let mut conn = self.conn()?;

        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| GatorError::Other(format!("Migration failed: {}", e)))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            GatorError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    /// Fixed-width UTC text, so string order in SQL equals time order.
    fn format_datetime(dt: &DateTime<Utc>) -> String {
        dt.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn required_datetime(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
        Ok(row
            .get::<_, String>(idx)
            .ok()
            .and_then(|s| Self::parse_datetime(&s))
            .unwrap_or_else(Utc::now))
    }

    fn optional_datetime(row: &Row, idx: usize) -> rusqlite::Result<Option<DateTime<Utc>>> {
        Ok(row
            .get::<_, Option<String>>(idx)?
            .and_then(|s| Self::parse_datetime(&s)))
    }

    fn user_from_row(row: &Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get(0)?,
            name: row.get(1)?,
            created_at: Self::required_datetime(row, 2)?,
            updated_at: Self::required_datetime(row, 3)?,
        })
    }

    fn feed_from_row(row: &Row) -> rusqlite::Result<Feed> {
        Ok(Feed {
            id: row.get(0)?,
            name: row.get(1)?,
            url: row.get(2)?,
            user_id: row.get(3)?,
            last_fetched_at: Self::optional_datetime(row, 4)?,
            created_at: Self::required_datetime(row, 5)?,
            updated_at: Self::required_datetime(row, 6)?,
        })
    }

    fn post_from_row(row: &Row) -> rusqlite::Result<Post> {
        Ok(Post {
            id: row.get(0)?,
            feed_id: row.get(1)?,
            title: row.get(2)?,
            url: row.get(3)?,
            description: row.get(4)?,
            published_at: Self::optional_datetime(row, 5)?,
            created_at: Self::required_datetime(row, 6)?,
            updated_at: Self::required_datetime(row, 7)?,
        })
    }

    fn post_with_feed_from_row(row: &Row) -> rusqlite::Result<PostWithFeed> {
        Ok(PostWithFeed {
            post: Self::post_from_row(row)?,
            feed_name: row.get(8)?,
        })
    }

    fn follow_from_row(row: &Row) -> rusqlite::Result<FeedFollow> {
        Ok(FeedFollow {
            id: row.get(0)?,
            user_id: row.get(1)?,
            feed_id: row.get(2)?,
            user_name: row.get(3)?,
            feed_name: row.get(4)?,
            feed_url: row.get(5)?,
            created_at: Self::required_datetime(row, 6)?,
            updated_at: Self::required_datetime(row, 7)?,
        })
    }
}

#[cfg(test)]
impl SqliteStore {
    pub fn get_posts_by_feed(&self, feed_id: i64) -> Result<Vec<Post>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE feed_id = ?1
             ORDER BY published_at DESC, created_at DESC"
        ))?;
        let posts = stmt
            .query_map(params![feed_id], Self::post_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(posts)
    }

    pub fn count_posts(&self) -> Result<i64> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM posts", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn constraint_code(err: &rusqlite::Error) -> Option<i32> {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            Some(e.extended_code)
        }
        _ => None,
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    constraint_code(err) == Some(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE)
}

fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    constraint_code(err) == Some(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY)
}

impl Store for SqliteStore {
    fn add_user(&self, user: &User) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO users (name, created_at, updated_at) VALUES (?1, ?2, ?3)",
            params![
                user.name,
                Self::format_datetime(&user.created_at),
                Self::format_datetime(&user.updated_at)
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                GatorError::DuplicateUser(user.name.clone())
            } else {
                e.into()
            }
        })?;

        Ok(conn.last_insert_rowid())
    }

    fn get_user(&self, id: i64) -> Result<Option<User>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id],
                Self::user_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn get_user_by_name(&self, name: &str) -> Result<Option<User>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE name = ?1"),
                params![name],
                Self::user_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn get_all_users(&self) -> Result<Vec<User>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY name"))?;
        let users = stmt
            .query_map([], Self::user_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(users)
    }

    fn add_feed(&self, feed: &Feed) -> Result<i64> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO feeds (name, url, user_id, last_fetched_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                feed.name,
                feed.url,
                feed.user_id,
                feed.last_fetched_at.as_ref().map(Self::format_datetime),
                Self::format_datetime(&feed.created_at),
                Self::format_datetime(&feed.updated_at)
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                GatorError::DuplicateFeed(feed.url.clone())
            } else if is_foreign_key_violation(&e) {
                GatorError::UserNotFound(feed.user_id.to_string())
            } else {
                e.into()
            }
        })?;

        Ok(conn.last_insert_rowid())
    }

    fn get_feed(&self, id: i64) -> Result<Option<Feed>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                &format!("SELECT {FEED_COLUMNS} FROM feeds WHERE id = ?1"),
                params![id],
                Self::feed_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn get_feed_by_url(&self, url: &str) -> Result<Option<Feed>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                &format!("SELECT {FEED_COLUMNS} FROM feeds WHERE url = ?1"),
                params![url],
                Self::feed_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn get_all_feeds(&self) -> Result<Vec<Feed>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {FEED_COLUMNS} FROM feeds ORDER BY name, url"
        ))?;
        let feeds = stmt
            .query_map([], Self::feed_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(feeds)
    }

    fn claim_next_feed(&self, now: DateTime<Utc>) -> Result<Feed> {
        let mut conn = self.conn()?;

        // IMMEDIATE takes the write lock up front: another connection cannot
        // select the same row between our SELECT and UPDATE.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        // NULLs sort first under ASC.
        let feed = tx
            .query_row(
                &format!(
                    "SELECT {FEED_COLUMNS} FROM feeds
                     ORDER BY last_fetched_at ASC, created_at ASC, id ASC
                     LIMIT 1"
                ),
                [],
                Self::feed_from_row,
            )
            .optional()?
            .ok_or(GatorError::NoFeeds)?;

        let stamp = Self::format_datetime(&now);
        tx.execute(
            "UPDATE feeds
             SET last_fetched_at = MAX(COALESCE(last_fetched_at, ?1), ?1),
                 updated_at = ?1
             WHERE id = ?2",
            params![stamp, feed.id],
        )?;
        tx.commit()?;

        Ok(feed)
    }

    fn mark_feed_fetched(&self, id: i64, now: DateTime<Utc>) -> Result<()> {
        let conn = self.conn()?;

        let updated = conn.execute(
            "UPDATE feeds
             SET last_fetched_at = MAX(COALESCE(last_fetched_at, ?1), ?1),
                 updated_at = ?1
             WHERE id = ?2",
            params![Self::format_datetime(&now), id],
        )?;

        if updated == 0 {
            return Err(GatorError::FeedNotFound(id.to_string()));
        }
        Ok(())
    }

    fn follow_feed(&self, user_id: i64, feed_id: i64) -> Result<FeedFollow> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO feed_follows (user_id, feed_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3)",
            params![user_id, feed_id, Self::format_datetime(&Utc::now())],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                GatorError::AlreadyFollowing(feed_id.to_string())
            } else if is_foreign_key_violation(&e) {
                let user_known = conn
                    .query_row("SELECT 1 FROM users WHERE id = ?1", params![user_id], |_| Ok(()))
                    .optional()
                    .ok()
                    .flatten()
                    .is_some();
                if user_known {
                    GatorError::FeedNotFound(feed_id.to_string())
                } else {
                    GatorError::UserNotFound(user_id.to_string())
                }
            } else {
                e.into()
            }
        })?;

        let follow = conn.query_row(
            &format!("{FOLLOW_SELECT} WHERE ff.id = ?1"),
            params![conn.last_insert_rowid()],
            Self::follow_from_row,
        )?;

        Ok(follow)
    }

    fn unfollow_feed(&self, user_id: i64, feed_id: i64) -> Result<()> {
        let conn = self.conn()?;

        let deleted = conn.execute(
            "DELETE FROM feed_follows WHERE user_id = ?1 AND feed_id = ?2",
            params![user_id, feed_id],
        )?;

        if deleted == 0 {
            return Err(GatorError::NotFollowing(feed_id.to_string()));
        }
        Ok(())
    }

    fn get_follows_for_user(&self, user_id: i64) -> Result<Vec<FeedFollow>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(&format!(
            "{FOLLOW_SELECT} WHERE ff.user_id = ?1 ORDER BY f.name, f.url"
        ))?;
        let follows = stmt
            .query_map(params![user_id], Self::follow_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(follows)
    }

    fn create_post(&self, post: &Post) -> Result<()> {
        let conn = self.conn()?;

        conn.execute(
            "INSERT INTO posts (id, feed_id, title, url, description, published_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                post.id,
                post.feed_id,
                post.title,
                post.url,
                post.description,
                post.published_at.as_ref().map(Self::format_datetime),
                Self::format_datetime(&post.created_at),
                Self::format_datetime(&post.updated_at)
            ],
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                GatorError::DuplicateUrl(post.url.clone())
            } else if is_foreign_key_violation(&e) {
                GatorError::FeedNotFound(post.feed_id.to_string())
            } else {
                e.into()
            }
        })?;

        Ok(())
    }

    fn get_post_by_url(&self, url: &str) -> Result<Option<Post>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                &format!("SELECT {POST_COLUMNS} FROM posts WHERE url = ?1"),
                params![url],
                Self::post_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn get_posts_for_user(&self, user_id: i64, limit: usize) -> Result<Vec<PostWithFeed>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare(
            "SELECT p.id, p.feed_id, p.title, p.url, p.description, p.published_at, p.created_at, p.updated_at, f.name
             FROM posts p
             JOIN feeds f ON p.feed_id = f.id
             JOIN feed_follows ff ON ff.feed_id = f.id
             WHERE ff.user_id = ?1
             ORDER BY p.published_at DESC, p.created_at DESC
             LIMIT ?2",
        )?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let posts = stmt
            .query_map(params![user_id, limit], Self::post_with_feed_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(posts)
    }

    fn reset(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute("DELETE FROM users", [])?;
        Ok(())
    }
}
