//! Turns raw feed items into stored posts.
//!
//! Each item is handled on its own: an unparsable date only drops the
//! published timestamp, a URL that is already stored is skipped quietly,
//! and any other store failure is logged without aborting the batch.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::app::GatorError;
use crate::domain::{Post, RawItem};
use crate::store::Store;

/// Per-batch tally. `processed` counts every item examined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub processed: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub failed: usize,
}

pub struct PostIngester<S: Store> {
    store: Arc<S>,
}

impl<S: Store> Clone for PostIngester<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Store> PostIngester<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn ingest(&self, feed_id: i64, items: &[RawItem]) -> IngestReport {
        self.ingest_at(feed_id, items, Utc::now())
    }

    pub fn ingest_at(&self, feed_id: i64, items: &[RawItem], now: DateTime<Utc>) -> IngestReport {
        let mut report = IngestReport::default();

        for item in items {
            report.processed += 1;

            let Some(link) = item.link.as_deref() else {
                tracing::warn!("Skipping \"{}\": item has no link", item.display_title());
                report.failed += 1;
                continue;
            };

            let mut post = Post::new(feed_id, item.title.clone(), link.to_string(), now);
            post.description = item.description.clone();
            post.published_at = item.pub_date.as_deref().and_then(parse_pub_date);

            match self.store.create_post(&post) {
                Ok(()) => report.inserted += 1,
                Err(GatorError::DuplicateUrl(url)) => {
                    tracing::debug!("Post already stored: {}", url);
                    report.duplicates += 1;
                }
                Err(e) => {
                    tracing::warn!("Couldn't create post {}: {}", post.url, e);
                    report.failed += 1;
                }
            }
        }

        report
    }
}

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Everything after the `Ddd, ` prefix of the RFC 1123 numeric-zone layout.
const PUB_DATE_BODY: &str = "%d %b %Y %H:%M:%S %z";

/// Parse a `pubDate` in the fixed RFC 1123 numeric-zone layout.
///
/// The weekday must be one of the seven abbreviations; whether it agrees
/// with the date is not checked.
pub fn parse_pub_date(raw: &str) -> Option<DateTime<Utc>> {
    let (weekday, rest) = raw.trim().split_once(", ")?;
    if !WEEKDAYS.contains(&weekday) {
        return None;
    }

    DateTime::parse_from_str(rest, PUB_DATE_BODY)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
