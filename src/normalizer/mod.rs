use feed_rs::parser;
use html_escape::decode_html_entities;

use crate::app::{GatorError, Result};
use crate::domain::{FetchedFeed, RawItem};

/// `pubDate` layout: RFC 1123 with a numeric zone.
pub const PUB_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S %z";

#[derive(Clone)]
pub struct Normalizer;

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Parse an RSS document into raw items.
    ///
    /// Atom and JSON Feed documents are accepted as a fallback; their
    /// parsed dates are rendered back into [`PUB_DATE_FORMAT`]. This also
    /// applies to an RSS document the `rss` crate rejects but feed-rs reads,
    /// so any date feed-rs understands (a `GMT` zone included) survives
    /// ingestion on that path.
    pub fn normalize(&self, body: &[u8]) -> Result<FetchedFeed> {
        match rss::Channel::read_from(body) {
            Ok(channel) => Ok(Self::from_channel(&channel)),
            Err(rss_err) => match parser::parse(body) {
                Ok(feed) => Ok(Self::from_feed_rs(feed)),
                Err(_) => Err(GatorError::FeedParse(rss_err.to_string())),
            },
        }
    }

    fn from_channel(channel: &rss::Channel) -> FetchedFeed {
        let items = channel
            .items()
            .iter()
            .map(|item| RawItem {
                title: item.title().map(decode_text).unwrap_or_default(),
                link: item.link().map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
                description: item.description().map(decode_text),
                pub_date: item.pub_date().map(|d| d.trim().to_string()),
            })
            .collect();

        FetchedFeed {
            title: Some(decode_text(channel.title())).filter(|t| !t.is_empty()),
            items,
        }
    }

    fn from_feed_rs(feed: feed_rs::model::Feed) -> FetchedFeed {
        let items = feed
            .entries
            .into_iter()
            .map(|entry| RawItem {
                title: entry
                    .title
                    .map(|t| decode_text(&t.content))
                    .unwrap_or_default(),
                link: entry.links.first().map(|l| l.href.clone()),
                description: entry
                    .summary
                    .map(|s| decode_text(&s.content))
                    .or_else(|| entry.content.and_then(|c| c.body).map(|b| decode_text(&b))),
                pub_date: entry
                    .published
                    .or(entry.updated)
                    .map(|dt| dt.format(PUB_DATE_FORMAT).to_string()),
            })
            .collect();

        FetchedFeed {
            title: feed.title.map(|t| decode_text(&t.content)),
            items,
        }
    }
}

/// Undo HTML escaping left over after XML decoding (`&amp;#39;` and friends).
fn decode_text(s: &str) -> String {
    decode_html_entities(s.trim()).to_string()
}
