//! # gator
//!
//! Polls RSS feeds on behalf of registered users and stores every post
//! exactly once.
//!
//! ## Architecture
//!
//! ```text
//! PollLoop tick → FeedScheduler (claim) → Fetcher → Normalizer → PostIngester → Store
//! ```
//!
//! - [`scheduler`]: least-recently-fetched feed selection with claim-then-fetch
//! - [`fetcher`]: time-bounded HTTP retrieval
//! - [`normalizer`]: RSS (with Atom/JSON Feed fallback) to raw items
//! - [`ingest`]: per-item post creation with URL deduplication
//! - [`poller`]: the single-flight polling loop and its stop handle
//!
//! ## Quick Start
//!
//! ```bash
//! gator register alice
//! gator addfeed "Rust Blog" https://blog.rust-lang.org/feed.xml
//! gator follow https://this-week-in-rust.org/rss.xml
//! gator agg 1m30s
//! gator browse 5
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together config,
/// store and fetcher.
pub mod app;

/// Command-line interface using clap.
pub mod cli;

/// Configuration file and interval parsing.
pub mod config;

/// Core domain models: [`User`](domain::User), [`Feed`](domain::Feed),
/// [`FeedFollow`](domain::FeedFollow), [`Post`](domain::Post) and the pre-ingestion [`RawItem`](domain::RawItem).
pub mod domain;

/// HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): async trait for feed retrieval
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
pub mod fetcher;

/// Post ingestion with per-item failure isolation.
pub mod ingest;

/// Feed document parsing.
pub mod normalizer;

/// Fixed-interval polling loop.
pub mod poller;

/// Feed rotation.
pub mod scheduler;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
