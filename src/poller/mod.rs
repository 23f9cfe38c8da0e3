//! Fixed-interval feed polling.
//!
//! One cycle is claim → fetch → ingest for a single feed. Cycles never
//! overlap: the loop awaits each cycle before waiting on the next tick, and
//! a tick missed during a long cycle fires as soon as that cycle ends.
//! Cycle errors are logged and polling continues. A stop request is
//! honoured between cycles; a cycle already in flight runs to completion.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::app::{GatorError, Result};
use crate::config::format_duration;
use crate::domain::Feed;
use crate::fetcher::Fetcher;
use crate::ingest::{IngestReport, PostIngester};
use crate::scheduler::FeedScheduler;
use crate::store::Store;

/// Outcome of one successful cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// The feed as it was when claimed.
    pub feed: Feed,
    pub items_found: usize,
    pub ingest: IngestReport,
}

pub struct PollLoop<S: Store> {
    scheduler: FeedScheduler<S>,
    fetcher: Arc<dyn Fetcher + Send + Sync>,
    ingester: PostIngester<S>,
    interval: Duration,
}

impl<S: Store + Send + Sync + 'static> PollLoop<S> {
    pub fn new(store: Arc<S>, fetcher: Arc<dyn Fetcher + Send + Sync>, interval: Duration) -> Self {
        Self {
            scheduler: FeedScheduler::new(store.clone()),
            fetcher,
            ingester: PostIngester::new(store),
            interval,
        }
    }

    /// Run a single cycle.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let feed = self.scheduler.next_feed()?;
        let fetched = self.fetcher.fetch(&feed.url).await?;
        if let Some(title) = fetched.title.as_deref() {
            tracing::debug!("Fetched \"{}\" from {}", title, feed.url);
        }
        let ingest = self.ingester.ingest(feed.id, &fetched.items);

        Ok(CycleReport {
            feed,
            items_found: fetched.items.len(),
            ingest,
        })
    }

    async fn cycle_and_log(&self) {
        match self.run_cycle().await {
            Ok(report) => {
                tracing::info!(
                    "Feed {} collected, {} posts found ({} new)",
                    report.feed.display_title(),
                    report.items_found,
                    report.ingest.inserted
                );
            }
            Err(GatorError::NoFeeds) => {
                tracing::info!("No feeds to fetch");
            }
            Err(e) if e.is_network() => {
                tracing::warn!("Error fetching feed: {}", e);
            }
            Err(e) => {
                tracing::warn!("Collection cycle failed: {}", e);
            }
        }
    }

    /// Poll until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Collecting feeds every {}", format_duration(self.interval));

        let mut timer = interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = timer.tick() => {
                    self.cycle_and_log().await;
                }
            }
        }

        tracing::info!("Poll loop stopped");
    }

    /// Start polling on a background task.
    ///
    /// Dropping the returned handle also stops the loop.
    pub fn spawn(self) -> PollHandle {
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(self.run(rx));
        PollHandle { shutdown: tx, task }
    }
}

/// Control side of a spawned [`PollLoop`].
pub struct PollHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl PollHandle {
    /// Ask the loop to stop after the current cycle, without waiting.
    pub fn stop(&self) {
        // Fails only when the loop has already exited.
        let _ = self.shutdown.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the loop and wait for it to exit.
    pub async fn shutdown(self) -> Result<()> {
        self.stop();
        self.task
            .await
            .map_err(|e| GatorError::Other(format!("Poll loop task failed: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Instant;

    use async_trait::async_trait;

    use crate::domain::{FetchedFeed, RawItem, User};
    use crate::store::SqliteStore;

    #[derive(Default)]
    struct StubFetcher {
        items: Vec<RawItem>,
        fail: bool,
        delay: Duration,
        started: AtomicUsize,
        finished: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        spans: Mutex<Vec<(Instant, Instant)>>,
    }

    impl StubFetcher {
        fn returning(items: Vec<RawItem>) -> Self {
            Self {
                items,
                ..Default::default()
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn slow(delay: Duration) -> Self {
            Self {
                delay,
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl Fetcher for StubFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedFeed> {
            let start = Instant::now();
            self.started.fetch_add(1, Ordering::SeqCst);
            let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.finished.fetch_add(1, Ordering::SeqCst);
            self.spans.lock().unwrap().push((start, Instant::now()));

            if self.fail {
                return Err(GatorError::HttpStatus {
                    url: url.to_string(),
                    status: 503,
                });
            }
            Ok(FetchedFeed {
                items: self.items.clone(),
                ..Default::default()
            })
        }
    }

    fn store_with_feed() -> (Arc<SqliteStore>, i64) {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let user_id = store.add_user(&User::new("alice".into())).unwrap();
        let feed_id = store
            .add_feed(&Feed::new(
                "news".into(),
                "https://example.com/feed.xml".into(),
                user_id,
            ))
            .unwrap();
        (store, feed_id)
    }

    fn poll_loop(
        store: Arc<SqliteStore>,
        fetcher: Arc<StubFetcher>,
        every: Duration,
    ) -> PollLoop<SqliteStore> {
        let fetcher: Arc<dyn Fetcher + Send + Sync> = fetcher;
        PollLoop::new(store, fetcher, every)
    }

    #[tokio::test]
    async fn test_cycle_ingests_items() {
        let (store, feed_id) = store_with_feed();
        let fetcher = Arc::new(StubFetcher::returning(vec![
            RawItem::new("One", "https://example.com/1"),
            RawItem::new("Two", "https://example.com/2"),
        ]));
        let poller = poll_loop(store.clone(), fetcher, Duration::from_secs(60));

        let report = poller.run_cycle().await.unwrap();
        assert_eq!(report.feed.id, feed_id);
        assert_eq!(report.items_found, 2);
        assert_eq!(report.ingest.inserted, 2);

        let again = poller.run_cycle().await.unwrap();
        assert_eq!(again.ingest.inserted, 0);
        assert_eq!(again.ingest.duplicates, 2);
        assert_eq!(store.count_posts().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_cycle_without_feeds() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let fetcher = Arc::new(StubFetcher::returning(vec![]));
        let poller = poll_loop(store, fetcher.clone(), Duration::from_secs(60));

        let err = poller.run_cycle().await.unwrap_err();
        assert!(matches!(err, GatorError::NoFeeds));
        assert_eq!(fetcher.started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_claim_survives_failed_fetch() {
        let (store, feed_id) = store_with_feed();
        let fetcher = Arc::new(StubFetcher::failing());
        let poller = poll_loop(store.clone(), fetcher, Duration::from_secs(60));

        let err = poller.run_cycle().await.unwrap_err();
        assert!(err.is_network());

        let feed = store.get_feed(feed_id).unwrap().unwrap();
        assert!(feed.last_fetched_at.is_some());
        assert_eq!(store.count_posts().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_loop_keeps_going_after_errors() {
        let (store, _) = store_with_feed();
        let fetcher = Arc::new(StubFetcher::failing());
        let handle = poll_loop(store, fetcher.clone(), Duration::from_millis(10)).spawn();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!handle.is_finished());
        handle.shutdown().await.unwrap();

        assert!(fetcher.finished.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_loop_survives_empty_store() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let fetcher = Arc::new(StubFetcher::returning(vec![]));
        let handle = poll_loop(store, fetcher.clone(), Duration::from_millis(10)).spawn();

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!handle.is_finished());
        handle.shutdown().await.unwrap();

        assert_eq!(fetcher.started.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_single_flight() {
        let (store, _) = store_with_feed();
        let fetcher = Arc::new(StubFetcher::slow(Duration::from_millis(100)));
        let handle = poll_loop(store, fetcher.clone(), Duration::from_millis(20)).spawn();

        tokio::time::sleep(Duration::from_millis(450)).await;
        handle.shutdown().await.unwrap();

        assert_eq!(fetcher.max_in_flight.load(Ordering::SeqCst), 1);

        let spans = fetcher.spans.lock().unwrap().clone();
        assert!(spans.len() >= 3, "expected several cycles, got {}", spans.len());
        for pair in spans.windows(2) {
            let (_, prev_end) = pair[0];
            let (next_start, _) = pair[1];
            assert!(next_start >= prev_end);
            // The overdue tick fires right away instead of waiting a period.
            assert!(next_start.duration_since(prev_end) < Duration::from_millis(80));
        }
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_cycle_in_flight() {
        let (store, _) = store_with_feed();
        let fetcher = Arc::new(StubFetcher::slow(Duration::from_millis(100)));
        let handle = poll_loop(store, fetcher.clone(), Duration::from_secs(60)).spawn();

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(fetcher.started.load(Ordering::SeqCst), 1);

        handle.shutdown().await.unwrap();
        assert_eq!(fetcher.finished.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fetcher.started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dropping_handle_stops_loop() {
        let store = Arc::new(SqliteStore::in_memory().unwrap());
        let fetcher = Arc::new(StubFetcher::returning(vec![]));
        let (tx, rx) = watch::channel(false);
        let task = tokio::spawn(poll_loop(store, fetcher, Duration::from_millis(10)).run(rx));

        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("loop should exit once the sender is gone")
            .unwrap();
    }
}
