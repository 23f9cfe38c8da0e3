pub mod http_fetcher;

use async_trait::async_trait;

use crate::app::Result;
use crate::domain::FetchedFeed;

pub use http_fetcher::HttpFetcher;

/// Retrieve and parse one feed document.
///
/// All-or-nothing: either every item of the document is returned, or an
/// error describing why the fetch (`Timeout`, `Http`, `HttpStatus`) or the
/// parse (`FeedParse`) failed.
#[async_trait]
pub trait Fetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedFeed>;
}
