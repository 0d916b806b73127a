pub mod http_fetcher;
pub mod retry;

use async_trait::async_trait;

use crate::domain::PageContent;
use crate::scraper::ScrapeError;

pub use http_fetcher::HttpFetcher;
pub use retry::{Backoff, RetryPolicy, Sleeper, TokioSleeper};

/// A statically fetched page plus the signals used to decide on a render fallback
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub page: PageContent,
    /// Text came out under the minimum length; a signal, not a failure
    pub too_short: bool,
    /// Markup looks like a client-side shell with nothing rendered server side
    pub js_shell: bool,
}

impl FetchedPage {
    /// Whether the static result should be replaced by a dynamic render
    pub fn needs_render(&self) -> bool {
        self.too_short || self.js_shell
    }
}

#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetch `url` without running scripts and extract its visible text
    async fn fetch(&self, url: &str) -> Result<FetchedPage, ScrapeError>;
}
