use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{info, warn};

use crate::app::Result;
use crate::domain::{ContentSource, PageContent};
use crate::fetcher::retry::{RetryPolicy, Sleeper, TokioSleeper};
use crate::fetcher::{FetchedPage, Fetcher};
use crate::scraper::{ContentExtractor, ScrapeError, ScraperConfig};

/// Static fetcher: one GET per attempt with a browser-like user agent
pub struct HttpFetcher {
    client: Client,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    extractor: ContentExtractor,
}

impl HttpFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .gzip(true)
            .brotli(true)
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            policy: RetryPolicy::fixed(config.max_retries, config.retry_delay()),
            sleeper: Arc::new(TokioSleeper),
            extractor: ContentExtractor::from_config(config),
        })
    }

    /// Replace the delay source used between attempts
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    async fn get_markup(&self, url: &str, attempt: u32) -> std::result::Result<String, ScrapeError> {
        info!(
            "Fetching {} (attempt {}/{})",
            url, attempt, self.policy.max_attempts
        );

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} returned HTTP {}", url, status.as_u16());
            return Err(ScrapeError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response.text().await.map_err(|e| classify(url, e))
    }
}

fn classify(url: &str, e: reqwest::Error) -> ScrapeError {
    if e.is_timeout() {
        ScrapeError::Timeout(format!("{url}: {e}"))
    } else {
        ScrapeError::Network {
            url: url.to_string(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<FetchedPage, ScrapeError> {
        url::Url::parse(url).map_err(|e| ScrapeError::InvalidUrl(format!("{url}: {e}")))?;

        let html = self
            .policy
            .run(
                self.sleeper.as_ref(),
                |attempt| self.get_markup(url, attempt),
                ScrapeError::is_transient,
            )
            .await
            .inspect_err(|e| warn!("Static fetch of {} failed: {}", url, e))?;

        let text = self.extractor.extract_text(&html);
        let text_len = text.chars().count();
        let too_short = text_len < self.extractor.min_text_length();
        let js_shell = self.extractor.looks_like_js_shell(&html, text_len);

        if too_short {
            warn!(
                "Suspiciously short content from {}: {} characters",
                url, text_len
            );
        }
        info!("Successfully fetched {}: {} characters", url, text_len);

        let mut page = PageContent::new(url, text, ContentSource::Static);
        page.metadata = self.extractor.extract_metadata(&html);

        Ok(FetchedPage {
            page,
            too_short,
            js_shell,
        })
    }
}
