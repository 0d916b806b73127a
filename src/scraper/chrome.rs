use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::CaptureScreenshotFormat;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::domain::{ContentSource, PageContent};
use crate::fetcher::{RetryPolicy, TokioSleeper};
use crate::scraper::config::ScraperConfig;
use crate::scraper::extractor::ContentExtractor;
use crate::scraper::{Renderer, ScrapeError, ScrapeOutcome};

/// Upper bound on the network-idle wait once navigation has returned
const MAX_IDLE_WAIT: Duration = Duration::from_secs(15);

/// Headroom between our own deadlines and the CDP request timeout
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

/// How a navigation attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Navigation {
    Loaded,
    TimedOut,
}

/// Classify the result of `goto` under the soft navigation deadline.
///
/// `None` means our deadline fired first. A CDP timeout counts the same:
/// both continue with whatever the page has loaded so far.
fn classify_navigation(
    result: Option<Result<(), CdpError>>,
    url: &str,
    nav_timeout: Duration,
) -> Result<Navigation, ScrapeError> {
    match result {
        Some(Ok(())) => Ok(Navigation::Loaded),
        None | Some(Err(CdpError::Timeout)) => {
            warn!(
                "Navigation to {} exceeded {}s, continuing with partial content",
                url,
                nav_timeout.as_secs()
            );
            Ok(Navigation::TimedOut)
        }
        Some(Err(e)) => Err(ScrapeError::Render(format!("Navigation failed: {}", e))),
    }
}

/// CDP request timeout that outlasts every wait issued through one request
fn request_timeout(config: &ScraperConfig) -> Duration {
    config
        .nav_timeout()
        .max(config.selector_timeout())
        .max(MAX_IDLE_WAIT)
        + REQUEST_TIMEOUT_MARGIN
}

/// Headless Chrome renderer using chromiumoxide.
///
/// Every call launches its own browser process, so concurrent renders share
/// nothing. The process lives in a [`RenderSession`] that is closed on every
/// return path and killed on drop if the render future is cancelled.
pub struct ChromeRenderer {
    config: ScraperConfig,
    extractor: ContentExtractor,
    launch_policy: RetryPolicy,
}

impl ChromeRenderer {
    pub fn new(config: ScraperConfig) -> Self {
        let extractor = ContentExtractor::from_config(&config);
        Self {
            config,
            extractor,
            launch_policy: RetryPolicy::fixed(2, Duration::from_secs(1)),
        }
    }

    /// Create a new Chrome renderer with default configuration
    pub fn with_defaults() -> Self {
        Self::new(ScraperConfig::default())
    }

    async fn render_in(&self, session: &RenderSession, url: &str) -> ScrapeOutcome {
        let page = session
            .browser
            .new_page("about:blank")
            .await
            .map_err(|e| ScrapeError::Render(format!("Failed to create page: {}", e)))?;

        page.set_user_agent(self.config.user_agent.as_str())
            .await
            .map_err(|e| ScrapeError::Render(format!("Failed to set user agent: {}", e)))?;

        let result = self.drive_page(&page, url).await;

        if let Err(e) = page.close().await {
            debug!("Failed to close page for {}: {}", url, e);
        }
        result
    }

    async fn drive_page(&self, page: &Page, url: &str) -> ScrapeOutcome {
        let nav_timeout = self.config.nav_timeout();
        let started = Instant::now();

        let goto = tokio::time::timeout(nav_timeout, page.goto(url))
            .await
            .ok()
            .map(|r| r.map(|_| ()));
        let nav_timed_out = classify_navigation(goto, url, nav_timeout)? == Navigation::TimedOut;

        if !nav_timed_out {
            let remaining = nav_timeout.saturating_sub(started.elapsed()).min(MAX_IDLE_WAIT);
            self.wait_for_network_idle(page, remaining).await;
        }

        self.wait_for_subscription_selector(page, url).await;
        self.scroll_full_page(page).await;

        let screenshot = match tokio::time::timeout(
            nav_timeout,
            page.screenshot(
                ScreenshotParams::builder()
                    .format(CaptureScreenshotFormat::Png)
                    .full_page(true)
                    .build(),
            ),
        )
        .await
        {
            Ok(Ok(bytes)) => Some(bytes),
            Ok(Err(e)) => {
                warn!("Screenshot of {} failed: {}", url, e);
                None
            }
            Err(_) => {
                warn!("Screenshot of {} timed out", url);
                None
            }
        };

        let html = page
            .content()
            .await
            .map_err(|e| ScrapeError::Render(format!("Failed to read DOM: {}", e)))?;

        self.page_from_markup(url, &html, screenshot, nav_timed_out)
    }

    async fn wait_for_network_idle(&self, page: &Page, timeout: Duration) {
        let script = self.extractor.network_idle_script(timeout);
        match page.evaluate(script).await {
            Ok(result) => {
                if let Ok(value) = result.into_value::<serde_json::Value>() {
                    let idle = value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false);
                    let waited = value.get("waitedMs").and_then(|v| v.as_u64()).unwrap_or(0);
                    debug!(idle, waited_ms = waited, "Network idle wait finished");
                }
            }
            Err(e) => debug!("Network idle wait failed: {}", e),
        }
    }

    async fn wait_for_subscription_selector(&self, page: &Page, url: &str) {
        if self.config.subscription_selectors.is_empty() {
            return;
        }

        let script = self.extractor.selector_wait_script(
            &self.config.subscription_selectors,
            self.config.selector_timeout(),
        );
        match page.evaluate(script).await {
            Ok(result) => match result.into_value::<bool>() {
                Ok(true) => debug!("Subscription selector present on {}", url),
                _ => debug!(
                    "No subscription selector on {} after {}s",
                    url, self.config.selector_timeout_secs
                ),
            },
            Err(e) => debug!("Selector wait failed on {}: {}", url, e),
        }
    }

    async fn scroll_full_page(&self, page: &Page) {
        let script = self
            .extractor
            .scroll_script(self.config.scroll_step_px, self.config.scroll_pause());
        match page.evaluate(script).await {
            Ok(result) => {
                if let Ok(steps) = result.into_value::<u32>() {
                    debug!("Scrolled page in {} steps", steps);
                }
            }
            Err(e) => warn!("Scrolling failed: {}", e),
        }
    }

    /// Turn the rendered DOM into page content.
    ///
    /// An empty page is a failure: a timeout if navigation never finished,
    /// otherwise too short.
    fn page_from_markup(
        &self,
        url: &str,
        html: &str,
        screenshot: Option<Vec<u8>>,
        nav_timed_out: bool,
    ) -> ScrapeOutcome {
        let text = self.extractor.extract_text(html);
        if text.is_empty() {
            return Err(if nav_timed_out {
                ScrapeError::Timeout(format!("navigation to {url} produced no content"))
            } else {
                ScrapeError::TooShort {
                    url: url.to_string(),
                    len: 0,
                }
            });
        }

        let mut metadata = self.extractor.extract_metadata(html);
        metadata.prices = self.extractor.extract_prices(&text);

        info!(
            "Rendered {}: {} characters, {} prices",
            url,
            text.chars().count(),
            metadata.prices.len()
        );

        let mut page = PageContent::new(url, text, ContentSource::Dynamic);
        page.metadata = metadata;
        page.screenshot = screenshot;
        Ok(page)
    }
}

#[async_trait]
impl Renderer for ChromeRenderer {
    async fn render(&self, url: &str) -> ScrapeOutcome {
        url::Url::parse(url).map_err(|e| ScrapeError::InvalidUrl(format!("{url}: {e}")))?;

        let session = self
            .launch_policy
            .run(
                &TokioSleeper,
                |_| RenderSession::launch(&self.config),
                |_| true,
            )
            .await?;

        let result = self.render_in(&session, url).await;
        session.close().await;
        result
    }
}

/// One browser process and its CDP event loop
struct RenderSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

impl RenderSession {
    async fn launch(config: &ScraperConfig) -> Result<Self, ScrapeError> {
        let mut builder = BrowserConfig::builder()
            .arg("--no-sandbox")
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-software-rasterizer")
            .window_size(config.viewport_width, config.viewport_height)
            .request_timeout(request_timeout(config));

        if !config.headless {
            builder = builder.with_head();
        }

        let browser_config = builder
            .build()
            .map_err(|e| ScrapeError::Render(format!("Failed to build browser config: {}", e)))?;

        let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
            ScrapeError::Render(format!(
                "Failed to launch browser: {}. Is Chrome or Chromium installed and in PATH?",
                e
            ))
        })?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser,
            handler_task,
        })
    }

    async fn close(mut self) {
        if let Err(e) = self.browser.close().await {
            debug!("Browser close failed: {}", e);
        }
        if let Err(e) = self.browser.wait().await {
            debug!("Browser wait failed: {}", e);
        }
        self.handler_task.abort();
    }
}

impl Drop for RenderSession {
    fn drop(&mut self) {
        // Browser's own Drop kills the child process
        self.handler_task.abort();
    }
}
