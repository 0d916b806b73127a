use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::app::Result;
use crate::domain::ContentSource;
use crate::fetcher::{Fetcher, HttpFetcher};
use crate::scraper::chrome::ChromeRenderer;
use crate::scraper::config::ScraperConfig;
use crate::scraper::visual::{TesseractOcr, VisualExtractor};
use crate::scraper::{Renderer, ScrapeError, ScrapeOutcome};

/// Static fetch first, headless render only when the static text is unusable
pub struct ScrapeOrchestrator {
    fetcher: Arc<dyn Fetcher>,
    renderer: Option<Arc<dyn Renderer>>,
    visual: Option<VisualExtractor>,
}

impl ScrapeOrchestrator {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        renderer: Option<Arc<dyn Renderer>>,
        visual: Option<VisualExtractor>,
    ) -> Self {
        Self {
            fetcher,
            renderer,
            visual,
        }
    }

    /// Wire the production fetcher, renderer and OCR engine from configuration
    pub fn from_config(config: &ScraperConfig) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(config)?);

        let renderer: Option<Arc<dyn Renderer>> = config
            .enable_dynamic
            .then(|| Arc::new(ChromeRenderer::new(config.clone())) as Arc<dyn Renderer>);

        let visual = (config.enable_dynamic && config.enable_ocr)
            .then(|| VisualExtractor::new(Arc::new(TesseractOcr::from_config(config))));

        Ok(Self::new(fetcher, renderer, visual))
    }

    /// Acquire the text of `url`.
    ///
    /// A usable static result is returned without touching the renderer. The
    /// renderer runs at most once, and only after the static fetch finished.
    pub async fn scrape(&self, url: &str) -> ScrapeOutcome {
        let fetched = self.fetcher.fetch(url).await;

        let reason = match &fetched {
            Ok(f) if !f.needs_render() => None,
            Ok(f) if f.js_shell => Some("page looks like a JavaScript shell".to_string()),
            Ok(f) => Some(format!(
                "static text is only {} characters",
                f.page.text_len()
            )),
            Err(e) => Some(format!("static fetch failed: {}", e)),
        };

        let (Some(reason), Some(renderer)) = (reason, &self.renderer) else {
            return fetched.map(|f| f.page);
        };

        info!("Falling back to dynamic render for {}: {}", url, reason);

        match renderer.render(url).await {
            Ok(mut page) => {
                if let (Some(visual), Some(screenshot)) = (&self.visual, &page.screenshot) {
                    let merged = visual.extract_and_merge(screenshot, &page.text).await;
                    if merged != page.text {
                        page.text = merged;
                        page.source = ContentSource::VisualMerged;
                    }
                }
                Ok(page)
            }
            Err(render_err) => match fetched {
                Ok(f) => {
                    warn!(
                        "Dynamic render of {} failed ({}), keeping static text",
                        url, render_err
                    );
                    Ok(f.page)
                }
                Err(_) => Err(render_err),
            },
        }
    }

    /// [`scrape`](Self::scrape) under a caller-level deadline.
    ///
    /// On expiry the in-flight future is dropped, which closes its HTTP
    /// connections and kills any browser it launched.
    pub async fn scrape_with_timeout(&self, url: &str, timeout: Duration) -> ScrapeOutcome {
        match tokio::time::timeout(timeout, self.scrape(url)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!("Scraping {} exceeded {}s", url, timeout.as_secs());
                Err(ScrapeError::Timeout(format!(
                    "{url}: scrape exceeded {}s",
                    timeout.as_secs()
                )))
            }
        }
    }
}
