use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for page acquisition (static fetch, dynamic render, OCR)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Static request timeout in seconds (default: 30)
    pub request_timeout_secs: u64,

    /// Total static fetch attempts, including the first (default: 3)
    pub max_retries: u32,

    /// Fixed pause between static fetch attempts in milliseconds (default: 1000)
    pub retry_delay_ms: u64,

    /// Soft navigation deadline for the headless browser in seconds (default: 60)
    pub nav_timeout_secs: u64,

    /// How long to wait for a subscription-related selector in seconds (default: 30)
    pub selector_timeout_secs: u64,

    /// Static text shorter than this many characters triggers the render fallback (default: 100)
    pub min_text_length: usize,

    /// Fall back to the headless browser when static text is unusable (default: true)
    pub enable_dynamic: bool,

    /// Run OCR over the rendered screenshot and merge novel text (default: true)
    pub enable_ocr: bool,

    /// Whether to run the browser in headless mode (default: true)
    pub headless: bool,

    /// Browser viewport width in pixels (default: 1920)
    pub viewport_width: u32,

    /// Browser viewport height in pixels (default: 1080)
    pub viewport_height: u32,

    /// Scroll increment used to trigger lazy-loaded sections (default: 500)
    pub scroll_step_px: u32,

    /// Pause between scroll increments in milliseconds (default: 100)
    pub scroll_pause_ms: u64,

    /// CSS selectors that indicate the subscription offer has rendered
    pub subscription_selectors: Vec<String>,

    /// Path or name of the tesseract binary
    pub tesseract_path: String,

    /// OCR timeout in seconds (default: 60)
    pub ocr_timeout_secs: u64,

    /// User agent string sent by both the HTTP client and the browser
    pub user_agent: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            max_retries: 3,
            retry_delay_ms: 1000,
            nav_timeout_secs: 60,
            selector_timeout_secs: 30,
            min_text_length: 100,
            enable_dynamic: true,
            enable_ocr: true,
            headless: true,
            viewport_width: 1920,
            viewport_height: 1080,
            scroll_step_px: 500,
            scroll_pause_ms: 100,
            subscription_selectors: vec![
                "[class*=\"price\"]".to_string(),
                "[class*=\"paywall\"]".to_string(),
                "[class*=\"subscribe\"]".to_string(),
                "[class*=\"subscription\"]".to_string(),
                "[class*=\"membership\"]".to_string(),
                "[class*=\"plan\"]".to_string(),
                "[data-testid*=\"subscribe\"]".to_string(),
                "a[href*=\"subscribe\"]".to_string(),
                "button[class*=\"subscribe\"]".to_string(),
            ],
            tesseract_path: "tesseract".to_string(),
            ocr_timeout_secs: 60,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36"
                .to_string(),
        }
    }
}

impl ScraperConfig {
    /// Get the static request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn nav_timeout(&self) -> Duration {
        Duration::from_secs(self.nav_timeout_secs)
    }

    pub fn selector_timeout(&self) -> Duration {
        Duration::from_secs(self.selector_timeout_secs)
    }

    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }

    pub fn ocr_timeout(&self) -> Duration {
        Duration::from_secs(self.ocr_timeout_secs)
    }
}
