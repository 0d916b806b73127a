//! Page acquisition: static fetch with render fallback and OCR merge.
//!
//! # Architecture
//!
//! ```text
//! URL → Fetcher ─ok──────────────────────────────→ PageContent (static)
//!          └─short / JS shell / failed → Renderer → VisualExtractor → PageContent
//! ```
//!
//! [`ScrapeOrchestrator::scrape`] is the single entry point. It never returns a
//! raw transport error: every expected failure arrives as a [`ScrapeError`]
//! whose [`FailureReason`] callers can record and move past.
//!
//! # Usage
//!
//! ```rust,ignore
//! use subscope::scraper::{ChromeRenderer, ScrapeOrchestrator, ScraperConfig};
//!
//! let config = ScraperConfig::default();
//! let orchestrator = ScrapeOrchestrator::from_config(&config)?;
//! let page = orchestrator.scrape("https://example.com/subscribe").await?;
//! println!("{} chars via {}", page.text_len(), page.source.as_str());
//! ```

mod chrome;
mod config;
mod extractor;
mod orchestrator;
mod visual;

pub use chrome::ChromeRenderer;
pub use config::ScraperConfig;
pub use extractor::{collapse_whitespace, ContentExtractor, NOISE_TAGS, TEXT_TAGS};
pub use orchestrator::ScrapeOrchestrator;
pub use visual::{merge_texts, OcrError, TesseractOcr, TextRecognizer, VisualExtractor};

#[cfg(test)]
pub(crate) use orchestrator::testing;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::PageContent;

/// Failure while acquiring page text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScrapeError {
    #[error("network error for {url}: {message}")]
    Network { url: String, message: String },

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("content too short at {url} ({len} chars)")]
    TooShort { url: String, len: usize },

    #[error("browser render failed: {0}")]
    Render(String),

    #[error("invalid URL {0}")]
    InvalidUrl(String),

    #[error("{0}")]
    Exception(String),
}

/// Coarse failure kind recorded alongside failed publishers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Timeout,
    HttpError,
    TooShort,
    Exception,
}

impl FailureReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Timeout => "timeout",
            Self::HttpError => "http_error",
            Self::TooShort => "too_short",
            Self::Exception => "exception",
        }
    }
}

impl ScrapeError {
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::Timeout(_) => FailureReason::Timeout,
            Self::HttpStatus { .. } => FailureReason::HttpError,
            Self::TooShort { .. } => FailureReason::TooShort,
            Self::Network { .. } | Self::Render(_) | Self::InvalidUrl(_) | Self::Exception(_) => {
                FailureReason::Exception
            }
        }
    }

    /// Whether another attempt could plausibly succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { .. } | Self::Timeout(_) => true,
            Self::HttpStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Result of one scrape: complete page content or a typed failure, never both
pub type ScrapeOutcome = std::result::Result<PageContent, ScrapeError>;

/// Headless rendering of a page whose static markup is not enough
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Render `url` and return its text, metadata and full-page screenshot
    async fn render(&self, url: &str) -> ScrapeOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_mapping() {
        assert_eq!(
            ScrapeError::Timeout("x".into()).reason(),
            FailureReason::Timeout
        );
        assert_eq!(
            ScrapeError::HttpStatus {
                status: 404,
                url: "u".into()
            }
            .reason(),
            FailureReason::HttpError
        );
        assert_eq!(
            ScrapeError::TooShort {
                url: "u".into(),
                len: 3
            }
            .reason(),
            FailureReason::TooShort
        );
        assert_eq!(
            ScrapeError::Render("boom".into()).reason(),
            FailureReason::Exception
        );
    }

    #[test]
    fn test_transient_errors() {
        let server_error = ScrapeError::HttpStatus {
            status: 503,
            url: "u".into(),
        };
        let not_found = ScrapeError::HttpStatus {
            status: 404,
            url: "u".into(),
        };
        assert!(server_error.is_transient());
        assert!(!not_found.is_transient());
        assert!(ScrapeError::Timeout("t".into()).is_transient());
        assert!(!ScrapeError::InvalidUrl("x".into()).is_transient());
    }

    #[test]
    fn test_reason_strings() {
        assert_eq!(FailureReason::HttpError.as_str(), "http_error");
        assert_eq!(
            serde_json::to_string(&FailureReason::TooShort).unwrap(),
            "\"too_short\""
        );
    }
}
