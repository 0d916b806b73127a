//! # subscope
//!
//! Acquire the text of publisher subscription pages and score how they
//! persuade readers to pay.
//!
//! ## Architecture
//!
//! ```text
//! URL → Fetcher ─┬───────────────→ text → Cache ─hit→ AnalysisResult
//!                └→ Renderer → OCR ↗         └miss→ Analyzer ↗ → Reports
//! ```
//!
//! - [`fetcher`]: static HTTP fetch with a bounded retry policy
//! - [`scraper`]: headless-browser fallback, OCR merge and the orchestrator
//! - [`cache`]: analysis cache with lazy expiry over a [`store`] backend
//! - [`analysis`]: heuristic and Claude-backed analyzers
//! - [`pipeline`]: single-publisher and batch runs
//! - [`report`]: JSON, CSV and Markdown output
//!
//! ## Quick Start
//!
//! ```bash
//! # Print the text of one page
//! subscope scrape https://example.com/subscribe
//!
//! # Analyse one page
//! subscope analyze https://example.com/subscribe --publisher "Example Daily"
//!
//! # Analyse a list of publishers
//! subscope batch subscription_pages.csv --output results
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires configuration into the
/// orchestrator, cache and analysis pipeline.
pub mod app;

/// Command-line interface using clap.
///
/// - `scrape <url>` - Print the acquired page text
/// - `analyze <url> --publisher NAME` - Scrape and analyse one page
/// - `batch <csv>` - Analyse every publisher in a CSV file
/// - `cache clear | stats` - Maintain the analysis cache
pub mod cli;

/// Configuration loaded from `~/.config/subscope/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`PageContent`](domain::PageContent): acquired text plus metadata
/// - [`Publisher`](domain::Publisher): one row of batch input
/// - [`AnalysisResult`](domain::AnalysisResult): scored analysis
pub mod domain;

/// Static HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): async trait for static fetches
/// - [`HttpFetcher`](fetcher::http_fetcher::HttpFetcher): reqwest-based implementation
/// - [`RetryPolicy`](fetcher::RetryPolicy): bounded retries with fixed or exponential delay
pub mod fetcher;

/// Page acquisition beyond the static fetch.
///
/// - [`ScrapeOrchestrator`](scraper::ScrapeOrchestrator): static-then-dynamic fallback
/// - [`ChromeRenderer`](scraper::ChromeRenderer): headless Chrome via chromiumoxide
/// - [`VisualExtractor`](scraper::VisualExtractor): OCR over the rendered screenshot
pub mod scraper;

/// Cache storage backends.
///
/// - [`CacheStore`](store::CacheStore): trait defining storage operations
/// - [`SqliteCacheStore`](store::SqliteCacheStore): SQLite implementation
pub mod store;

pub mod cache;

pub mod analysis;

pub mod pipeline;

pub mod report;
