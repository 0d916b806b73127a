//! Scrape → clean → cache → analyze, for one publisher or a whole list.

mod batch;

pub use batch::{read_publishers, BatchFailure, BatchProgress, BatchRunner, BatchSummary};

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::analysis::language::resolve_language;
use crate::analysis::text::{clean_text, count_words};
use crate::analysis::{AnalysisConfig, AnalysisError, Analyzer};
use crate::cache::AnalysisCache;
use crate::domain::{AnalysisResult, Publisher};
use crate::report::ReportEntry;
use crate::scraper::{ScrapeError, ScrapeOrchestrator};

/// Why one publisher produced no analysis
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),
}

impl PipelineError {
    /// Short failure kind recorded in batch logs
    pub fn reason(&self) -> &'static str {
        match self {
            Self::Scrape(e) => e.reason().as_str(),
            Self::Analysis(AnalysisError::InvalidResponse(_)) => "invalid_response",
            Self::Analysis(AnalysisError::EmptyText) => "empty_text",
            Self::Analysis(_) => "analysis_error",
        }
    }
}

pub struct Pipeline {
    orchestrator: Arc<ScrapeOrchestrator>,
    analyzer: Arc<dyn Analyzer>,
    cache: Option<Arc<AnalysisCache>>,
    supported_languages: Vec<String>,
    min_word_count: usize,
}

impl Pipeline {
    pub fn new(
        orchestrator: Arc<ScrapeOrchestrator>,
        analyzer: Arc<dyn Analyzer>,
        cache: Option<Arc<AnalysisCache>>,
        config: &AnalysisConfig,
    ) -> Self {
        Self {
            orchestrator,
            analyzer,
            cache,
            supported_languages: config.supported_languages.clone(),
            min_word_count: config.min_word_count,
        }
    }

    /// Scrape the publisher's page and analyse it.
    ///
    /// `scrape_timeout` bounds the whole acquisition, fallbacks included.
    pub async fn run(
        &self,
        publisher: &Publisher,
        scrape_timeout: Option<Duration>,
    ) -> Result<ReportEntry, PipelineError> {
        info!("Processing {} ({})", publisher.name, publisher.url);

        let page = match scrape_timeout {
            Some(timeout) => {
                self.orchestrator
                    .scrape_with_timeout(&publisher.url, timeout)
                    .await?
            }
            None => self.orchestrator.scrape(&publisher.url).await?,
        };

        let analysis = self
            .analyze_text(&page.text, &publisher.name, &publisher.language)
            .await?;

        Ok(ReportEntry {
            publisher: publisher.clone(),
            page,
            analysis,
        })
    }

    /// Analyse already-acquired text, going through the cache when enabled.
    ///
    /// The cache is keyed on the language as requested (`auto` included), so
    /// a hit skips language detection as well as the analyzer.
    pub async fn analyze_text(
        &self,
        text: &str,
        publisher: &str,
        language: &str,
    ) -> Result<AnalysisResult, AnalysisError> {
        let cleaned = clean_text(text);
        if cleaned.is_empty() {
            return Err(AnalysisError::EmptyText);
        }

        if let Some(hit) = self.cached(&cleaned, publisher, language) {
            info!("Using cached analysis for {}", publisher);
            return Ok(hit);
        }

        let words = count_words(&cleaned);
        if words < self.min_word_count {
            warn!("Very short content for {}: {} words", publisher, words);
        }

        let resolved = resolve_language(language, &cleaned, &self.supported_languages);
        let result = self.analyzer.analyze(&cleaned, publisher, &resolved).await?;

        if let Some(cache) = &self.cache {
            match serde_json::to_value(&result) {
                Ok(payload) => cache.put(&cleaned, publisher, language, &payload),
                Err(e) => warn!("Could not serialize analysis for caching: {}", e),
            }
        }

        Ok(result)
    }

    fn cached(&self, text: &str, publisher: &str, language: &str) -> Option<AnalysisResult> {
        let payload = self.cache.as_ref()?.get(text, publisher, language)?;

        let result: AnalysisResult = match serde_json::from_value(payload) {
            Ok(result) => result,
            Err(e) => {
                warn!("Ignoring unreadable cache entry for {}: {}", publisher, e);
                return None;
            }
        };

        if result.analysis_method != self.analyzer.method() {
            debug!(
                "Cached analysis for {} came from {:?}, wanted {:?}",
                publisher,
                result.analysis_method,
                self.analyzer.method()
            );
            return None;
        }

        Some(result)
    }
}


#[cfg(test)]
mod tests {
    use chrono::Duration as ChronoDuration;

    use super::testing::FakeAnalyzer;
    use super::*;
    use crate::domain::{AnalysisMethod, ContentSource};
    use crate::scraper::testing::FakeFetcher;
    use crate::store::{CacheStore, MemoryCacheStore};

    const PAGE_TEXT: &str = "Support independent journalism. Subscribe today and read every \
                             story on every device. Contact us at help@daily.example.";

    struct Harness {
        pipeline: Pipeline,
        analyzer: Arc<FakeAnalyzer>,
        store: Arc<MemoryCacheStore>,
    }

    fn harness(fetcher: FakeFetcher, method: AnalysisMethod) -> Harness {
        let orchestrator = Arc::new(ScrapeOrchestrator::new(Arc::new(fetcher), None, None));
        let analyzer = Arc::new(FakeAnalyzer::new(method));
        let store = Arc::new(MemoryCacheStore::new());
        let cache = Arc::new(AnalysisCache::new(store.clone(), ChronoDuration::hours(24)));

        Harness {
            pipeline: Pipeline::new(
                orchestrator,
                analyzer.clone(),
                Some(cache),
                &AnalysisConfig::default(),
            ),
            analyzer,
            store,
        }
    }

    #[tokio::test]
    async fn test_run_scrapes_then_analyses() {
        let h = harness(FakeFetcher::page(PAGE_TEXT, 10), AnalysisMethod::Heuristic);
        let publisher = Publisher::new("Daily", "https://example.com", "en");

        let entry = h.pipeline.run(&publisher, None).await.unwrap();

        assert_eq!(entry.page.source, ContentSource::Static);
        assert_eq!(entry.analysis.publisher_name, "Daily");
        assert_eq!(h.analyzer.calls(), 1);
        assert_eq!(h.store.count().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_second_analysis_is_served_from_cache() {
        let h = harness(FakeFetcher::page(PAGE_TEXT, 10), AnalysisMethod::Heuristic);

        let first = h.pipeline.analyze_text(PAGE_TEXT, "Daily", "en").await.unwrap();
        let second = h.pipeline.analyze_text(PAGE_TEXT, "Daily", "en").await.unwrap();

        assert_eq!(h.analyzer.calls(), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_language_is_part_of_the_cache_key() {
        let h = harness(FakeFetcher::page(PAGE_TEXT, 10), AnalysisMethod::Heuristic);

        h.pipeline.analyze_text(PAGE_TEXT, "Daily", "en").await.unwrap();
        h.pipeline.analyze_text(PAGE_TEXT, "Daily", "de").await.unwrap();

        assert_eq!(h.analyzer.calls(), 2);
        assert_eq!(h.store.count().unwrap(), 2);
    }

    #[tokio::test]
    async fn test_cached_result_from_other_method_is_ignored() {
        let h = harness(FakeFetcher::page(PAGE_TEXT, 10), AnalysisMethod::ClaudeAi);
        let mut stale = crate::domain::analysis::fixtures::sample_result("Daily");
        stale.analysis_method = AnalysisMethod::Heuristic;

        let cleaned = clean_text(PAGE_TEXT);
        let cache = h.pipeline.cache.clone().unwrap();
        cache.put(&cleaned, "Daily", "en", &serde_json::to_value(&stale).unwrap());

        let result = h.pipeline.analyze_text(PAGE_TEXT, "Daily", "en").await.unwrap();
        assert_eq!(result.analysis_method, AnalysisMethod::ClaudeAi);
        assert_eq!(h.analyzer.calls(), 1);
    }

    #[tokio::test]
    async fn test_auto_language_is_resolved_before_analysis() {
        let h = harness(FakeFetcher::page(PAGE_TEXT, 10), AnalysisMethod::Heuristic);
        let german = "Unterstützen Sie unabhängigen Journalismus. Mit einem Abo lesen Sie die \
                      Zeitung und das Magazin auf allen Geräten, für nur einen Euro.";

        let result = h.pipeline.analyze_text(german, "Zeit", "auto").await.unwrap();

        assert_eq!(result.detected_language, "de");
        assert_eq!(*h.analyzer.languages.lock().unwrap(), vec!["de".to_string()]);
    }

    #[tokio::test]
    async fn test_text_is_cleaned_before_analysis() {
        let h = harness(FakeFetcher::page(PAGE_TEXT, 10), AnalysisMethod::Heuristic);
        h.pipeline.analyze_text(PAGE_TEXT, "Daily", "en").await.unwrap();

        // The e-mail address is stripped, so the cleaned text is what got cached
        let cache = h.pipeline.cache.clone().unwrap();
        assert!(cache.get(&clean_text(PAGE_TEXT), "Daily", "en").is_some());
        assert!(cache.get(PAGE_TEXT, "Daily", "en").is_none());
    }

    #[tokio::test]
    async fn test_blank_text_is_rejected() {
        let h = harness(FakeFetcher::page(PAGE_TEXT, 10), AnalysisMethod::Heuristic);
        let err = h.pipeline.analyze_text("   ", "Daily", "en").await.unwrap_err();
        assert!(matches!(err, AnalysisError::EmptyText));
        assert_eq!(h.analyzer.calls(), 0);
    }

    #[tokio::test]
    async fn test_scrape_failure_skips_analysis() {
        let h = harness(
            FakeFetcher::failing(ScrapeError::HttpStatus {
                status: 404,
                url: "https://example.com".into(),
            }),
            AnalysisMethod::Heuristic,
        );
        let publisher = Publisher::new("Daily", "https://example.com", "en");

        let err = h.pipeline.run(&publisher, None).await.unwrap_err();
        assert_eq!(err.reason(), "http_error");
        assert_eq!(h.analyzer.calls(), 0);
    }
}
