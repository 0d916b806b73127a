use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::analysis::{build_analyzer, RateLimiter};
use crate::app::error::Result;
use crate::cache::AnalysisCache;
use crate::config::Config;
use crate::pipeline::Pipeline;
use crate::scraper::ScrapeOrchestrator;
use crate::store::{CacheStore, MemoryCacheStore, SqliteCacheStore};

/// Wires configuration into the scraper, cache and analysis components
pub struct AppContext {
    pub config: Config,
    pub orchestrator: Arc<ScrapeOrchestrator>,
    /// `None` when caching is disabled
    pub cache: Option<Arc<AnalysisCache>>,
    pub limiter: Arc<RateLimiter>,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let cache = if config.cache.enabled {
            let path = config.cache.resolve_path()?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            info!("Using analysis cache at {}", path.display());
            let store: Arc<dyn CacheStore> = Arc::new(SqliteCacheStore::new(&path)?);
            Some(Arc::new(AnalysisCache::new(store, config.cache.expiry())))
        } else {
            None
        };

        Self::with_cache(config, cache)
    }

    /// Context backed by an in-memory cache, for tests and dry runs
    pub fn in_memory(config: Config) -> Result<Self> {
        let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new());
        let cache = Arc::new(AnalysisCache::new(store, config.cache.expiry()));
        Self::with_cache(config, Some(cache))
    }

    fn with_cache(config: Config, cache: Option<Arc<AnalysisCache>>) -> Result<Self> {
        let orchestrator = Arc::new(ScrapeOrchestrator::from_config(&config.scraper)?);
        let limiter = Arc::new(RateLimiter::per_minute(config.analysis.rate_limit_per_minute));

        Ok(Self {
            config,
            orchestrator,
            cache,
            limiter,
        })
    }

    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        Self::new(Config::load(config_path)?)
    }

    /// Build the analysis pipeline for the configured analysis mode.
    ///
    /// Claude mode fails here, not at startup, when no API key is set, so
    /// scrape and cache commands work without one.
    pub fn pipeline(&self) -> Result<Pipeline> {
        let analyzer = build_analyzer(&self.config.analysis, self.limiter.clone())?;
        Ok(Pipeline::new(
            self.orchestrator.clone(),
            analyzer,
            self.cache.clone(),
            &self.config.analysis,
        ))
    }
}
