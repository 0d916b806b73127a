//! Behavioral-economics scoring of subscription page text.
//!
//! Two [`Analyzer`] implementations produce the same [`AnalysisResult`]
//! shape: [`HeuristicAnalyzer`] tabulates word lists locally, and
//! [`ClaudeAnalyzer`] asks the Claude Messages API behind a shared
//! [`RateLimiter`].

mod claude;
mod config;
mod heuristic;
pub mod language;
mod rate_limit;
pub mod text;

pub use claude::ClaudeAnalyzer;
pub use config::{AnalysisConfig, AnalysisMode, API_KEY_ENV};
pub use heuristic::HeuristicAnalyzer;
pub use rate_limit::RateLimiter;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{AnalysisMethod, AnalysisResult};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("invalid analysis response: {0}")]
    InvalidResponse(String),

    #[error("analysis API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("analysis request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("no text to analyse")]
    EmptyText,

    #[error("no API key configured; set ANTHROPIC_API_KEY or analysis.api_key")]
    MissingApiKey,
}

#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Score `text` from `publisher`, written in the resolved `language` code
    async fn analyze(
        &self,
        text: &str,
        publisher: &str,
        language: &str,
    ) -> Result<AnalysisResult, AnalysisError>;

    fn method(&self) -> AnalysisMethod;
}

/// Build the analyzer selected by `config.mode`
pub fn build_analyzer(
    config: &AnalysisConfig,
    limiter: Arc<RateLimiter>,
) -> Result<Arc<dyn Analyzer>, AnalysisError> {
    Ok(match config.mode {
        AnalysisMode::Heuristic => Arc::new(HeuristicAnalyzer::new()),
        AnalysisMode::Claude => Arc::new(ClaudeAnalyzer::new(config, limiter)?),
    })
}
