use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::config::ConfigError;
use crate::pipeline::PipelineError;
use crate::scraper::ScrapeError;
use crate::store::StorageError;

#[derive(Error, Debug)]
pub enum SubscopeError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Scrape failed: {0}")]
    Scrape(#[from] ScrapeError),

    #[error("Analysis failed: {0}")]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Cache storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid input file: {0}")]
    InvalidInput(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, SubscopeError>;
