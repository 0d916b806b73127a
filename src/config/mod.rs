//! Configuration management for subscope.
//!
//! Configuration is read from `~/.config/subscope/config.toml` unless a path
//! is given on the command line. If the default file doesn't exist, one with
//! commented defaults is created. Every section is optional.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analysis::AnalysisConfig;
use crate::scraper::ScraperConfig;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub scraper: ScraperConfig,
    pub cache: CacheConfig,
    pub analysis: AnalysisConfig,
    pub batch: BatchConfig,
}

/// Analysis result cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,

    /// Entries older than this are treated as absent (default: 24)
    pub expiry_hours: u64,

    /// SQLite file; defaults to `<data dir>/subscope/cache.db`
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            expiry_hours: 24,
            path: None,
        }
    }
}

impl CacheConfig {
    pub fn expiry(&self) -> chrono::Duration {
        crate::cache::hours(self.expiry_hours)
    }

    /// Configured path, or the default under the platform data directory
    pub fn resolve_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => {
                let data_dir = dirs::data_dir().ok_or(ConfigError::NoDataDir)?;
                Ok(data_dir.join("subscope").join("cache.db"))
            }
        }
    }
}

/// Batch run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Publishers processed at the same time (default: 3)
    pub max_concurrent: usize,

    /// Upper bound on one publisher's scrape, fallbacks included (default: 180)
    pub scrape_timeout_secs: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_concurrent: 3,
            scrape_timeout_secs: 180,
        }
    }
}

impl BatchConfig {
    pub fn scrape_timeout(&self) -> Duration {
        Duration::from_secs(self.scrape_timeout_secs)
    }
}

impl Config {
    /// Load configuration from `path`, or from the default path when `None`.
    ///
    /// A missing default file is created with commented defaults; a missing
    /// explicit path is an error. Missing fields use default values.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default_path = Self::default_config_path()?;
                if !default_path.exists() {
                    Self::create_default_config(&default_path)?;
                    return Ok(Self::default());
                }
                default_path
            }
        };

        Self::load_from(&config_path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the default config file path: `~/.config/subscope/config.toml`
    pub fn default_config_path() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("subscope").join("config.toml"))
    }

    fn create_default_config(path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let mut file = fs::File::create(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        file.write_all(Self::default_config_content().as_bytes())
            .map_err(|e| ConfigError::Io {
                path: path.to_path_buf(),
                source: e,
            })
    }

    /// Default config file content with comments.
    pub fn default_config_content() -> String {
        r##"# subscope configuration
#
# Every key is optional; anything left out falls back to the value shown here.

[scraper]
# Static HTTP request timeout in seconds
request_timeout_secs = 30

# Total static fetch attempts, including the first
max_retries = 3

# Pause between static fetch attempts (milliseconds)
retry_delay_ms = 1000

# Headless browser navigation deadline in seconds
nav_timeout_secs = 60

# How long to wait for a subscription selector to appear, in seconds
selector_timeout_secs = 30

# Static text shorter than this (characters) triggers the browser fallback
min_text_length = 100

# Use the headless browser when static text is too short or a JS shell
enable_dynamic = true

# OCR the rendered screenshot and merge text the DOM did not contain
enable_ocr = true

headless = true
viewport_width = 1920
viewport_height = 1080

# Scrolling to trigger lazy-loaded sections
scroll_step_px = 500
scroll_pause_ms = 100

# Tesseract binary used for OCR, and its timeout in seconds
tesseract_path = "tesseract"
ocr_timeout_secs = 60

[cache]
enabled = true

# Cached analyses older than this are ignored and removed on read
expiry_hours = 24

# SQLite file (default: <data dir>/subscope/cache.db)
# path = "/var/cache/subscope/cache.db"

[analysis]
# "heuristic" (local word lists) or "claude" (Claude Messages API)
mode = "heuristic"

model = "claude-3-sonnet-20240229"

# The ANTHROPIC_API_KEY environment variable takes precedence
# api_key = "sk-ant-..."

max_tokens = 4000
temperature = 0.1

# Calls to the analysis API per minute
rate_limit_per_minute = 60

request_timeout_secs = 120

# Texts shorter than this many words are analysed with a warning
min_word_count = 10

# Language used when a publisher does not name one; "auto" detects it
default_language = "auto"

[batch]
# Publishers processed at the same time
max_concurrent = 3

# Upper bound on one publisher's scrape in seconds, fallbacks included
scrape_timeout_secs = 180
"##
        .to_string()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Could not determine data directory")]
    NoDataDir,

    #[error("Failed to read/write config file at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}
