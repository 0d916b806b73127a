use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Environment variable that overrides `api_key` from the config file
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMode {
    /// Local word-list tabulation, no network
    #[default]
    Heuristic,
    /// Claude Messages API
    Claude,
}

/// Configuration for the analysis step
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub mode: AnalysisMode,

    /// Claude model name
    pub model: String,

    /// API key; the ANTHROPIC_API_KEY environment variable takes precedence
    pub api_key: Option<String>,

    pub api_url: String,

    pub anthropic_version: String,

    /// Response token limit (default: 4000)
    pub max_tokens: u32,

    /// Sampling temperature; kept low for repeatable scoring (default: 0.1)
    pub temperature: f32,

    /// Calls per minute before the limiter starts spacing requests (default: 60)
    pub rate_limit_per_minute: u32,

    /// Whole-request timeout for the analysis API in seconds (default: 120)
    pub request_timeout_secs: u64,

    /// Texts with fewer words are analysed anyway, with a warning (default: 10)
    pub min_word_count: usize,

    /// Language used when a request does not name one; "auto" detects it
    pub default_language: String,

    pub supported_languages: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            mode: AnalysisMode::Heuristic,
            model: "claude-3-sonnet-20240229".to_string(),
            api_key: None,
            api_url: "https://api.anthropic.com/v1/messages".to_string(),
            anthropic_version: "2023-06-01".to_string(),
            max_tokens: 4000,
            temperature: 0.1,
            rate_limit_per_minute: 60,
            request_timeout_secs: 120,
            min_word_count: 10,
            default_language: "auto".to_string(),
            supported_languages: [
                "cs", "pl", "sk", "hu", "ro", "de", "es", "fr", "lt", "lv", "pt", "nl", "sv",
                "da", "fi", "no", "en",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl AnalysisConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Key from the environment if set, else from the config file
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
    }

    pub fn is_supported_language(&self, code: &str) -> bool {
        code == "auto" || self.supported_languages.iter().any(|l| l == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnalysisConfig::default();
        assert_eq!(config.mode, AnalysisMode::Heuristic);
        assert_eq!(config.max_tokens, 4000);
        assert_eq!(config.rate_limit_per_minute, 60);
        assert_eq!(config.request_timeout(), Duration::from_secs(120));
        assert_eq!(config.supported_languages.len(), 17);
    }

    #[test]
    fn test_supported_language() {
        let config = AnalysisConfig::default();
        assert!(config.is_supported_language("cs"));
        assert!(config.is_supported_language("auto"));
        assert!(!config.is_supported_language("ja"));
    }

    #[test]
    fn test_mode_from_toml() {
        let config: AnalysisConfig = toml::from_str("mode = \"claude\"\nmax_tokens = 2000").unwrap();
        assert_eq!(config.mode, AnalysisMode::Claude);
        assert_eq!(config.max_tokens, 2000);
        assert_eq!(config.min_word_count, 10);
    }
}
