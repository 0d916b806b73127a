pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "subscope")]
#[command(about = "Scrape and analyse publisher subscription pages", long_about = None)]
pub struct Cli {
    /// Config file (default: ~/.config/subscope/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Acquire the text of one subscription page
    Scrape {
        /// URL of the subscription page
        url: String,

        /// Save the rendered full-page screenshot here (dynamic path only)
        #[arg(long)]
        screenshot: Option<PathBuf>,
    },
    /// Scrape and analyse one subscription page
    Analyze {
        /// URL of the subscription page
        url: String,

        /// Publisher name used in reports and the cache key
        #[arg(short, long)]
        publisher: String,

        /// Language code, or "auto" (default: analysis.default_language)
        #[arg(short, long)]
        language: Option<String>,

        /// Write <publisher>_analysis.json into this directory instead of printing
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Analyse every publisher in a CSV file
    Batch {
        /// CSV with publisher_name, subscription_url and optional language columns
        input: PathBuf,

        /// Output directory for reports
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Only process the first N publishers
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Inspect or prune the analysis cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Remove cached analyses older than the given age
    Clear {
        /// Maximum age in hours (default: cache.expiry_hours)
        #[arg(long)]
        max_age_hours: Option<u64>,
    },
    /// Show cache statistics
    Stats,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_analyze() {
        let cli = Cli::parse_from([
            "subscope",
            "--verbose",
            "analyze",
            "https://abo.example",
            "--publisher",
            "Le Monde",
            "--language",
            "fr",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Analyze {
                url,
                publisher,
                language,
                output,
            } => {
                assert_eq!(url, "https://abo.example");
                assert_eq!(publisher, "Le Monde");
                assert_eq!(language.as_deref(), Some("fr"));
                assert!(output.is_none());
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_parse_batch_defaults_and_global_config() {
        let cli = Cli::parse_from(["subscope", "batch", "pages.csv", "--limit", "5", "-c", "x.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        match cli.command {
            Commands::Batch {
                input,
                output,
                limit,
            } => {
                assert_eq!(input, PathBuf::from("pages.csv"));
                assert_eq!(output, PathBuf::from("results"));
                assert_eq!(limit, Some(5));
            }
            _ => panic!("expected batch"),
        }
    }

    #[test]
    fn test_parse_cache_clear() {
        let cli = Cli::parse_from(["subscope", "cache", "clear", "--max-age-hours", "0"]);
        assert!(matches!(
            cli.command,
            Commands::Cache {
                action: CacheAction::Clear {
                    max_age_hours: Some(0)
                }
            }
        ));
    }
}
