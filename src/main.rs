use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use subscope::app::AppContext;
use subscope::cli::{commands, CacheAction, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins; otherwise info, or debug with --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let ctx = AppContext::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Scrape { url, screenshot } => {
            commands::scrape(&ctx, &url, screenshot.as_deref()).await?;
        }
        Commands::Analyze {
            url,
            publisher,
            language,
            output,
        } => {
            commands::analyze(&ctx, &url, &publisher, language.as_deref(), output.as_deref())
                .await?;
        }
        Commands::Batch {
            input,
            output,
            limit,
        } => {
            commands::batch(&ctx, &input, &output, limit).await?;
        }
        Commands::Cache { action } => match action {
            CacheAction::Clear { max_age_hours } => commands::cache_clear(&ctx, max_age_hours)?,
            CacheAction::Stats => commands::cache_stats(&ctx)?,
        },
    }

    Ok(())
}
