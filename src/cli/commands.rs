use std::path::Path;
use std::sync::Arc;

use crate::app::{AppContext, Result};
use crate::domain::Publisher;
use crate::pipeline::{read_publishers, BatchRunner};
use crate::report::ReportWriter;

pub async fn scrape(ctx: &AppContext, url: &str, screenshot: Option<&Path>) -> Result<()> {
    let page = ctx.orchestrator.scrape(url).await?;

    println!("Title: {}", page.display_title());
    println!("Source: {}", page.source.as_str());
    println!("Length: {} characters", page.text_len());
    if let Some(description) = &page.metadata.description {
        println!("Description: {}", description);
    }
    if !page.metadata.prices.is_empty() {
        println!("Prices: {}", page.metadata.prices.join(", "));
    }
    println!();
    println!("{}", page.text);

    if let Some(path) = screenshot {
        match &page.screenshot {
            Some(png) => {
                std::fs::write(path, png)?;
                println!("\nSaved screenshot to {}", path.display());
            }
            None => eprintln!("\nNo screenshot: the page was served by the static fetch"),
        }
    }

    Ok(())
}

pub async fn analyze(
    ctx: &AppContext,
    url: &str,
    publisher: &str,
    language: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    let pipeline = ctx.pipeline()?;
    let language = language.unwrap_or(&ctx.config.analysis.default_language);
    let publisher = Publisher::new(publisher, url, language);

    let entry = pipeline
        .run(&publisher, Some(ctx.config.batch.scrape_timeout()))
        .await?;
    let analysis = &entry.analysis;

    match output {
        Some(dir) => {
            let path = ReportWriter::new(dir)?.write_individual(&entry)?;
            println!("Saved report to {}", path.display());
        }
        None => println!("{}", serde_json::to_string_pretty(analysis)?),
    }

    println!(
        "{}: sophistication {:.2}/10, {} strategy ({}, {} words, via {})",
        analysis.publisher_name,
        analysis.sophistication_score,
        analysis.primary_strategy,
        analysis.language_name,
        analysis.total_words,
        entry.page.source.as_str()
    );
    for insight in &analysis.key_insights {
        println!("  - {}", insight);
    }

    Ok(())
}

pub async fn batch(ctx: &AppContext, input: &Path, output: &Path, limit: Option<usize>) -> Result<()> {
    let mut publishers = read_publishers(input, &ctx.config.analysis.default_language)?;
    if let Some(limit) = limit {
        publishers.truncate(limit);
    }

    if publishers.is_empty() {
        println!("No publishers found in {}", input.display());
        return Ok(());
    }

    println!("Analysing {} publishers...", publishers.len());

    let runner = BatchRunner::new(
        Arc::new(ctx.pipeline()?),
        ReportWriter::new(output)?,
        ctx.config.batch.max_concurrent,
        ctx.config.batch.scrape_timeout(),
    );
    let summary = runner.run(publishers).await?;

    for failure in &summary.failures {
        eprintln!("  Failed {} ({}): {}", failure.publisher, failure.url, failure.reason);
    }
    println!(
        "Batch complete: {} successful, {} failed in {:.1} minutes",
        summary.entries.len(),
        summary.failures.len(),
        summary.elapsed.as_secs_f64() / 60.0
    );
    println!("Results saved to {}", output.display());

    Ok(())
}

pub fn cache_clear(ctx: &AppContext, max_age_hours: Option<u64>) -> Result<()> {
    let Some(cache) = &ctx.cache else {
        println!("Cache is disabled");
        return Ok(());
    };

    let max_age = match max_age_hours {
        Some(hours) => crate::cache::hours(hours),
        None => cache.expiry(),
    };
    let removed = cache.clear_expired(max_age)?;
    println!("Removed {} cached analyses older than {} hours", removed, max_age.num_hours());
    Ok(())
}

pub fn cache_stats(ctx: &AppContext) -> Result<()> {
    let Some(cache) = &ctx.cache else {
        println!("Cache is disabled");
        return Ok(());
    };

    let stats = cache.stats()?;
    println!("Cached analyses: {}", stats.entries);
    println!("Expiry: {} hours", cache.expiry().num_hours());
    Ok(())
}
