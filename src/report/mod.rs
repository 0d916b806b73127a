//! Report assembly for analysed publishers.
//!
//! Three artifacts land in the output directory:
//! - `<slug>_analysis.json` per publisher (page metadata plus the full analysis)
//! - `comparative_analysis.csv` with one row of headline scores per publisher
//! - `summary_report.md` ranking publishers and describing the whole run

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::app::{Result, SubscopeError};
use crate::domain::{AnalysisResult, ContentSource, PageContent, PageMetadata, Publisher};
use crate::pipeline::BatchFailure;

pub const COMPARATIVE_CSV: &str = "comparative_analysis.csv";
pub const SUMMARY_MARKDOWN: &str = "summary_report.md";

/// Examples shorter than this are too thin to quote in the summary
const MIN_QUOTE_CHARS: usize = 20;

/// One analysed publisher, as fed to the report writers
#[derive(Debug, Clone)]
pub struct ReportEntry {
    pub publisher: Publisher,
    pub page: PageContent,
    pub analysis: AnalysisResult,
}

#[derive(Serialize)]
struct IndividualReport<'a> {
    url: &'a str,
    requested_language: &'a str,
    content_source: ContentSource,
    text_length: usize,
    metadata: &'a PageMetadata,
    #[serde(flatten)]
    analysis: &'a AnalysisResult,
}

/// Writes report files into one output directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    /// Create the writer, making the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn individual_path(&self, publisher: &Publisher) -> PathBuf {
        self.dir.join(format!("{}_analysis.json", publisher.slug()))
    }

    /// Write `<slug>_analysis.json`; the screenshot is never included
    pub fn write_individual(&self, entry: &ReportEntry) -> Result<PathBuf> {
        let report = IndividualReport {
            url: &entry.page.url,
            requested_language: &entry.publisher.language,
            content_source: entry.page.source,
            text_length: entry.page.text_len(),
            metadata: &entry.page.metadata,
            analysis: &entry.analysis,
        };

        let path = self.individual_path(&entry.publisher);
        fs::write(&path, serde_json::to_string_pretty(&report)?)?;
        info!("Saved individual report to {}", path.display());
        Ok(path)
    }

    pub fn write_comparative(&self, entries: &[ReportEntry]) -> Result<PathBuf> {
        let path = self.dir.join(COMPARATIVE_CSV);
        fs::write(&path, comparative_csv(entries)?)?;
        info!("Saved comparative CSV to {}", path.display());
        Ok(path)
    }

    pub fn write_summary(&self, entries: &[ReportEntry], failures: &[BatchFailure]) -> Result<PathBuf> {
        let path = self.dir.join(SUMMARY_MARKDOWN);
        fs::write(&path, summary_markdown(entries, failures))?;
        info!("Saved summary report to {}", path.display());
        Ok(path)
    }
}

/// One line of `comparative_analysis.csv`; field names are the header
#[derive(Debug, Serialize)]
struct ComparativeRow<'a> {
    publisher_name: &'a str,
    url: &'a str,
    language: &'a str,
    content_source: &'static str,
    sophistication_score: f64,
    primary_strategy: &'a str,
    total_words: usize,
    support_ratio: f64,
    mission_density: f64,
    feature_density: f64,
    identity_score: f64,
    community_score: f64,
    scarcity_score: f64,
    social_proof_score: f64,
    loss_aversion_score: f64,
    reciprocity_score: f64,
    authority_score: f64,
    temporal_score: f64,
    frequency_score: f64,
    convenience_score: f64,
    platform_score: f64,
    support_count: u32,
    transactional_count: u32,
    mission_count: u32,
    scarcity_count: u32,
    social_proof_count: u32,
    price_mentions: usize,
}

impl<'a> ComparativeRow<'a> {
    fn from_entry(entry: &'a ReportEntry) -> Self {
        let a = &entry.analysis;
        let m = &a.motivation_framework;
        let b = &a.behavioral_triggers;
        let h = &a.habit_formation;

        Self {
            publisher_name: &a.publisher_name,
            url: &entry.page.url,
            language: &a.detected_language,
            content_source: entry.page.source.as_str(),
            sophistication_score: round(a.sophistication_score, 2),
            primary_strategy: &a.primary_strategy,
            total_words: a.total_words,
            support_ratio: round(m.support_ratio, 4),
            mission_density: round(m.mission_density, 4),
            feature_density: round(m.feature_density, 4),
            identity_score: round(m.identity_score, 4),
            community_score: round(m.community_score, 4),
            scarcity_score: round(b.scarcity_score, 4),
            social_proof_score: round(b.social_proof_score, 4),
            loss_aversion_score: round(b.loss_aversion_score, 4),
            reciprocity_score: round(b.reciprocity_score, 4),
            authority_score: round(b.authority_score, 4),
            temporal_score: round(h.temporal_score, 4),
            frequency_score: round(h.frequency_score, 4),
            convenience_score: round(h.convenience_score, 4),
            platform_score: round(h.platform_score, 4),
            support_count: count(&m.counts, "support"),
            transactional_count: count(&m.counts, "transactional"),
            mission_count: count(&m.counts, "mission"),
            scarcity_count: count(&b.counts, "scarcity"),
            social_proof_count: count(&b.counts, "social_proof"),
            price_mentions: entry.page.metadata.prices.len(),
        }
    }
}

fn by_sophistication(entries: &[ReportEntry]) -> Vec<&ReportEntry> {
    let mut sorted: Vec<&ReportEntry> = entries.iter().collect();
    sorted.sort_by(|a, b| {
        b.analysis
            .sophistication_score
            .total_cmp(&a.analysis.sophistication_score)
    });
    sorted
}

fn count(counts: &BTreeMap<String, u32>, key: &str) -> u32 {
    counts.get(key).copied().unwrap_or(0)
}

fn round(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

/// Comparative table, most sophisticated publisher first
pub fn comparative_csv(entries: &[ReportEntry]) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for entry in by_sophistication(entries) {
        writer.serialize(ComparativeRow::from_entry(entry))?;
    }

    let buf = writer
        .into_inner()
        .map_err(|e| SubscopeError::Io(e.into_error()))?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn average(entries: &[&ReportEntry], score: impl Fn(&AnalysisResult) -> f64) -> f64 {
    if entries.is_empty() {
        return 0.0;
    }
    entries.iter().map(|e| score(&e.analysis)).sum::<f64>() / entries.len() as f64
}

fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// Markdown overview of a run: ranking, strategy mix, averages, quotes and failures
pub fn summary_markdown(entries: &[ReportEntry], failures: &[BatchFailure]) -> String {
    let ranked = by_sophistication(entries);
    let total = ranked.len();
    let mut out = String::new();

    let _ = writeln!(out, "# Subscription Language Analysis Report\n");
    let _ = writeln!(out, "Generated: {}\n", Utc::now().format("%Y-%m-%d %H:%M:%S UTC"));

    let _ = writeln!(out, "## Executive Summary\n");
    let _ = writeln!(
        out,
        "Analyzed {} publisher subscription pages ({} failed).\n",
        total,
        failures.len()
    );

    if total > 0 {
        let _ = writeln!(out, "### Key Findings\n");
        let _ = writeln!(
            out,
            "- **Average Sophistication Score**: {:.2}/10",
            average(&ranked, |a| a.sophistication_score)
        );

        let mut strategies: BTreeMap<&str, usize> = BTreeMap::new();
        for entry in &ranked {
            *strategies.entry(entry.analysis.primary_strategy.as_str()).or_default() += 1;
        }
        let mut strategies: Vec<_> = strategies.into_iter().collect();
        strategies.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));

        let _ = writeln!(out, "- **Strategy Distribution**:");
        for (strategy, n) in strategies {
            let _ = writeln!(out, "  - {}: {} ({:.1}%)", strategy, n, percent(n, total));
        }

        let _ = writeln!(out, "\n### Top 5 Most Sophisticated Publishers\n");
        let _ = writeln!(out, "| Rank | Publisher | Language | Score | Primary Strategy |");
        let _ = writeln!(out, "|------|-----------|----------|-------|------------------|");
        for (rank, entry) in ranked.iter().take(5).enumerate() {
            let a = &entry.analysis;
            let _ = writeln!(
                out,
                "| {} | {} | {} | {:.2} | {} |",
                rank + 1,
                a.publisher_name,
                a.language_name,
                a.sophistication_score,
                a.primary_strategy
            );
        }

        let _ = writeln!(out, "\n## Average Scores Across All Publishers\n");
        let averages: [(&str, fn(&AnalysisResult) -> f64); 6] = [
            ("Support vs Transactional Ratio", |a| a.motivation_framework.support_ratio),
            ("Mission Messaging Density", |a| a.motivation_framework.mission_density),
            ("Community Focus", |a| a.motivation_framework.community_score),
            ("Scarcity Tactics", |a| a.behavioral_triggers.scarcity_score),
            ("Social Proof Usage", |a| a.behavioral_triggers.social_proof_score),
            ("Authority Signals", |a| a.behavioral_triggers.authority_score),
        ];
        for (label, score) in averages {
            let _ = writeln!(out, "- **{}**: {:.4}", label, average(&ranked, score));
        }

        let _ = writeln!(out, "\n## Behavioral Economics Techniques Usage\n");
        let techniques: [(&str, fn(&AnalysisResult) -> bool); 5] = [
            ("Scarcity", |a| a.behavioral_triggers.scarcity_score > 0.0),
            ("Social Proof", |a| a.behavioral_triggers.social_proof_score > 0.0),
            ("Loss Aversion", |a| a.behavioral_triggers.loss_aversion_score > 0.0),
            ("Reciprocity", |a| a.behavioral_triggers.reciprocity_score > 0.0),
            ("Habit Formation", |a| a.habit_formation.counts.values().sum::<u32>() > 5),
        ];
        let mut usage: Vec<(&str, usize)> = techniques
            .iter()
            .map(|(name, used)| (*name, ranked.iter().filter(|e| used(&e.analysis)).count()))
            .collect();
        usage.sort_by(|a, b| b.1.cmp(&a.1));
        for (name, n) in usage {
            let _ = writeln!(out, "- **{}**: {} publishers ({:.1}%)", name, n, percent(n, total));
        }

        let _ = writeln!(out, "\n## Notable Example Phrases\n");
        let categories: [(&str, fn(&AnalysisResult) -> Option<&Vec<String>>); 5] = [
            ("Mission-Driven", |a| a.motivation_framework.examples.get("mission")),
            ("Community Building", |a| a.motivation_framework.examples.get("community")),
            ("Scarcity", |a| a.behavioral_triggers.examples.get("scarcity")),
            ("Social Proof", |a| a.behavioral_triggers.examples.get("social_proof")),
            ("Reciprocity", |a| a.behavioral_triggers.examples.get("reciprocity")),
        ];
        for (name, examples) in categories {
            let _ = writeln!(out, "### {} Examples\n", name);
            let quotes: Vec<(&str, &str)> = ranked
                .iter()
                .take(10)
                .flat_map(|e| {
                    examples(&e.analysis)
                        .into_iter()
                        .flatten()
                        .take(2)
                        .filter(|q| q.chars().count() > MIN_QUOTE_CHARS)
                        .map(move |q| (e.analysis.publisher_name.as_str(), q.as_str()))
                })
                .take(5)
                .collect();

            if quotes.is_empty() {
                let _ = writeln!(out, "- No notable examples found");
            }
            for (publisher, quote) in quotes {
                let _ = writeln!(out, "- **{}**: \"{}\"", publisher, quote);
            }
            let _ = writeln!(out);
        }
    }

    if !failures.is_empty() {
        let _ = writeln!(out, "## Failed Publishers\n");
        let _ = writeln!(out, "| Publisher | URL | Reason |");
        let _ = writeln!(out, "|-----------|-----|--------|");
        for failure in failures {
            let _ = writeln!(
                out,
                "| {} | {} | {} |",
                failure.publisher, failure.url, failure.reason
            );
        }
    }

    out
}
