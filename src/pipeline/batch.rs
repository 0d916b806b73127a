use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Local;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::app::{Result, SubscopeError};
use crate::domain::Publisher;
use crate::pipeline::Pipeline;
use crate::scraper::FailureReason;
use crate::report::{ReportEntry, ReportWriter};

pub const PROGRESS_FILE: &str = "progress.json";
pub const ERROR_LOG: &str = "errors.log";

const NAME_COLUMN: &str = "publisher_name";
const URL_COLUMN: &str = "subscription_url";

/// One row of the publisher list; `language` is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PublisherRow {
    publisher_name: String,
    subscription_url: String,
    language: String,
}

/// Read the publisher list from a CSV with a
/// `publisher_name,subscription_url[,language]` header.
///
/// Rows without a name or URL are skipped; a missing language becomes
/// `default_language`.
pub fn read_publishers(path: &Path, default_language: &str) -> Result<Vec<Publisher>> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let headers = reader.headers()?;
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(SubscopeError::InvalidInput(format!("{} is empty", path.display())));
    }
    let has = |name: &str| headers.iter().any(|h| h == name);
    if !has(NAME_COLUMN) || !has(URL_COLUMN) {
        return Err(SubscopeError::InvalidInput(format!(
            "{} needs {} and {} columns",
            path.display(),
            NAME_COLUMN,
            URL_COLUMN
        )));
    }

    let mut publishers = Vec::new();
    for (line, row) in reader.deserialize::<PublisherRow>().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                warn!("Skipping row {} of {}: {}", line + 2, path.display(), e);
                continue;
            }
        };
        if row.publisher_name.is_empty() || row.subscription_url.is_empty() {
            warn!("Skipping row {} of {}: missing name or URL", line + 2, path.display());
            continue;
        }
        let language = if row.language.is_empty() {
            default_language.to_string()
        } else {
            row.language
        };
        publishers.push(Publisher::new(row.publisher_name, row.subscription_url, language));
    }

    info!("Read {} publishers from {}", publishers.len(), path.display());
    Ok(publishers)
}

/// One publisher the batch could not analyse
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub publisher: String,
    pub url: String,
    /// Failure kind, e.g. `timeout` or `http_error`
    pub reason: String,
}

/// Snapshot written to `progress.json` after every publisher
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    pub processed: usize,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

#[derive(Debug)]
pub struct BatchSummary {
    pub total: usize,
    /// Successful publishers, in input order
    pub entries: Vec<ReportEntry>,
    pub failures: Vec<BatchFailure>,
    pub elapsed: Duration,
}

/// Persists progress and failures while a batch runs
struct ProgressLog {
    progress_path: PathBuf,
    error_path: PathBuf,
    started: Instant,
    state: Mutex<BatchProgress>,
}

impl ProgressLog {
    fn new(dir: &Path, total: usize) -> Self {
        Self {
            progress_path: dir.join(PROGRESS_FILE),
            error_path: dir.join(ERROR_LOG),
            started: Instant::now(),
            state: Mutex::new(BatchProgress {
                total,
                ..Default::default()
            }),
        }
    }

    fn record(&self, failure: Option<(&BatchFailure, &str)>) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        state.processed += 1;

        match failure {
            None => state.successful += 1,
            Some((failure, detail)) => {
                state.failed += 1;
                if let Err(e) = self.append_error(failure, detail) {
                    warn!("Could not write {}: {}", self.error_path.display(), e);
                }
            }
        }

        if let Err(e) = self.write_progress(&state) {
            warn!("Could not write {}: {}", self.progress_path.display(), e);
        }

        if state.processed % 5 == 0 {
            let minutes = self.started.elapsed().as_secs_f64() / 60.0;
            let rate = if minutes > 0.0 { state.processed as f64 / minutes } else { 0.0 };
            info!(
                "Progress: {}/{} ({:.1} publishers/min)",
                state.processed, state.total, rate
            );
        }
    }

    fn append_error(&self, failure: &BatchFailure, detail: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.error_path)?;
        writeln!(
            file,
            "[{}] {} ({}): {}: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            failure.publisher,
            failure.url,
            failure.reason,
            detail
        )
    }

    fn write_progress(&self, state: &BatchProgress) -> Result<()> {
        fs::write(&self.progress_path, serde_json::to_string_pretty(state)?)?;
        Ok(())
    }
}

/// Runs the pipeline over many publishers with bounded concurrency.
///
/// A failed publisher is logged and recorded; it never stops the run.
pub struct BatchRunner {
    pipeline: Arc<Pipeline>,
    reports: ReportWriter,
    semaphore: Arc<Semaphore>,
    scrape_timeout: Duration,
}

impl BatchRunner {
    pub fn new(
        pipeline: Arc<Pipeline>,
        reports: ReportWriter,
        max_concurrent: usize,
        scrape_timeout: Duration,
    ) -> Self {
        Self {
            pipeline,
            reports,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            scrape_timeout,
        }
    }

    pub async fn run(&self, publishers: Vec<Publisher>) -> Result<BatchSummary> {
        let total = publishers.len();
        let log = Arc::new(ProgressLog::new(self.reports.dir(), total));
        let started = Instant::now();

        let mut handles = Vec::with_capacity(total);
        for (i, publisher) in publishers.into_iter().enumerate() {
            let pipeline = self.pipeline.clone();
            let semaphore = self.semaphore.clone();
            let reports = self.reports.clone();
            let log = log.clone();
            let timeout = self.scrape_timeout;
            let crashed = failure_for(&publisher, FailureReason::Exception.as_str());

            let handle = tokio::spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return Err(failure_for(&publisher, FailureReason::Exception.as_str()));
                };

                info!("Processing {}/{}: {}", i + 1, total, publisher.name);
                match pipeline.run(&publisher, Some(timeout)).await {
                    Ok(entry) => {
                        if let Err(e) = reports.write_individual(&entry) {
                            error!("Failed to save report for {}: {}", publisher.name, e);
                        }
                        log.record(None);
                        Ok(entry)
                    }
                    Err(e) => {
                        error!("Failed to process {}: {}", publisher.name, e);
                        let failure = failure_for(&publisher, e.reason());
                        let detail = e.to_string();
                        log.record(Some((&failure, detail.as_str())));
                        Err(failure)
                    }
                }
            });
            handles.push((crashed, handle));
        }

        let mut entries = Vec::new();
        let mut failures = Vec::new();
        for (crashed, handle) in handles {
            match handle.await {
                Ok(Ok(entry)) => entries.push(entry),
                Ok(Err(failure)) => failures.push(failure),
                Err(e) => {
                    error!("Batch task for {} did not finish: {}", crashed.publisher, e);
                    let detail = e.to_string();
                    log.record(Some((&crashed, detail.as_str())));
                    failures.push(crashed);
                }
            }
        }

        if !entries.is_empty() {
            self.reports.write_comparative(&entries)?;
        }
        self.reports.write_summary(&entries, &failures)?;

        let summary = BatchSummary {
            total,
            entries,
            failures,
            elapsed: started.elapsed(),
        };
        info!(
            "Batch complete: {} publishers, {} successful, {} failed in {:.1} minutes",
            summary.total,
            summary.entries.len(),
            summary.failures.len(),
            summary.elapsed.as_secs_f64() / 60.0
        );
        Ok(summary)
    }
}

fn failure_for(publisher: &Publisher, reason: &str) -> BatchFailure {
    BatchFailure {
        publisher: publisher.name.clone(),
        url: publisher.url.clone(),
        reason: reason.to_string(),
    }
}
