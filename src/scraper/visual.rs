use std::collections::HashSet;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::scraper::extractor::collapse_whitespace;
use crate::scraper::ScraperConfig;

/// OCR fragments shorter than this are treated as recognition noise
const MIN_OCR_FRAGMENT_CHARS: usize = 4;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR engine not found: {0}")]
    NotInstalled(String),

    #[error("OCR I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("OCR exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("OCR timed out after {0:?}")]
    Timeout(Duration),

    #[error("no image data")]
    EmptyImage,
}

/// Converts an encoded image into text
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &[u8]) -> Result<String, OcrError>;
}

/// Runs the `tesseract` CLI, feeding the image on stdin
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: String,
    timeout: Duration,
}

impl TesseractOcr {
    pub fn new(binary: impl Into<String>, timeout: Duration) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self::new(config.tesseract_path.clone(), config.ocr_timeout())
    }

    async fn run(&self, image: &[u8]) -> Result<String, OcrError> {
        let mut child = Command::new(&self.binary)
            .args(["stdin", "stdout"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => OcrError::NotInstalled(self.binary.clone()),
                _ => OcrError::Io(e),
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(image).await?;
            stdin.shutdown().await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            return Err(OcrError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl TextRecognizer for TesseractOcr {
    async fn recognize(&self, image: &[u8]) -> Result<String, OcrError> {
        if image.is_empty() {
            return Err(OcrError::EmptyImage);
        }

        tokio::time::timeout(self.timeout, self.run(image))
            .await
            .map_err(|_| OcrError::Timeout(self.timeout))?
    }
}

/// Append OCR fragments that the DOM text does not already contain.
///
/// The result always starts with the whitespace-normalized DOM text.
/// Fragments are split on sentence punctuation and line breaks and compared
/// case-insensitively.
pub fn merge_texts(dom_text: &str, ocr_text: &str) -> String {
    let dom = collapse_whitespace(dom_text);
    let dom_lower = dom.to_lowercase();
    let mut seen = HashSet::new();
    let mut novel = Vec::new();

    for raw in ocr_text.split_inclusive(['.', '!', '?', '\n']) {
        let fragment = collapse_whitespace(raw);
        let core = fragment.trim_end_matches(['.', '!', '?']).trim();
        if core.chars().count() < MIN_OCR_FRAGMENT_CHARS
            || !core.chars().any(char::is_alphanumeric)
        {
            continue;
        }

        let key = core.to_lowercase();
        if dom_lower.contains(&key) || !seen.insert(key) {
            continue;
        }
        novel.push(fragment);
    }

    if novel.is_empty() {
        return dom;
    }
    if dom.is_empty() {
        return novel.join(" ");
    }
    format!("{} {}", dom, novel.join(" "))
}

/// OCR over a rendered screenshot, merged additively into the DOM text
#[derive(Clone)]
pub struct VisualExtractor {
    recognizer: Arc<dyn TextRecognizer>,
}

impl VisualExtractor {
    pub fn new(recognizer: Arc<dyn TextRecognizer>) -> Self {
        Self { recognizer }
    }

    /// Never fails: an OCR error leaves the DOM text as the result
    pub async fn extract_and_merge(&self, screenshot: &[u8], dom_text: &str) -> String {
        match self.recognizer.recognize(screenshot).await {
            Ok(ocr_text) => {
                let merged = merge_texts(dom_text, &ocr_text);
                debug!(
                    "OCR produced {} characters, merged text grew by {}",
                    ocr_text.chars().count(),
                    merged
                        .chars()
                        .count()
                        .saturating_sub(collapse_whitespace(dom_text).chars().count())
                );
                merged
            }
            Err(e) => {
                warn!("OCR failed, keeping DOM text only: {}", e);
                collapse_whitespace(dom_text)
            }
        }
    }
}
