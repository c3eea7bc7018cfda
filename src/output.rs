//! Batch results.
//!
//! A [`ConversionResult`] is either a success carrying an artifact or a
//! failure carrying an error message; the two constructors are the only way
//! to build one, so `success` can never disagree with the presence of the
//! artifact or the error.

use crate::file::Artifact;
use crate::format::Format;
use serde::Serialize;

/// Outcome of one file (or one page of a multi-output file) in a batch.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionResult {
    original_name: String,
    original_size: usize,
    converted: Option<Artifact>,
    target: Format,
    error: Option<String>,
    page_number: Option<usize>,
    total_pages: Option<usize>,
}

impl ConversionResult {
    pub fn succeeded(original_name: &str, original_size: usize, artifact: Artifact, target: Format) -> Self {
        Self {
            original_name: original_name.to_string(),
            original_size,
            converted: Some(artifact),
            target,
            error: None,
            page_number: None,
            total_pages: None,
        }
    }

    pub fn failed(
        original_name: &str,
        original_size: usize,
        target: Format,
        error: impl Into<String>,
    ) -> Self {
        Self {
            original_name: original_name.to_string(),
            original_size,
            converted: None,
            target,
            error: Some(error.into()),
            page_number: None,
            total_pages: None,
        }
    }

    /// Tag a successful result as page `page` of `total`.
    pub(crate) fn with_page(mut self, page: usize, total: usize) -> Self {
        self.page_number = Some(page);
        self.total_pages = Some(total);
        self
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn original_size(&self) -> usize {
        self.original_size
    }

    pub fn converted(&self) -> Option<&Artifact> {
        self.converted.as_ref()
    }

    pub fn target(&self) -> Format {
        self.target
    }

    pub fn success(&self) -> bool {
        self.converted.is_some()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn page_number(&self) -> Option<usize> {
        self.page_number
    }

    pub fn total_pages(&self) -> Option<usize> {
        self.total_pages
    }
}

/// Aggregate tri-state of a finished batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchOutcome {
    AllSucceeded,
    AllFailed,
    Mixed,
}

impl BatchOutcome {
    /// Classify from success/failure counts. A batch with no failures
    /// (including an empty one) counts as all-succeeded.
    pub fn from_counts(succeeded: usize, failed: usize) -> Self {
        match (succeeded, failed) {
            (_, 0) => BatchOutcome::AllSucceeded,
            (0, _) => BatchOutcome::AllFailed,
            _ => BatchOutcome::Mixed,
        }
    }
}

/// Everything the UI needs after a batch: ordered results and the outcome.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub target: Format,
    pub results: Vec<ConversionResult>,
    pub outcome: BatchOutcome,
    pub succeeded: usize,
    pub failed: usize,
    /// Last progress value reported, `round(100 * completed / total)`.
    pub progress: u8,
    pub duration_ms: u64,
}

impl BatchReport {
    pub(crate) fn new(
        target: Format,
        results: Vec<ConversionResult>,
        progress: u8,
        duration_ms: u64,
    ) -> Self {
        let succeeded = results.iter().filter(|r| r.success()).count();
        let failed = results.len() - succeeded;
        Self {
            target,
            outcome: BatchOutcome::from_counts(succeeded, failed),
            results,
            succeeded,
            failed,
            progress,
            duration_ms,
        }
    }

    /// `(file name, error text)` for every failed entry, in batch order.
    pub fn errors(&self) -> Vec<(&str, &str)> {
        self.results
            .iter()
            .filter_map(|r| r.error().map(|e| (r.original_name(), e)))
            .collect()
    }

    /// Artifacts of the successful entries, in batch order.
    pub fn artifacts(&self) -> impl Iterator<Item = &Artifact> {
        self.results.iter().filter_map(|r| r.converted())
    }

    /// One-line summary in the tone of the tool's notifications.
    pub fn summary(&self) -> String {
        match self.outcome {
            BatchOutcome::AllSucceeded => {
                format!("Converted {} file(s) successfully", self.succeeded)
            }
            BatchOutcome::AllFailed => {
                format!("Conversion failed: {} file(s) had errors", self.failed)
            }
            BatchOutcome::Mixed => format!(
                "Partially converted: {} succeeded, {} failed",
                self.succeeded, self.failed
            ),
        }
    }
}
