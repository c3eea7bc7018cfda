//! Progress-callback trait for per-file batch events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to receive
//! events as the orchestrator works through a batch.
//!
//! Files are processed strictly in input order, so events for file `i` always
//! arrive before events for file `i + 1`. Progress is reported once per file,
//! never per output artifact.
//!
//! # Example
//!
//! ```rust
//! use fileconv::{BatchProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicU8, Ordering}};
//!
//! struct LastPercent(AtomicU8);
//!
//! impl BatchProgressCallback for LastPercent {
//!     fn on_progress(&self, percent: u8) {
//!         self.0.store(percent, Ordering::SeqCst);
//!     }
//! }
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(Arc::new(LastPercent(AtomicU8::new(0))))
//!     .build()
//!     .unwrap();
//! ```

use crate::output::BatchOutcome;
use std::sync::Arc;

/// Called by the batch orchestrator as it processes each file.
///
/// All methods have default no-op implementations so callers only override
/// what they care about.
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before the first file.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called before file `index` (1-based) is routed.
    fn on_file_start(&self, index: usize, total_files: usize, name: &str) {
        let _ = (index, total_files, name);
    }

    /// Called when a file converted; `artifacts` is how many outputs it produced.
    fn on_file_complete(&self, index: usize, total_files: usize, artifacts: usize) {
        let _ = (index, total_files, artifacts);
    }

    /// Called when a file failed.
    fn on_file_error(&self, index: usize, total_files: usize, error: &str) {
        let _ = (index, total_files, error);
    }

    /// Called after every file with `round(100 * completed / total)`.
    fn on_progress(&self, percent: u8) {
        let _ = percent;
    }

    /// Called once after the last file.
    fn on_batch_complete(&self, outcome: BatchOutcome, succeeded: usize, failed: usize) {
        let _ = (outcome, succeeded, failed);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

/// `round(100 * completed / total)`, 0 for an empty batch.
pub fn percent(completed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((completed as f64 / total as f64) * 100.0).round().min(100.0) as u8
}
