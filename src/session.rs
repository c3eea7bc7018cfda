//! Batch session: the current file selection plus its latest report.
//!
//! Re-uploading replaces the selection and bumps the session epoch. A batch
//! remembers the epoch it started under and its report is published only if
//! that epoch is still current when it finishes; a batch that raced with a
//! re-upload is discarded instead of overwriting newer state.

use crate::config::ConversionConfig;
use crate::convert::convert_all;
use crate::file::UploadedFile;
use crate::format::Format;
use crate::output::BatchReport;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// What became of a finished batch.
#[derive(Debug, Clone)]
pub enum SessionRun {
    /// The batch was current and its report is now [`BatchSession::latest`].
    Published(Arc<BatchReport>),
    /// The file selection changed while the batch ran; the report was dropped.
    Stale { started: u64, current: u64 },
}

impl SessionRun {
    pub fn report(&self) -> Option<&BatchReport> {
        match self {
            SessionRun::Published(report) => Some(report),
            SessionRun::Stale { .. } => None,
        }
    }
}

#[derive(Default)]
pub struct BatchSession {
    epoch: AtomicU64,
    files: Mutex<Vec<UploadedFile>>,
    latest: Mutex<Option<Arc<BatchReport>>>,
}

impl BatchSession {
    pub fn new(files: Vec<UploadedFile>) -> Self {
        Self {
            epoch: AtomicU64::new(0),
            files: Mutex::new(files),
            latest: Mutex::new(None),
        }
    }

    /// Replace the selection, invalidating any batch still in flight and
    /// clearing the previous report. Returns the new epoch.
    pub fn replace_files(&self, files: Vec<UploadedFile>) -> u64 {
        let mut latest = lock(&self.latest);
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        *lock(&self.files) = files;
        *latest = None;
        debug!("Session epoch is now {}", epoch);
        epoch
    }

    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Snapshot of the current selection.
    pub fn files(&self) -> Vec<UploadedFile> {
        lock(&self.files).clone()
    }

    /// Report of the last batch that finished while still current.
    pub fn latest(&self) -> Option<Arc<BatchReport>> {
        lock(&self.latest).clone()
    }

    /// Convert the current selection and publish the report if no
    /// re-upload happened in the meantime.
    pub async fn run(&self, target: Format, config: &ConversionConfig) -> SessionRun {
        let (started, files) = {
            let files = lock(&self.files);
            (self.epoch(), files.clone())
        };

        let report = convert_all(&files, target, config).await;

        let mut latest = lock(&self.latest);
        let current = self.epoch();
        if current != started {
            info!(
                "Discarding batch from epoch {} (current epoch {})",
                started, current
            );
            return SessionRun::Stale { started, current };
        }
        let report = Arc::new(report);
        *latest = Some(Arc::clone(&report));
        SessionRun::Published(report)
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::BatchProgressCallback;
    use std::sync::Weak;

    fn txt(name: &str) -> UploadedFile {
        UploadedFile::new(name, b"text".to_vec())
    }

    #[tokio::test]
    async fn current_batch_is_published() {
        let session = BatchSession::new(vec![txt("a.txt"), txt("b.txt")]);
        let run = session
            .run(Format::Html, &ConversionConfig::default())
            .await;
        let report = run.report().expect("published");
        assert_eq!(report.succeeded, 2);
        assert_eq!(session.latest().unwrap().results.len(), 2);
    }

    struct ReuploadOnFirstFile(Weak<BatchSession>);

    impl BatchProgressCallback for ReuploadOnFirstFile {
        fn on_file_start(&self, index: usize, _total: usize, _name: &str) {
            if index == 1 {
                if let Some(session) = self.0.upgrade() {
                    session.replace_files(vec![txt("new.txt")]);
                }
            }
        }
    }

    #[tokio::test]
    async fn batch_racing_a_reupload_is_discarded() {
        let session = Arc::new(BatchSession::new(vec![txt("old1.txt"), txt("old2.txt")]));
        let config = ConversionConfig::builder()
            .progress_callback(Arc::new(ReuploadOnFirstFile(Arc::downgrade(&session))))
            .build()
            .unwrap();

        let run = session.run(Format::Html, &config).await;
        assert!(matches!(run, SessionRun::Stale { started: 0, current: 1 }));
        assert!(session.latest().is_none());
        assert_eq!(session.files()[0].name(), "new.txt");
    }

    #[tokio::test]
    async fn reupload_clears_previous_report() {
        let session = BatchSession::new(vec![txt("a.txt")]);
        session
            .run(Format::Html, &ConversionConfig::default())
            .await;
        assert!(session.latest().is_some());
        assert_eq!(session.replace_files(vec![]), 1);
        assert!(session.latest().is_none());
    }
}
