//! Batch conversion entry points.
//!
//! [`convert_all`] is the orchestrator: it walks the batch strictly in input
//! order, routes every file, and never lets one file's failure abort the
//! rest. Use [`crate::stream::convert_stream`] instead to receive results
//! file by file as they finish.

use crate::config::ConversionConfig;
use crate::error::{ConvertError, FileError, OutputWriteError};
use crate::file::{Artifact, UploadedFile};
use crate::format::Format;
use crate::output::{BatchReport, ConversionResult};
use crate::progress::percent;
use crate::router::Router;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Convert every file in `files` to `target`.
///
/// Failures are recorded per file and never abort the batch. Files whose
/// conversion produces several artifacts (PDF → image) expand into one
/// result per artifact, tagged with `page_number` / `total_pages`.
///
/// # Example
/// ```rust,no_run
/// use fileconv::{convert_all, ConversionConfig, Format, UploadedFile};
///
/// # #[tokio::main]
/// # async fn main() {
/// let files = vec![UploadedFile::new("notes.txt", b"hello".to_vec())];
/// let report = convert_all(&files, Format::Html, &ConversionConfig::default()).await;
/// println!("{}", report.summary());
/// # }
/// ```
pub async fn convert_all(
    files: &[UploadedFile],
    target: Format,
    config: &ConversionConfig,
) -> BatchReport {
    let start = Instant::now();
    let total = files.len();
    info!("Starting batch: {} file(s) → {}", total, target);

    let cb = config.progress_callback.as_ref();
    if let Some(cb) = cb {
        cb.on_batch_start(total);
    }

    let mut results = Vec::with_capacity(total);
    for (i, file) in files.iter().enumerate() {
        let index = i + 1;
        if let Some(cb) = cb {
            cb.on_file_start(index, total, file.name());
        }

        match route_pages(file, target, config).await {
            Ok(artifacts) => {
                if let Some(cb) = cb {
                    cb.on_file_complete(index, total, artifacts.len());
                }
                results.extend(expand(file, target, artifacts));
            }
            Err(e) => {
                warn!("File {}/{} failed: {}", index, total, e);
                if let Some(cb) = cb {
                    cb.on_file_error(index, total, &e.source.to_string());
                }
                results.push(ConversionResult::failed(
                    file.name(),
                    file.size(),
                    target,
                    e.source.to_string(),
                ));
            }
        }

        if let Some(cb) = cb {
            cb.on_progress(percent(index, total));
        }
    }

    let report = BatchReport::new(
        target,
        results,
        percent(total, total),
        start.elapsed().as_millis() as u64,
    );
    info!(
        "Batch complete: {} succeeded, {} failed in {}ms",
        report.succeeded, report.failed, report.duration_ms
    );
    if let Some(cb) = cb {
        cb.on_batch_complete(report.outcome, report.succeeded, report.failed);
    }
    report
}

/// Route one batch entry, honouring [`ConversionConfig::pdf_all_pages`].
pub(crate) async fn route_pages(
    file: &UploadedFile,
    target: Format,
    config: &ConversionConfig,
) -> Result<Vec<Artifact>, FileError> {
    let router = Router::shared().map_err(|e| FileError::new(file.name(), e))?;
    if config.pdf_all_pages {
        router.convert_pages(file, target, config).await
    } else {
        router.convert(file, target, config).await.map(|a| vec![a])
    }
}

/// Turn one file's artifacts into batch results.
pub(crate) fn expand(
    file: &UploadedFile,
    target: Format,
    artifacts: Vec<Artifact>,
) -> Vec<ConversionResult> {
    let total = artifacts.len();
    match total {
        0 => vec![ConversionResult::failed(
            file.name(),
            file.size(),
            target,
            "conversion produced no output",
        )],
        1 => artifacts
            .into_iter()
            .map(|a| ConversionResult::succeeded(file.name(), file.size(), a, target))
            .collect(),
        _ => artifacts
            .into_iter()
            .enumerate()
            .map(|(i, a)| {
                ConversionResult::succeeded(file.name(), file.size(), a, target)
                    .with_page(i + 1, total)
            })
            .collect(),
    }
}

/// Convert a single file to exactly one artifact (PDF → image renders page 1).
pub async fn convert_file(
    file: &UploadedFile,
    target: Format,
    config: &ConversionConfig,
) -> Result<Artifact, FileError> {
    let router = Router::shared().map_err(|e| FileError::new(file.name(), e))?;
    router.convert(file, target, config).await
}

/// Synchronous wrapper around [`convert_all`].
///
/// Creates a temporary tokio runtime internally.
pub fn convert_sync(
    files: &[UploadedFile],
    target: Format,
    config: &ConversionConfig,
) -> Result<BatchReport, ConvertError> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| ConvertError::Internal(format!("Failed to create tokio runtime: {}", e)))?;
    Ok(runtime.block_on(convert_all(files, target, config)))
}

/// Write every successful artifact in `results` into `dir`, waiting
/// `stagger` between consecutive files.
///
/// Each file is written atomically (temp file + rename). When two artifacts
/// share a name, later ones get a ` (n)` suffix instead of overwriting.
/// Returns the written paths in batch order.
pub async fn save_artifacts(
    results: &[ConversionResult],
    dir: &Path,
    stagger: Duration,
) -> Result<Vec<PathBuf>, OutputWriteError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| OutputWriteError {
            path: dir.to_path_buf(),
            source: e,
        })?;

    let mut used = HashSet::new();
    let mut written = Vec::new();
    for artifact in results.iter().filter_map(ConversionResult::converted) {
        if !written.is_empty() && !stagger.is_zero() {
            tokio::time::sleep(stagger).await;
        }
        let name = unique_name(artifact.name(), &mut used);
        let path = dir.join(&name);
        write_atomic(&path, artifact.data()).await?;
        info!("Saved {}", path.display());
        written.push(path);
    }
    Ok(written)
}

async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), OutputWriteError> {
    let err = |source| OutputWriteError {
        path: path.to_path_buf(),
        source,
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!(".{file_name}.tmp"));
    tokio::fs::write(&tmp_path, data).await.map_err(err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(err)
}

/// `name`, or `stem (n).ext` for the n-th repeat within one save.
fn unique_name(name: &str, used: &mut HashSet<String>) -> String {
    if used.insert(name.to_string()) {
        return name.to_string();
    }
    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    let mut n = 1;
    loop {
        let candidate = match ext {
            Some(ext) => format!("{stem} ({n}).{ext}"),
            None => format!("{stem} ({n})"),
        };
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
