//! Error types for the fileconv library.
//!
//! Three layers of failure exist, each with its own type:
//!
//! * [`ConvertError`] — the taxonomy of a single conversion: the pair is not
//!   supported, the source bytes cannot be decoded, a rasterisation/layout step
//!   failed, or the final artifact could not be written.
//!
//! * [`FileError`] — a [`ConvertError`] wrapped with the name of the file that
//!   produced it. This is what the router returns and what the batch
//!   orchestrator records in a failed [`crate::output::ConversionResult`].
//!
//! * [`EngineError`] — **Fatal**: the native PDF engine cannot be located or
//!   bound. Reported once by [`crate::engine::initialize`] at startup rather
//!   than per file.

use crate::format::Format;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of one conversion step.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConvertError {
    /// The (source, target) pair is not in the format registry.
    #[error("Unsupported conversion: {from} -> {to}")]
    UnsupportedConversion { from: String, to: String },

    /// Source bytes cannot be parsed by the expected format reader.
    #[error("Failed to decode {format} input: {detail}")]
    DecodeFailure { format: Format, detail: String },

    /// Rasterisation or layout failed (image load error, page render error).
    #[error("Rendering failed: {detail}")]
    RenderFailure { detail: String },

    /// The output artifact could not be constructed.
    #[error("Failed to encode {format} output: {detail}")]
    EncodeFailure { format: Format, detail: String },

    /// A PDF-touching converter ran before the engine was initialised.
    #[error("PDF engine unavailable: {0}")]
    EngineUnavailable(String),

    /// Unexpected internal error (task panic, registry mismatch).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConvertError {
    pub(crate) fn decode(format: Format, detail: impl ToString) -> Self {
        ConvertError::DecodeFailure {
            format,
            detail: detail.to_string(),
        }
    }

    pub(crate) fn render(detail: impl ToString) -> Self {
        ConvertError::RenderFailure {
            detail: detail.to_string(),
        }
    }

    pub(crate) fn encode(format: Format, detail: impl ToString) -> Self {
        ConvertError::EncodeFailure {
            format,
            detail: detail.to_string(),
        }
    }

    /// `true` for [`ConvertError::UnsupportedConversion`].
    pub fn is_unsupported(&self) -> bool {
        matches!(self, ConvertError::UnsupportedConversion { .. })
    }
}

/// A conversion error annotated with the file it came from.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{file}: {source}")]
pub struct FileError {
    pub file: String,
    #[source]
    pub source: ConvertError,
}

impl FileError {
    pub fn new(file: impl Into<String>, source: ConvertError) -> Self {
        Self {
            file: file.into(),
            source,
        }
    }

    /// The underlying conversion error.
    pub fn kind(&self) -> &ConvertError {
        &self.source
    }
}

/// Fatal PDF engine initialisation errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The configured library path does not exist.
    #[error("PDF engine library not found at '{path}'\nSet PDFIUM_LIB_PATH or pass --pdfium-lib.")]
    LibraryNotFound { path: PathBuf },

    /// The library exists but could not be loaded.
    #[error(
        "Failed to bind to pdfium library{}: {reason}\n\n\
You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium (file or directory).\n\
  • Place libpdfium next to the fileconv executable.\n\
  • Install pdfium as a system library.\n",
        .path.as_ref().map(|p| format!(" at '{}'", p.display())).unwrap_or_default()
    )]
    BindFailed {
        path: Option<PathBuf>,
        reason: String,
    },
}

/// Errors loading an input from disk or over HTTP.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to read '{path}': {source}")]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },
}

/// Errors writing artifacts to disk.
#[derive(Debug, Error)]
#[error("Failed to write output file '{path}': {source}")]
pub struct OutputWriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Builder validation failed.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("Invalid configuration: {0}")]
pub struct ConfigError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_names_both_formats() {
        let e = ConvertError::UnsupportedConversion {
            from: "docx".into(),
            to: "png".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("docx"), "got: {msg}");
        assert!(msg.contains("png"), "got: {msg}");
        assert!(e.is_unsupported());
    }

    #[test]
    fn file_error_wraps_with_name() {
        let e = FileError::new(
            "report.xlsx",
            ConvertError::decode(Format::Xlsx, "bad zip"),
        );
        let msg = e.to_string();
        assert!(msg.starts_with("report.xlsx: "), "got: {msg}");
        assert!(msg.contains("bad zip"));
        assert!(!e.kind().is_unsupported());
    }

    #[test]
    fn bind_failed_display_with_and_without_path() {
        let e = EngineError::BindFailed {
            path: Some(PathBuf::from("/opt/libpdfium.so")),
            reason: "dlopen failed".into(),
        };
        assert!(e.to_string().contains("/opt/libpdfium.so"));

        let e = EngineError::BindFailed {
            path: None,
            reason: "no system library".into(),
        };
        assert!(e.to_string().contains("no system library"));
        assert!(!e.to_string().contains(" at '"));
    }
}
