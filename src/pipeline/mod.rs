//! Per-format converters.
//!
//! Each submodule owns one family of source formats. Every converter has the
//! same shape, [`ConverterFn`]: it takes a [`ConvertJob`] and returns the
//! artifacts it produced. Converters are synchronous and CPU-bound; the
//! router runs them under `spawn_blocking`.
//!
//! ```text
//! input ──▶ router ──▶ pdf | word | spreadsheet | text | html | image ──▶ encode
//! (path/URL)           (one converter per (source, target) pair)          (PNG/JPEG)
//! ```

pub mod encode;
pub mod html;
pub mod image;
pub mod input;
pub mod pdf;
pub mod spreadsheet;
pub mod text;
pub mod word;

use crate::config::ConversionConfig;
use crate::error::ConvertError;
use crate::file::{Artifact, UploadedFile};
use crate::format::Format;

/// Everything a converter needs for one file.
pub struct ConvertJob<'a> {
    pub file: &'a UploadedFile,
    pub source: Format,
    pub target: Format,
    pub config: &'a ConversionConfig,
    /// Produce one artifact per page where the converter supports it
    /// (PDF→image). When `false` only the first page is rendered.
    pub all_pages: bool,
}

impl ConvertJob<'_> {
    /// A single artifact named after the source file.
    pub(crate) fn artifact(&self, data: Vec<u8>) -> Artifact {
        Artifact::for_source(self.file.name(), self.target, data)
    }
}

/// Signature shared by every entry in the dispatch table.
pub type ConverterFn = fn(&ConvertJob<'_>) -> Result<Vec<Artifact>, ConvertError>;
