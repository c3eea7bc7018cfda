//! In-memory inputs and outputs of a conversion.
//!
//! Both types share their payload through an `Arc<[u8]>` so that handing a
//! file to `spawn_blocking`, to a batch result, or to the preview path is a
//! reference-count bump rather than a copy of a possibly large document.

use crate::format::Format;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A file selected by the user: declared name plus its raw bytes.
///
/// Immutable once created; a re-upload replaces it wholesale.
#[derive(Clone)]
pub struct UploadedFile {
    name: String,
    data: Arc<[u8]>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Source format derived from the file name, if recognised.
    pub fn format(&self) -> Option<Format> {
        Format::from_file_name(&self.name)
    }

    /// The name without its last extension.
    pub fn base_name(&self) -> &str {
        base_name(&self.name)
    }

    /// Decode the payload as UTF-8, replacing invalid sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

impl fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadedFile")
            .field("name", &self.name)
            .field("size", &self.data.len())
            .finish()
    }
}

/// A named, typed, in-memory conversion output.
#[derive(Clone, Serialize)]
pub struct Artifact {
    name: String,
    format: Format,
    content_type: &'static str,
    #[serde(skip)]
    data: Arc<[u8]>,
}

impl Artifact {
    /// Build an artifact for `source_name` converted to `format`: the output
    /// name is the source base name plus the new extension.
    pub fn for_source(source_name: &str, format: Format, data: Vec<u8>) -> Self {
        Self::named(
            format!("{}.{}", base_name(source_name), format.extension()),
            format,
            data,
        )
    }

    /// Artifact for page `page` of a multi-output job.
    pub fn for_page(source_name: &str, page: usize, format: Format, data: Vec<u8>) -> Self {
        Self::named(
            format!("{}-page-{}.{}", base_name(source_name), page, format.extension()),
            format,
            data,
        )
    }

    fn named(name: String, format: Format, data: Vec<u8>) -> Self {
        Self {
            name,
            format,
            content_type: format.content_type(),
            data: data.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn format(&self) -> Format {
        self.format
    }

    pub fn content_type(&self) -> &'static str {
        self.content_type
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Re-open the artifact as an input, e.g. to chain a second conversion.
    pub fn into_uploaded(self) -> UploadedFile {
        UploadedFile {
            name: self.name,
            data: self.data,
        }
    }
}

impl fmt::Debug for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Artifact")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("size", &self.data.len())
            .finish()
    }
}

/// Strip the last extension from `name`. Names without a dot (or dotfiles
/// like `.env`) are returned unchanged.
pub fn base_name(name: &str) -> &str {
    match name.rfind('.') {
        Some(0) | None => name,
        Some(idx) => &name[..idx],
    }
}

/// Human-readable byte size: `0 Bytes`, `1.5 KB`, `2 MB`.
pub fn format_file_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];
    let k = 1024f64;
    let b = bytes as f64;
    let i = ((b.ln() / k.ln()).floor() as usize).min(UNITS.len() - 1);
    let value = b / k.powi(i as i32);
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[i])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_name_strips_last_extension_only() {
        assert_eq!(base_name("report.final.pdf"), "report.final");
        assert_eq!(base_name("noext"), "noext");
        assert_eq!(base_name(".env"), ".env");
    }

    #[test]
    fn artifact_names_and_types() {
        let a = Artifact::for_source("scan.v2.PNG", Format::Pdf, vec![1, 2, 3]);
        assert_eq!(a.name(), "scan.v2.pdf");
        assert_eq!(a.content_type(), "application/pdf");
        assert_eq!(a.size(), 3);

        let p = Artifact::for_page("deck.pdf", 2, Format::Jpg, vec![]);
        assert_eq!(p.name(), "deck-page-2.jpg");
        assert_eq!(p.content_type(), "image/jpeg");
    }

    #[test]
    fn uploaded_file_basics() {
        let f = UploadedFile::new("Data.CSV", b"a,b".to_vec());
        assert_eq!(f.format(), Some(Format::Csv));
        assert_eq!(f.size(), 3);
        assert_eq!(f.base_name(), "Data");
        assert_eq!(f.text(), "a,b");
    }

    #[test]
    fn file_sizes() {
        assert_eq!(format_file_size(0), "0 Bytes");
        assert_eq!(format_file_size(512), "512 Bytes");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(2 * 1024 * 1024), "2 MB");
    }
}
