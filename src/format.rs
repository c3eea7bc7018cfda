//! File formats and the static registry of legal conversions.
//!
//! The registry is the single source of truth for which `(source, target)`
//! pairs the UI may offer. [`crate::router::Router::new`] checks its dispatch
//! table against this registry, so a pair can never be offered without a
//! converter behind it (or vice versa).

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Every file extension the tool recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    Pdf,
    Doc,
    Docx,
    Xls,
    Xlsx,
    Csv,
    Txt,
    Md,
    Html,
    Htm,
    Png,
    Jpg,
    Jpeg,
    Gif,
    Bmp,
    Webp,
    Ppt,
    Pptx,
}

/// Coarse grouping used for preview dispatch and UI labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormatFamily {
    Pdf,
    Word,
    Excel,
    Csv,
    Text,
    Html,
    Image,
    PowerPoint,
}

impl Format {
    pub const ALL: [Format; 18] = [
        Format::Pdf,
        Format::Doc,
        Format::Docx,
        Format::Xls,
        Format::Xlsx,
        Format::Csv,
        Format::Txt,
        Format::Md,
        Format::Html,
        Format::Htm,
        Format::Png,
        Format::Jpg,
        Format::Jpeg,
        Format::Gif,
        Format::Bmp,
        Format::Webp,
        Format::Ppt,
        Format::Pptx,
    ];

    /// Parse a bare extension (`"PNG"`, `"png"`, `".png"`).
    pub fn from_extension(ext: &str) -> Option<Format> {
        let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        Format::ALL.iter().copied().find(|f| f.extension() == ext)
    }

    /// Derive the format from a file name: the lower-cased suffix after the
    /// last `.`. A name without a dot is treated as all-suffix, so `"pdf"`
    /// resolves to PDF the same way the upload widget does it.
    pub fn from_file_name(name: &str) -> Option<Format> {
        Format::from_extension(extension_of(name))
    }

    pub fn extension(self) -> &'static str {
        match self {
            Format::Pdf => "pdf",
            Format::Doc => "doc",
            Format::Docx => "docx",
            Format::Xls => "xls",
            Format::Xlsx => "xlsx",
            Format::Csv => "csv",
            Format::Txt => "txt",
            Format::Md => "md",
            Format::Html => "html",
            Format::Htm => "htm",
            Format::Png => "png",
            Format::Jpg => "jpg",
            Format::Jpeg => "jpeg",
            Format::Gif => "gif",
            Format::Bmp => "bmp",
            Format::Webp => "webp",
            Format::Ppt => "ppt",
            Format::Pptx => "pptx",
        }
    }

    /// MIME type tagged on artifacts of this format.
    pub fn content_type(self) -> &'static str {
        match self {
            Format::Pdf => "application/pdf",
            Format::Doc => "application/msword",
            Format::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Format::Xls => "application/vnd.ms-excel",
            Format::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Format::Csv => "text/csv",
            Format::Txt => "text/plain",
            Format::Md => "text/markdown",
            Format::Html | Format::Htm => "text/html",
            Format::Png => "image/png",
            Format::Jpg | Format::Jpeg => "image/jpeg",
            Format::Gif => "image/gif",
            Format::Bmp => "image/bmp",
            Format::Webp => "image/webp",
            Format::Ppt => "application/vnd.ms-powerpoint",
            Format::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
        }
    }

    pub fn family(self) -> FormatFamily {
        match self {
            Format::Pdf => FormatFamily::Pdf,
            Format::Doc | Format::Docx => FormatFamily::Word,
            Format::Xls | Format::Xlsx => FormatFamily::Excel,
            Format::Csv => FormatFamily::Csv,
            Format::Txt | Format::Md => FormatFamily::Text,
            Format::Html | Format::Htm => FormatFamily::Html,
            Format::Png | Format::Jpg | Format::Jpeg | Format::Gif | Format::Bmp | Format::Webp => {
                FormatFamily::Image
            }
            Format::Ppt | Format::Pptx => FormatFamily::PowerPoint,
        }
    }

    /// `true` for raster targets a PDF can be rendered into.
    pub fn is_raster_target(self) -> bool {
        matches!(self, Format::Png | Format::Jpg | Format::Jpeg)
    }

    /// Label shown next to a target option, e.g. `"PNG image (.png)"`.
    pub fn label(self) -> String {
        let kind = match self {
            Format::Pdf => "PDF document",
            Format::Doc | Format::Docx => "Word document",
            Format::Xls | Format::Xlsx => "Excel workbook",
            Format::Csv => "CSV file",
            Format::Txt => "Text file",
            Format::Md => "Markdown file",
            Format::Html | Format::Htm => "HTML page",
            Format::Png => "PNG image",
            Format::Jpg => "JPG image",
            Format::Jpeg => "JPEG image",
            Format::Gif => "GIF image",
            Format::Bmp => "BMP image",
            Format::Webp => "WebP image",
            Format::Ppt | Format::Pptx => "PowerPoint presentation",
        };
        format!("{kind} (.{})", self.extension())
    }

    /// One-line description of a target format.
    pub fn description(self) -> &'static str {
        match self {
            Format::Pdf => "Portable document format, suited to printing and sharing",
            Format::Docx => "Microsoft Word document format",
            Format::Xlsx => "Microsoft Excel workbook format",
            Format::Csv => "Comma-separated values, a common data interchange format",
            Format::Html => "Web page format, viewable in any browser",
            Format::Txt => "Plain text, the most compatible format",
            Format::Png => "High-quality image format with transparency support",
            Format::Jpg => "Common image format with small file sizes",
            Format::Jpeg => "Standard image format with high compression",
            _ => "",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FormatFamily {
    /// Name of the source format shown for the first uploaded file.
    pub fn display_name(family: Option<FormatFamily>) -> &'static str {
        match family {
            Some(FormatFamily::Pdf) => "PDF",
            Some(FormatFamily::Word) => "Word",
            Some(FormatFamily::Excel) => "Excel",
            Some(FormatFamily::Csv) => "CSV",
            Some(FormatFamily::Text) => "Text",
            Some(FormatFamily::Html) => "HTML",
            Some(FormatFamily::Image) => "Image",
            Some(FormatFamily::PowerPoint) => "PowerPoint",
            None => "File",
        }
    }
}

/// Suffix after the last `.` of `name` (case preserved).
pub fn extension_of(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => name,
    }
}

// ── Registry ─────────────────────────────────────────────────────────────

const TABLE: &[(Format, &[Format])] = &[
    (Format::Pdf, &[Format::Png, Format::Jpg, Format::Jpeg, Format::Txt]),
    (Format::Doc, &[Format::Html]),
    (Format::Docx, &[Format::Html]),
    (Format::Xls, &[Format::Html, Format::Csv]),
    (Format::Xlsx, &[Format::Html, Format::Csv]),
    (Format::Csv, &[Format::Xlsx]),
    (Format::Txt, &[Format::Html]),
    (Format::Html, &[Format::Pdf]),
    (Format::Png, &[Format::Pdf, Format::Jpg, Format::Jpeg]),
    (Format::Jpg, &[Format::Pdf, Format::Png]),
    (Format::Jpeg, &[Format::Pdf, Format::Png]),
    (Format::Gif, &[Format::Pdf, Format::Png, Format::Jpg]),
    (Format::Bmp, &[Format::Pdf, Format::Png, Format::Jpg]),
    (Format::Webp, &[Format::Pdf, Format::Png, Format::Jpg]),
];

static REGISTRY: Lazy<HashMap<Format, &'static [Format]>> =
    Lazy::new(|| TABLE.iter().map(|(src, targets)| (*src, *targets)).collect());

/// Every legal `(source, target)` pair, in table order.
pub fn registry_pairs() -> impl Iterator<Item = (Format, Format)> {
    TABLE
        .iter()
        .flat_map(|(src, targets)| targets.iter().map(move |t| (*src, *t)))
}

/// Formats that can appear as a conversion source.
pub fn source_formats() -> impl Iterator<Item = Format> {
    TABLE.iter().map(|(src, _)| *src)
}

/// Ordered conversion targets for `source_ext`. Unknown sources yield an
/// empty list.
pub fn supported_targets(source_ext: &str) -> Vec<Format> {
    Format::from_extension(source_ext)
        .and_then(|f| REGISTRY.get(&f))
        .map(|targets| targets.to_vec())
        .unwrap_or_default()
}

/// `true` when `source_ext -> target_ext` is a registered conversion.
pub fn is_supported(source_ext: &str, target_ext: &str) -> bool {
    match Format::from_extension(target_ext) {
        Some(target) => supported_targets(source_ext).contains(&target),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn targets_are_ordered() {
        assert_eq!(
            supported_targets("pdf"),
            vec![Format::Png, Format::Jpg, Format::Jpeg, Format::Txt]
        );
        assert_eq!(
            supported_targets("GIF"),
            vec![Format::Pdf, Format::Png, Format::Jpg]
        );
    }

    #[test]
    fn unknown_source_is_empty_not_error() {
        assert!(supported_targets("exe").is_empty());
        assert!(supported_targets("").is_empty());
        // recognised but not convertible
        assert!(supported_targets("pptx").is_empty());
    }

    #[test]
    fn is_supported_matches_table() {
        assert!(is_supported("csv", "xlsx"));
        assert!(is_supported("png", "jpeg"));
        assert!(!is_supported("jpg", "jpeg"));
        assert!(!is_supported("xlsx", "csv2"));
        assert!(!is_supported("txt", "pdf"));
    }

    #[test]
    fn file_name_uses_last_suffix_lowercased() {
        assert_eq!(Format::from_file_name("Report.Final.XLSX"), Some(Format::Xlsx));
        assert_eq!(Format::from_file_name("archive.tar.gz"), None);
        assert_eq!(extension_of("README"), "README");
    }

    #[test]
    fn labels_and_content_types() {
        assert_eq!(Format::Png.label(), "PNG image (.png)");
        assert_eq!(Format::Jpeg.content_type(), "image/jpeg");
        assert_eq!(
            FormatFamily::display_name(Format::from_extension("webp").map(Format::family)),
            "Image"
        );
        assert_eq!(FormatFamily::display_name(None), "File");
    }

    #[test]
    fn pair_count() {
        assert_eq!(registry_pairs().count(), 29);
    }
}
