//! File previews.
//!
//! [`preview`] turns an uploaded file into a [`PreviewPayload`] a viewer can
//! render directly. It never fails: anything that cannot be previewed comes
//! back as [`PreviewPayload::Unavailable`] with the file's metadata and a
//! reason.

use crate::config::ConversionConfig;
use crate::file::{format_file_size, UploadedFile};
use crate::format::{Format, FormatFamily};
use crate::pipeline::encode::data_url;
use crate::pipeline::{image, spreadsheet, word};
use serde::Serialize;
use tracing::{debug, warn};

/// Name and size of a file that could not be previewed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMetadata {
    pub name: String,
    pub size: usize,
    /// Human-readable size, e.g. `1.5 KB`.
    pub size_display: String,
}

impl FileMetadata {
    fn of(file: &UploadedFile) -> Self {
        Self {
            name: file.name().to_string(),
            size: file.size(),
            size_display: format_file_size(file.size() as u64),
        }
    }
}

/// What a viewer should display for a file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PreviewPayload {
    /// Plain text shown verbatim.
    Text { content: String },
    /// Markup rendered as HTML.
    Html { content: String },
    /// An image as a base64 data URL.
    Image { data_url: String },
    /// The first rows of the first sheet of a workbook.
    Table {
        rows: Vec<Vec<String>>,
        sheet_names: Vec<String>,
        total_rows: usize,
    },
    /// An embeddable document (PDF) as a base64 data URL.
    Document { data_url: String },
    Unavailable {
        metadata: FileMetadata,
        reason: String,
    },
}

impl PreviewPayload {
    fn unavailable(file: &UploadedFile, reason: impl Into<String>) -> Self {
        PreviewPayload::Unavailable {
            metadata: FileMetadata::of(file),
            reason: reason.into(),
        }
    }
}

/// Build the preview payload for `file`.
pub fn preview(file: &UploadedFile, config: &ConversionConfig) -> PreviewPayload {
    let Some(format) = file.format() else {
        return PreviewPayload::unavailable(file, "Preview is not available for this file type");
    };
    debug!("Previewing '{}' as {:?}", file.name(), format.family());

    match format.family() {
        FormatFamily::Text | FormatFamily::Csv => PreviewPayload::Text {
            content: file.text(),
        },
        FormatFamily::Html => PreviewPayload::Html {
            content: file.text(),
        },
        FormatFamily::Word => match word::render_fragment(file) {
            Ok(fragment) => PreviewPayload::Html {
                content: fragment.html,
            },
            Err(e) => fallback(file, e),
        },
        FormatFamily::Excel => match spreadsheet::first_sheet_grid(file, config.preview_rows) {
            Ok(grid) => PreviewPayload::Table {
                rows: grid.rows,
                sheet_names: grid.sheet_names,
                total_rows: grid.total_rows,
            },
            Err(e) => fallback(file, e),
        },
        FormatFamily::Image => match image::decode(file) {
            Ok(_) => PreviewPayload::Image {
                data_url: data_url(format.content_type(), file.data()),
            },
            Err(e) => fallback(file, e),
        },
        FormatFamily::Pdf => {
            if file.data().starts_with(b"%PDF") {
                PreviewPayload::Document {
                    data_url: data_url(Format::Pdf.content_type(), file.data()),
                }
            } else {
                PreviewPayload::unavailable(file, "PDF preview is unavailable: not a PDF document")
            }
        }
        FormatFamily::PowerPoint => {
            PreviewPayload::unavailable(file, "Preview not implemented for PowerPoint files")
        }
    }
}

fn fallback(file: &UploadedFile, e: impl std::fmt::Display) -> PreviewPayload {
    warn!("Preview of '{}' failed: {}", file.name(), e);
    PreviewPayload::unavailable(file, format!("Unable to load file preview: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::spreadsheet::write_xlsx;
    use crate::pipeline::word::tests::docx;

    fn cfg() -> ConversionConfig {
        ConversionConfig::default()
    }

    #[test]
    fn text_markdown_and_csv_preview_verbatim() {
        for name in ["a.txt", "b.md", "c.csv"] {
            let file = UploadedFile::new(name, b"x,y\n1,2".to_vec());
            assert_eq!(
                preview(&file, &cfg()),
                PreviewPayload::Text {
                    content: "x,y\n1,2".into()
                }
            );
        }
    }

    #[test]
    fn html_is_passed_through() {
        let file = UploadedFile::new("page.HTM", b"<p>hi</p>".to_vec());
        assert_eq!(
            preview(&file, &cfg()),
            PreviewPayload::Html {
                content: "<p>hi</p>".into()
            }
        );
    }

    #[test]
    fn word_preview_is_body_fragment() {
        let bytes = docx(r#"<w:p><w:r><w:t>Hello preview</w:t></w:r></w:p>"#);
        let file = UploadedFile::new("memo.docx", bytes);
        match preview(&file, &cfg()) {
            PreviewPayload::Html { content } => {
                assert!(content.contains("Hello preview"));
                assert!(!content.contains("<!DOCTYPE"));
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn excel_preview_is_limited() {
        let rows: Vec<Vec<String>> = (0..30).map(|i| vec![i.to_string()]).collect();
        let bytes = write_xlsx(&[("Data", rows), ("Other", vec![])]).unwrap();
        let file = UploadedFile::new("big.xlsx", bytes);
        let config = ConversionConfig::builder().preview_rows(20).build().unwrap();
        match preview(&file, &config) {
            PreviewPayload::Table {
                rows,
                sheet_names,
                total_rows,
            } => {
                assert_eq!(rows.len(), 20);
                assert_eq!(total_rows, 30);
                assert_eq!(sheet_names, ["Data", "Other"]);
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn image_preview_is_data_url() {
        let img = ::image::RgbImage::from_pixel(2, 2, ::image::Rgb([9, 9, 9]));
        let mut bytes = Vec::new();
        ::image::DynamicImage::ImageRgb8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), ::image::ImageFormat::Png)
            .unwrap();
        let file = UploadedFile::new("dot.png", bytes);
        match preview(&file, &cfg()) {
            PreviewPayload::Image { data_url } => {
                assert!(data_url.starts_with("data:image/png;base64,"))
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn pdf_preview_embeds_document() {
        let file = UploadedFile::new("doc.pdf", b"%PDF-1.7\n%%EOF".to_vec());
        assert!(matches!(
            preview(&file, &cfg()),
            PreviewPayload::Document { data_url } if data_url.starts_with("data:application/pdf;base64,")
        ));
    }

    #[test]
    fn unavailable_cases_carry_metadata() {
        let pptx = UploadedFile::new("deck.pptx", vec![0; 1536]);
        match preview(&pptx, &cfg()) {
            PreviewPayload::Unavailable { metadata, reason } => {
                assert_eq!(metadata.name, "deck.pptx");
                assert_eq!(metadata.size_display, "1.5 KB");
                assert!(reason.contains("PowerPoint"));
            }
            other => panic!("unexpected payload {other:?}"),
        }

        let unknown = UploadedFile::new("archive.7z", vec![1]);
        assert!(matches!(
            preview(&unknown, &cfg()),
            PreviewPayload::Unavailable { .. }
        ));

        let broken = UploadedFile::new("broken.xlsx", b"not a zip".to_vec());
        match preview(&broken, &cfg()) {
            PreviewPayload::Unavailable { reason, .. } => {
                assert!(reason.starts_with("Unable to load file preview"))
            }
            other => panic!("unexpected payload {other:?}"),
        }
    }

    #[test]
    fn payload_serialises_with_kind_tag() {
        let json = serde_json::to_value(PreviewPayload::Text {
            content: "x".into(),
        })
        .unwrap();
        assert_eq!(json["kind"], "text");
        assert_eq!(json["content"], "x");
    }
}
