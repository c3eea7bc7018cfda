//! Conversion routing: `(source, target)` → converter.
//!
//! The dispatch table is an explicit map built from [`CONVERTERS`]. On
//! construction the router checks it against the format registry in both
//! directions, so a pair the UI can offer always has a converter and no
//! converter is reachable for a pair the registry does not list.

use crate::config::ConversionConfig;
use crate::error::{ConvertError, FileError};
use crate::file::{Artifact, UploadedFile};
use crate::format::{self, extension_of, Format};
use crate::pipeline::{html, image, pdf, spreadsheet, text, word, ConvertJob, ConverterFn};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use tracing::{debug, info};

use Format::*;

const CONVERTERS: &[((Format, Format), ConverterFn)] = &[
    ((Pdf, Png), pdf::to_images),
    ((Pdf, Jpg), pdf::to_images),
    ((Pdf, Jpeg), pdf::to_images),
    ((Pdf, Txt), pdf::to_text),
    ((Doc, Html), word::to_html),
    ((Docx, Html), word::to_html),
    ((Xls, Html), spreadsheet::to_html),
    ((Xlsx, Html), spreadsheet::to_html),
    ((Xls, Csv), spreadsheet::to_csv),
    ((Xlsx, Csv), spreadsheet::to_csv),
    ((Csv, Xlsx), spreadsheet::from_csv),
    ((Txt, Html), text::to_html),
    ((Html, Pdf), html::to_pdf),
    ((Png, Pdf), image::to_pdf),
    ((Png, Jpg), image::to_image),
    ((Png, Jpeg), image::to_image),
    ((Jpg, Pdf), image::to_pdf),
    ((Jpg, Png), image::to_image),
    ((Jpeg, Pdf), image::to_pdf),
    ((Jpeg, Png), image::to_image),
    ((Gif, Pdf), image::to_pdf),
    ((Gif, Png), image::to_image),
    ((Gif, Jpg), image::to_image),
    ((Bmp, Pdf), image::to_pdf),
    ((Bmp, Png), image::to_image),
    ((Bmp, Jpg), image::to_image),
    ((Webp, Pdf), image::to_pdf),
    ((Webp, Png), image::to_image),
    ((Webp, Jpg), image::to_image),
];

static SHARED: Lazy<Result<Router, ConvertError>> = Lazy::new(Router::new);

/// Dispatches files to the converter for their `(source, target)` pair.
pub struct Router {
    table: HashMap<(Format, Format), ConverterFn>,
}

impl Router {
    /// The process-wide router, built and validated on first use.
    pub fn shared() -> Result<&'static Router, ConvertError> {
        SHARED.as_ref().map_err(Clone::clone)
    }

    /// Build the dispatch table and verify it matches the registry.
    pub fn new() -> Result<Self, ConvertError> {
        Self::from_table(CONVERTERS)
    }

    fn from_table(entries: &[((Format, Format), ConverterFn)]) -> Result<Self, ConvertError> {
        let table: HashMap<_, _> = entries.iter().copied().collect();

        if let Some((s, t)) = format::registry_pairs().find(|pair| !table.contains_key(pair)) {
            return Err(ConvertError::Internal(format!(
                "registered conversion {s} -> {t} has no converter"
            )));
        }
        if let Some((s, t)) = table
            .keys()
            .find(|(s, t)| !format::is_supported(s.extension(), t.extension()))
        {
            return Err(ConvertError::Internal(format!(
                "converter for {s} -> {t} is not in the format registry"
            )));
        }
        debug!("Router ready with {} conversions", table.len());
        Ok(Self { table })
    }

    /// Convert `file` to `target`, producing exactly one artifact. PDF
    /// sources rendered to images yield page 1 only.
    pub async fn convert(
        &self,
        file: &UploadedFile,
        target: Format,
        config: &ConversionConfig,
    ) -> Result<Artifact, FileError> {
        let mut artifacts = self.dispatch(file, target, config, false).await?;
        match artifacts.len() {
            1 => Ok(artifacts.remove(0)),
            n => Err(FileError::new(
                file.name(),
                ConvertError::Internal(format!("expected one artifact, converter produced {n}")),
            )),
        }
    }

    /// Convert `file` to `target`, one artifact per page where the converter
    /// paginates its output (PDF → image); every other pair yields one.
    pub async fn convert_pages(
        &self,
        file: &UploadedFile,
        target: Format,
        config: &ConversionConfig,
    ) -> Result<Vec<Artifact>, FileError> {
        self.dispatch(file, target, config, true).await
    }

    async fn dispatch(
        &self,
        file: &UploadedFile,
        target: Format,
        config: &ConversionConfig,
        all_pages: bool,
    ) -> Result<Vec<Artifact>, FileError> {
        let (source, converter) = self
            .lookup(file.name(), target)
            .map_err(|e| FileError::new(file.name(), e))?;
        info!("Converting '{}': {} -> {}", file.name(), source, target);

        let file_owned = file.clone();
        let config_owned = config.clone();
        tokio::task::spawn_blocking(move || {
            converter(&ConvertJob {
                file: &file_owned,
                source,
                target,
                config: &config_owned,
                all_pages,
            })
        })
        .await
        .map_err(|e| ConvertError::Internal(format!("Conversion task panicked: {e}")))
        .and_then(|r| r)
        .map_err(|e| FileError::new(file.name(), e))
    }

    fn lookup(&self, name: &str, target: Format) -> Result<(Format, ConverterFn), ConvertError> {
        let unsupported = || ConvertError::UnsupportedConversion {
            from: extension_of(name).to_ascii_lowercase(),
            to: target.extension().to_string(),
        };
        let source = Format::from_file_name(name).ok_or_else(unsupported)?;
        let converter = self.table.get(&(source, target)).ok_or_else(unsupported)?;
        Ok((source, *converter))
    }

    /// `true` if this router has a converter for the pair.
    pub fn supports(&self, source: Format, target: Format) -> bool {
        self.table.contains_key(&(source, target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_matches_registry() {
        let router = Router::new().unwrap();
        for (s, t) in format::registry_pairs() {
            assert!(router.supports(s, t), "{s} -> {t}");
        }
        assert_eq!(router.table.len(), format::registry_pairs().count());
    }

    #[test]
    fn missing_converter_is_rejected() {
        let partial = &CONVERTERS[1..];
        let err = Router::from_table(partial).err().unwrap();
        assert!(err.to_string().contains("pdf -> png"), "{err}");
    }

    #[test]
    fn extra_converter_is_rejected() {
        let mut entries = CONVERTERS.to_vec();
        entries.push(((Txt, Pdf), text::to_html));
        let err = Router::from_table(&entries).err().unwrap();
        assert!(err.to_string().contains("txt -> pdf"), "{err}");
    }

    #[tokio::test]
    async fn unsupported_pair_names_both_formats() {
        let router = Router::new().unwrap();
        let file = UploadedFile::new("slides.PPTX", b"pk".to_vec());
        let err = router
            .convert(&file, Format::Png, &ConversionConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.file, "slides.PPTX");
        assert_eq!(
            err.source,
            ConvertError::UnsupportedConversion {
                from: "pptx".into(),
                to: "png".into()
            }
        );
    }

    #[tokio::test]
    async fn unknown_extension_is_unsupported() {
        let router = Router::new().unwrap();
        let file = UploadedFile::new("tool.exe", vec![0u8; 4]);
        let err = router
            .convert(&file, Format::Pdf, &ConversionConfig::default())
            .await
            .unwrap_err();
        assert!(err.kind().is_unsupported());
        assert!(err.to_string().contains("exe -> pdf"));
    }

    #[tokio::test]
    async fn text_to_html_through_router() {
        let router = Router::new().unwrap();
        let file = UploadedFile::new("readme.txt", b"hi <there>".to_vec());
        let artifact = router
            .convert(&file, Format::Html, &ConversionConfig::default())
            .await
            .unwrap();
        assert_eq!(artifact.name(), "readme.html");
        assert_eq!(artifact.content_type(), "text/html");
        let html = String::from_utf8(artifact.data().to_vec()).unwrap();
        assert!(html.contains("hi &lt;there&gt;"));
    }

    #[tokio::test]
    async fn decode_failure_keeps_file_name() {
        let router = Router::new().unwrap();
        let file = UploadedFile::new("broken.png", b"nope".to_vec());
        let err = router
            .convert(&file, Format::Jpg, &ConversionConfig::default())
            .await
            .unwrap_err();
        assert_eq!(err.file, "broken.png");
        assert!(matches!(err.source, ConvertError::DecodeFailure { .. }));
    }
}
