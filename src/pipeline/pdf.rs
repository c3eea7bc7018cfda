//! PDF sources: rasterise pages to images, or extract their text.
//!
//! Documents are opened straight from the in-memory bytes through the shared
//! engine from [`crate::engine::bind`], no temp file needed.

use super::encode::encode_image;
use super::ConvertJob;
use crate::engine;
use crate::error::ConvertError;
use crate::file::Artifact;
use crate::format::Format;
use pdfium_render::prelude::*;
use tracing::{debug, info};

/// PDF → PNG/JPEG. Page 1 only unless `job.all_pages` is set.
pub fn to_images(job: &ConvertJob<'_>) -> Result<Vec<Artifact>, ConvertError> {
    let pdfium = engine::bind()?;
    let document = pdfium
        .load_pdf_from_byte_slice(job.file.data(), None)
        .map_err(|e| ConvertError::decode(Format::Pdf, format!("{e:?}")))?;

    let pages = document.pages();
    let total_pages = pages.len() as usize;
    if total_pages == 0 {
        return Err(ConvertError::decode(Format::Pdf, "document has no pages"));
    }
    let count = if job.all_pages { total_pages } else { 1 };
    info!(
        "Rasterising {} of {} page(s) from '{}'",
        count,
        total_pages,
        job.file.name()
    );

    let render_config = PdfRenderConfig::new().scale_page_by_factor(job.config.pdf_render_scale);

    let mut artifacts = Vec::with_capacity(count);
    for idx in 0..count {
        let page = pages
            .get(idx as u16)
            .map_err(|e| ConvertError::render(format!("page {}: {e:?}", idx + 1)))?;
        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| ConvertError::render(format!("page {}: {e:?}", idx + 1)))?;
        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px",
            idx + 1,
            image.width(),
            image.height()
        );

        let data = encode_image(&image, job.target, job.config.jpeg_quality)?;
        artifacts.push(if count > 1 {
            Artifact::for_page(job.file.name(), idx + 1, job.target, data)
        } else {
            job.artifact(data)
        });
    }
    Ok(artifacts)
}

/// PDF → plain text, every page preceded by a `--- page N ---` marker.
pub fn to_text(job: &ConvertJob<'_>) -> Result<Vec<Artifact>, ConvertError> {
    let pdfium = engine::bind()?;
    let document = pdfium
        .load_pdf_from_byte_slice(job.file.data(), None)
        .map_err(|e| ConvertError::decode(Format::Pdf, format!("{e:?}")))?;

    let mut out = String::new();
    for (idx, page) in document.pages().iter().enumerate() {
        let text = page
            .text()
            .map_err(|e| ConvertError::decode(Format::Pdf, format!("page {}: {e:?}", idx + 1)))?;
        out.push_str(&page_section(idx + 1, &text.all()));
    }
    debug!("Extracted {} chars of text", out.len());
    Ok(vec![job.artifact(out.into_bytes())])
}

fn page_section(page: usize, text: &str) -> String {
    format!("--- page {page} ---\n{text}\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_sections_are_marked_in_order() {
        let joined = [page_section(1, "first"), page_section(2, "second")].concat();
        assert_eq!(joined, "--- page 1 ---\nfirst\n\n--- page 2 ---\nsecond\n\n");
    }
}
