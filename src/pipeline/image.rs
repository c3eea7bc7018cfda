//! Raster image sources: re-encode to another raster format, or place on a
//! single A4 PDF page.

use super::encode::{encode_image, flatten_on_white};
use super::ConvertJob;
use crate::config::{A4_HEIGHT_MM, A4_WIDTH_MM};
use crate::engine;
use crate::error::ConvertError;
use crate::file::{Artifact, UploadedFile};
use image::DynamicImage;
use pdfium_render::prelude::*;
use tracing::debug;

/// Where an image lands on the A4 page, in millimetres from the top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x_mm: f32,
    pub y_mm: f32,
    pub width_mm: f32,
    pub height_mm: f32,
}

/// Fit a `width_px` × `height_px` image into `box_mm`, one pixel taken as one
/// millimetre. Images are shrunk to fit but never enlarged; the result is
/// centred on the page.
pub fn fit_on_a4(width_px: u32, height_px: u32, box_mm: (f32, f32)) -> Placement {
    let (w, h) = (width_px.max(1) as f32, height_px.max(1) as f32);
    let scale = (box_mm.0 / w).min(box_mm.1 / h).min(1.0);
    let (width_mm, height_mm) = (w * scale, h * scale);
    Placement {
        x_mm: (A4_WIDTH_MM - width_mm) / 2.0,
        y_mm: (A4_HEIGHT_MM - height_mm) / 2.0,
        width_mm,
        height_mm,
    }
}

pub(crate) fn decode(file: &UploadedFile) -> Result<DynamicImage, ConvertError> {
    let format = file.format().unwrap_or(crate::format::Format::Png);
    image::load_from_memory(file.data()).map_err(|e| ConvertError::decode(format, e))
}

/// Image → PNG/JPEG at native size.
pub fn to_image(job: &ConvertJob<'_>) -> Result<Vec<Artifact>, ConvertError> {
    let img = decode(job.file)?;
    let data = encode_image(&img, job.target, job.config.jpeg_quality)?;
    Ok(vec![job.artifact(data)])
}

/// Image → single-page A4 PDF.
pub fn to_pdf(job: &ConvertJob<'_>) -> Result<Vec<Artifact>, ConvertError> {
    let img = decode(job.file)?;
    let placement = fit_on_a4(img.width(), img.height(), job.config.image_box_mm);
    debug!(
        "Placing {}x{} px image at ({:.1}, {:.1}) mm, {:.1}x{:.1} mm",
        img.width(),
        img.height(),
        placement.x_mm,
        placement.y_mm,
        placement.width_mm,
        placement.height_mm
    );
    let flat = DynamicImage::ImageRgb8(flatten_on_white(&img));

    let pdfium = engine::bind()?;
    let mut document = pdfium
        .create_new_pdf()
        .map_err(|e| ConvertError::render(format!("{e:?}")))?;
    {
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .map_err(|e| ConvertError::render(format!("{e:?}")))?;

        // PDF user space grows upwards from the bottom-left corner.
        let bottom_mm = A4_HEIGHT_MM - placement.y_mm - placement.height_mm;
        page.objects_mut()
            .create_image_object(
                PdfPoints::from_mm(placement.x_mm),
                PdfPoints::from_mm(bottom_mm),
                &flat,
                Some(PdfPoints::from_mm(placement.width_mm)),
                Some(PdfPoints::from_mm(placement.height_mm)),
            )
            .map_err(|e| ConvertError::render(format!("{e:?}")))?;
    }

    let bytes = document
        .save_to_bytes()
        .map_err(|e| ConvertError::encode(job.target, format!("{e:?}")))?;
    Ok(vec![job.artifact(bytes)])
}
