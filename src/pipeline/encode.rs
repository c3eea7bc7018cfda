//! Bitmap encoding: `DynamicImage` → PNG/JPEG bytes, and data URLs.
//!
//! JPEG has no alpha channel, so transparent pixels are composited onto
//! opaque white before encoding. Without this, transparent regions come out
//! black.

use crate::error::ConvertError;
use crate::format::Format;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use std::io::Cursor;
use tracing::debug;

/// Encode `img` as `target` (PNG lossless, JPEG at `jpeg_quality`).
pub fn encode_image(
    img: &DynamicImage,
    target: Format,
    jpeg_quality: u8,
) -> Result<Vec<u8>, ConvertError> {
    let mut buf = Vec::new();
    match target {
        Format::Png => {
            img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
                .map_err(|e| ConvertError::encode(target, e))?;
        }
        Format::Jpg | Format::Jpeg => {
            let flat = flatten_on_white(img);
            JpegEncoder::new_with_quality(&mut buf, jpeg_quality)
                .encode_image(&flat)
                .map_err(|e| ConvertError::encode(target, e))?;
        }
        other => {
            return Err(ConvertError::encode(other, "not a raster output format"));
        }
    }
    debug!(
        "Encoded {}x{} bitmap → {} bytes {}",
        img.width(),
        img.height(),
        buf.len(),
        target
    );
    Ok(buf)
}

/// Composite `img` over an opaque white background.
pub fn flatten_on_white(img: &DynamicImage) -> RgbImage {
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let alpha = a as u16;
        let blend = |c: u8| ((c as u16 * alpha + 255 * (255 - alpha)) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}

/// `data:<mime>;base64,<payload>` for embedding a payload in a page.
pub fn data_url(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, STANDARD.encode(bytes))
}
