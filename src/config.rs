//! Configuration types for file conversion.
//!
//! All conversion behaviour is controlled through [`ConversionConfig`], built
//! via its [`ConversionConfigBuilder`]. The defaults reproduce the fixed
//! constants of the browser tool (2× PDF rasterisation, JPEG quality 0.95,
//! 800 px HTML layout width, 190×270 mm image box, 20-row table preview,
//! 100 ms download stagger).

use crate::error::ConfigError;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;

/// A4 paper size in millimetres.
pub const A4_WIDTH_MM: f32 = 210.0;
pub const A4_HEIGHT_MM: f32 = 297.0;

/// Configuration for a conversion run.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use fileconv::ConversionConfig;
///
/// let config = ConversionConfig::builder()
///     .pdf_render_scale(3.0)
///     .jpeg_quality(85)
///     .build()
///     .unwrap();
/// assert_eq!(config.jpeg_quality, 85);
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Upscale factor when rasterising PDF pages. Default: 2.0.
    pub pdf_render_scale: f32,

    /// Batch PDF→image conversions emit every page. When `false` only page 1
    /// is rendered. Default: true.
    pub pdf_all_pages: bool,

    /// JPEG encoder quality, 1–100. Default: 95.
    pub jpeg_quality: u8,

    /// Width of the off-screen layout surface for HTML→PDF. Default: 800.
    pub html_surface_width_px: u32,

    /// Bitmap scale applied when rasterising the HTML surface. Default: 2.0.
    pub html_render_scale: f32,

    /// Left/top margin on each A4 page of an HTML→PDF document. Default: 0.
    pub html_page_margin_mm: f32,

    /// Content box an image is fitted into for Image→PDF, in mm. Default: 190×270.
    pub image_box_mm: (f32, f32),

    /// Number of rows returned by a tabular preview. Default: 20.
    pub preview_rows: usize,

    /// Delay between consecutive artifact saves. Default: 100.
    pub download_stagger_ms: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional batch progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            pdf_render_scale: 2.0,
            pdf_all_pages: true,
            jpeg_quality: 95,
            html_surface_width_px: 800,
            html_render_scale: 2.0,
            html_page_margin_mm: 0.0,
            image_box_mm: (190.0, 270.0),
            preview_rows: 20,
            download_stagger_ms: 100,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("pdf_render_scale", &self.pdf_render_scale)
            .field("pdf_all_pages", &self.pdf_all_pages)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("html_surface_width_px", &self.html_surface_width_px)
            .field("html_render_scale", &self.html_render_scale)
            .field("html_page_margin_mm", &self.html_page_margin_mm)
            .field("image_box_mm", &self.image_box_mm)
            .field("preview_rows", &self.preview_rows)
            .field("download_stagger_ms", &self.download_stagger_ms)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn BatchProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn pdf_render_scale(mut self, scale: f32) -> Self {
        self.config.pdf_render_scale = scale.clamp(0.25, 8.0);
        self
    }

    pub fn pdf_all_pages(mut self, all: bool) -> Self {
        self.config.pdf_all_pages = all;
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn html_surface_width_px(mut self, px: u32) -> Self {
        self.config.html_surface_width_px = px.max(100);
        self
    }

    pub fn html_render_scale(mut self, scale: f32) -> Self {
        self.config.html_render_scale = scale.clamp(0.25, 8.0);
        self
    }

    pub fn html_page_margin_mm(mut self, mm: f32) -> Self {
        self.config.html_page_margin_mm = mm.max(0.0);
        self
    }

    pub fn image_box_mm(mut self, width: f32, height: f32) -> Self {
        self.config.image_box_mm = (width, height);
        self
    }

    pub fn preview_rows(mut self, n: usize) -> Self {
        self.config.preview_rows = n.max(1);
        self
    }

    pub fn download_stagger_ms(mut self, ms: u64) -> Self {
        self.config.download_stagger_ms = ms;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, ConfigError> {
        let c = &self.config;
        let (w, h) = c.image_box_mm;
        if !(w > 0.0 && h > 0.0 && w <= A4_WIDTH_MM && h <= A4_HEIGHT_MM) {
            return Err(ConfigError(format!(
                "Image box must fit inside A4 (210×297 mm), got {w}×{h}"
            )));
        }
        if c.html_page_margin_mm * 2.0 >= A4_WIDTH_MM {
            return Err(ConfigError(format!(
                "HTML page margin {} mm leaves no printable width",
                c.html_page_margin_mm
            )));
        }
        Ok(self.config)
    }
}

/// Where to find the native PDF engine.
///
/// Resolution order (first match wins):
/// 1. [`EngineConfig::library_path`]
/// 2. `PDFIUM_LIB_PATH` environment variable
/// 3. the directory containing the running executable
/// 4. the system library search path
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// A pdfium shared library, or a directory containing one.
    pub library_path: Option<PathBuf>,
}

impl EngineConfig {
    pub fn with_library_path(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tool_constants() {
        let c = ConversionConfig::default();
        assert_eq!(c.pdf_render_scale, 2.0);
        assert_eq!(c.jpeg_quality, 95);
        assert_eq!(c.html_surface_width_px, 800);
        assert_eq!(c.image_box_mm, (190.0, 270.0));
        assert_eq!(c.preview_rows, 20);
        assert_eq!(c.download_stagger_ms, 100);
    }

    #[test]
    fn setters_clamp() {
        let c = ConversionConfig::builder()
            .pdf_render_scale(100.0)
            .jpeg_quality(0)
            .html_surface_width_px(3)
            .build()
            .unwrap();
        assert_eq!(c.pdf_render_scale, 8.0);
        assert_eq!(c.jpeg_quality, 1);
        assert_eq!(c.html_surface_width_px, 100);
    }

    #[test]
    fn oversized_image_box_rejected() {
        let err = ConversionConfig::builder()
            .image_box_mm(300.0, 100.0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("A4"));
    }

    #[test]
    fn huge_margin_rejected() {
        assert!(ConversionConfig::builder()
            .html_page_margin_mm(120.0)
            .build()
            .is_err());
    }
}
