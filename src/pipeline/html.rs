//! HTML → PDF.
//!
//! The document is flattened into text blocks with `scraper` and laid out on
//! a surface of fixed width (one PDF point per CSS pixel). The layout is cut
//! into bands of one A4 page each; every band is drawn on an off-screen
//! pdfium page, rasterised, and embedded as one page of the output.
//!
//! ```text
//! html ──▶ blocks ──▶ layout ──▶ bands ──▶ surface page ──▶ bitmap ──▶ A4 page
//! ```
//!
//! Layout is deliberately simple: headings, paragraphs, list items,
//! preformatted text, quotes and table rows, wrapped on estimated glyph
//! widths. No CSS is evaluated.

use super::ConvertJob;
use crate::config::{A4_HEIGHT_MM, A4_WIDTH_MM};
use crate::engine;
use crate::error::ConvertError;
use crate::file::Artifact;
use image::DynamicImage;
use once_cell::sync::Lazy;
use pdfium_render::prelude::*;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());

const SKIPPED: &[&str] = &["script", "style", "head", "template", "noscript", "svg"];
const INLINE: &[&str] = &[
    "a", "abbr", "b", "br", "code", "em", "i", "kbd", "mark", "q", "s", "small", "span",
    "strong", "sub", "sup", "u", "var",
];

const PADDING: f32 = 20.0;
const LINE_HEIGHT: f32 = 1.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Heading(u8),
    Paragraph,
    ListItem,
    Preformatted,
    Quote,
    TableRow,
}

impl BlockKind {
    fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "h1" => BlockKind::Heading(1),
            "h2" => BlockKind::Heading(2),
            "h3" => BlockKind::Heading(3),
            "h4" => BlockKind::Heading(4),
            "h5" => BlockKind::Heading(5),
            "h6" => BlockKind::Heading(6),
            "p" | "dt" | "dd" | "caption" | "figcaption" | "address" => BlockKind::Paragraph,
            "li" => BlockKind::ListItem,
            "pre" => BlockKind::Preformatted,
            "blockquote" => BlockKind::Quote,
            "tr" => BlockKind::TableRow,
            _ => return None,
        })
    }

    fn font_size(self) -> f32 {
        match self {
            BlockKind::Heading(1) => 32.0,
            BlockKind::Heading(2) => 24.0,
            BlockKind::Heading(3) => 18.72,
            BlockKind::Heading(5) => 13.28,
            BlockKind::Heading(6) => 10.72,
            BlockKind::Preformatted => 13.0,
            _ => 16.0,
        }
    }

    fn face(self) -> Face {
        match self {
            BlockKind::Heading(_) => Face::Bold,
            BlockKind::Preformatted => Face::Mono,
            _ => Face::Regular,
        }
    }

    fn indent(self) -> f32 {
        match self {
            BlockKind::ListItem => 10.0,
            BlockKind::Quote => 20.0,
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub text: String,
}

/// Flatten `html` into text blocks in document order.
pub fn extract_blocks(html: &str) -> Vec<Block> {
    let document = Html::parse_document(html);
    let mut blocks = Vec::new();
    if let Some(body) = document.select(&BODY).next() {
        collect(body, &mut blocks);
    }
    blocks
}

fn collect(el: ElementRef<'_>, out: &mut Vec<Block>) {
    let mut loose = String::new();
    for child in el.children() {
        if let Some(child_el) = ElementRef::wrap(child) {
            let name = child_el.value().name();
            if SKIPPED.contains(&name) {
                continue;
            }
            if let Some(kind) = BlockKind::from_tag(name) {
                flush(&mut loose, out);
                let text = match kind {
                    BlockKind::Preformatted => child_el.text().collect::<String>(),
                    BlockKind::TableRow => child_el
                        .children()
                        .filter_map(ElementRef::wrap)
                        .filter(|c| matches!(c.value().name(), "td" | "th"))
                        .map(|c| collapse(&c.text().collect::<String>()))
                        .collect::<Vec<_>>()
                        .join("  |  "),
                    _ => collapse(&child_el.text().collect::<String>()),
                };
                if !text.trim().is_empty() {
                    out.push(Block { kind, text });
                }
            } else if INLINE.contains(&name) {
                loose.push_str(&child_el.text().collect::<String>());
                loose.push(' ');
            } else {
                flush(&mut loose, out);
                collect(child_el, out);
            }
        } else if let Some(text) = child.value().as_text() {
            loose.push_str(text);
        }
    }
    flush(&mut loose, out);
}

fn flush(loose: &mut String, out: &mut Vec<Block>) {
    let text = collapse(loose);
    if !text.is_empty() {
        out.push(Block {
            kind: BlockKind::Paragraph,
            text,
        });
    }
    loose.clear();
}

fn collapse(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ── Layout ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Regular,
    Bold,
    Mono,
}

impl Face {
    /// Rough average advance width as a fraction of the font size.
    fn advance(self) -> f32 {
        match self {
            Face::Regular => 0.5,
            Face::Bold => 0.56,
            Face::Mono => 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    pub x: f32,
    /// Distance from the top of the surface to the top of the line box.
    pub top: f32,
    pub size: f32,
    pub face: Face,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layout {
    pub lines: Vec<Line>,
    pub height: f32,
}

/// Lay `blocks` out on a surface `width` points wide.
pub fn layout(blocks: &[Block], width: f32) -> Layout {
    let mut lines = Vec::new();
    let mut cursor = PADDING;

    for block in blocks {
        let size = block.kind.font_size();
        let face = block.kind.face();
        let x = PADDING + block.kind.indent();
        let usable = (width - x - PADDING).max(size);
        let max_chars = ((usable / (size * face.advance())).floor() as usize).max(1);

        let text = match block.kind {
            BlockKind::ListItem => format!("• {}", block.text),
            _ => block.text.clone(),
        };
        let wrapped: Vec<String> = if block.kind == BlockKind::Preformatted {
            text.lines().flat_map(|l| hard_wrap(l, max_chars)).collect()
        } else {
            wrap(&text, max_chars)
        };

        for line in wrapped {
            lines.push(Line {
                text: line,
                x,
                top: cursor,
                size,
                face,
            });
            cursor += size * LINE_HEIGHT;
        }
        cursor += match block.kind {
            BlockKind::Heading(_) => size * 0.67,
            BlockKind::ListItem | BlockKind::TableRow => size * 0.25,
            _ => size,
        };
    }

    Layout {
        lines,
        height: cursor + PADDING,
    }
}

/// Greedy word wrap on character counts; over-long words are split.
fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        for piece in hard_wrap(word, max_chars) {
            let needed = if current.is_empty() {
                piece.chars().count()
            } else {
                current.chars().count() + 1 + piece.chars().count()
            };
            if needed > max_chars && !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(&piece);
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

fn hard_wrap(line: &str, max_chars: usize) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(max_chars)
        .map(|c| c.iter().collect())
        .collect()
}

// ── Banding ─────────────────────────────────────────────────────────────

/// One horizontal band of the laid-out surface, destined for one A4 page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    /// Distance from the top of the layout, in surface points.
    pub top: f32,
    pub height: f32,
    pub height_mm: f32,
}

/// Cut a `width` × `height` point layout into page-sized bands. The surface
/// is scaled to the printable width (A4 minus `margin_mm` on each side); the
/// ratio fixes how many points of layout fit on one page.
pub fn band_plan(width: f32, height: f32, margin_mm: f32) -> Vec<Band> {
    let printable_w = A4_WIDTH_MM - 2.0 * margin_mm;
    let printable_h = A4_HEIGHT_MM - 2.0 * margin_mm;
    let pt_per_mm = width.max(1.0) / printable_w;
    let page_pt = printable_h * pt_per_mm;

    let mut bands = Vec::new();
    let mut top = 0.0;
    while height - top > 0.5 {
        let h = page_pt.min(height - top);
        bands.push(Band {
            top,
            height: h,
            height_mm: h / pt_per_mm,
        });
        top += h;
    }
    bands
}

/// Lines that are at least partly visible inside `band`.
fn lines_in<'l>(layout: &'l Layout, band: &Band) -> impl Iterator<Item = &'l Line> + 'l {
    let (top, bottom) = (band.top, band.top + band.height);
    layout
        .lines
        .iter()
        .filter(move |l| l.top < bottom && l.top + l.size * LINE_HEIGHT > top)
}

// ── Rendering ───────────────────────────────────────────────────────────

/// Largest bitmap a single band may rasterise to.
const MAX_BAND_PIXELS: u64 = 64 * 1024 * 1024;

fn check_band_size(width: f32, height: f32, scale: f32) -> Result<(), ConvertError> {
    let pixels = (width * scale) as u64 * (height * scale) as u64;
    if pixels > MAX_BAND_PIXELS {
        return Err(ConvertError::render(format!(
            "page band of {width:.0}x{height:.0} pt at scale {scale} needs {pixels} pixels, \
             over the {MAX_BAND_PIXELS} limit; lower the surface width or render scale"
        )));
    }
    Ok(())
}

/// Off-screen document the layout is drawn onto, one page-sized band at a
/// time, so the rasterised bitmap never exceeds one output page.
struct LayoutSurface<'a> {
    document: PdfDocument<'a>,
    width: f32,
    fonts: [PdfFontToken; 3],
}

impl<'a> LayoutSurface<'a> {
    fn new(pdfium: &'a Pdfium, width: f32) -> Result<Self, ConvertError> {
        let mut document = pdfium
            .create_new_pdf()
            .map_err(|e| ConvertError::render(format!("{e:?}")))?;
        let fonts = [
            document.fonts_mut().helvetica(),
            document.fonts_mut().helvetica_bold(),
            document.fonts_mut().courier(),
        ];
        Ok(Self {
            document,
            width,
            fonts,
        })
    }

    fn font(&self, face: Face) -> PdfFontToken {
        match face {
            Face::Regular => self.fonts[0],
            Face::Bold => self.fonts[1],
            Face::Mono => self.fonts[2],
        }
    }

    /// Draw the lines of `band` on a fresh surface page and rasterise it.
    fn render_band(
        &mut self,
        layout: &Layout,
        band: &Band,
        scale: f32,
    ) -> Result<DynamicImage, ConvertError> {
        check_band_size(self.width, band.height, scale)?;
        let fonts: Vec<_> = lines_in(layout, band).map(|l| self.font(l.face)).collect();
        let mut page = self
            .document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::Custom(
                PdfPoints::new(self.width),
                PdfPoints::new(band.height),
            ))
            .map_err(|e| ConvertError::render(format!("{e:?}")))?;

        for (line, font) in lines_in(layout, band).zip(fonts) {
            // Baseline, measured up from the bottom edge of the band.
            let y = band.height - (line.top - band.top) - line.size;
            page.objects_mut()
                .create_text_object(
                    PdfPoints::new(line.x),
                    PdfPoints::new(y),
                    &line.text,
                    font,
                    PdfPoints::new(line.size),
                )
                .map_err(|e| ConvertError::render(format!("{e:?}")))?;
        }

        let bitmap = page
            .render_with_config(&PdfRenderConfig::new().scale_page_by_factor(scale))
            .map_err(|e| ConvertError::render(format!("{e:?}")))?;
        Ok(bitmap.as_image())
    }
}

pub fn to_pdf(job: &ConvertJob<'_>) -> Result<Vec<Artifact>, ConvertError> {
    let blocks = extract_blocks(&job.file.text());
    let width = job.config.html_surface_width_px as f32;
    let layout = layout(&blocks, width);
    let margin = job.config.html_page_margin_mm;
    let printable_w = A4_WIDTH_MM - 2.0 * margin;
    let bands = band_plan(width, layout.height, margin);
    debug!(
        "Laid out {} block(s) into {} line(s), {:.0} pt tall, {} page(s)",
        blocks.len(),
        layout.lines.len(),
        layout.height,
        bands.len()
    );

    let pdfium = engine::bind()?;
    let mut surface = LayoutSurface::new(pdfium, width)?;
    let mut document = pdfium
        .create_new_pdf()
        .map_err(|e| ConvertError::render(format!("{e:?}")))?;
    for band in &bands {
        let bitmap = surface.render_band(&layout, band, job.config.html_render_scale)?;
        let mut page = document
            .pages_mut()
            .create_page_at_end(PdfPagePaperSize::a4())
            .map_err(|e| ConvertError::render(format!("{e:?}")))?;
        page.objects_mut()
            .create_image_object(
                PdfPoints::from_mm(margin),
                PdfPoints::from_mm(A4_HEIGHT_MM - margin - band.height_mm),
                &bitmap,
                Some(PdfPoints::from_mm(printable_w)),
                Some(PdfPoints::from_mm(band.height_mm)),
            )
            .map_err(|e| ConvertError::render(format!("{e:?}")))?;
    }

    let bytes = document
        .save_to_bytes()
        .map_err(|e| ConvertError::encode(job.target, format!("{e:?}")))?;
    Ok(vec![job.artifact(bytes)])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_follow_document_order() {
        let blocks = extract_blocks(
            "<html><head><title>t</title><style>p{}</style></head><body>\
             <h1>Title</h1><div>loose <b>bold</b> text<p>para</p></div>\
             <ul><li>one</li><li>two</li></ul>\
             <table><tr><th>a</th><td>b</td></tr></table>\
             <script>ignored()</script></body></html>",
        );
        let kinds: Vec<_> = blocks.iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![
                BlockKind::Heading(1),
                BlockKind::Paragraph,
                BlockKind::Paragraph,
                BlockKind::ListItem,
                BlockKind::ListItem,
                BlockKind::TableRow,
            ]
        );
        assert_eq!(blocks[1].text, "loose bold text");
        assert_eq!(blocks[5].text, "a  |  b");
        assert!(blocks.iter().all(|b| !b.text.contains("ignored")));
    }

    #[test]
    fn pre_keeps_line_breaks() {
        let blocks = extract_blocks("<pre>a\n  b</pre>");
        assert_eq!(blocks[0].kind, BlockKind::Preformatted);
        let l = layout(&blocks, 800.0);
        assert_eq!(l.lines.len(), 2);
        assert_eq!(l.lines[1].text, "  b");
        assert_eq!(l.lines[1].face, Face::Mono);
    }

    #[test]
    fn long_paragraph_wraps_within_width() {
        let text = "word ".repeat(200);
        let blocks = vec![Block {
            kind: BlockKind::Paragraph,
            text: text.trim().to_string(),
        }];
        let l = layout(&blocks, 800.0);
        assert!(l.lines.len() > 1);
        let max_chars = ((760.0 / 8.0) as usize).max(1);
        assert!(l.lines.iter().all(|line| line.text.chars().count() <= max_chars));
        assert!(l.height > l.lines.last().map(|x| x.top).unwrap_or(0.0));
    }

    #[test]
    fn wrap_splits_overlong_words() {
        assert_eq!(wrap("abcdefgh", 3), vec!["abc", "def", "gh"]);
        assert_eq!(wrap("a bb ccc", 4), vec!["a bb", "ccc"]);
    }

    #[test]
    fn bands_cover_layout_exactly() {
        // 800 pt over 210 mm → 3.81 pt/mm, 1131.4 pt per page.
        let bands = band_plan(800.0, 3000.0, 0.0);
        assert_eq!(bands.len(), 3);
        assert!((bands[0].height - 297.0 * 800.0 / 210.0).abs() < 0.01);
        assert!((bands[0].height_mm - 297.0).abs() < 0.01);
        assert!((bands.iter().map(|b| b.height).sum::<f32>() - 3000.0).abs() < 0.01);
        assert!((bands[2].top - 2.0 * bands[0].height).abs() < 0.01);
    }

    #[test]
    fn margin_shrinks_page_band() {
        let no_margin = band_plan(800.0, 10_000.0, 0.0)[0].height;
        let margin = band_plan(800.0, 10_000.0, 10.0)[0].height;
        // 800 pt over 190 mm, 277 mm printable height.
        assert!((margin - 277.0 * 800.0 / 190.0).abs() < 0.01);
        assert!(margin < no_margin);
    }

    #[test]
    fn long_document_bands_stay_page_sized() {
        let text = "word ".repeat(100_000);
        let blocks = vec![Block {
            kind: BlockKind::Paragraph,
            text: text.trim().to_string(),
        }];
        let l = layout(&blocks, 800.0);
        assert!(l.height > 14_400.0);
        let bands = band_plan(800.0, l.height, 0.0);
        assert!(bands.len() > 1);
        assert!(bands.iter().all(|b| b.height <= 297.0 * 800.0 / 210.0 + 0.01));
    }

    #[test]
    fn straddling_line_is_drawn_on_both_bands() {
        let l = Layout {
            lines: vec![Line {
                text: "edge".into(),
                x: 20.0,
                top: 95.0,
                size: 10.0,
                face: Face::Regular,
            }],
            height: 200.0,
        };
        let first = Band { top: 0.0, height: 100.0, height_mm: 1.0 };
        let second = Band { top: 100.0, height: 100.0, height_mm: 1.0 };
        assert_eq!(lines_in(&l, &first).count(), 1);
        assert_eq!(lines_in(&l, &second).count(), 1);
        let far = Band { top: 150.0, height: 50.0, height_mm: 1.0 };
        assert_eq!(lines_in(&l, &far).count(), 0);
    }

    #[test]
    fn oversized_band_is_rejected_before_rendering() {
        assert!(check_band_size(800.0, 1131.4, 2.0).is_ok());
        let err = check_band_size(20_000.0, 28_285.0, 8.0).unwrap_err();
        assert!(matches!(err, ConvertError::RenderFailure { .. }));
        assert!(err.to_string().contains("lower the surface width"));
    }

    #[test]
    fn empty_layout_has_no_bands() {
        assert!(band_plan(800.0, 0.0, 0.0).is_empty());
    }
}
