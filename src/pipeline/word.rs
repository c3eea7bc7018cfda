//! Word → HTML.
//!
//! DOCX packages are opened with `zip` and `word/document.xml` is streamed
//! through `quick-xml`. Paragraph styles are resolved to their display names
//! through `word/styles.xml`, then mapped:
//!
//! | style name      | element          |
//! |-----------------|------------------|
//! | Heading 1..6    | `h1`..`h6`       |
//! | numbered list   | `ol > li`        |
//! | bullet list     | `ul > li`        |
//! | anything else   | `p`              |
//!
//! Whether a list paragraph is numbered comes from the `numFmt` of its
//! level in `word/numbering.xml`; bullets, `none` and unresolvable
//! numbering render as `ul`.
//!
//! Bold and italic runs become `<strong>` and `<em>`; tables become
//! `<table>`. Styles outside the map and skipped elements (drawings,
//! embedded objects) are reported as conversion notes rather than failing
//! the conversion. Legacy binary `.doc` files are not ZIP packages and fail
//! to decode.

use super::ConvertJob;
use crate::error::ConvertError;
use crate::file::{Artifact, UploadedFile};
use crate::format::Format;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read};
use tracing::debug;
use zip::ZipArchive;

const STYLE: &str = "body{font-family:'Times New Roman',serif;margin:40px;line-height:1.6;color:#333;max-width:800px}\
h1,h2,h3{color:#2c3e50;margin-top:2em}\
h1{font-size:2em;border-bottom:2px solid #3498db;padding-bottom:10px}\
h2{font-size:1.5em;color:#34495e}\
h3{font-size:1.2em;color:#7f8c8d}\
p{margin-bottom:1em;text-align:justify}\
ul,ol{margin-left:20px}\
table{border-collapse:collapse}td{border:1px solid #ccc;padding:4px 8px}";

/// HTML body fragment plus the notes collected while rendering it.
#[derive(Debug, Clone, Default)]
pub struct WordHtml {
    pub html: String,
    pub messages: Vec<String>,
}

pub fn to_html(job: &ConvertJob<'_>) -> Result<Vec<Artifact>, ConvertError> {
    let fragment = render_fragment(job.file)?;
    if !fragment.messages.is_empty() {
        debug!(
            "'{}' converted with {} note(s)",
            job.file.name(),
            fragment.messages.len()
        );
    }
    let html = wrap_document(job.file.name(), &fragment);
    Ok(vec![job.artifact(html.into_bytes())])
}

/// Render the document body without the surrounding page shell.
pub fn render_fragment(file: &UploadedFile) -> Result<WordHtml, ConvertError> {
    let format = file.format().unwrap_or(Format::Docx);
    let mut archive = ZipArchive::new(Cursor::new(file.data()))
        .map_err(|e| ConvertError::decode(format, format!("not a DOCX package ({e})")))?;

    let styles = match read_part(&mut archive, "word/styles.xml", format)? {
        Some(xml) => parse_styles(&xml).map_err(|e| ConvertError::decode(format, e))?,
        None => HashMap::new(),
    };
    let numbering = match read_part(&mut archive, "word/numbering.xml", format)? {
        Some(xml) => parse_numbering(&xml).map_err(|e| ConvertError::decode(format, e))?,
        None => Numbering::default(),
    };
    let document = read_part(&mut archive, "word/document.xml", format)?
        .ok_or_else(|| ConvertError::decode(format, "missing word/document.xml"))?;

    let mut renderer = Renderer::new(&styles, &numbering);
    renderer
        .run(&document)
        .map_err(|e| ConvertError::decode(format, e))?;
    Ok(renderer.finish())
}

fn wrap_document(name: &str, fragment: &WordHtml) -> String {
    let title = escape(name);
    let mut notes = String::new();
    if !fragment.messages.is_empty() {
        notes.push_str("<hr>\n<h3>Conversion notes:</h3>\n<ul>\n");
        for msg in &fragment.messages {
            notes.push_str(&format!("<li>{}</li>\n", escape(msg)));
        }
        notes.push_str("</ul>\n");
    }
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
<style>{STYLE}</style>\n</head>\n<body>\n<h1>Document: {title}</h1>\n{}\n{notes}</body>\n</html>\n",
        fragment.html
    )
}

fn read_part(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
    format: Format,
) -> Result<Option<String>, ConvertError> {
    let Ok(mut part) = archive.by_name(name) else {
        return Ok(None);
    };
    let mut xml = String::new();
    part.read_to_string(&mut xml)
        .map_err(|e| ConvertError::decode(format, format!("{name}: {e}")))?;
    Ok(Some(xml))
}

/// `styleId → display name` for paragraph styles.
fn parse_styles(xml: &str) -> quick_xml::Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut styles = HashMap::new();
    let mut current_id: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) if e.name().as_ref() == b"w:style" => {
                current_id = get_attr(&e, b"w:styleId");
            }
            Event::Empty(e) if e.name().as_ref() == b"w:name" => {
                if let (Some(id), Some(name)) = (current_id.as_ref(), get_attr(&e, b"w:val")) {
                    styles.insert(id.clone(), name);
                }
            }
            Event::End(e) if e.name().as_ref() == b"w:style" => current_id = None,
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(styles)
}

/// List level formats from `word/numbering.xml`.
#[derive(Debug, Default)]
struct Numbering {
    /// `abstractNumId → (ilvl → numFmt)`
    abstract_formats: HashMap<String, HashMap<u8, String>>,
    /// `numId → abstractNumId`
    instances: HashMap<String, String>,
}

impl Numbering {
    fn format(&self, num_id: &str, ilvl: u8) -> Option<&str> {
        let abstract_id = self.instances.get(num_id)?;
        self.abstract_formats
            .get(abstract_id)?
            .get(&ilvl)
            .map(String::as_str)
    }

    /// `ol` for counted levels (decimal, letters, roman numerals, ...).
    fn list_tag(&self, num_id: Option<&str>, ilvl: u8) -> &'static str {
        match num_id.and_then(|id| self.format(id, ilvl)) {
            None | Some("bullet" | "none") => "ul",
            Some(_) => "ol",
        }
    }
}

fn parse_numbering(xml: &str) -> quick_xml::Result<Numbering> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut numbering = Numbering::default();
    let mut abstract_id: Option<String> = None;
    let mut level: Option<u8> = None;
    let mut num_id: Option<String> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.name().as_ref() {
                b"w:abstractNum" => abstract_id = get_attr(&e, b"w:abstractNumId"),
                b"w:lvl" => level = get_attr(&e, b"w:ilvl").and_then(|v| v.parse().ok()),
                b"w:num" => num_id = get_attr(&e, b"w:numId"),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"w:numFmt" => {
                    if let (Some(id), Some(lvl), Some(fmt)) =
                        (abstract_id.as_ref(), level, get_attr(&e, b"w:val"))
                    {
                        numbering
                            .abstract_formats
                            .entry(id.clone())
                            .or_default()
                            .insert(lvl, fmt);
                    }
                }
                b"w:abstractNumId" => {
                    if let (Some(id), Some(target)) = (num_id.as_ref(), get_attr(&e, b"w:val")) {
                        numbering.instances.insert(id.clone(), target);
                    }
                }
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"w:abstractNum" => abstract_id = None,
                b"w:lvl" => level = None,
                b"w:num" => num_id = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }
    Ok(numbering)
}

fn get_attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .find(|a| a.as_ref().ok().map(|x| x.key.as_ref()) == Some(key))
        .and_then(Result::ok)
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

/// `<w:b w:val="0"/>` and `<w:b w:val="false"/>` switch formatting off.
fn toggle_on(e: &BytesStart<'_>) -> bool {
    !matches!(get_attr(e, b"w:val").as_deref(), Some("0" | "false"))
}

#[derive(Default)]
struct Paragraph {
    style_id: Option<String>,
    is_list: bool,
    num_id: Option<String>,
    ilvl: u8,
    html: String,
}

#[derive(Default)]
struct Run {
    bold: bool,
    italic: bool,
    html: String,
}

struct Renderer<'s> {
    styles: &'s HashMap<String, String>,
    numbering: &'s Numbering,
    /// Output buffers: body, then one per open table, row and cell.
    stack: Vec<String>,
    para: Option<Paragraph>,
    run: Option<Run>,
    in_text: bool,
    /// Element of the list currently open in the top buffer.
    open_list: Option<&'static str>,
    messages: Vec<String>,
}

impl<'s> Renderer<'s> {
    fn new(styles: &'s HashMap<String, String>, numbering: &'s Numbering) -> Self {
        Self {
            styles,
            numbering,
            stack: vec![String::new()],
            para: None,
            run: None,
            in_text: false,
            open_list: None,
            messages: Vec::new(),
        }
    }

    fn run(&mut self, xml: &str) -> quick_xml::Result<()> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(e) => self.open(&e, false),
                Event::Empty(e) => self.open(&e, true),
                Event::Text(t) if self.in_text => {
                    let text = t.unescape()?;
                    if let Some(run) = self.run.as_mut() {
                        run.html.push_str(&escape(&text));
                    }
                }
                Event::End(e) => self.close(e.name().as_ref()),
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }
        Ok(())
    }

    fn open(&mut self, e: &BytesStart<'_>, empty: bool) {
        match e.name().as_ref() {
            b"w:p" if !empty => self.para = Some(Paragraph::default()),
            b"w:pStyle" => {
                if let Some(p) = self.para.as_mut() {
                    p.style_id = get_attr(e, b"w:val");
                }
            }
            b"w:numPr" => {
                if let Some(p) = self.para.as_mut() {
                    p.is_list = true;
                }
            }
            b"w:numId" => {
                if let Some(p) = self.para.as_mut() {
                    p.num_id = get_attr(e, b"w:val");
                }
            }
            b"w:ilvl" => {
                if let Some(p) = self.para.as_mut() {
                    p.ilvl = get_attr(e, b"w:val")
                        .and_then(|v| v.parse().ok())
                        .unwrap_or(0);
                }
            }
            b"w:r" if !empty => self.run = Some(Run::default()),
            b"w:b" => {
                if let Some(r) = self.run.as_mut() {
                    r.bold = toggle_on(e);
                }
            }
            b"w:i" => {
                if let Some(r) = self.run.as_mut() {
                    r.italic = toggle_on(e);
                }
            }
            b"w:t" if !empty => self.in_text = true,
            b"w:tab" => {
                if let Some(r) = self.run.as_mut() {
                    r.html.push('\t');
                }
            }
            b"w:br" => {
                if let Some(r) = self.run.as_mut() {
                    r.html.push_str("<br />");
                }
            }
            b"w:tbl" | b"w:tr" | b"w:tc" if !empty => {
                self.close_list();
                self.stack.push(String::new());
            }
            b"w:drawing" | b"w:pict" | b"w:object" => {
                self.note("Images and embedded objects are not converted".to_string());
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"w:t" => self.in_text = false,
            b"w:r" => {
                if let (Some(run), Some(para)) = (self.run.take(), self.para.as_mut()) {
                    let mut html = run.html;
                    if run.italic {
                        html = format!("<em>{html}</em>");
                    }
                    if run.bold {
                        html = format!("<strong>{html}</strong>");
                    }
                    para.html.push_str(&html);
                }
            }
            b"w:p" => self.finish_paragraph(),
            b"w:tc" => {
                self.close_list();
                self.pop_into("td");
            }
            b"w:tr" => self.pop_into("tr"),
            b"w:tbl" => self.pop_into("table"),
            _ => {}
        }
    }

    fn finish_paragraph(&mut self) {
        let Some(para) = self.para.take() else {
            return;
        };
        if para.html.trim().is_empty() {
            return;
        }

        let tag = match &para.style_id {
            Some(id) => {
                let name = self.styles.get(id).cloned().unwrap_or_else(|| id.clone());
                match style_tag(&name) {
                    Some(tag) => tag,
                    None => {
                        self.note(format!(
                            "Unrecognised paragraph style: '{name}' (Style ID: {id})"
                        ));
                        "p"
                    }
                }
            }
            None => "p",
        };

        if para.is_list && tag == "p" {
            let list = self.numbering.list_tag(para.num_id.as_deref(), para.ilvl);
            if self.open_list != Some(list) {
                self.close_list();
                let open = format!("<{list}>");
                self.top().push_str(&open);
                self.open_list = Some(list);
            }
            let html = format!("<li>{}</li>", para.html);
            self.top().push_str(&html);
        } else {
            self.close_list();
            let html = format!("<{tag}>{}</{tag}>", para.html);
            self.top().push_str(&html);
        }
    }

    fn close_list(&mut self) {
        if let Some(list) = self.open_list.take() {
            let close = format!("</{list}>");
            self.top().push_str(&close);
        }
    }

    fn pop_into(&mut self, tag: &str) {
        if self.stack.len() < 2 {
            return;
        }
        if let Some(inner) = self.stack.pop() {
            let html = format!("<{tag}>{inner}</{tag}>");
            self.top().push_str(&html);
        }
    }

    fn top(&mut self) -> &mut String {
        if self.stack.is_empty() {
            self.stack.push(String::new());
        }
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }

    fn note(&mut self, msg: String) {
        if !self.messages.contains(&msg) {
            self.messages.push(msg);
        }
    }

    fn finish(mut self) -> WordHtml {
        self.close_list();
        WordHtml {
            html: self.stack.concat(),
            messages: self.messages,
        }
    }
}

/// Element for a paragraph style name, `None` when the style is not mapped.
fn style_tag(name: &str) -> Option<&'static str> {
    match name.to_ascii_lowercase().as_str() {
        "heading 1" => Some("h1"),
        "heading 2" => Some("h2"),
        "heading 3" => Some("h3"),
        "heading 4" => Some("h4"),
        "heading 5" => Some("h5"),
        "heading 6" => Some("h6"),
        "normal" | "list paragraph" | "body text" => Some("p"),
        _ => None,
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::ConversionConfig;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:style w:type="paragraph" w:styleId="Heading1"><w:name w:val="heading 1"/></w:style>
<w:style w:type="paragraph" w:styleId="Title"><w:name w:val="Title"/></w:style>
<w:style w:type="paragraph" w:styleId="ListParagraph"><w:name w:val="List Paragraph"/></w:style>
</w:styles>"#;

    const NUMBERING: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<w:numbering xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
<w:abstractNum w:abstractNumId="0"><w:lvl w:ilvl="0"><w:start w:val="1"/><w:numFmt w:val="bullet"/></w:lvl></w:abstractNum>
<w:abstractNum w:abstractNumId="1"><w:lvl w:ilvl="0"><w:numFmt w:val="decimal"/></w:lvl><w:lvl w:ilvl="1"><w:numFmt w:val="lowerRoman"/></w:lvl></w:abstractNum>
<w:num w:numId="1"><w:abstractNumId w:val="0"/></w:num>
<w:num w:numId="2"><w:abstractNumId w:val="1"/></w:num>
</w:numbering>"#;

    /// Minimal DOCX package wrapping `body` in `w:document/w:body`.
    pub(crate) fn docx(body: &str) -> Vec<u8> {
        let document = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
        );
        let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();
        zip.start_file("word/document.xml", options).unwrap();
        zip.write_all(document.as_bytes()).unwrap();
        zip.start_file("word/styles.xml", options).unwrap();
        zip.write_all(STYLES.as_bytes()).unwrap();
        zip.start_file("word/numbering.xml", options).unwrap();
        zip.write_all(NUMBERING.as_bytes()).unwrap();
        zip.finish().unwrap().into_inner()
    }

    fn fragment(body: &str) -> WordHtml {
        render_fragment(&UploadedFile::new("doc.docx", docx(body))).unwrap()
    }

    #[test]
    fn heading_and_formatted_runs() {
        let out = fragment(
            r#"<w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr><w:r><w:t>Intro</w:t></w:r></w:p>
<w:p><w:r><w:rPr><w:b/></w:rPr><w:t>bold</w:t></w:r><w:r><w:t xml:space="preserve"> and </w:t></w:r><w:r><w:rPr><w:i/></w:rPr><w:t>italic</w:t></w:r></w:p>"#,
        );
        assert!(out.html.contains("<h1>Intro</h1>"), "{}", out.html);
        assert!(out
            .html
            .contains("<p><strong>bold</strong> and <em>italic</em></p>"));
        assert!(out.messages.is_empty());
    }

    #[test]
    fn list_paragraphs_grouped() {
        let item = |t: &str| {
            format!(
                r#"<w:p><w:pPr><w:pStyle w:val="ListParagraph"/><w:numPr><w:ilvl w:val="0"/><w:numId w:val="1"/></w:numPr></w:pPr><w:r><w:t>{t}</w:t></w:r></w:p>"#
            )
        };
        let body = format!(
            "{}{}<w:p><w:r><w:t>after</w:t></w:r></w:p>",
            item("one"),
            item("two")
        );
        let out = fragment(&body);
        assert!(out
            .html
            .contains("<ul><li>one</li><li>two</li></ul><p>after</p>"));
    }

    fn numbered(num_id: u32, ilvl: u8, t: &str) -> String {
        format!(
            r#"<w:p><w:pPr><w:pStyle w:val="ListParagraph"/><w:numPr><w:ilvl w:val="{ilvl}"/><w:numId w:val="{num_id}"/></w:numPr></w:pPr><w:r><w:t>{t}</w:t></w:r></w:p>"#
        )
    }

    #[test]
    fn counted_numbering_becomes_ordered_list() {
        let body = format!("{}{}", numbered(2, 0, "first"), numbered(2, 1, "sub"));
        let out = fragment(&body);
        assert!(
            out.html.contains("<ol><li>first</li><li>sub</li></ol>"),
            "{}",
            out.html
        );
    }

    #[test]
    fn switching_list_kind_closes_previous_list() {
        let body = format!("{}{}", numbered(1, 0, "dot"), numbered(2, 0, "one"));
        let out = fragment(&body);
        assert!(out.html.contains("<ul><li>dot</li></ul><ol><li>one</li></ol>"));
    }

    #[test]
    fn unresolved_numbering_stays_bulleted() {
        let numbering = parse_numbering(NUMBERING).unwrap();
        assert_eq!(numbering.list_tag(Some("2"), 0), "ol");
        assert_eq!(numbering.list_tag(Some("2"), 1), "ol");
        assert_eq!(numbering.list_tag(Some("1"), 0), "ul");
        assert_eq!(numbering.list_tag(Some("9"), 0), "ul");
        assert_eq!(numbering.list_tag(None, 0), "ul");
    }

    #[test]
    fn tables_rendered() {
        let out = fragment(
            r#"<w:tbl><w:tr><w:tc><w:p><w:r><w:t>A1</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>B1</w:t></w:r></w:p></w:tc></w:tr></w:tbl>"#,
        );
        assert!(out
            .html
            .contains("<table><tr><td><p>A1</p></td><td><p>B1</p></td></tr></table>"));
    }

    #[test]
    fn unknown_style_becomes_note() {
        let out = fragment(
            r#"<w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t>Big</w:t></w:r></w:p>"#,
        );
        assert!(out.html.contains("<p>Big</p>"));
        assert_eq!(
            out.messages,
            vec!["Unrecognised paragraph style: 'Title' (Style ID: Title)".to_string()]
        );
    }

    #[test]
    fn document_shell_lists_notes() {
        let file = UploadedFile::new(
            "memo.docx",
            docx(r#"<w:p><w:pPr><w:pStyle w:val="Title"/></w:pPr><w:r><w:t>x &amp; y</w:t></w:r></w:p>"#),
        );
        let config = ConversionConfig::default();
        let job = ConvertJob {
            file: &file,
            source: Format::Docx,
            target: Format::Html,
            config: &config,
            all_pages: false,
        };
        let out = to_html(&job).unwrap();
        assert_eq!(out[0].name(), "memo.html");
        let html = String::from_utf8(out[0].data().to_vec()).unwrap();
        assert!(html.contains("<h1>Document: memo.docx</h1>"));
        assert!(html.contains("Conversion notes"));
        assert!(html.contains("x &amp; y"));
    }

    #[test]
    fn legacy_doc_fails_to_decode() {
        let ole = [0xD0u8, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1, 0, 0, 0, 0];
        let err = render_fragment(&UploadedFile::new("old.doc", ole.to_vec())).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::DecodeFailure {
                format: Format::Doc,
                ..
            }
        ));
    }
}
