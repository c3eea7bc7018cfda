//! Spreadsheet conversions: Excel → HTML, Excel → CSV, CSV → Excel.
//!
//! Workbooks are read with `calamine` (xls and xlsx alike). Writing only ever
//! produces xlsx, assembled by hand from the handful of OOXML parts a reader
//! needs.
//!
//! Two conversions here are lossy on purpose:
//! * Excel → CSV keeps the first worksheet only.
//! * CSV → Excel splits on newline, then on comma; quoted fields and
//!   embedded commas are not recognised.

use super::ConvertJob;
use crate::error::ConvertError;
use crate::file::{Artifact, UploadedFile};
use crate::format::Format;
use calamine::{open_workbook_auto_from_rs, Data, ExcelDateTime, Range, Reader, Sheets};
use chrono::{NaiveDate, NaiveTime, TimeDelta};
use once_cell::sync::Lazy;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use regex::Regex;
use std::fmt::Write as _;
use std::io::{Cursor, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

static RE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}|\d{2}/\d{2}/\d{4}").unwrap());

const STYLE: &str = "body{font-family:'Segoe UI',Tahoma,Geneva,Verdana,sans-serif;margin:20px;background-color:#f8f9fa}\
.container{background:white;padding:30px;border-radius:8px;box-shadow:0 2px 10px rgba(0,0,0,0.1)}\
h1{color:#2c3e50;border-bottom:3px solid #3498db;padding-bottom:10px}\
h2{margin-top:30px;background:#5a67d8;color:white;padding:10px 15px;border-radius:5px}\
table{border-collapse:collapse;width:100%;margin-bottom:30px}\
td{border:1px solid #ddd;padding:12px 8px;text-align:left;vertical-align:top}\
tr:nth-child(even){background-color:#f8f9fa}\
.sheet-info{background:#e8f5e8;padding:10px;border-radius:5px;margin-bottom:15px;border-left:4px solid #27ae60}\
.number{text-align:right;font-family:'Courier New',monospace}\
.date{text-align:center}";

type Workbook = Sheets<Cursor<Vec<u8>>>;

fn open(file: &UploadedFile) -> Result<Workbook, ConvertError> {
    let format = file.format().unwrap_or(Format::Xlsx);
    open_workbook_auto_from_rs(Cursor::new(file.data().to_vec()))
        .map_err(|e| ConvertError::decode(format, e))
}

fn sheet(
    workbook: &mut Workbook,
    name: &str,
    format: Format,
) -> Result<Range<Data>, ConvertError> {
    workbook
        .worksheet_range(name)
        .map_err(|e| ConvertError::decode(format, format!("sheet '{name}': {e}")))
}

/// Excel → HTML: every worksheet as a table under an info banner.
pub fn to_html(job: &ConvertJob<'_>) -> Result<Vec<Artifact>, ConvertError> {
    let mut workbook = open(job.file)?;
    let names = workbook.sheet_names();
    let total = names.len();

    let mut body = String::new();
    for (idx, name) in names.iter().enumerate() {
        let range = sheet(&mut workbook, name, job.source)?;
        let (rows, cols) = range.get_size();
        debug!("Sheet '{}': {} rows × {} cols", name, rows, cols);

        let _ = write!(
            body,
            "<h2>Sheet: {}</h2>\n<div class=\"sheet-info\"><strong>Range:</strong> {} rows × {} columns | \
<strong>Sheet:</strong> {}/{}</div>\n",
            escape(name),
            rows,
            cols,
            idx + 1,
            total
        );
        body.push_str(&table_html(&range, idx));
    }

    let html = format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n\
<style>{STYLE}</style>\n</head>\n<body>\n<div class=\"container\">\n<h1>Excel file: {title}</h1>\n\
{body}</div>\n</body>\n</html>\n",
        title = escape(job.file.name()),
    );
    Ok(vec![job.artifact(html.into_bytes())])
}

fn table_html(range: &Range<Data>, sheet_idx: usize) -> String {
    let mut out = format!("<table class=\"data-table\" id=\"sheet-{sheet_idx}\">\n");
    for row in range.rows() {
        out.push_str("<tr>");
        for cell in row {
            let text = cell_text(cell);
            match cell_class(&text) {
                Some(class) => {
                    let _ = write!(out, "<td class=\"{class}\">{}</td>", escape(&text));
                }
                None => {
                    let _ = write!(out, "<td>{}</td>", escape(&text));
                }
            }
        }
        out.push_str("</tr>\n");
    }
    out.push_str("</table>\n");
    out
}

/// CSS class of a rendered cell: `number` when the whole value parses as a
/// number, `date` when it contains a `YYYY-MM-DD` or `MM/DD/YYYY` pattern.
pub fn cell_class(text: &str) -> Option<&'static str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else if trimmed.parse::<f64>().is_ok() {
        Some("number")
    } else if RE_DATE.is_match(trimmed) {
        Some("date")
    } else {
        None
    }
}

/// Excel → CSV from the first worksheet; the others are dropped.
pub fn to_csv(job: &ConvertJob<'_>) -> Result<Vec<Artifact>, ConvertError> {
    let mut workbook = open(job.file)?;
    let names = workbook.sheet_names();
    let first = names
        .first()
        .ok_or_else(|| ConvertError::decode(job.source, "workbook has no worksheets"))?;
    if names.len() > 1 {
        debug!(
            "CSV export keeps sheet '{}', dropping {} other sheet(s)",
            first,
            names.len() - 1
        );
    }
    let range = sheet(&mut workbook, first, job.source)?;

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());
    for row in range.rows() {
        writer
            .write_record(row.iter().map(cell_text))
            .map_err(|e| ConvertError::encode(Format::Csv, e))?;
    }
    let data = writer
        .into_inner()
        .map_err(|e| ConvertError::encode(Format::Csv, e))?;
    Ok(vec![job.artifact(data)])
}

/// CSV → Excel, one sheet named `Sheet1`.
pub fn from_csv(job: &ConvertJob<'_>) -> Result<Vec<Artifact>, ConvertError> {
    let grid = split_csv(&job.file.text());
    debug!("CSV grid: {} rows", grid.len());
    let data = write_xlsx(&[("Sheet1", grid)])?;
    Ok(vec![job.artifact(data)])
}

/// Newline then comma. A single trailing newline does not add an empty row,
/// and a `\r` before the newline is dropped.
pub fn split_csv(text: &str) -> Vec<Vec<String>> {
    let text = text.strip_suffix('\n').unwrap_or(text);
    text.split('\n')
        .map(|line| {
            line.strip_suffix('\r')
                .unwrap_or(line)
                .split(',')
                .map(str::to_string)
                .collect()
        })
        .collect()
}

/// First sheet as display strings, for tabular previews.
pub(crate) struct Grid {
    pub sheet_names: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
}

pub(crate) fn first_sheet_grid(file: &UploadedFile, limit: usize) -> Result<Grid, ConvertError> {
    let mut workbook = open(file)?;
    let sheet_names = workbook.sheet_names();
    let Some(first) = sheet_names.first() else {
        return Ok(Grid {
            sheet_names,
            rows: Vec::new(),
            total_rows: 0,
        });
    };
    let range = sheet(&mut workbook, first, file.format().unwrap_or(Format::Xlsx))?;
    let rows = range
        .rows()
        .take(limit)
        .map(|row| row.iter().map(cell_text).collect())
        .collect();
    Ok(Grid {
        total_rows: range.height(),
        sheet_names,
        rows,
    })
}

/// Render a cell the way a spreadsheet shows it.
fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => format_float(*f),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::DateTime(dt) => excel_datetime_text(dt),
        Data::Error(e) => e.to_string(),
    }
}

fn format_float(f: f64) -> String {
    if f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// Date, date-time, time-of-day or duration, depending on what the cell holds.
fn excel_datetime_text(dt: &ExcelDateTime) -> String {
    if dt.is_duration() {
        return dt
            .as_duration()
            .map(duration_text)
            .unwrap_or_else(|| format_float(dt.as_f64()));
    }
    let Some(value) = dt.as_datetime() else {
        return format_float(dt.as_f64());
    };
    // Serials below 1 in the 1900 system carry no date, only a time of day.
    if dt.as_f64() >= 0.0 && value.date() == TIME_ONLY_DAY {
        value.format("%H:%M:%S").to_string()
    } else if value.time() == NaiveTime::MIN {
        value.format("%Y-%m-%d").to_string()
    } else {
        value.format("%Y-%m-%d %H:%M:%S").to_string()
    }
}

/// The day calamine places a 1900-system serial in `[0, 1)` on.
const TIME_ONLY_DAY: NaiveDate = match NaiveDate::from_ymd_opt(1899, 12, 31) {
    Some(d) => d,
    None => NaiveDate::MIN,
};

/// Elapsed time as Excel's `[h]:mm:ss`.
fn duration_text(d: TimeDelta) -> String {
    let secs = d.num_seconds();
    let sign = if secs < 0 { "-" } else { "" };
    let secs = secs.unsigned_abs();
    format!("{sign}{}:{:02}:{:02}", secs / 3600, secs / 60 % 60, secs % 60)
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ── XLSX writer ─────────────────────────────────────────────────────────

const CONTENT_TYPES_HEAD: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const NS_MAIN: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const NS_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Package `sheets` as an xlsx workbook with inline-string cells.
pub(crate) fn write_xlsx(sheets: &[(&str, Vec<Vec<String>>)]) -> Result<Vec<u8>, ConvertError> {
    let err = |e: &dyn std::fmt::Display| ConvertError::encode(Format::Xlsx, e);

    let mut content_types = CONTENT_TYPES_HEAD.to_string();
    let mut workbook_rels = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for i in 1..=sheets.len() {
        let _ = write!(
            content_types,
            r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        );
        let _ = write!(
            workbook_rels,
            r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{i}.xml"/>"#
        );
    }
    content_types.push_str("</Types>");
    workbook_rels.push_str("</Relationships>");

    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let mut put = |name: &str, bytes: &[u8]| -> Result<(), ConvertError> {
        zip.start_file(name, options).map_err(|e| err(&e))?;
        zip.write_all(bytes).map_err(|e| err(&e))
    };

    put("[Content_Types].xml", content_types.as_bytes())?;
    put("_rels/.rels", ROOT_RELS.as_bytes())?;
    put("xl/workbook.xml", &workbook_xml(sheets).map_err(|e| err(&e))?)?;
    put("xl/_rels/workbook.xml.rels", workbook_rels.as_bytes())?;
    for (i, (_, rows)) in sheets.iter().enumerate() {
        let xml = sheet_xml(rows).map_err(|e| err(&e))?;
        put(&format!("xl/worksheets/sheet{}.xml", i + 1), &xml)?;
    }

    let cursor = zip.finish().map_err(|e| err(&e))?;
    Ok(cursor.into_inner())
}

fn workbook_xml(sheets: &[(&str, Vec<Vec<String>>)]) -> quick_xml::Result<Vec<u8>> {
    let mut w = Writer::new(Cursor::new(Vec::new()));
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    w.write_event(Event::Start(
        BytesStart::new("workbook").with_attributes([("xmlns", NS_MAIN), ("xmlns:r", NS_REL)]),
    ))?;
    w.write_event(Event::Start(BytesStart::new("sheets")))?;
    for (i, (name, _)) in sheets.iter().enumerate() {
        let id = (i + 1).to_string();
        let rid = format!("rId{id}");
        w.write_event(Event::Empty(BytesStart::new("sheet").with_attributes([
            ("name", *name),
            ("sheetId", id.as_str()),
            ("r:id", rid.as_str()),
        ])))?;
    }
    w.write_event(Event::End(BytesEnd::new("sheets")))?;
    w.write_event(Event::End(BytesEnd::new("workbook")))?;
    Ok(w.into_inner().into_inner())
}

fn sheet_xml(rows: &[Vec<String>]) -> quick_xml::Result<Vec<u8>> {
    let mut w = Writer::new(Cursor::new(Vec::new()));
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
    w.write_event(Event::Start(
        BytesStart::new("worksheet").with_attributes([("xmlns", NS_MAIN)]),
    ))?;
    w.write_event(Event::Start(BytesStart::new("sheetData")))?;
    for (r, row) in rows.iter().enumerate() {
        let row_num = (r + 1).to_string();
        w.write_event(Event::Start(
            BytesStart::new("row").with_attributes([("r", row_num.as_str())]),
        ))?;
        for (c, value) in row.iter().enumerate() {
            let cell_ref = format!("{}{}", column_name(c), r + 1);
            w.write_event(Event::Start(BytesStart::new("c").with_attributes([
                ("r", cell_ref.as_str()),
                ("t", "inlineStr"),
            ])))?;
            w.write_event(Event::Start(BytesStart::new("is")))?;
            w.write_event(Event::Start(
                BytesStart::new("t").with_attributes([("xml:space", "preserve")]),
            ))?;
            w.write_event(Event::Text(BytesText::new(value)))?;
            w.write_event(Event::End(BytesEnd::new("t")))?;
            w.write_event(Event::End(BytesEnd::new("is")))?;
            w.write_event(Event::End(BytesEnd::new("c")))?;
        }
        w.write_event(Event::End(BytesEnd::new("row")))?;
    }
    w.write_event(Event::End(BytesEnd::new("sheetData")))?;
    w.write_event(Event::End(BytesEnd::new("worksheet")))?;
    Ok(w.into_inner().into_inner())
}

/// Zero-based column index → spreadsheet letters (`0` → `A`, `26` → `AA`).
fn column_name(mut idx: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (idx % 26) as u8);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConversionConfig;
    use calamine::ExcelDateTimeType;

    fn job<'a>(
        file: &'a UploadedFile,
        source: Format,
        target: Format,
        config: &'a ConversionConfig,
    ) -> ConvertJob<'a> {
        ConvertJob {
            file,
            source,
            target,
            config,
            all_pages: false,
        }
    }

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|s| s.to_string()).collect())
            .collect()
    }

    #[test]
    fn column_names() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
        assert_eq!(column_name(27), "AB");
        assert_eq!(column_name(701), "ZZ");
        assert_eq!(column_name(702), "AAA");
    }

    #[test]
    fn split_ignores_quoting() {
        let g = split_csv("name,note\n\"Smith, J\",x\n");
        assert_eq!(g.len(), 2);
        assert_eq!(g[1], vec!["\"Smith", " J\"", "x"]);
        assert_eq!(split_csv("a,b\r\n1,2"), grid(&[&["a", "b"], &["1", "2"]]));
    }

    #[test]
    fn csv_xlsx_csv_round_trip() {
        let config = ConversionConfig::default();
        let csv_in = UploadedFile::new("data.csv", b"a,b\n1,2".to_vec());
        let xlsx = from_csv(&job(&csv_in, Format::Csv, Format::Xlsx, &config)).unwrap();
        assert_eq!(xlsx[0].name(), "data.xlsx");

        let reopened = xlsx[0].clone().into_uploaded();
        let csv_out = to_csv(&job(&reopened, Format::Xlsx, Format::Csv, &config)).unwrap();
        let text = String::from_utf8(csv_out[0].data().to_vec()).unwrap();
        assert_eq!(text.trim_end(), "a,b\n1,2");
    }

    #[test]
    fn csv_export_keeps_first_sheet_only() {
        let bytes = write_xlsx(&[
            ("First", grid(&[&["one"]])),
            ("Second", grid(&[&["two"]])),
            ("Third", grid(&[&["three"]])),
        ])
        .unwrap();
        let file = UploadedFile::new("book.xlsx", bytes);
        let config = ConversionConfig::default();
        let out = to_csv(&job(&file, Format::Xlsx, Format::Csv, &config)).unwrap();
        assert_eq!(out.len(), 1);
        let text = String::from_utf8(out[0].data().to_vec()).unwrap();
        assert_eq!(text.trim_end(), "one");
    }

    #[test]
    fn html_has_banner_per_sheet_and_cell_classes() {
        let bytes = write_xlsx(&[
            ("Sales", grid(&[&["Item", "Qty", "When"], &["Pen", "12", "2024-03-01"]])),
            ("Notes", grid(&[&["<todo>"]])),
        ])
        .unwrap();
        let file = UploadedFile::new("report.xlsx", bytes);
        let config = ConversionConfig::default();
        let out = to_html(&job(&file, Format::Xlsx, Format::Html, &config)).unwrap();
        let html = String::from_utf8(out[0].data().to_vec()).unwrap();

        assert!(html.contains("2 rows × 3 columns"));
        assert!(html.contains("<strong>Sheet:</strong> 1/2"));
        assert!(html.contains("<strong>Sheet:</strong> 2/2"));
        assert!(html.contains("<td class=\"number\">12</td>"));
        assert!(html.contains("<td class=\"date\">2024-03-01</td>"));
        assert!(html.contains("&lt;todo&gt;"));
    }

    #[test]
    fn classes() {
        assert_eq!(cell_class(" 3.5 "), Some("number"));
        assert_eq!(cell_class("03/15/2024"), Some("date"));
        assert_eq!(cell_class("hello"), None);
        assert_eq!(cell_class(""), None);
    }

    fn date_cell(value: f64, kind: ExcelDateTimeType, is_1904: bool) -> String {
        cell_text(&Data::DateTime(ExcelDateTime::new(value, kind, is_1904)))
    }

    #[test]
    fn whole_day_serials_render_as_dates() {
        assert_eq!(date_cell(45352.0, ExcelDateTimeType::DateTime, false), "2024-03-01");
        assert_eq!(date_cell(25569.0, ExcelDateTimeType::DateTime, false), "1970-01-01");
        assert_eq!(date_cell(1.0, ExcelDateTimeType::DateTime, false), "1900-01-01");
        assert_eq!(date_cell(59.0, ExcelDateTimeType::DateTime, false), "1900-02-28");
        assert_eq!(date_cell(61.0, ExcelDateTimeType::DateTime, false), "1900-03-01");
    }

    #[test]
    fn fractional_serials_keep_time_of_day() {
        assert_eq!(
            date_cell(45352.75, ExcelDateTimeType::DateTime, false),
            "2024-03-01 18:00:00"
        );
        assert_eq!(date_cell(0.5, ExcelDateTimeType::DateTime, false), "12:00:00");
        assert_eq!(date_cell(0.0, ExcelDateTimeType::DateTime, false), "00:00:00");
    }

    #[test]
    fn epoch_1904_is_honoured() {
        assert_eq!(date_cell(0.0, ExcelDateTimeType::DateTime, true), "1904-01-01");
        assert_eq!(
            date_cell(43890.25, ExcelDateTimeType::DateTime, true),
            "2024-03-01 06:00:00"
        );
    }

    #[test]
    fn durations_render_as_elapsed_hours() {
        assert_eq!(date_cell(1.5, ExcelDateTimeType::TimeDelta, false), "36:00:00");
        assert_eq!(date_cell(0.0625, ExcelDateTimeType::TimeDelta, false), "1:30:00");
        assert_eq!(duration_text(TimeDelta::seconds(-90)), "-0:01:30");
    }

    #[test]
    fn date_cells_classify_in_html() {
        let text = date_cell(45352.75, ExcelDateTimeType::DateTime, false);
        assert_eq!(cell_class(&text), Some("date"));
    }

    #[test]
    fn grid_preview_is_limited() {
        let rows: Vec<Vec<String>> = (0..50).map(|i| vec![i.to_string()]).collect();
        let bytes = write_xlsx(&[("Only", rows)]).unwrap();
        let file = UploadedFile::new("big.xlsx", bytes);
        let g = first_sheet_grid(&file, 20).unwrap();
        assert_eq!(g.rows.len(), 20);
        assert_eq!(g.total_rows, 50);
        assert_eq!(g.sheet_names, vec!["Only".to_string()]);
    }

    #[test]
    fn garbage_workbook_is_decode_failure() {
        let file = UploadedFile::new("bad.xlsx", b"not a workbook".to_vec());
        let config = ConversionConfig::default();
        let err = to_html(&job(&file, Format::Xlsx, Format::Html, &config)).unwrap_err();
        assert!(matches!(err, ConvertError::DecodeFailure { .. }));
    }
}
