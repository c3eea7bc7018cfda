//! Plain text → line-numbered HTML.

use super::ConvertJob;
use crate::error::ConvertError;
use crate::file::Artifact;
use std::fmt::Write as _;

const STYLE: &str = "body{font-family:monospace;margin:20px;line-height:1.5}\
.line{white-space:pre-wrap}\
.line-number{color:#999;margin-right:10px;user-select:none}";

pub fn to_html(job: &ConvertJob<'_>) -> Result<Vec<Artifact>, ConvertError> {
    let html = render_numbered(&job.file.text(), job.file.name());
    Ok(vec![job.artifact(html.into_bytes())])
}

/// Wrap each line in a numbered `<div>`; only `<` and `>` are escaped.
pub fn render_numbered(text: &str, title: &str) -> String {
    let mut body = String::with_capacity(text.len() * 2);
    for (i, line) in text.split('\n').enumerate() {
        let _ = writeln!(
            body,
            "<div class=\"line\"><span class=\"line-number\">{:>3}:</span>{}</div>",
            i + 1,
            escape_angles(line)
        );
    }
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n\
<style>{STYLE}</style>\n</head>\n<body>\n{body}</body>\n</html>\n",
        escape_angles(title)
    )
}

fn escape_angles(s: &str) -> String {
    s.replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_numbered_and_padded() {
        let html = render_numbered("alpha\nbeta", "notes.txt");
        assert!(html.contains("<span class=\"line-number\">  1:</span>alpha</div>"));
        assert!(html.contains("<span class=\"line-number\">  2:</span>beta</div>"));
        assert_eq!(html.matches("class=\"line\"").count(), 2);
    }

    #[test]
    fn angle_brackets_escaped_ampersand_kept() {
        let html = render_numbered("<b>x & y</b>", "t.txt");
        assert!(html.contains("&lt;b&gt;x & y&lt;/b&gt;"));
        assert!(!html.contains("<b>x"));
    }

    #[test]
    fn wide_line_numbers_grow() {
        let text = vec!["x"; 1000].join("\n");
        let html = render_numbered(&text, "big.txt");
        assert!(html.contains(">1000:</span>"));
    }
}
