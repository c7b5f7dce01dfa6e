//! Standalone HTML export of a rendered preview.

use std::fmt::Write as _;

use markdown_weaver_escape::{FmtWriter, escape_html};

pub const DEFAULT_EXPORT_TITLE: &str = "Markdown Export";

/// Readable defaults for exported documents. Matches the preview's look
/// closely enough that an export reads like what was on screen.
pub const EXPORT_CSS: &str = r#"    body {
      font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Roboto', sans-serif;
      line-height: 1.6;
      color: #333;
      max-width: 800px;
      margin: 0 auto;
      padding: 20px;
      background-color: #fff;
    }
    h1, h2, h3, h4, h5, h6 { margin-top: 24px; margin-bottom: 16px; font-weight: 600; line-height: 1.25; }
    h1 { font-size: 2em; border-bottom: 1px solid #eaecef; padding-bottom: 0.3em; }
    h2 { font-size: 1.5em; border-bottom: 1px solid #eaecef; padding-bottom: 0.3em; }
    h3 { font-size: 1.25em; }
    p { margin-bottom: 16px; }
    code { background: #f6f8fa; border-radius: 3px; font-size: 85%; padding: 0.2em 0.4em; }
    pre { background: #f6f8fa; border-radius: 6px; font-size: 85%; line-height: 1.45; overflow: auto; padding: 16px; }
    pre code { background: transparent; padding: 0; }
    table { border-collapse: collapse; display: block; max-width: 100%; overflow: auto; width: max-content; }
    th, td { border: 1px solid #d0d7de; padding: 6px 13px; }
    th { background-color: #f6f8fa; font-weight: 600; }
    blockquote { border-left: 0.25em solid #d0d7de; color: #656d76; margin: 0; padding: 0 1em; }
    ul, ol { margin-bottom: 16px; padding-left: 2em; }
    li input[type="checkbox"] { margin-right: 0.5em; }
    a { color: #0969da; text-decoration: none; }
    hr { background-color: #d0d7de; border: 0; height: 0.25em; margin: 24px 0; }
"#;

/// Wrap already-sanitized preview HTML in a complete document.
///
/// Returns `None` when there is nothing to export.
pub fn standalone_document(body_html: &str, title: &str) -> Option<String> {
    if body_html.trim().is_empty() {
        return None;
    }

    let mut title_html = String::new();
    escape_html(FmtWriter(&mut title_html), title).ok()?;

    let mut out = String::with_capacity(body_html.len() + EXPORT_CSS.len() + 256);
    out.push_str("<!DOCTYPE html>\n");
    out.push_str("<html lang=\"en\">\n");
    out.push_str("<head>\n");
    out.push_str("  <meta charset=\"UTF-8\">\n");
    out.push_str("  <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n");
    let _ = writeln!(out, "  <title>{}</title>", title_html);
    out.push_str("  <style>\n");
    out.push_str(EXPORT_CSS);
    out.push_str("  </style>\n");
    out.push_str("</head>\n");
    out.push_str("<body>\n");
    out.push_str(body_html);
    if !body_html.ends_with('\n') {
        out.push('\n');
    }
    out.push_str("</body>\n");
    out.push_str("</html>\n");
    Some(out)
}
