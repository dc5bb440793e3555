//! Standalone print document wrapping rendered HTML.

use std::fmt::Write;

use mdexport_markdown::{SanitizedDocument, escape_html, render_html};

use crate::engine::PrintOptions;

/// Stylesheet for paginated output.
///
/// Headings stay with the following block, code blocks and table rows are
/// not split across pages, and table headers repeat on every page.
const PRINT_CSS: &str = "\
body{font-family:-apple-system,\"Segoe UI\",Helvetica,Arial,sans-serif;font-size:11pt;line-height:1.5;color:#1f2328;margin:0}
h1,h2,h3,h4,h5,h6{break-after:avoid;page-break-after:avoid;break-inside:avoid;line-height:1.25;margin:1.2em 0 .5em}
h1{font-size:2em}h2{font-size:1.5em}h3{font-size:1.25em}
pre{break-inside:avoid;page-break-inside:avoid;white-space:pre-wrap;overflow-wrap:anywhere;background:#f6f8fa;padding:.75em;border-radius:4px}
code,pre{font-family:ui-monospace,\"SF Mono\",Menlo,Consolas,monospace;font-size:.9em}
blockquote{margin:0 0 1em;padding:0 1em;color:#59636e;border-left:.25em solid #d1d9e0}
table{border-collapse:collapse;width:100%;margin:0 0 1em}
thead{display:table-header-group}
tr{break-inside:avoid;page-break-inside:avoid}
th,td{border:1px solid #d1d9e0;padding:.3em .6em}
th{background:#f6f8fa}
a{color:#0969da}
li>input[type=checkbox]{margin-right:.4em}
";

/// Content-Security-Policy of the print page. Nothing but inline styles and
/// `data:` images may load.
const PRINT_CSP: &str = "default-src 'none'; img-src data:; style-src 'unsafe-inline'";

/// Build a complete HTML page for printing.
///
/// The browser runs on the server, so images are replaced by their alt text
/// and never fetched: a document must not reach the server's disk or
/// internal network through an image source. `about:blank` as the base keeps
/// any relative URL from resolving against the temporary file the page is
/// loaded from, and the CSP forbids scripts and every other load.
pub fn print_document(document: &SanitizedDocument, options: &PrintOptions) -> String {
    let document = document.without_images();
    let body = render_html(&document);
    let title = document.title().unwrap_or_default();

    let mut out = String::with_capacity(body.len() + PRINT_CSS.len() + 512);
    out.push_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\">");
    write!(
        out,
        "<meta http-equiv=\"Content-Security-Policy\" content=\"{PRINT_CSP}\">"
    )
    .unwrap();
    out.push_str("<base href=\"about:blank\">");
    write!(out, "<title>{}</title><style>", escape_html(&title)).unwrap();
    write!(
        out,
        "@page{{size:{};margin:{}mm}}",
        options.css_page_size(),
        options.margin_mm
    )
    .unwrap();
    out.push_str(PRINT_CSS);
    out.push_str("</style></head><body>");
    out.push_str(&body);
    out.push_str("</body></html>");
    out
}
