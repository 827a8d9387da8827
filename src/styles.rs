//! Print stylesheets injected into the document before export.
//!
//! Keeping every stylesheet here means tests can inspect the exact CSS that
//! reaches the engine, and changing a print rule touches one place.
//! [`compose`] is the only entry point: it turns a
//! [`PresentationOptions`] into a single stylesheet, in a fixed order, so
//! injecting it twice is harmless.

use crate::config::PresentationOptions;

/// `@media print` rules that reduce awkward page breaks.
///
/// Headings stay with the text that follows them; paragraphs, list items,
/// tables and code blocks avoid splitting across pages.
pub const KEEP_TEXT_TOGETHER_CSS: &str = r#"@media print {
    html, body {
        text-rendering: optimizeLegibility;
        height: auto;
    }
    h1, h2, h3, h4, h5, h6 {
        page-break-after: avoid;
        break-after: avoid;
    }
    p, li, blockquote, figure, img, table {
        page-break-inside: avoid;
        break-inside: avoid;
    }
    ul, ol {
        page-break-before: avoid;
        break-before: avoid;
    }
    pre, pre code {
        white-space: pre-wrap;
        word-break: normal;
        page-break-inside: avoid;
        break-inside: avoid;
    }
}"#;

/// Native UI font stacks that embed cleanly in PDF output and carry emoji
/// glyphs on every desktop platform.
pub const OPTIMIZE_PDF_FONTS_CSS: &str = r#"html, body {
    font-family: -apple-system, BlinkMacSystemFont, "Segoe UI", "Segoe UI Emoji",
        "Apple Color Emoji", "Noto Color Emoji", Roboto, "Helvetica Neue", Arial, sans-serif;
}
pre, code, kbd, samp {
    font-family: ui-monospace, SFMono-Regular, Consolas, "Liberation Mono", Menlo, monospace;
}"#;

/// Combine the enabled stylesheets, in a fixed order.
///
/// Returns `None` when nothing is enabled and the custom CSS is absent or
/// blank, so the worker can skip the injection step entirely.
pub fn compose(options: &PresentationOptions) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    if options.keep_text_together {
        parts.push(KEEP_TEXT_TOGETHER_CSS);
    }
    if options.optimize_pdf_fonts {
        parts.push(OPTIMIZE_PDF_FONTS_CSS);
    }
    if let Some(css) = options.css_to_inject.as_deref() {
        let css = css.trim();
        if !css.is_empty() {
            parts.push(css);
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("\n\n"))
    }
}
