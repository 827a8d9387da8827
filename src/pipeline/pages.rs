//! Per-page text of the rendered PDF.
//!
//! Text extracted from a PDF breaks lines wherever the layout wrapped them.
//! A heading that wrapped would then never match its source text, so every
//! line break is replaced by a single space before matching.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static LINE_BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\r\n|\r|\n").expect("valid regex"));

/// Normalised text of one rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    /// 1-based page number.
    pub page_index: usize,
    /// Page text with line breaks replaced by spaces.
    pub text: String,
}

impl PageText {
    /// Build a page entry, normalising `raw`.
    pub fn new(page_index: usize, raw: &str) -> Self {
        Self {
            page_index,
            text: normalize_page_text(raw),
        }
    }
}

/// Replace each `\r\n`, `\r` and `\n` with one space.
///
/// Other whitespace is left alone.
pub fn normalize_page_text(raw: &str) -> String {
    LINE_BREAK_RE.replace_all(raw, " ").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_line_break_becomes_one_space() {
        assert_eq!(normalize_page_text("a\r\nb\nc\rd"), "a b c d");
        assert_eq!(normalize_page_text("a\n\nb"), "a  b");
    }

    #[test]
    fn other_whitespace_is_untouched() {
        assert_eq!(normalize_page_text("a\tb  c"), "a\tb  c");
        assert_eq!(normalize_page_text(""), "");
    }

    #[test]
    fn wrapped_heading_matches_after_normalising() {
        let page = PageText::new(3, "Chapter\nOne: The\r\nBeginning");
        assert_eq!(page.page_index, 3);
        assert!(page.text.contains("Chapter One: The Beginning"));
    }
}
