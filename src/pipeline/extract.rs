//! Heading extraction: `h1`..`h6` in document order.
//!
//! The HTML is parsed with `kuchiki` (html5ever), so malformed markup is
//! recovered the same way a browser would recover it. The heading text is
//! the element's text content with whitespace runs collapsed to one space,
//! which is how the text appears once laid out on a page.
//!
//! `kuchiki` nodes are reference counted and not `Send`; [`extract`] runs
//! the parse on the blocking pool and only moves plain [`HeadingNode`]s
//! back.

use crate::config::MAX_OUTLINE_LEVEL;
use crate::error::OutlineError;
use crate::pipeline::input::load_document;
use crate::worker::RenderSource;
use kuchiki::traits::TendrilSink;
use serde::{Deserialize, Serialize};
use tracing::debug;

const HEADING_SELECTOR: &str = "h1, h2, h3, h4, h5, h6";

/// One heading, in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadingNode {
    /// 1 for `h1` through 6 for `h6`.
    pub level: u8,
    /// Trimmed text content.
    pub text: String,
}

impl HeadingNode {
    pub fn new(level: u8, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }
}

/// Load `source` and extract its headings up to `max_level`.
///
/// A source that cannot be found yields an empty list.
pub async fn extract(
    source: &RenderSource,
    max_level: u8,
    download_timeout_secs: u64,
) -> Result<Vec<HeadingNode>, OutlineError> {
    let Some(html) = load_document(source, download_timeout_secs).await? else {
        return Ok(Vec::new());
    };

    let headings = tokio::task::spawn_blocking(move || extract_headings(&html, max_level))
        .await
        .map_err(|e| OutlineError::Task(format!("heading extraction: {e}")))?;

    debug!("Extracted {} headings from {}", headings.len(), source);
    Ok(headings)
}

/// Extract `h1`..`h<max_level>` from an HTML string.
///
/// Headings whose text is empty after trimming are skipped: they can never
/// be matched to a page.
pub fn extract_headings(html: &str, max_level: u8) -> Vec<HeadingNode> {
    let max_level = max_level.min(MAX_OUTLINE_LEVEL);
    let document = kuchiki::parse_html().one(html);

    let Ok(elements) = document.select(HEADING_SELECTOR) else {
        return Vec::new();
    };

    elements
        .filter_map(|element| {
            let level = heading_level(&element.name.local)?;
            if level > max_level {
                return None;
            }
            let text = collapse_whitespace(&element.as_node().text_contents());
            if text.is_empty() {
                return None;
            }
            Some(HeadingNode { level, text })
        })
        .collect()
}

fn heading_level(tag: &str) -> Option<u8> {
    match tag.as_bytes() {
        [b'h', d @ b'1'..=b'6'] => Some(d - b'0'),
        _ => None,
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn levels(headings: &[HeadingNode]) -> Vec<u8> {
        headings.iter().map(|h| h.level).collect()
    }

    #[test]
    fn headings_come_in_document_order() {
        let html = r#"
            <html><body>
              <h1>Intro</h1>
              <div><h3>Deep</h3></div>
              <h2>Middle</h2>
              <section><h1>Second</h1></section>
            </body></html>"#;
        let headings = extract_headings(html, 6);
        assert_eq!(levels(&headings), vec![1, 3, 2, 1]);
        assert_eq!(headings[1].text, "Deep");
        assert_eq!(headings[3].text, "Second");
    }

    #[test]
    fn text_is_trimmed_and_collapsed() {
        let html = "<h2>\n   Getting   <em>started</em>\n</h2>";
        assert_eq!(
            extract_headings(html, 6),
            vec![HeadingNode::new(2, "Getting started")]
        );
    }

    #[test]
    fn levels_above_max_are_dropped() {
        let html = "<h1>A</h1><h2>B</h2><h3>C</h3><h4>D</h4>";
        assert_eq!(levels(&extract_headings(html, 2)), vec![1, 2]);
        assert_eq!(levels(&extract_headings(html, 6)), vec![1, 2, 3, 4]);
    }

    #[test]
    fn empty_headings_and_documents() {
        assert!(extract_headings("<p>No headings here</p>", 6).is_empty());
        assert!(extract_headings("", 6).is_empty());
        assert!(extract_headings("<h1>   </h1>", 6).is_empty());
    }

    #[test]
    fn subheadings_of_an_empty_heading_nest_under_the_previous_one() {
        use crate::pipeline::tree::build_tree;

        let html = "<h1>Guide</h1><h2> </h2><h3>Install</h3><h3>Run</h3>";
        let headings = extract_headings(html, 6);
        assert_eq!(levels(&headings), vec![1, 3, 3]);

        let tree = build_tree(headings);
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].text, "Guide");
        let children: Vec<_> = tree[0].children.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(children, vec!["Install", "Run"]);
    }

    #[test]
    fn non_heading_tags_are_ignored() {
        let html = "<header>Top</header><h7>Nope</h7><h1>Yes</h1>";
        assert_eq!(extract_headings(html, 6), vec![HeadingNode::new(1, "Yes")]);
    }

    #[test]
    fn heading_level_parses_tag_names() {
        assert_eq!(heading_level("h1"), Some(1));
        assert_eq!(heading_level("h6"), Some(6));
        assert_eq!(heading_level("h7"), None);
        assert_eq!(heading_level("hr"), None);
    }

    #[tokio::test]
    async fn missing_source_yields_no_headings() {
        let source = RenderSource::File("/no/such/file.html".into());
        assert!(extract(&source, 6, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn in_memory_source_is_parsed() {
        let source = RenderSource::Html("<h1>A</h1><h2>B</h2>".into());
        let headings = extract(&source, 6, 5).await.unwrap();
        assert_eq!(
            headings,
            vec![HeadingNode::new(1, "A"), HeadingNode::new(2, "B")]
        );
    }
}
