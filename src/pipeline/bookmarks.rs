//! Page mapping: attach each outline node to the page it appears on.
//!
//! A node maps to the **first** page whose normalised text contains the
//! node's trimmed text as an exact, case-sensitive substring. A node that
//! matches no page is dropped together with its whole subtree, so a
//! bookmark never points at a guessed page.
//!
//! Mapping is a pure function of its inputs: running it twice over the same
//! tree and pages gives the same bookmarks.

use crate::pipeline::pages::PageText;
use crate::pipeline::tree::OutlineNode;
use serde::{Deserialize, Serialize};

/// A matched outline entry, ready to be written into the PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkNode {
    pub title: String,
    pub level: u8,
    /// 1-based page the heading was found on.
    pub page_index: usize,
    pub children: Vec<BookmarkNode>,
}

/// Map `tree` onto `pages`, depth-first, keeping order.
pub fn map_bookmarks(tree: &[OutlineNode], pages: &[PageText]) -> Vec<BookmarkNode> {
    tree.iter().filter_map(|node| map_node(node, pages)).collect()
}

fn map_node(node: &OutlineNode, pages: &[PageText]) -> Option<BookmarkNode> {
    let title = node.text.trim();
    if title.is_empty() {
        return None;
    }
    let page = pages.iter().find(|p| p.text.contains(title))?;
    Some(BookmarkNode {
        title: title.to_string(),
        level: node.level,
        page_index: page.page_index,
        children: map_bookmarks(&node.children, pages),
    })
}

/// Total number of bookmarks, nested ones included.
pub fn count_bookmarks(bookmarks: &[BookmarkNode]) -> usize {
    bookmarks
        .iter()
        .map(|b| 1 + count_bookmarks(&b.children))
        .sum()
}
