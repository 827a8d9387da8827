//! Outline tree: nest a flat heading list by level.
//!
//! The builder makes one left-to-right pass, tracking the last heading it
//! placed:
//!
//! | New heading | Placement |
//! |-------------|-----------|
//! | first heading, or level 1 | top level |
//! | same level as last | next to last (same parent) |
//! | deeper than last | child of last |
//! | shallower than last | start at last's parent, climb while the new level is shallower than the current node, then attach under the parent of the node reached |
//!
//! The climb stops on the first ancestor whose level number is at most the
//! new heading's, and the heading becomes that ancestor's sibling. A climb
//! that runs past the top-level nodes attaches at the top level.
//!
//! Gapped (`h1` → `h3`) and non-monotonic sequences are accepted as they
//! come; nothing is rejected.
//!
//! Parent links exist only inside the builder, as indices into an arena.
//! The returned [`OutlineNode`] tree owns its children and has no
//! back-pointers.

use crate::pipeline::extract::HeadingNode;
use serde::{Deserialize, Serialize};

/// A heading with its nested subheadings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineNode {
    pub level: u8,
    pub text: String,
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    /// Number of nodes in this subtree, including `self`.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(OutlineNode::len).sum::<usize>()
    }

    /// Deepest chain of nested nodes, counting `self` as 1.
    pub fn depth(&self) -> usize {
        1 + self.children.iter().map(OutlineNode::depth).max().unwrap_or(0)
    }
}

struct Slot {
    heading: HeadingNode,
    parent: Option<usize>,
    children: Vec<usize>,
}

/// Arena of placed headings. `None` as a parent means the synthetic root.
struct Arena {
    slots: Vec<Slot>,
    roots: Vec<usize>,
}

impl Arena {
    fn attach(&mut self, heading: HeadingNode, parent: Option<usize>) -> usize {
        let id = self.slots.len();
        self.slots.push(Slot {
            heading,
            parent,
            children: Vec::new(),
        });
        match parent {
            Some(p) => self.slots[p].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    fn level(&self, id: usize) -> u8 {
        self.slots[id].heading.level
    }

    fn parent(&self, id: usize) -> Option<usize> {
        self.slots[id].parent
    }

    /// Parent for a `level` heading that is shallower than the last one.
    /// `cur` starts at the last heading's parent.
    fn climb(&self, mut cur: usize, level: u8) -> Option<usize> {
        while level < self.level(cur) {
            cur = self.parent(cur)?;
        }
        self.parent(cur)
    }

    fn into_tree(mut self) -> Vec<OutlineNode> {
        let roots = std::mem::take(&mut self.roots);
        roots.into_iter().map(|id| self.take(id)).collect()
    }

    fn take(&mut self, id: usize) -> OutlineNode {
        let children = std::mem::take(&mut self.slots[id].children);
        let heading = std::mem::replace(&mut self.slots[id].heading, HeadingNode::new(0, ""));
        OutlineNode {
            level: heading.level,
            text: heading.text,
            children: children.into_iter().map(|c| self.take(c)).collect(),
        }
    }
}

/// Nest `headings` (document order) into a forest of top-level nodes.
pub fn build_tree(headings: Vec<HeadingNode>) -> Vec<OutlineNode> {
    let mut arena = Arena {
        slots: Vec::with_capacity(headings.len()),
        roots: Vec::new(),
    };
    let mut last: Option<usize> = None;

    for heading in headings {
        let level = heading.level;
        let parent = match last {
            None => None,
            Some(_) if level <= 1 => None,
            Some(prev) if level == arena.level(prev) => arena.parent(prev),
            Some(prev) if level > arena.level(prev) => Some(prev),
            Some(prev) => arena
                .parent(prev)
                .and_then(|start| arena.climb(start, level)),
        };
        last = Some(arena.attach(heading, parent));
    }

    arena.into_tree()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headings(levels: &[u8]) -> Vec<HeadingNode> {
        levels
            .iter()
            .enumerate()
            .map(|(i, &l)| HeadingNode::new(l, format!("h{l}-{i}")))
            .collect()
    }

    /// Compact shape: `level(children...)`.
    fn shape(nodes: &[OutlineNode]) -> String {
        nodes
            .iter()
            .map(|n| {
                if n.children.is_empty() {
                    n.level.to_string()
                } else {
                    format!("{}({})", n.level, shape(&n.children))
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn empty_input_gives_empty_tree() {
        assert!(build_tree(Vec::new()).is_empty());
    }

    #[test]
    fn monotonic_levels_form_a_chain() {
        let tree = build_tree(headings(&[1, 2, 3, 4, 5, 6]));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree[0].depth(), 6);
        assert_eq!(shape(&tree), "1(2(3(4(5(6)))))");
    }

    #[test]
    fn siblings_and_new_top_levels() {
        let tree = build_tree(headings(&[1, 2, 2, 1, 3]));
        assert_eq!(shape(&tree), "1(2 2) 1(3)");
    }

    #[test]
    fn shallower_heading_after_gap_becomes_sibling_of_stopping_node() {
        // h2 after h1 > h3: the climb stops on the h1, so the h2 lands next to it.
        let tree = build_tree(headings(&[1, 3, 2]));
        assert_eq!(shape(&tree), "1(3) 2");

        let tree = build_tree(headings(&[1, 2, 4, 3]));
        assert_eq!(shape(&tree), "1(2(4) 3)");
    }

    #[test]
    fn climb_stops_at_shallower_parent() {
        let tree = build_tree(headings(&[1, 2, 3, 4, 2, 3]));
        assert_eq!(shape(&tree), "1(2(3(4)) 2(3))");
    }

    #[test]
    fn climb_past_every_parent_lands_on_top_level() {
        let tree = build_tree(headings(&[2, 3, 4, 2]));
        assert_eq!(shape(&tree), "2(3(4)) 2");

        let tree = build_tree(headings(&[3, 4, 2]));
        assert_eq!(shape(&tree), "3(4) 2");
    }

    #[test]
    fn first_heading_attaches_at_top_level_whatever_its_level() {
        let tree = build_tree(headings(&[3, 3, 1]));
        assert_eq!(shape(&tree), "3 3 1");
    }

    #[test]
    fn every_input_heading_appears_once_in_order() {
        let input = headings(&[2, 1, 4, 3, 3, 1, 6, 2]);
        let tree = build_tree(input.clone());

        fn walk(nodes: &[OutlineNode], out: &mut Vec<String>) {
            for n in nodes {
                out.push(n.text.clone());
                walk(&n.children, out);
            }
        }
        let mut seen = Vec::new();
        walk(&tree, &mut seen);
        let expected: Vec<String> = input.into_iter().map(|h| h.text).collect();
        assert_eq!(seen, expected);
        assert_eq!(tree.iter().map(OutlineNode::len).sum::<usize>(), 8);
    }

    #[test]
    fn top_level_siblings_keep_collecting_after_a_gap() {
        let tree = build_tree(headings(&[1, 3, 2, 2, 4, 1]));
        assert_eq!(shape(&tree), "1(3) 2 2(4) 1");
    }
}
