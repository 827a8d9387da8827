//! PDF access for the outline stage: page text in, bookmarks out.
//!
//! [`PdfAssembler`] is the seam between the outline logic and the PDF
//! library. The default [`LopdfAssembler`] uses `lopdf`, which can both
//! extract page text and write new objects into an existing document.
//!
//! ## Outline layout
//!
//! Bookmarks are written as a standard PDF outline:
//!
//! ```text
//! Catalog ──/Outlines──▶ Outlines { First, Last, Count }
//!                           │
//!              item { Title, Parent, Prev, Next, First, Last, Count, Dest }
//! ```
//!
//! `Dest` is `[page /XYZ null null null]`: jump to the page, keep the
//! viewer's zoom. Items with children are written closed (negative
//! `Count`). The catalog also gets `/PageMode /UseOutlines` so viewers open
//! the bookmark pane.

use crate::error::OutlineError;
use crate::pipeline::bookmarks::BookmarkNode;
use crate::pipeline::pages::PageText;
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, StringFormat};
use tracing::{debug, warn};

/// Reads page text from, and writes bookmarks into, a rendered PDF.
pub trait PdfAssembler: Send + Sync + 'static {
    /// Normalised text of every page, in page order, 1-based.
    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<PageText>, OutlineError>;

    /// A copy of `pdf` whose outline is `bookmarks`.
    ///
    /// Any outline already present is replaced.
    fn attach_bookmarks(&self, pdf: &[u8], bookmarks: &[BookmarkNode])
        -> Result<Vec<u8>, OutlineError>;
}

/// [`PdfAssembler`] backed by `lopdf`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LopdfAssembler;

impl LopdfAssembler {
    pub fn new() -> Self {
        Self
    }
}

impl PdfAssembler for LopdfAssembler {
    fn page_texts(&self, pdf: &[u8]) -> Result<Vec<PageText>, OutlineError> {
        let doc = load(pdf)?;
        let pages = doc.get_pages();
        let mut texts = Vec::with_capacity(pages.len());

        for (index, page_number) in pages.keys().enumerate() {
            // A page whose text cannot be decoded still counts; it just
            // matches nothing.
            let raw = doc.extract_text(&[*page_number]).unwrap_or_else(|e| {
                warn!("Text of page {} could not be extracted: {}", page_number, e);
                String::new()
            });
            texts.push(PageText::new(index + 1, &raw));
        }

        debug!("Extracted text from {} pages", texts.len());
        Ok(texts)
    }

    fn attach_bookmarks(
        &self,
        pdf: &[u8],
        bookmarks: &[BookmarkNode],
    ) -> Result<Vec<u8>, OutlineError> {
        let mut doc = load(pdf)?;
        let page_ids: Vec<ObjectId> = doc.get_pages().values().copied().collect();

        let outline_id = write_outline(&mut doc, bookmarks, &page_ids);

        let catalog = catalog_mut(&mut doc)?;
        match outline_id {
            Some(id) => {
                catalog.set("Outlines", Object::Reference(id));
                catalog.set("PageMode", "UseOutlines");
            }
            None => {
                catalog.remove(b"Outlines");
            }
        }

        let mut out = Vec::with_capacity(pdf.len() + 1024);
        doc.save_to(&mut out).map_err(|e| OutlineError::PdfWrite {
            detail: e.to_string(),
        })?;
        debug!(
            "Wrote outline with {} top-level bookmarks ({} bytes)",
            bookmarks.len(),
            out.len()
        );
        Ok(out)
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn load(pdf: &[u8]) -> Result<Document, OutlineError> {
    Document::load_mem(pdf).map_err(|e| OutlineError::PdfParse {
        detail: e.to_string(),
    })
}

fn catalog_mut(doc: &mut Document) -> Result<&mut Dictionary, OutlineError> {
    let parse_error = |e: lopdf::Error| OutlineError::PdfParse {
        detail: format!("document catalog: {e}"),
    };
    let root = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(parse_error)?;
    doc.get_object_mut(root)
        .and_then(Object::as_dict_mut)
        .map_err(parse_error)
}

/// An outline item whose object id is reserved before it is written.
struct OutlineItem {
    id: ObjectId,
    dict: Dictionary,
    children: Vec<OutlineItem>,
}

fn plan(doc: &mut Document, nodes: &[BookmarkNode], page_ids: &[ObjectId]) -> Vec<OutlineItem> {
    nodes
        .iter()
        .filter_map(|node| {
            let Some(page_id) = node
                .page_index
                .checked_sub(1)
                .and_then(|i| page_ids.get(i))
            else {
                warn!(
                    "Bookmark '{}' points at page {} of {}; skipped",
                    node.title,
                    node.page_index,
                    page_ids.len()
                );
                return None;
            };
            let dest = vec![
                Object::Reference(*page_id),
                "XYZ".into(),
                Object::Null,
                Object::Null,
                Object::Null,
            ];
            let dict = dictionary! {
                "Title" => encode_title(&node.title),
                "Dest" => dest,
            };
            Some(OutlineItem {
                id: doc.new_object_id(),
                dict,
                children: plan(doc, &node.children, page_ids),
            })
        })
        .collect()
}

fn write_outline(
    doc: &mut Document,
    bookmarks: &[BookmarkNode],
    page_ids: &[ObjectId],
) -> Option<ObjectId> {
    let items = plan(doc, bookmarks, page_ids);
    let (first, last) = (items.first()?.id, items.last()?.id);

    let root_id = doc.add_object(dictionary! {
        "Type" => "Outlines",
        "First" => Object::Reference(first),
        "Last" => Object::Reference(last),
        "Count" => items.len() as i64,
    });
    write_level(doc, items, root_id);
    Some(root_id)
}

fn write_level(doc: &mut Document, items: Vec<OutlineItem>, parent_id: ObjectId) {
    let ids: Vec<ObjectId> = items.iter().map(|item| item.id).collect();
    for (i, item) in items.into_iter().enumerate() {
        let OutlineItem {
            id,
            mut dict,
            children,
        } = item;
        dict.set("Parent", Object::Reference(parent_id));
        if i > 0 {
            dict.set("Prev", Object::Reference(ids[i - 1]));
        }
        if let Some(next) = ids.get(i + 1) {
            dict.set("Next", Object::Reference(*next));
        }
        if let (Some(first), Some(last)) = (children.first(), children.last()) {
            dict.set("First", Object::Reference(first.id));
            dict.set("Last", Object::Reference(last.id));
            dict.set("Count", -(children.len() as i64));
            write_level(doc, children, id);
        }
        doc.objects.insert(id, Object::Dictionary(dict));
    }
}

/// PDF text string: literal for ASCII, UTF-16BE with byte order mark
/// otherwise.
fn encode_title(title: &str) -> Object {
    if title.is_ascii() {
        return Object::String(title.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in title.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

/// Small PDFs with one line of Helvetica text per page.
#[cfg(test)]
pub(crate) mod sample {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};

    pub(crate) fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let mut kids = Vec::new();
        for text in pages {
            let content = Content {
                operations: vec![
                    Operation::new("BT", vec![]),
                    Operation::new("Tf", vec!["F1".into(), 12.into()]),
                    Operation::new("Td", vec![72.into(), 720.into()]),
                    Operation::new("Tj", vec![Object::string_literal(*text)]),
                    Operation::new("ET", vec![]),
                ],
            };
            let content_id =
                doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out).unwrap();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::bookmarks::map_bookmarks;
    use crate::pipeline::extract::HeadingNode;
    use crate::pipeline::tree::build_tree;

    /// Outline read back as `(title, page number, children)`.
    #[derive(Debug, PartialEq)]
    struct ReadBack(String, usize, Vec<ReadBack>);

    fn read_outline(pdf: &[u8]) -> Vec<ReadBack> {
        let doc = Document::load_mem(pdf).unwrap();
        let page_numbers: std::collections::HashMap<ObjectId, usize> = doc
            .get_pages()
            .values()
            .enumerate()
            .map(|(i, id)| (*id, i + 1))
            .collect();
        let root = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
        let catalog = doc.get_dictionary(root).unwrap();
        let Ok(outlines) = catalog.get(b"Outlines") else {
            return Vec::new();
        };
        let outlines = doc.get_dictionary(outlines.as_reference().unwrap()).unwrap();

        fn walk(
            doc: &Document,
            first: Option<ObjectId>,
            pages: &std::collections::HashMap<ObjectId, usize>,
        ) -> Vec<ReadBack> {
            let mut out = Vec::new();
            let mut cur = first;
            while let Some(id) = cur {
                let item = doc.get_dictionary(id).unwrap();
                let title = match item.get(b"Title").unwrap() {
                    Object::String(bytes, _) if bytes.starts_with(&[0xFE, 0xFF]) => {
                        let units: Vec<u16> = bytes[2..]
                            .chunks(2)
                            .map(|c| u16::from_be_bytes([c[0], c[1]]))
                            .collect();
                        String::from_utf16(&units).unwrap()
                    }
                    Object::String(bytes, _) => String::from_utf8(bytes.clone()).unwrap(),
                    other => panic!("unexpected title {other:?}"),
                };
                let dest = item.get(b"Dest").unwrap().as_array().unwrap();
                let page = pages[&dest[0].as_reference().unwrap()];
                let child = item.get(b"First").ok().map(|o| o.as_reference().unwrap());
                out.push(ReadBack(title, page, walk(doc, child, pages)));
                cur = item.get(b"Next").ok().map(|o| o.as_reference().unwrap());
            }
            out
        }

        let first = outlines
            .get(b"First")
            .ok()
            .map(|o| o.as_reference().unwrap());
        walk(&doc, first, &page_numbers)
    }

    fn bookmark(title: &str, level: u8, page: usize, children: Vec<BookmarkNode>) -> BookmarkNode {
        BookmarkNode {
            title: title.into(),
            level,
            page_index: page,
            children,
        }
    }

    #[test]
    fn page_texts_are_one_based_and_ordered() {
        let pdf = sample::pdf_with_pages(&["Alpha", "Beta", "Gamma"]);
        let pages = LopdfAssembler.page_texts(&pdf).unwrap();
        assert_eq!(
            pages.iter().map(|p| p.page_index).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(pages[0].text.contains("Alpha"));
        assert!(pages[2].text.contains("Gamma"));
        assert!(pages.iter().all(|p| !p.text.contains('\n')));
    }

    #[test]
    fn bookmarks_are_written_and_read_back() {
        let pdf = sample::pdf_with_pages(&["A", "B", "C"]);
        let bookmarks = vec![
            bookmark("A", 1, 1, vec![bookmark("B", 2, 2, vec![])]),
            bookmark("C", 1, 3, vec![]),
        ];
        let out = LopdfAssembler.attach_bookmarks(&pdf, &bookmarks).unwrap();

        assert_eq!(
            read_outline(&out),
            vec![
                ReadBack("A".into(), 1, vec![ReadBack("B".into(), 2, vec![])]),
                ReadBack("C".into(), 3, vec![]),
            ]
        );
    }

    #[test]
    fn catalog_opens_the_outline_pane() {
        let pdf = sample::pdf_with_pages(&["A"]);
        let out = LopdfAssembler
            .attach_bookmarks(&pdf, &[bookmark("A", 1, 1, vec![])])
            .unwrap();
        let doc = Document::load_mem(&out).unwrap();
        let root = doc.trailer.get(b"Root").unwrap().as_reference().unwrap();
        let catalog = doc.get_dictionary(root).unwrap();
        assert_eq!(catalog.get(b"PageMode").unwrap().as_name().unwrap(), b"UseOutlines");
    }

    #[test]
    fn non_ascii_titles_survive() {
        let pdf = sample::pdf_with_pages(&["x"]);
        let out = LopdfAssembler
            .attach_bookmarks(&pdf, &[bookmark("Übersicht ✓", 1, 1, vec![])])
            .unwrap();
        assert_eq!(read_outline(&out)[0].0, "Übersicht ✓");
    }

    #[test]
    fn out_of_range_page_is_skipped() {
        let pdf = sample::pdf_with_pages(&["A"]);
        let out = LopdfAssembler
            .attach_bookmarks(
                &pdf,
                &[bookmark("A", 1, 1, vec![]), bookmark("Ghost", 1, 9, vec![])],
            )
            .unwrap();
        assert_eq!(read_outline(&out), vec![ReadBack("A".into(), 1, vec![])]);
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let err = LopdfAssembler.page_texts(b"not a pdf").unwrap_err();
        assert!(matches!(err, OutlineError::PdfParse { .. }));
    }

    #[test]
    fn headings_to_outline_end_to_end() {
        let pdf = sample::pdf_with_pages(&["Introduction", "Background and Scope", "Results"]);
        let headings = vec![
            HeadingNode::new(1, "Introduction"),
            HeadingNode::new(2, "Background"),
            HeadingNode::new(2, "Not in the PDF"),
            HeadingNode::new(1, "Results"),
        ];
        let tree = build_tree(headings);
        let pages = LopdfAssembler.page_texts(&pdf).unwrap();
        let bookmarks = map_bookmarks(&tree, &pages);
        assert_eq!(bookmarks, map_bookmarks(&tree, &pages));

        let out = LopdfAssembler.attach_bookmarks(&pdf, &bookmarks).unwrap();
        assert_eq!(
            read_outline(&out),
            vec![
                ReadBack(
                    "Introduction".into(),
                    1,
                    vec![ReadBack("Background".into(), 2, vec![])]
                ),
                ReadBack("Results".into(), 3, vec![]),
            ]
        );
        // Page text is unchanged by the rewrite.
        assert_eq!(LopdfAssembler.page_texts(&out).unwrap(), pages);
    }
}
