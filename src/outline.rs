//! The outline stage: headings of the source become bookmarks of the PDF.
//!
//! ```text
//! source ──▶ extract ──▶ build_tree ──┐
//!                                     ├──▶ map_bookmarks ──▶ attach_bookmarks
//! rendered PDF ──▶ page_texts ────────┘
//! ```
//!
//! The stage is best-effort. When no heading can be matched to a page the
//! PDF is left exactly as rendered and [`OutlineResult::pdf`] is `None`.
//!
//! [`OutlineStage`] is a trait so the conversion service can run a
//! different stage (or a counting one in tests) without touching the
//! render path.

use crate::config::ConversionConfig;
use crate::error::OutlineError;
use crate::pdf::{LopdfAssembler, PdfAssembler};
use crate::pipeline::bookmarks::{count_bookmarks, map_bookmarks, BookmarkNode};
use crate::pipeline::{extract, tree};
use crate::worker::RenderSource;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// What one outline pass found and produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutlineResult {
    /// Headings extracted from the source, after the level filter.
    pub headings_found: usize,
    /// Pages of the PDF scanned for heading text.
    pub pages_scanned: usize,
    /// Bookmarks that matched a page.
    pub bookmarks: Vec<BookmarkNode>,
    /// The PDF rewritten with the outline; `None` when nothing matched.
    pub pdf: Option<Vec<u8>>,
}

/// Turns a rendered PDF plus its source into a PDF with bookmarks.
#[async_trait]
pub trait OutlineStage: Send + Sync {
    async fn augment(
        &self,
        source: &RenderSource,
        pdf: &[u8],
        config: &ConversionConfig,
    ) -> Result<OutlineResult, OutlineError>;
}

/// Default stage: `h1`..`h6` headings matched against page text.
pub struct HeadingOutline<A: PdfAssembler = LopdfAssembler> {
    assembler: Arc<A>,
}

impl Default for HeadingOutline<LopdfAssembler> {
    fn default() -> Self {
        Self::new(LopdfAssembler)
    }
}

impl<A: PdfAssembler> HeadingOutline<A> {
    pub fn new(assembler: A) -> Self {
        Self {
            assembler: Arc::new(assembler),
        }
    }
}

#[async_trait]
impl<A: PdfAssembler> OutlineStage for HeadingOutline<A> {
    async fn augment(
        &self,
        source: &RenderSource,
        pdf: &[u8],
        config: &ConversionConfig,
    ) -> Result<OutlineResult, OutlineError> {
        // ── Step 1: Headings ─────────────────────────────────────────────
        let headings = extract::extract(
            source,
            config.max_outline_level,
            config.download_timeout_secs,
        )
        .await?;
        let headings_found = headings.len();
        if headings.is_empty() {
            info!("No headings in {}; outline skipped", source);
            return Ok(OutlineResult::default());
        }
        let outline = tree::build_tree(headings);

        // ── Step 2: Page text, mapping, rewrite (CPU-bound) ──────────────
        let assembler = Arc::clone(&self.assembler);
        let pdf = pdf.to_vec();
        let result = tokio::task::spawn_blocking(move || -> Result<OutlineResult, OutlineError> {
            let pages = assembler.page_texts(&pdf)?;
            let pages_scanned = pages.len();
            let bookmarks = map_bookmarks(&outline, &pages);
            debug!(
                "{} of {} headings matched a page",
                count_bookmarks(&bookmarks),
                headings_found
            );

            let rewritten = if bookmarks.is_empty() {
                None
            } else {
                Some(assembler.attach_bookmarks(&pdf, &bookmarks)?)
            };
            Ok(OutlineResult {
                headings_found,
                pages_scanned,
                bookmarks,
                pdf: rewritten,
            })
        })
        .await
        .map_err(|e| OutlineError::Task(format!("outline assembly: {e}")))??;

        info!(
            "Outline: {} headings, {} bookmarks over {} pages",
            result.headings_found,
            count_bookmarks(&result.bookmarks),
            result.pages_scanned
        );
        Ok(result)
    }
}
