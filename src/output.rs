//! Result types returned by the conversion functions.

use crate::pipeline::bookmarks::{count_bookmarks, BookmarkNode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The PDF a render produced.
///
/// Which variant you get follows the requested
/// [`crate::worker::OutputMode`]: `File` when the engine wrote straight to
/// disk, `Bytes` when the PDF was exported in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderArtifact {
    /// PDF written to this path.
    File(PathBuf),
    /// PDF held in memory.
    Bytes(Vec<u8>),
}

impl RenderArtifact {
    /// The output path, in file mode.
    pub fn path(&self) -> Option<&Path> {
        match self {
            RenderArtifact::File(p) => Some(p),
            RenderArtifact::Bytes(_) => None,
        }
    }

    /// The PDF bytes, in stream mode.
    pub fn bytes(&self) -> Option<&[u8]> {
        match self {
            RenderArtifact::Bytes(b) => Some(b),
            RenderArtifact::File(_) => None,
        }
    }

    /// Consume the artifact and return its bytes, in stream mode.
    pub fn into_bytes(self) -> Option<Vec<u8>> {
        match self {
            RenderArtifact::Bytes(b) => Some(b),
            RenderArtifact::File(_) => None,
        }
    }
}

/// What the outline stage did for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutlineReport {
    /// `false` when outline generation was not requested.
    pub requested: bool,
    /// Headings found in the source (after the level filter).
    pub headings_found: usize,
    /// Pages of the rendered PDF that were scanned for heading text.
    pub pages_scanned: usize,
    /// Top-level bookmarks written. Nested ones live in `bookmarks`.
    pub bookmarks: Vec<BookmarkNode>,
    /// `true` when the PDF was rewritten with an outline.
    pub applied: bool,
}

impl OutlineReport {
    /// Total bookmarks written, counting nested entries.
    pub fn bookmark_count(&self) -> usize {
        count_bookmarks(&self.bookmarks)
    }
}

/// Timing for one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionStats {
    /// Wall-clock time of the whole call.
    pub total_duration_ms: u64,
    /// Time spent waiting on the render bridge.
    pub render_duration_ms: u64,
    /// Time spent in the outline stage (0 when not requested).
    pub outline_duration_ms: u64,
    /// Size of the final PDF in bytes.
    pub pdf_bytes: u64,
}

/// Successful conversion output.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    /// The final PDF (with outline when one was applied).
    pub artifact: RenderArtifact,
    /// Outline stage summary.
    pub outline: OutlineReport,
    /// Timing and size.
    pub stats: ConversionStats,
}
