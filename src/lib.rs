//! # edgequake-html2pdf
//!
//! Convert HTML pages to PDF with a headless browser engine, and turn the
//! document's `h1`..`h6` headings into PDF bookmarks.
//!
//! ## Why this crate?
//!
//! Browser engines print beautiful PDFs, but they are awkward to embed: the
//! engine wants its own thread and event loop, reports progress through
//! callbacks, and can hang forever on a page that never finishes loading.
//! Their PDFs also come without a usable outline. This crate hides the
//! engine behind one awaitable call with a hard timeout, and adds the
//! bookmark outline afterwards.
//!
//! ## Pipeline Overview
//!
//! ```text
//! HTML (URL / file / string)
//!  │
//!  ├─ 1. Bridge   dedicated "render-worker" thread, current-thread runtime
//!  ├─ 2. Worker   session → navigate → content ready → CSS → export
//!  │              (caller waits on a oneshot, bounded by the timeout)
//!  ├─ 3. Extract  h1..h6 from the source, in document order
//!  ├─ 4. Tree     nest headings by level
//!  ├─ 5. Map      first page whose text contains each heading
//!  └─ 6. Outline  write bookmarks into the PDF (lopdf)
//! ```
//!
//! Steps 3–6 only run when [`ConversionConfig::generate_outline`] is set.
//! They are best-effort: a failure there still hands back the rendered PDF
//! inside [`Html2PdfError::OutlineAugmentation`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_html2pdf::{convert_to_file, ConversionConfig, RenderSettings};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConversionConfig::builder()
//!         .settings(RenderSettings::builder().margins(0.5, 0.5, 0.5, 0.5).build())
//!         .generate_outline(true)
//!         .render_timeout_secs(30)
//!         .build()?;
//!     let output = convert_to_file("https://example.com", "example.pdf", &config).await?;
//!     eprintln!(
//!         "{} bytes, {} bookmarks, {}ms",
//!         output.stats.pdf_bytes,
//!         output.outline.bookmark_count(),
//!         output.stats.total_duration_ms
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature    | Default | Description |
//! |------------|---------|-------------|
//! | `chromium` | on      | Headless Chromium engine adapter and the `convert*` free functions |
//! | `cli`      | on      | Enables the `html2pdf` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable both to bring your own [`RenderEngine`]:
//! ```toml
//! edgequake-html2pdf = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod bridge;
pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod outline;
pub mod output;
pub mod pdf;
pub mod pipeline;
pub mod progress;
pub mod stream;
pub mod styles;
pub mod worker;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use bridge::{RenderBridge, RenderOutcome};
pub use config::{
    ConversionConfig, ConversionConfigBuilder, Orientation, PresentationOptions, RenderSettings,
    RenderSettingsBuilder,
};
pub use convert::ConversionService;
#[cfg(feature = "chromium")]
pub use convert::{convert, convert_html, convert_sync, convert_to_file};
#[cfg(feature = "chromium")]
pub use engine::chromium::ChromiumEngine;
pub use engine::{EngineError, RenderEngine, RenderSession};
pub use error::{Html2PdfError, OutlineError, RenderError};
pub use outline::{HeadingOutline, OutlineResult, OutlineStage};
pub use output::{ConversionOutput, ConversionStats, OutlineReport, RenderArtifact};
pub use pdf::{LopdfAssembler, PdfAssembler};
pub use pipeline::bookmarks::BookmarkNode;
pub use progress::{ConversionProgressCallback, NoopProgressCallback, ProgressCallback};
pub use stream::{convert_stream, BatchItem, BatchStream};
pub use worker::{OutputMode, RenderRequest, RenderSource};
