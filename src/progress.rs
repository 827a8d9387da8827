//! Progress-callback trait for conversion stage events.
//!
//! Inject an [`Arc<dyn ConversionProgressCallback>`] via
//! [`crate::config::ConversionConfigBuilder::progress_callback`] to be told
//! when the render starts and finishes and what the outline stage did.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers can
//! forward events to a channel, a log, or a terminal spinner without the
//! library knowing how the host application communicates. The trait is
//! `Send + Sync` because the batch API runs several conversions at once.
//!
//! # Example
//!
//! ```rust
//! use edgequake_html2pdf::{ConversionProgressCallback, ConversionConfig};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct BookmarkCounter {
//!     written: Arc<AtomicUsize>,
//! }
//!
//! impl ConversionProgressCallback for BookmarkCounter {
//!     fn on_outline_complete(&self, headings_found: usize, bookmarks_written: usize) {
//!         self.written.fetch_add(bookmarks_written, Ordering::SeqCst);
//!         eprintln!("{bookmarks_written}/{headings_found} headings matched a page");
//!     }
//! }
//!
//! let counter = Arc::new(BookmarkCounter {
//!     written: Arc::new(AtomicUsize::new(0)),
//! });
//!
//! let config = ConversionConfig::builder()
//!     .progress_callback(counter as Arc<dyn ConversionProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the conversion pipeline at each stage boundary.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Events for one conversion arrive in order:
/// `on_render_start`, `on_render_complete`, then (when requested)
/// `on_outline_start` and `on_outline_complete`, and finally
/// `on_conversion_complete`.
pub trait ConversionProgressCallback: Send + Sync {
    /// Called just before the render request is submitted.
    ///
    /// # Arguments
    /// * `source` — display name of the source (URL, path, or `<html>`)
    fn on_render_start(&self, source: &str) {
        let _ = source;
    }

    /// Called when the render bridge resolves.
    ///
    /// # Arguments
    /// * `success`     — `false` on failure or timeout
    /// * `duration_ms` — time spent waiting on the bridge
    fn on_render_complete(&self, success: bool, duration_ms: u64) {
        let _ = (success, duration_ms);
    }

    /// Called before heading extraction starts.
    fn on_outline_start(&self) {}

    /// Called when the outline stage finishes successfully.
    ///
    /// # Arguments
    /// * `headings_found`    — headings extracted from the source
    /// * `bookmarks_written` — bookmarks (including nested) that matched a page
    fn on_outline_complete(&self, headings_found: usize, bookmarks_written: usize) {
        let _ = (headings_found, bookmarks_written);
    }

    /// Called once at the end of every conversion, successful or not.
    ///
    /// # Arguments
    /// * `success` — whether the call returned `Ok`
    fn on_conversion_complete(&self, success: bool) {
        let _ = success;
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no callback is configured.
pub struct NoopProgressCallback;

impl ConversionProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::ConversionConfig`].
pub type ProgressCallback = Arc<dyn ConversionProgressCallback>;
