//! Error types for the edgequake-html2pdf library.
//!
//! Three error types reflect three distinct failure surfaces:
//!
//! * [`RenderError`] — the render step failed. One variant per stage of the
//!   worker lifecycle (initialization, navigation, export), plus the
//!   bridge-level [`RenderError::Timeout`] and a catch-all for faults inside
//!   the worker itself. This is the `Err` side of a
//!   [`crate::bridge::RenderOutcome`].
//!
//! * [`OutlineError`] — the best-effort outline augmentation failed *after*
//!   a successful render: the source could not be re-read, or the PDF could
//!   not be parsed or rewritten.
//!
//! * [`Html2PdfError`] — what the top-level `convert*` functions return.
//!   It wraps the two above and keeps them apart: an outline failure carries
//!   the untouched base artifact so the rendered PDF is never lost.
//!
//! Every failure travels back to the caller as a value. Nothing panics
//! across the worker thread boundary and nothing is retried.

use crate::output::RenderArtifact;
use std::error::Error as StdError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Boxed error cause carried by render failures.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Failure of a single render request.
///
/// `Display` is the human-readable message; [`std::error::Error::source`]
/// exposes the originating cause when the engine or OS provided one.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The worker thread, its event loop, or the engine session could not
    /// be created.
    #[error("Render engine initialization failed: {message}")]
    Initialization {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The source could not be loaded by the engine.
    #[error("Navigation to '{source_name}' failed: {message}")]
    Navigation {
        source_name: String,
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The engine reported no output, empty output, or the output target
    /// could not be prepared.
    #[error("PDF export failed: {message}")]
    Export {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The bridge gave up waiting. The worker thread is abandoned, not
    /// killed; its late result is discarded.
    #[error("timed out")]
    Timeout { after: Duration },

    /// Any other fault while orchestrating the render, including a panic
    /// inside the worker.
    #[error("Internal render error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl RenderError {
    pub(crate) fn initialization(message: impl Into<String>, source: Option<BoxError>) -> Self {
        RenderError::Initialization {
            message: message.into(),
            source,
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        RenderError::Internal {
            message: message.into(),
            source: None,
        }
    }

    /// `true` when the bridge timed out rather than the worker failing.
    pub fn is_timeout(&self) -> bool {
        matches!(self, RenderError::Timeout { .. })
    }

    /// Short machine-friendly name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            RenderError::Initialization { .. } => "initialization",
            RenderError::Navigation { .. } => "navigation",
            RenderError::Export { .. } => "export",
            RenderError::Timeout { .. } => "timeout",
            RenderError::Internal { .. } => "internal",
        }
    }
}

/// Failure of the outline augmentation step.
#[derive(Debug, Error)]
pub enum OutlineError {
    /// Remote source could not be fetched for heading extraction.
    #[error("Failed to fetch '{url}' for outline extraction: {reason}")]
    SourceFetch { url: String, reason: String },

    /// Local source exists but could not be read.
    #[error("Failed to read '{path}' for outline extraction: {source}")]
    SourceRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The rendered PDF could not be opened or its pages enumerated.
    #[error("Rendered PDF could not be parsed: {detail}")]
    PdfParse { detail: String },

    /// The PDF with bookmarks could not be serialised.
    #[error("Failed to write outline into PDF: {detail}")]
    PdfWrite { detail: String },

    /// A blocking outline task panicked or was cancelled.
    #[error("Outline task failed: {0}")]
    Task(String),
}

/// All errors returned by the top-level conversion functions.
#[derive(Debug, Error)]
pub enum Html2PdfError {
    // ── Render errors ─────────────────────────────────────────────────────
    /// The render step failed; no artifact exists.
    #[error(transparent)]
    Render(#[from] RenderError),

    // ── Outline errors ────────────────────────────────────────────────────
    /// Rendering succeeded but outline augmentation failed.
    ///
    /// `artifact` is the base PDF exactly as the render produced it. In file
    /// mode it is already on disk and has not been touched.
    #[error("PDF was rendered but adding the outline failed: {source}")]
    OutlineAugmentation {
        artifact: RenderArtifact,
        #[source]
        source: OutlineError,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output PDF file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Html2PdfError {
    /// The rendered artifact, when the render itself succeeded.
    ///
    /// Only [`Html2PdfError::OutlineAugmentation`] has one.
    pub fn artifact(&self) -> Option<&RenderArtifact> {
        match self {
            Html2PdfError::OutlineAugmentation { artifact, .. } => Some(artifact),
            _ => None,
        }
    }

    /// `true` when the failure happened in the render step.
    pub fn is_render_failure(&self) -> bool {
        matches!(self, Html2PdfError::Render(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_message_is_exact() {
        let e = RenderError::Timeout {
            after: Duration::from_millis(250),
        };
        assert_eq!(e.to_string(), "timed out");
        assert!(e.is_timeout());
        assert_eq!(e.kind(), "timeout");
    }

    #[test]
    fn navigation_display_names_source() {
        let e = RenderError::Navigation {
            source_name: "https://example.com".into(),
            message: "net::ERR_NAME_NOT_RESOLVED".into(),
            source: None,
        };
        let msg = e.to_string();
        assert!(msg.contains("https://example.com"), "got: {msg}");
        assert!(msg.contains("ERR_NAME_NOT_RESOLVED"), "got: {msg}");
    }

    #[test]
    fn render_error_keeps_cause() {
        let cause = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "locked");
        let e = RenderError::Export {
            message: "output file could not be removed".into(),
            source: Some(Box::new(cause)),
        };
        let source = StdError::source(&e).expect("cause should be attached");
        assert!(source.to_string().contains("locked"));
    }

    #[test]
    fn outline_failure_keeps_artifact() {
        let e = Html2PdfError::OutlineAugmentation {
            artifact: RenderArtifact::Bytes(b"%PDF-1.7".to_vec()),
            source: OutlineError::PdfParse {
                detail: "bad xref".into(),
            },
        };
        assert!(!e.is_render_failure());
        assert!(matches!(e.artifact(), Some(RenderArtifact::Bytes(b)) if b.starts_with(b"%PDF")));
        assert!(e.to_string().contains("bad xref"));
    }

    #[test]
    fn render_failure_is_transparent() {
        let e: Html2PdfError = RenderError::internal("worker panicked").into();
        assert!(e.is_render_failure());
        assert!(e.artifact().is_none());
        assert_eq!(e.to_string(), "Internal render error: worker panicked");
    }
}
