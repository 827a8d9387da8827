//! Render engine boundary.
//!
//! The engine that lays out HTML and prints it to PDF is an external
//! collaborator. This module fixes the small surface the
//! [`crate::worker::RenderWorker`] drives it through:
//!
//! ```text
//! RenderEngine::create_session(env)      (once, on the worker thread)
//!   └─ RenderSession::navigate(source)
//!   └─ RenderSession::content_ready()    (resolves on "content ready")
//!   └─ RenderSession::inject_presentation(css)   (optional)
//!   └─ RenderSession::export_to_file / export_to_stream
//! ```
//!
//! ## Thread affinity
//!
//! A [`RenderEngine`] is a `Send + Sync` factory shared between callers. The
//! [`RenderSession`] it creates is **not** `Send`: it is created, used and
//! dropped on the single worker thread the bridge spawned for it. Session
//! methods are `async` so an engine can deliver its callbacks through the
//! worker's event loop instead of blocking it.
//!
//! Callers never see the engine's native callback API; they only see the
//! future returned by [`crate::bridge::RenderBridge::submit`].

#[cfg(feature = "chromium")]
pub mod chromium;

use crate::config::RenderSettings;
use crate::error::BoxError;
use crate::worker::RenderSource;
use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

/// Error reported by an engine adapter.
///
/// The worker maps it onto the right [`crate::error::RenderError`] variant
/// depending on which step failed.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct EngineError {
    pub message: String,
    #[source]
    pub source: Option<BoxError>,
}

impl EngineError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Factory for thread-bound engine sessions.
#[async_trait(?Send)]
pub trait RenderEngine: Send + Sync + 'static {
    /// Session type; lives on the worker thread only.
    type Session: RenderSession;

    /// Short engine name for logs.
    fn name(&self) -> &'static str;

    /// Create a session bound to the calling (worker) thread.
    ///
    /// `environment` is the directory the engine may use for its profile
    /// and cache. Completes only once the session is ready to navigate.
    async fn create_session(&self, environment: &Path) -> Result<Self::Session, EngineError>;
}

/// One engine session, driven by a single render request.
#[async_trait(?Send)]
pub trait RenderSession {
    /// Start loading `source`. Returns once the engine accepted the
    /// navigation; the content may still be loading.
    async fn navigate(&mut self, source: &RenderSource) -> Result<(), EngineError>;

    /// Resolve when the engine signals the document content is ready.
    ///
    /// An engine that never signals readiness never resolves; the bridge
    /// timeout is the only recovery.
    async fn content_ready(&mut self) -> Result<(), EngineError>;

    /// Add `css` to the loaded document.
    async fn inject_presentation(&mut self, css: &str) -> Result<(), EngineError>;

    /// Print the document to a PDF file at `path`.
    async fn export_to_file(
        &mut self,
        path: &Path,
        settings: &RenderSettings,
    ) -> Result<(), EngineError>;

    /// Print the document to an in-memory PDF.
    async fn export_to_stream(&mut self, settings: &RenderSettings) -> Result<Vec<u8>, EngineError>;
}
