//! The render worker: one request, one engine session, one outcome.
//!
//! A [`RenderWorker`] runs entirely inside the dedicated thread the
//! [`crate::bridge::RenderBridge`] created for it. It walks the engine
//! through a fixed sequence and turns the first failure into the matching
//! [`RenderError`] variant:
//!
//! | Step | Failure |
//! |------|---------|
//! | create session | `Initialization` |
//! | navigate / wait for content ready | `Navigation` |
//! | inject presentation CSS | `Internal` |
//! | prepare output, export, check output | `Export` |
//!
//! The worker has no timer of its own. If the engine never reports the
//! content as ready, `run` never returns and only the bridge timeout ends
//! the wait.

use crate::config::{PresentationOptions, RenderSettings};
use crate::engine::{EngineError, RenderEngine, RenderSession};
use crate::error::RenderError;
use crate::output::RenderArtifact;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Where the HTML comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderSource {
    /// `http://`, `https://` or `file://` URL (any URL the engine can load).
    Url(String),
    /// Local HTML file.
    File(PathBuf),
    /// In-memory HTML document. Rust strings are UTF-8; the engine is told
    /// so explicitly.
    Html(String),
}

impl RenderSource {
    /// Classify a user-supplied string as URL or file path.
    ///
    /// `file://` URLs stay URLs; they are not treated as relative paths.
    pub fn parse(input: &str) -> Self {
        if crate::pipeline::input::is_url(input) || input.starts_with("file://") {
            RenderSource::Url(input.to_string())
        } else {
            RenderSource::File(PathBuf::from(input))
        }
    }

    /// Short name for logs and error messages.
    pub fn display_name(&self) -> String {
        match self {
            RenderSource::Url(u) => u.clone(),
            RenderSource::File(p) => p.display().to_string(),
            RenderSource::Html(_) => "<html>".to_string(),
        }
    }
}

impl fmt::Display for RenderSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// Where the PDF goes.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// Engine writes the PDF to this path.
    File(PathBuf),
    /// PDF is returned in memory. (default)
    #[default]
    Stream,
}

/// Everything one render needs. Immutable once submitted.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub source: RenderSource,
    pub settings: RenderSettings,
    pub presentation: PresentationOptions,
    pub output: OutputMode,
    /// Engine profile/cache directory.
    pub environment_path: PathBuf,
    /// Pause between content ready and export.
    pub content_delay: Duration,
}

impl RenderRequest {
    /// A stream-mode request with default settings.
    pub fn new(source: RenderSource) -> Self {
        Self {
            source,
            settings: RenderSettings::default(),
            presentation: PresentationOptions::default(),
            output: OutputMode::Stream,
            environment_path: crate::config::default_environment_path(),
            content_delay: Duration::ZERO,
        }
    }

    pub fn with_settings(mut self, settings: RenderSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_presentation(mut self, presentation: PresentationOptions) -> Self {
        self.presentation = presentation;
        self
    }

    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    pub fn with_environment_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.environment_path = path.into();
        self
    }

    pub fn with_content_delay(mut self, delay: Duration) -> Self {
        self.content_delay = delay;
        self
    }
}

/// Drives one engine session through one request.
///
/// Single use: [`RenderWorker::run`] consumes the worker.
pub struct RenderWorker<'e, E: RenderEngine> {
    engine: &'e E,
    request: RenderRequest,
}

impl<'e, E: RenderEngine> RenderWorker<'e, E> {
    pub fn new(engine: &'e E, request: RenderRequest) -> Self {
        Self { engine, request }
    }

    /// Run the request to completion on the current (worker) thread.
    pub async fn run(self) -> Result<RenderArtifact, RenderError> {
        let RenderWorker { engine, request } = self;
        let source_name = request.source.display_name();

        // ── Step 1: Session ──────────────────────────────────────────────
        let mut session = engine
            .create_session(&request.environment_path)
            .await
            .map_err(|e| RenderError::Initialization {
                message: format!("{} session could not be created: {}", engine.name(), e.message),
                source: e.source,
            })?;
        debug!("{} session ready", engine.name());

        // ── Step 2–3: Navigate, wait for content ready ───────────────────
        let navigation_error = |e: EngineError| RenderError::Navigation {
            source_name: source_name.clone(),
            message: e.message,
            source: e.source,
        };
        session
            .navigate(&request.source)
            .await
            .map_err(navigation_error)?;
        session
            .content_ready()
            .await
            .map_err(navigation_error)?;
        debug!("Content ready: {}", source_name);

        if !request.content_delay.is_zero() {
            debug!("Delaying export by {:?}", request.content_delay);
            tokio::time::sleep(request.content_delay).await;
        }

        // ── Step 4: Presentation, export ─────────────────────────────────
        if let Some(css) = request.presentation.stylesheet() {
            session
                .inject_presentation(&css)
                .await
                .map_err(|e| RenderError::Internal {
                    message: format!("presentation CSS could not be injected: {}", e.message),
                    source: e.source,
                })?;
        }

        let artifact = match &request.output {
            OutputMode::File(path) => {
                export_file(&mut session, path, &request.settings).await?;
                RenderArtifact::File(path.clone())
            }
            OutputMode::Stream => {
                RenderArtifact::Bytes(export_stream(&mut session, &request.settings).await?)
            }
        };

        info!("Rendered {}", source_name);
        Ok(artifact)
    }
}

async fn export_file<S: RenderSession>(
    session: &mut S,
    path: &Path,
    settings: &RenderSettings,
) -> Result<(), RenderError> {
    // A stale file would make a failed export look like a success.
    match std::fs::remove_file(path) {
        Ok(()) => debug!("Removed existing output {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(RenderError::Export {
                message: format!("existing output '{}' could not be removed", path.display()),
                source: Some(Box::new(e)),
            })
        }
    }

    session
        .export_to_file(path, settings)
        .await
        .map_err(|e| RenderError::Export {
            message: e.message,
            source: e.source,
        })?;

    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => {
            debug!("Exported {} bytes to {}", meta.len(), path.display());
            Ok(())
        }
        Ok(_) => Err(RenderError::Export {
            message: format!("engine wrote an empty file to '{}'", path.display()),
            source: None,
        }),
        Err(e) => Err(RenderError::Export {
            message: format!("engine reported success but '{}' does not exist", path.display()),
            source: Some(Box::new(e)),
        }),
    }
}

async fn export_stream<S: RenderSession>(
    session: &mut S,
    settings: &RenderSettings,
) -> Result<Vec<u8>, RenderError> {
    let bytes = session
        .export_to_stream(settings)
        .await
        .map_err(|e| RenderError::Export {
            message: e.message,
            source: e.source,
        })?;

    if bytes.is_empty() {
        return Err(RenderError::Export {
            message: "engine produced no output".into(),
            source: None,
        });
    }
    debug!("Exported {} bytes", bytes.len());
    Ok(bytes)
}
