//! Eager conversion entry points.
//!
//! ## Why a service?
//!
//! [`ConversionService`] ties the two halves of a conversion together: the
//! render bridge (engine on its own thread, bounded by a timeout) and the
//! best-effort outline stage. It holds no per-call state, so one service can
//! run any number of conversions at once; each call builds its own request,
//! bridge deadline and outline pass.
//!
//! The free functions [`convert`], [`convert_to_file`] and
//! [`convert_sync`] use a service backed by headless Chromium with default
//! launch options. Build a [`ConversionService`] yourself to pick another
//! engine, launch Chromium differently, or replace the outline stage.
//!
//! ## Failure semantics
//!
//! * Render failure → [`Html2PdfError::Render`]. There is no PDF.
//! * Outline failure → [`Html2PdfError::OutlineAugmentation`], carrying the
//!   PDF exactly as rendered. In file mode it is on disk, untouched.

use crate::bridge::RenderBridge;
use crate::config::ConversionConfig;
use crate::engine::RenderEngine;
use crate::error::{Html2PdfError, OutlineError};
use crate::outline::{HeadingOutline, OutlineStage};
use crate::output::{ConversionOutput, ConversionStats, OutlineReport, RenderArtifact};
use crate::worker::{OutputMode, RenderRequest, RenderSource};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[cfg(feature = "chromium")]
use crate::engine::chromium::ChromiumEngine;

/// Renders HTML to PDF through a [`RenderEngine`] and optionally adds a
/// heading outline.
pub struct ConversionService<E: RenderEngine> {
    engine: Arc<E>,
    outline: Arc<dyn OutlineStage>,
}

impl<E: RenderEngine> Clone for ConversionService<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            outline: Arc::clone(&self.outline),
        }
    }
}

impl<E: RenderEngine> ConversionService<E> {
    /// A service using `engine` and the default [`HeadingOutline`] stage.
    pub fn new(engine: E) -> Self {
        Self {
            engine: Arc::new(engine),
            outline: Arc::new(HeadingOutline::default()),
        }
    }

    /// Replace the outline stage.
    pub fn with_outline_stage(mut self, stage: Arc<dyn OutlineStage>) -> Self {
        self.outline = stage;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Render `source` in memory. The artifact is [`RenderArtifact::Bytes`].
    pub async fn convert(
        &self,
        source: RenderSource,
        config: &ConversionConfig,
    ) -> Result<ConversionOutput, Html2PdfError> {
        self.run(source, OutputMode::Stream, config).await
    }

    /// Render `source` straight to `output_path`. The artifact is
    /// [`RenderArtifact::File`].
    ///
    /// Missing parent directories are created. An existing file at
    /// `output_path` is replaced.
    pub async fn convert_to_file(
        &self,
        source: RenderSource,
        output_path: impl AsRef<Path>,
        config: &ConversionConfig,
    ) -> Result<ConversionOutput, Html2PdfError> {
        let path = output_path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Html2PdfError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        }
        self.run(source, OutputMode::File(path.to_path_buf()), config)
            .await
    }

    async fn run(
        &self,
        source: RenderSource,
        output: OutputMode,
        config: &ConversionConfig,
    ) -> Result<ConversionOutput, Html2PdfError> {
        let result = self.run_inner(source, output, config).await;
        if let Some(ref cb) = config.progress_callback {
            cb.on_conversion_complete(result.is_ok());
        }
        result
    }

    async fn run_inner(
        &self,
        source: RenderSource,
        output: OutputMode,
        config: &ConversionConfig,
    ) -> Result<ConversionOutput, Html2PdfError> {
        let total_start = Instant::now();
        let source_name = source.display_name();
        info!("Starting conversion: {}", source_name);

        // ── Step 1: Render ───────────────────────────────────────────────
        let request = RenderRequest {
            source: source.clone(),
            settings: config.settings.clone(),
            presentation: config.presentation.clone(),
            output,
            environment_path: config.environment_path.clone(),
            content_delay: Duration::from_millis(config.content_delay_ms),
        };
        let bridge = RenderBridge::from_shared(
            Arc::clone(&self.engine),
            Duration::from_secs(config.render_timeout_secs),
        );

        if let Some(ref cb) = config.progress_callback {
            cb.on_render_start(&source_name);
        }
        let render_start = Instant::now();
        let outcome = bridge.submit(request).await;
        let render_duration_ms = render_start.elapsed().as_millis() as u64;
        if let Some(ref cb) = config.progress_callback {
            cb.on_render_complete(outcome.is_ok(), render_duration_ms);
        }
        let artifact = outcome?;
        info!("Rendered {} in {}ms", source_name, render_duration_ms);

        let mut stats = ConversionStats {
            render_duration_ms,
            ..Default::default()
        };

        // ── Step 2: Outline (optional, best-effort) ──────────────────────
        if !config.generate_outline {
            stats.pdf_bytes = artifact_len(&artifact).await;
            stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
            return Ok(ConversionOutput {
                artifact,
                outline: OutlineReport::default(),
                stats,
            });
        }

        if let Some(ref cb) = config.progress_callback {
            cb.on_outline_start();
        }
        let outline_start = Instant::now();
        let (artifact, outline) = self.apply_outline(&source, artifact, config).await?;
        stats.outline_duration_ms = outline_start.elapsed().as_millis() as u64;
        if let Some(ref cb) = config.progress_callback {
            cb.on_outline_complete(outline.headings_found, outline.bookmark_count());
        }

        stats.pdf_bytes = artifact_len(&artifact).await;
        stats.total_duration_ms = total_start.elapsed().as_millis() as u64;
        info!(
            "Conversion complete: {} ({} bytes, {} bookmarks, {}ms total)",
            source_name,
            stats.pdf_bytes,
            outline.bookmark_count(),
            stats.total_duration_ms
        );

        Ok(ConversionOutput {
            artifact,
            outline,
            stats,
        })
    }

    /// Run the outline stage over `artifact`.
    ///
    /// On any error the artifact is handed back untouched inside
    /// [`Html2PdfError::OutlineAugmentation`].
    async fn apply_outline(
        &self,
        source: &RenderSource,
        artifact: RenderArtifact,
        config: &ConversionConfig,
    ) -> Result<(RenderArtifact, OutlineReport), Html2PdfError> {
        let base = match &artifact {
            RenderArtifact::Bytes(bytes) => bytes.clone(),
            RenderArtifact::File(path) => match tokio::fs::read(path).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    return Err(outline_failure(
                        artifact.clone(),
                        OutlineError::PdfParse {
                            detail: format!("rendered file '{}' could not be read: {e}", path.display()),
                        },
                    ))
                }
            },
        };

        let result = match self.outline.augment(source, &base, config).await {
            Ok(result) => result,
            Err(e) => return Err(outline_failure(artifact, e)),
        };

        let mut report = OutlineReport {
            requested: true,
            headings_found: result.headings_found,
            pages_scanned: result.pages_scanned,
            bookmarks: result.bookmarks,
            applied: false,
        };

        let Some(rewritten) = result.pdf else {
            debug!("No bookmarks matched; PDF left as rendered");
            return Ok((artifact, report));
        };

        let artifact = match artifact {
            RenderArtifact::Bytes(_) => RenderArtifact::Bytes(rewritten),
            RenderArtifact::File(path) => {
                if let Err(e) = write_atomic(&path, &rewritten).await {
                    return Err(outline_failure(
                        RenderArtifact::File(path),
                        OutlineError::PdfWrite {
                            detail: e.to_string(),
                        },
                    ));
                }
                RenderArtifact::File(path)
            }
        };
        report.applied = true;
        Ok((artifact, report))
    }
}

fn outline_failure(artifact: RenderArtifact, source: OutlineError) -> Html2PdfError {
    warn!("Outline could not be added: {}", source);
    Html2PdfError::OutlineAugmentation { artifact, source }
}

async fn artifact_len(artifact: &RenderArtifact) -> u64 {
    match artifact {
        RenderArtifact::Bytes(bytes) => bytes.len() as u64,
        RenderArtifact::File(path) => tokio::fs::metadata(path)
            .await
            .map(|m| m.len())
            .unwrap_or(0),
    }
}

/// Replace `path` with `bytes` via a sibling temp file and a rename, so a
/// failed write never leaves a truncated PDF behind.
async fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let tmp_path = temp_sibling(path);
    if let Err(e) = tokio::fs::write(&tmp_path, bytes).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(e);
    }
    tokio::fs::rename(&tmp_path, path).await
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

// ── Chromium-backed free functions ───────────────────────────────────────

/// Convert an HTML file or URL to an in-memory PDF.
///
/// `input` is a local path or an `http(s)://` URL.
///
/// # Example
/// ```rust,no_run
/// use edgequake_html2pdf::{convert, ConversionConfig};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = ConversionConfig::builder().generate_outline(true).build()?;
/// let output = convert("report.html", &config).await?;
/// let pdf = output.artifact.bytes().unwrap_or_default();
/// std::fs::write("report.pdf", pdf)?;
/// eprintln!("{} bookmarks", output.outline.bookmark_count());
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "chromium")]
pub async fn convert(
    input: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Html2PdfError> {
    ConversionService::new(ChromiumEngine::default())
        .convert(RenderSource::parse(input.as_ref()), config)
        .await
}

/// Convert an in-memory HTML document to an in-memory PDF.
///
/// Relative links in the document do not resolve; inline or absolute-URL
/// assets only.
#[cfg(feature = "chromium")]
pub async fn convert_html(
    html: impl Into<String>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Html2PdfError> {
    ConversionService::new(ChromiumEngine::default())
        .convert(RenderSource::Html(html.into()), config)
        .await
}

/// Convert an HTML file or URL and write the PDF to `output_path`.
#[cfg(feature = "chromium")]
pub async fn convert_to_file(
    input: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Html2PdfError> {
    ConversionService::new(ChromiumEngine::default())
        .convert_to_file(RenderSource::parse(input.as_ref()), output_path, config)
        .await
}

/// Synchronous wrapper around [`convert`].
///
/// Creates a temporary tokio runtime internally.
#[cfg(feature = "chromium")]
pub fn convert_sync(
    input: impl AsRef<str>,
    config: &ConversionConfig,
) -> Result<ConversionOutput, Html2PdfError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Html2PdfError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(convert(input, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_sibling_stays_in_same_directory() {
        let p = temp_sibling(Path::new("/out/dir/report.pdf"));
        assert_eq!(p, PathBuf::from("/out/dir/report.pdf.tmp"));
    }

    #[tokio::test]
    async fn write_atomic_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        std::fs::write(&path, b"old").unwrap();

        write_atomic(&path, b"new content").await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"new content");
        assert!(!temp_sibling(&path).exists());
    }

    #[tokio::test]
    async fn write_atomic_failure_keeps_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("a.pdf");
        assert!(write_atomic(&path, b"x").await.is_err());
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn artifact_len_reads_file_size() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.pdf");
        std::fs::write(&path, b"12345").unwrap();
        assert_eq!(artifact_len(&RenderArtifact::File(path)).await, 5);
        assert_eq!(artifact_len(&RenderArtifact::Bytes(vec![0; 3])).await, 3);
    }
}
