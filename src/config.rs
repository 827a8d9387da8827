//! Configuration types for HTML-to-PDF conversion.
//!
//! Two layers, both plain immutable values passed into each call:
//!
//! * [`RenderSettings`] — what the engine's print-to-PDF call receives:
//!   page geometry, margins, scaling, header/footer templates, page ranges.
//! * [`ConversionConfig`] — everything around the render: presentation CSS,
//!   outline generation, timeouts, the engine environment directory and an
//!   optional progress callback.
//!
//! # Design choice: no process-wide defaults
//! Nothing here is global. Every conversion receives its own copy of the
//! configuration, so two concurrent conversions can never observe each
//! other's settings. Defaults come from `Default` impls, not mutable statics.

use crate::error::Html2PdfError;
use crate::progress::ProgressCallback;
use crate::styles;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Upper bound for [`RenderSettings::scale_factor`].
pub const MAX_SCALE_FACTOR: f32 = 2.0;

/// Deepest heading level considered for the outline (`h6`).
pub const MAX_OUTLINE_LEVEL: u8 = 6;

// ── Render settings ──────────────────────────────────────────────────────

/// Page orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Portrait,
    Landscape,
}

/// Print settings handed to the engine's PDF export.
///
/// All lengths are in inches. Fields are pass-through: the only validation
/// is that [`scale_factor`](Self::scale_factor) never exceeds
/// [`MAX_SCALE_FACTOR`] when set through the builder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Portrait or landscape. Default: portrait.
    pub orientation: Orientation,
    /// Paper width in inches. Default: 8.5 (US Letter).
    pub page_width: f32,
    /// Paper height in inches. Default: 11.
    pub page_height: f32,
    /// Top margin in inches. Default: 0.25.
    pub margin_top: f32,
    /// Bottom margin in inches. Default: 0.15.
    pub margin_bottom: f32,
    /// Left margin in inches. Default: 0.20.
    pub margin_left: f32,
    /// Right margin in inches. Default: 0.20.
    pub margin_right: f32,
    /// Scale factor, at most 2.0. Default: 1.0.
    pub scale_factor: f32,
    /// Page ranges to print, e.g. `"1,3,5-8"`. `None` prints everything.
    pub page_ranges: Option<String>,
    /// Print background colours and images. Default: true.
    pub print_background: bool,
    /// Print the header and footer bands. Default: false.
    pub print_header_footer: bool,
    /// HTML template for the header band (engine template syntax).
    pub header_template: Option<String>,
    /// HTML template for the footer band (engine template syntax).
    pub footer_template: Option<String>,
    /// Print only the current selection. Default: false.
    pub selection_only: bool,
    /// Ask the engine to emit its own native document outline. Independent
    /// of the heading-based outline this crate builds. Default: false.
    pub generate_document_outline: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            orientation: Orientation::Portrait,
            page_width: 8.5,
            page_height: 11.0,
            margin_top: 0.25,
            margin_bottom: 0.15,
            margin_left: 0.20,
            margin_right: 0.20,
            scale_factor: 1.0,
            page_ranges: None,
            print_background: true,
            print_header_footer: false,
            header_template: None,
            footer_template: None,
            selection_only: false,
            generate_document_outline: false,
        }
    }
}

impl RenderSettings {
    /// Create a new builder for `RenderSettings`.
    pub fn builder() -> RenderSettingsBuilder {
        RenderSettingsBuilder {
            settings: Self::default(),
        }
    }

    /// Scale factor as the engine should receive it.
    pub fn effective_scale(&self) -> f32 {
        self.scale_factor.min(MAX_SCALE_FACTOR)
    }
}

/// Builder for [`RenderSettings`].
#[derive(Debug)]
pub struct RenderSettingsBuilder {
    settings: RenderSettings,
}

impl RenderSettingsBuilder {
    pub fn orientation(mut self, orientation: Orientation) -> Self {
        self.settings.orientation = orientation;
        self
    }

    pub fn landscape(self, landscape: bool) -> Self {
        self.orientation(if landscape {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        })
    }

    /// Paper size in inches.
    pub fn page_size(mut self, width: f32, height: f32) -> Self {
        self.settings.page_width = width;
        self.settings.page_height = height;
        self
    }

    /// Margins in inches, CSS order: top, right, bottom, left.
    pub fn margins(mut self, top: f32, right: f32, bottom: f32, left: f32) -> Self {
        self.settings.margin_top = top;
        self.settings.margin_right = right;
        self.settings.margin_bottom = bottom;
        self.settings.margin_left = left;
        self
    }

    /// Scale factor; values above 2.0 are clamped to 2.0.
    pub fn scale_factor(mut self, scale: f32) -> Self {
        self.settings.scale_factor = scale.min(MAX_SCALE_FACTOR);
        self
    }

    pub fn page_ranges(mut self, ranges: impl Into<String>) -> Self {
        self.settings.page_ranges = Some(ranges.into());
        self
    }

    pub fn print_background(mut self, v: bool) -> Self {
        self.settings.print_background = v;
        self
    }

    pub fn print_header_footer(mut self, v: bool) -> Self {
        self.settings.print_header_footer = v;
        self
    }

    pub fn header_template(mut self, template: impl Into<String>) -> Self {
        self.settings.header_template = Some(template.into());
        self
    }

    pub fn footer_template(mut self, template: impl Into<String>) -> Self {
        self.settings.footer_template = Some(template.into());
        self
    }

    pub fn selection_only(mut self, v: bool) -> Self {
        self.settings.selection_only = v;
        self
    }

    pub fn generate_document_outline(mut self, v: bool) -> Self {
        self.settings.generate_document_outline = v;
        self
    }

    pub fn build(self) -> RenderSettings {
        self.settings
    }
}

// ── Presentation ─────────────────────────────────────────────────────────

/// CSS injected into the document right before export.
///
/// Injection is a fixed, idempotent pre-export step: the same options always
/// produce the same stylesheet, and an empty stylesheet means nothing is
/// injected at all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationOptions {
    /// Add `@media print` rules that keep headings with the following text
    /// and avoid breaking paragraphs, lists and code blocks across pages.
    pub keep_text_together: bool,
    /// Use the platform's native UI font stacks, which embed cleanly and
    /// render emoji and extended characters.
    pub optimize_pdf_fonts: bool,
    /// Arbitrary CSS appended last.
    pub css_to_inject: Option<String>,
}

impl PresentationOptions {
    /// The stylesheet to inject, or `None` when there is nothing to add.
    pub fn stylesheet(&self) -> Option<String> {
        styles::compose(self)
    }
}

// ── Conversion config ────────────────────────────────────────────────────

/// Configuration for one HTML-to-PDF conversion.
///
/// Built via [`ConversionConfig::builder()`] or using
/// [`ConversionConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_html2pdf::{ConversionConfig, RenderSettings};
///
/// let config = ConversionConfig::builder()
///     .settings(RenderSettings::builder().landscape(true).build())
///     .generate_outline(true)
///     .max_outline_level(3)
///     .render_timeout_secs(30)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct ConversionConfig {
    /// Print settings for the engine.
    pub settings: RenderSettings,

    /// CSS injected before export.
    pub presentation: PresentationOptions,

    /// Build a bookmark outline from the source's headings. Default: false.
    ///
    /// Outline generation is best-effort: when no heading can be matched to
    /// a page the PDF is returned unchanged.
    pub generate_outline: bool,

    /// Deepest heading level (1–6) included in the outline. Default: 6.
    pub max_outline_level: u8,

    /// Upper bound on the whole render, in seconds. Default: 60.
    ///
    /// This is the only recovery from an engine that never reports the
    /// document as loaded. On expiry the worker thread is abandoned: it may
    /// keep running until the engine finishes, and its result is discarded.
    pub render_timeout_secs: u64,

    /// Wait this long after the content is ready before exporting.
    /// Default: 0.
    ///
    /// Use it for pages that keep loading content from script after the
    /// initial document has been parsed.
    pub content_delay_ms: u64,

    /// Directory where the engine keeps its profile and cache.
    /// Default: `<tmp>/html2pdf-environment`.
    ///
    /// Share it between conversions that run one after another. Concurrent
    /// conversions against the same directory depend on the engine; give
    /// each its own directory when in doubt.
    pub environment_path: PathBuf,

    /// Timeout for fetching a remote source for heading extraction, in
    /// seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Optional per-stage progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            settings: RenderSettings::default(),
            presentation: PresentationOptions::default(),
            generate_outline: false,
            max_outline_level: MAX_OUTLINE_LEVEL,
            render_timeout_secs: 60,
            content_delay_ms: 0,
            environment_path: default_environment_path(),
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ConversionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConversionConfig")
            .field("settings", &self.settings)
            .field("presentation", &self.presentation)
            .field("generate_outline", &self.generate_outline)
            .field("max_outline_level", &self.max_outline_level)
            .field("render_timeout_secs", &self.render_timeout_secs)
            .field("content_delay_ms", &self.content_delay_ms)
            .field("environment_path", &self.environment_path)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn ConversionProgressCallback>"),
            )
            .finish()
    }
}

impl ConversionConfig {
    /// Create a new builder for `ConversionConfig`.
    pub fn builder() -> ConversionConfigBuilder {
        ConversionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Default engine environment directory.
pub fn default_environment_path() -> PathBuf {
    std::env::temp_dir().join("html2pdf-environment")
}

/// Builder for [`ConversionConfig`].
#[derive(Debug)]
pub struct ConversionConfigBuilder {
    config: ConversionConfig,
}

impl ConversionConfigBuilder {
    pub fn settings(mut self, settings: RenderSettings) -> Self {
        self.config.settings = settings;
        self
    }

    pub fn presentation(mut self, presentation: PresentationOptions) -> Self {
        self.config.presentation = presentation;
        self
    }

    pub fn generate_outline(mut self, v: bool) -> Self {
        self.config.generate_outline = v;
        self
    }

    pub fn max_outline_level(mut self, level: u8) -> Self {
        self.config.max_outline_level = level.clamp(1, MAX_OUTLINE_LEVEL);
        self
    }

    pub fn render_timeout_secs(mut self, secs: u64) -> Self {
        self.config.render_timeout_secs = secs;
        self
    }

    pub fn content_delay_ms(mut self, ms: u64) -> Self {
        self.config.content_delay_ms = ms;
        self
    }

    pub fn environment_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.environment_path = path.into();
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<ConversionConfig, Html2PdfError> {
        let c = &self.config;
        if c.render_timeout_secs == 0 {
            return Err(Html2PdfError::InvalidConfig(
                "Render timeout must be ≥ 1 second".into(),
            ));
        }
        if c.settings.page_width <= 0.0 || c.settings.page_height <= 0.0 {
            return Err(Html2PdfError::InvalidConfig(format!(
                "Page size must be positive, got {}x{} in",
                c.settings.page_width, c.settings.page_height
            )));
        }
        if c.settings.scale_factor <= 0.0 {
            return Err(Html2PdfError::InvalidConfig(format!(
                "Scale factor must be positive, got {}",
                c.settings.scale_factor
            )));
        }
        Ok(self.config)
    }
}
