//! Headless Chromium engine adapter.
//!
//! Drives a Chromium (or Chrome/Edge) process over the DevTools protocol via
//! the `headless_chrome` crate. One [`ChromiumSession`] owns one browser
//! process and one tab; the process exits when the session is dropped at
//! the end of the worker thread.
//!
//! ## Mapping
//!
//! | Session step | DevTools |
//! |--------------|----------|
//! | `navigate` | `Page.navigate` (file sources as `file://`, in-memory HTML as a `data:` URL) |
//! | `content_ready` | poll `document.readyState` until the document is parsed |
//! | `inject_presentation` | `Runtime.evaluate` appending a `<style>` element |
//! | `export_*` | `Page.printToPDF` |
//!
//! `headless_chrome` calls block the calling thread. That is acceptable here:
//! the calling thread is the bridge's dedicated worker and nothing else is
//! scheduled on its event loop.

use super::{EngineError, RenderEngine, RenderSession};
use crate::config::{Orientation, RenderSettings};
use crate::worker::RenderSource;
use async_trait::async_trait;
use base64::Engine as _;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Interval between `document.readyState` probes.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(50);

const READY_PROBE: &str =
    "document.readyState !== 'loading' && location.href !== 'about:blank'";

/// Launch options for the Chromium process.
#[derive(Debug, Clone)]
pub struct ChromiumEngine {
    /// Browser executable. `None` lets `headless_chrome` locate one
    /// (`CHROME` env var, then well-known install paths).
    pub executable: Option<PathBuf>,
    /// Run with the Chromium sandbox. Containers running as root usually
    /// need this off. Default: true.
    pub sandbox: bool,
    /// How long the DevTools connection may stay silent before the browser
    /// is considered gone. Should exceed the render timeout. Default: 300 s.
    pub idle_timeout: Duration,
}

impl Default for ChromiumEngine {
    fn default() -> Self {
        Self {
            executable: None,
            sandbox: true,
            idle_timeout: Duration::from_secs(300),
        }
    }
}

impl ChromiumEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = sandbox;
        self
    }

    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }
}

#[async_trait(?Send)]
impl RenderEngine for ChromiumEngine {
    type Session = ChromiumSession;

    fn name(&self) -> &'static str {
        "chromium"
    }

    async fn create_session(&self, environment: &Path) -> Result<ChromiumSession, EngineError> {
        std::fs::create_dir_all(environment).map_err(|e| {
            EngineError::with_source(
                format!("environment directory '{}' could not be created", environment.display()),
                e,
            )
        })?;

        let options = LaunchOptions::default_builder()
            .headless(true)
            .sandbox(self.sandbox)
            .path(self.executable.clone())
            .user_data_dir(Some(environment.to_path_buf()))
            .idle_browser_timeout(self.idle_timeout)
            .build()
            .map_err(|e| EngineError::new(format!("invalid launch options: {e}")))?;

        debug!(
            "Launching Chromium (sandbox={}, profile={})",
            self.sandbox,
            environment.display()
        );
        let browser = Browser::new(options)
            .map_err(|e| EngineError::with_source("Chromium could not be launched", e))?;
        let tab = browser
            .new_tab()
            .map_err(|e| EngineError::with_source("Chromium tab could not be opened", e))?;

        Ok(ChromiumSession { browser, tab })
    }
}

/// One browser process and its tab.
pub struct ChromiumSession {
    // Kept alive for the tab; dropping it ends the process.
    #[allow(dead_code)]
    browser: Browser,
    tab: Arc<Tab>,
}

#[async_trait(?Send)]
impl RenderSession for ChromiumSession {
    async fn navigate(&mut self, source: &RenderSource) -> Result<(), EngineError> {
        let url = navigation_url(source)?;
        debug!("Navigating to {}", source);
        self.tab
            .navigate_to(&url)
            .map_err(|e| EngineError::with_source("navigation was rejected", e))?;
        Ok(())
    }

    async fn content_ready(&mut self) -> Result<(), EngineError> {
        loop {
            let probe = self
                .tab
                .evaluate(READY_PROBE, false)
                .map_err(|e| EngineError::with_source("document state could not be read", e))?;
            if probe.value.as_ref().and_then(|v| v.as_bool()) == Some(true) {
                return Ok(());
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    async fn inject_presentation(&mut self, css: &str) -> Result<(), EngineError> {
        let script = style_injection_script(css)?;
        self.tab
            .evaluate(&script, false)
            .map_err(|e| EngineError::with_source("style element could not be added", e))?;
        Ok(())
    }

    async fn export_to_file(
        &mut self,
        path: &Path,
        settings: &RenderSettings,
    ) -> Result<(), EngineError> {
        let bytes = self.print(settings)?;
        std::fs::write(path, &bytes).map_err(|e| {
            EngineError::with_source(format!("'{}' could not be written", path.display()), e)
        })
    }

    async fn export_to_stream(&mut self, settings: &RenderSettings) -> Result<Vec<u8>, EngineError> {
        self.print(settings)
    }
}

impl ChromiumSession {
    fn print(&self, settings: &RenderSettings) -> Result<Vec<u8>, EngineError> {
        if settings.selection_only {
            warn!("selection_only is not supported by Chromium; printing the whole document");
        }
        self.tab
            .print_to_pdf(Some(print_options(settings)))
            .map_err(|e| EngineError::with_source("Page.printToPDF failed", e))
    }
}

// ── Helpers ──────────────────────────────────────────────────────────────

fn navigation_url(source: &RenderSource) -> Result<String, EngineError> {
    match source {
        RenderSource::Url(url) => Ok(url.clone()),
        RenderSource::File(path) => {
            let absolute = std::path::absolute(path).map_err(|e| {
                EngineError::with_source(format!("'{}' has no absolute form", path.display()), e)
            })?;
            reqwest::Url::from_file_path(&absolute)
                .map(String::from)
                .map_err(|()| {
                    EngineError::new(format!("'{}' is not a valid file URL", absolute.display()))
                })
        }
        RenderSource::Html(html) => Ok(html_data_url(html)),
    }
}

/// In-memory documents are loaded as UTF-8.
fn html_data_url(html: &str) -> String {
    format!(
        "data:text/html;charset=utf-8;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(html.as_bytes())
    )
}

fn style_injection_script(css: &str) -> Result<String, EngineError> {
    let literal = serde_json::to_string(css)
        .map_err(|e| EngineError::with_source("stylesheet could not be encoded", e))?;
    Ok(format!(
        "(() => {{ const s = document.createElement('style'); \
         s.textContent = {literal}; \
         (document.head || document.documentElement).appendChild(s); \
         return true; }})()"
    ))
}

fn print_options(settings: &RenderSettings) -> PrintToPdfOptions {
    PrintToPdfOptions {
        landscape: Some(settings.orientation == Orientation::Landscape),
        display_header_footer: Some(settings.print_header_footer),
        print_background: Some(settings.print_background),
        scale: Some(f64::from(settings.effective_scale())),
        paper_width: Some(f64::from(settings.page_width)),
        paper_height: Some(f64::from(settings.page_height)),
        margin_top: Some(f64::from(settings.margin_top)),
        margin_bottom: Some(f64::from(settings.margin_bottom)),
        margin_left: Some(f64::from(settings.margin_left)),
        margin_right: Some(f64::from(settings.margin_right)),
        page_ranges: settings.page_ranges.clone(),
        header_template: settings.header_template.clone(),
        footer_template: settings.footer_template.clone(),
        generate_document_outline: Some(settings.generate_document_outline),
        ..Default::default()
    }
}
