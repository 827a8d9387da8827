//! Input resolution: load the HTML behind a [`RenderSource`] for heading
//! extraction.
//!
//! ## Why load the source a second time?
//!
//! The engine renders from the source directly and never hands its DOM
//! back. Heading extraction therefore reads the same source again: remote
//! URLs are fetched with a plain HTTP GET, local files are read from disk,
//! and in-memory HTML is used as-is.
//!
//! A source that is simply not there (missing file, HTTP 404) is not an
//! error: the document has no headings we can see, so the outline is empty.
//! Anything else that goes wrong is reported as an [`OutlineError`].

use crate::error::OutlineError;
use crate::worker::RenderSource;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Load the HTML text of `source`.
///
/// Returns `Ok(None)` when a local file does not exist or a remote server
/// answers 404.
pub async fn load_document(
    source: &RenderSource,
    timeout_secs: u64,
) -> Result<Option<String>, OutlineError> {
    match source {
        RenderSource::Html(html) => Ok(Some(html.clone())),
        RenderSource::File(path) => read_local(path).await,
        RenderSource::Url(url) if url.starts_with("file://") => {
            let path = reqwest::Url::parse(url)
                .ok()
                .and_then(|u| u.to_file_path().ok())
                .ok_or_else(|| OutlineError::SourceFetch {
                    url: url.clone(),
                    reason: "not a valid file URL".into(),
                })?;
            read_local(&path).await
        }
        RenderSource::Url(url) => fetch_url(url, timeout_secs).await,
    }
}

/// Read a local HTML file. Missing → `None`.
async fn read_local(path: &Path) -> Result<Option<String>, OutlineError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => {
            debug!("Read {} bytes from {}", bytes.len(), path.display());
            Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("{} not found; no headings", path.display());
            Ok(None)
        }
        Err(e) => Err(OutlineError::SourceRead {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// GET a remote HTML page. 404 → `None`.
async fn fetch_url(url: &str, timeout_secs: u64) -> Result<Option<String>, OutlineError> {
    info!("Fetching {} for outline extraction", url);

    let fetch_error = |reason: String| OutlineError::SourceFetch {
        url: url.to_string(),
        reason,
    };

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| fetch_error(e.to_string()))?;

    let response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            fetch_error(format!("no response within {timeout_secs}s"))
        } else {
            fetch_error(e.to_string())
        }
    })?;

    let status = response.status();
    if status == reqwest::StatusCode::NOT_FOUND {
        debug!("{} returned 404; no headings", url);
        return Ok(None);
    }
    if !status.is_success() {
        return Err(fetch_error(format!("HTTP {status}")));
    }

    let body = response
        .text()
        .await
        .map_err(|e| fetch_error(e.to_string()))?;
    debug!("Fetched {} bytes from {}", body.len(), url);
    Ok(Some(body))
}
