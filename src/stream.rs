//! Batch conversion API: emit documents as they complete.
//!
//! ## Why stream?
//!
//! Converting a whole site takes minutes. A stream-based API lets callers
//! report progress, write PDFs to disk as they finish, and bound how many
//! engine processes run at once, instead of waiting for the slowest page
//! before seeing anything.
//!
//! Unlike the eager [`crate::convert::ConversionService::convert`], which
//! handles one document, [`convert_stream`] takes many and yields one
//! [`BatchItem`] per document as each completes. With `concurrency > 1`
//! items may arrive out of order; use [`BatchItem::index`] if order matters.
//!
//! ## Engine environment
//!
//! With more than one conversion in flight, job `i` gets its own
//! environment directory `<environment_path>/job-<i>`, so concurrent engine
//! sessions never share a profile.

use crate::config::ConversionConfig;
use crate::convert::ConversionService;
use crate::engine::RenderEngine;
use crate::error::Html2PdfError;
use crate::output::ConversionOutput;
use crate::worker::RenderSource;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::info;

/// One finished document of a batch.
#[derive(Debug)]
pub struct BatchItem {
    /// Position of the source in the input list.
    pub index: usize,
    /// Display name of the source.
    pub source: String,
    pub result: Result<ConversionOutput, Html2PdfError>,
}

/// A boxed stream of batch results.
pub type BatchStream = Pin<Box<dyn Stream<Item = BatchItem> + Send>>;

/// Convert many sources, at most `concurrency` at a time, streaming results
/// as they are ready.
///
/// Each item is converted in memory, exactly like
/// [`ConversionService::convert`]. A failed document does not stop the
/// batch.
pub fn convert_stream<E: RenderEngine>(
    service: &ConversionService<E>,
    sources: Vec<RenderSource>,
    config: &ConversionConfig,
    concurrency: usize,
) -> BatchStream {
    let concurrency = concurrency.max(1);
    info!(
        "Starting batch conversion: {} sources, concurrency {}",
        sources.len(),
        concurrency
    );

    let service = service.clone();
    let config = config.clone();

    let s = stream::iter(sources.into_iter().enumerate().map(move |(index, source)| {
        let service = service.clone();
        let mut cfg = config.clone();
        if concurrency > 1 {
            cfg.environment_path = cfg.environment_path.join(format!("job-{index}"));
        }
        async move {
            let name = source.display_name();
            let result = service.convert(source, &cfg).await;
            BatchItem {
                index,
                source: name,
                result,
            }
        }
    }))
    .buffer_unordered(concurrency);

    Box::pin(s)
}
