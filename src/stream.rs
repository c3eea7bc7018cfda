//! Streaming batch API: emit results as each file finishes.
//!
//! [`convert_stream`] does the same work as [`crate::convert::convert_all`]
//! but yields [`ConversionResult`] items through a `Stream` instead of
//! returning one report at the end. Files are still processed one at a time
//! in input order, so items arrive in batch order. A PDF rendered to images
//! yields one item per page unless `pdf_all_pages` is off.

use crate::config::ConversionConfig;
use crate::convert::{expand, route_pages};
use crate::file::UploadedFile;
use crate::format::Format;
use crate::output::ConversionResult;
use futures::stream::{self, StreamExt};
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::{info, warn};

/// A boxed stream of per-file (or per-page) results.
pub type ResultStream = Pin<Box<dyn Stream<Item = ConversionResult> + Send>>;

/// Convert `files` to `target`, streaming results as they are ready.
///
/// Progress callbacks are not invoked; the stream itself is the progress
/// signal.
///
/// # Example
/// ```rust,no_run
/// use fileconv::{convert_stream, ConversionConfig, Format, UploadedFile};
/// use futures::StreamExt;
///
/// # #[tokio::main]
/// # async fn main() {
/// let files = vec![UploadedFile::new("a.csv", b"x,y\n1,2".to_vec())];
/// let mut stream = convert_stream(files, Format::Xlsx, &ConversionConfig::default());
/// while let Some(result) = stream.next().await {
///     println!("{} ok={}", result.original_name(), result.success());
/// }
/// # }
/// ```
pub fn convert_stream(
    files: Vec<UploadedFile>,
    target: Format,
    config: &ConversionConfig,
) -> ResultStream {
    info!("Starting streaming batch: {} file(s) → {}", files.len(), target);
    let config = config.clone();

    let s = stream::iter(files)
        .then(move |file| {
            let config = config.clone();
            async move {
                match route_pages(&file, target, &config).await {
                    Ok(artifacts) => expand(&file, target, artifacts),
                    Err(e) => {
                        warn!("{}", e);
                        vec![ConversionResult::failed(
                            file.name(),
                            file.size(),
                            target,
                            e.source.to_string(),
                        )]
                    }
                }
            }
        })
        .flat_map(stream::iter);

    Box::pin(s)
}
