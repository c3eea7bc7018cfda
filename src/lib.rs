//! # fileconv
//!
//! Convert and preview everyday documents: PDF, Word, Excel, CSV, plain
//! text, HTML and raster images.
//!
//! Files are handled entirely in memory. A static format registry decides
//! which `(source, target)` pairs are legal, a router dispatches each file to
//! the converter for its pair, and a batch orchestrator walks a selection of
//! files one at a time, recording a result for every file whether it
//! succeeded or not.
//!
//! ## Pipeline Overview
//!
//! ```text
//! path / URL
//!  │
//!  ├─ 1. Input     read the file or download it (reqwest)
//!  ├─ 2. Route     registry lookup → converter for (source, target)
//!  ├─ 3. Convert   pdfium / calamine / zip+quick-xml / scraper / image
//!  │               (CPU-bound, spawn_blocking)
//!  ├─ 4. Collect   one ConversionResult per file (per page for PDF→image)
//!  └─ 5. Save      atomic writes, staggered
//! ```
//!
//! ## Supported conversions
//!
//! | Source | Targets |
//! |--------|---------|
//! | pdf | png, jpg, jpeg, txt |
//! | doc, docx | html |
//! | xls, xlsx | html, csv |
//! | csv | xlsx |
//! | txt | html |
//! | html | pdf |
//! | png | pdf, jpg, jpeg |
//! | jpg, jpeg | pdf, png |
//! | gif, bmp, webp | pdf, png, jpg |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fileconv::{convert_all, engine, ConversionConfig, EngineConfig, Format, UploadedFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Only needed for conversions that touch PDF.
//!     engine::initialize(&EngineConfig::default())?;
//!
//!     let files = vec![UploadedFile::new("data.csv", std::fs::read("data.csv")?)];
//!     let report = convert_all(&files, Format::Xlsx, &ConversionConfig::default()).await;
//!     println!("{}", report.summary());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `fileconv` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! fileconv = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod file;
pub mod format;
pub mod output;
pub mod pipeline;
pub mod preview;
pub mod progress;
pub mod router;
pub mod session;
pub mod stream;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{ConversionConfig, ConversionConfigBuilder, EngineConfig};
pub use convert::{convert_all, convert_file, convert_sync, save_artifacts};
pub use engine::EngineLocation;
pub use error::{ConfigError, ConvertError, EngineError, FileError, InputError, OutputWriteError};
pub use file::{format_file_size, Artifact, UploadedFile};
pub use format::{is_supported, supported_targets, Format, FormatFamily};
pub use output::{BatchOutcome, BatchReport, ConversionResult};
pub use preview::{preview, FileMetadata, PreviewPayload};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
pub use router::Router;
pub use session::{BatchSession, SessionRun};
pub use stream::{convert_stream, ResultStream};
