//! CLI binary for fileconv.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig`, runs a batch and writes the artifacts.

use anyhow::{bail, Context, Result};
use clap::Parser;
use fileconv::pipeline::input::load_input;
use fileconv::{
    convert_all, engine, format, preview, save_artifacts, BatchOutcome, BatchProgressCallback,
    ConversionConfig, EngineConfig, Format, PreviewPayload, ProgressCallback, UploadedFile,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one bar for the batch plus a log line per file.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new(0);
        bar.set_style(style);
        bar.set_prefix("Converting");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_files: usize) {
        self.bar.set_length(total_files as u64);
    }

    fn on_file_start(&self, _index: usize, _total: usize, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn on_file_complete(&self, index: usize, total: usize, artifacts: usize) {
        let outputs = if artifacts == 1 {
            String::new()
        } else {
            dim(&format!("{artifacts} outputs"))
        };
        self.bar.println(format!(
            "  {} File {:>3}/{:<3}  {}",
            green("✓"),
            index,
            total,
            outputs
        ));
        self.bar.inc(1);
    }

    fn on_file_error(&self, index: usize, total: usize, error: &str) {
        // Truncate very long error messages to keep output tidy.
        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };
        self.bar.println(format!(
            "  {} File {:>3}/{:<3}  {}",
            red("✗"),
            index,
            total,
            red(&msg)
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, _outcome: BatchOutcome, _succeeded: usize, _failed: usize) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Spreadsheet to CSV (first sheet)
  fileconv report.xlsx --to csv -o out/

  # Every page of a PDF as PNG
  fileconv slides.pdf --to png -o pages/

  # Only the first page
  fileconv slides.pdf --to jpg --first-page

  # Several images into one PDF each
  fileconv a.png b.webp c.gif --to pdf -o pdfs/

  # Convert from URL
  fileconv https://example.com/data.csv --to xlsx

  # What can a .docx become?
  fileconv --list-formats docx

  # Preview payload as JSON
  fileconv --preview --json notes.docx

ENVIRONMENT VARIABLES:
  PDFIUM_LIB_PATH   pdfium shared library (file or directory)
  FILECONV_*        every flag can also be set through its FILECONV_ variable
  RUST_LOG          tracing filter, overrides -v / -q
"#;

/// Convert and preview PDF, Word, Excel, CSV, text, HTML and image files.
#[derive(Parser, Debug)]
#[command(
    name = "fileconv",
    version,
    about = "Convert and preview PDF, Word, Excel, CSV, text, HTML and image files",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file paths or HTTP/HTTPS URLs.
    inputs: Vec<String>,

    /// Target extension (pdf, png, jpg, jpeg, txt, html, csv, xlsx).
    #[arg(short, long, env = "FILECONV_TO")]
    to: Option<String>,

    /// Directory the converted files are written to.
    #[arg(short, long, env = "FILECONV_OUTPUT", default_value = ".")]
    output: PathBuf,

    /// PDF → image: render page 1 only.
    #[arg(long, env = "FILECONV_FIRST_PAGE")]
    first_page: bool,

    /// List supported conversions, optionally for one source extension.
    #[arg(long, value_name = "EXT", num_args = 0..=1, default_missing_value = "")]
    list_formats: Option<String>,

    /// Print the preview payload of the first input instead of converting.
    #[arg(long)]
    preview: bool,

    /// Output structured JSON (batch report or preview payload).
    #[arg(long, env = "FILECONV_JSON")]
    json: bool,

    /// pdfium shared library, or a directory containing one.
    #[arg(long, env = "FILECONV_PDFIUM_LIB")]
    pdfium_lib: Option<PathBuf>,

    /// PDF rasterisation scale (0.25–8).
    #[arg(long, env = "FILECONV_SCALE", default_value_t = 2.0)]
    scale: f32,

    /// JPEG quality (1–100).
    #[arg(long, env = "FILECONV_JPEG_QUALITY", default_value_t = 95)]
    jpeg_quality: u8,

    /// Delay between writing consecutive output files, in milliseconds.
    #[arg(long, env = "FILECONV_STAGGER_MS", default_value_t = 100)]
    stagger_ms: u64,

    /// Disable progress bar.
    #[arg(long, env = "FILECONV_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FILECONV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FILECONV_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "FILECONV_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO-level library logs.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && !cli.preview;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Registry listing ─────────────────────────────────────────────────
    if let Some(ref ext) = cli.list_formats {
        list_formats(ext)?;
        return Ok(());
    }

    if cli.inputs.is_empty() {
        bail!("No input files given");
    }

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb)?;

    // ── Load inputs ──────────────────────────────────────────────────────
    let mut files = Vec::with_capacity(cli.inputs.len());
    for input in &cli.inputs {
        let file = load_input(input, config.download_timeout_secs)
            .await
            .with_context(|| format!("Failed to load '{input}'"))?;
        files.push(file);
    }

    // ── Preview mode ─────────────────────────────────────────────────────
    if cli.preview {
        let payload = preview(&files[0], &config);
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&payload).context("Failed to serialise preview")?
            );
        } else {
            print_preview(&payload);
        }
        return Ok(());
    }

    // ── Conversion ───────────────────────────────────────────────────────
    let Some(ref to) = cli.to else {
        bail!("Missing --to <EXT>; see --list-formats for what each file can become");
    };
    let target =
        Format::from_extension(to).with_context(|| format!("Unknown target format '{to}'"))?;

    if needs_engine(&files, target) || cli.pdfium_lib.is_some() {
        let engine_config = EngineConfig {
            library_path: cli.pdfium_lib.clone(),
        };
        tokio::task::block_in_place(|| engine::initialize(&engine_config))
            .context("Failed to initialise the PDF engine")?;
    }

    let report = convert_all(&files, target, &config).await;

    let written = save_artifacts(
        &report.results,
        &cli.output,
        Duration::from_millis(config.download_stagger_ms),
    )
    .await
    .context("Failed to write converted files")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialise report")?
        );
    } else if !cli.quiet {
        for path in &written {
            eprintln!("  {} {}", dim("→"), path.display());
        }
        for (name, error) in report.errors() {
            eprintln!("  {} {}: {}", red("✗"), bold(name), error);
        }
        let mark = match report.outcome {
            BatchOutcome::AllSucceeded => green("✔"),
            BatchOutcome::Mixed => cyan("⚠"),
            BatchOutcome::AllFailed => red("✘"),
        };
        eprintln!("{} {}  {}ms", mark, report.summary(), report.duration_ms);
    }

    if report.outcome == BatchOutcome::AllFailed && !report.results.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let mut builder = ConversionConfig::builder()
        .pdf_render_scale(cli.scale)
        .pdf_all_pages(!cli.first_page)
        .jpeg_quality(cli.jpeg_quality)
        .download_stagger_ms(cli.stagger_ms)
        .download_timeout_secs(cli.download_timeout);

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Does any file in the batch need pdfium for this target?
fn needs_engine(files: &[UploadedFile], target: Format) -> bool {
    target == Format::Pdf || files.iter().any(|f| f.format() == Some(Format::Pdf))
}

fn list_formats(ext: &str) -> Result<()> {
    if ext.is_empty() {
        for source in format::source_formats() {
            let targets: Vec<_> = format::supported_targets(source.extension())
                .iter()
                .map(|t| t.extension())
                .collect();
            println!("{:<6} → {}", source.extension(), targets.join(", "));
        }
        return Ok(());
    }

    let source =
        Format::from_extension(ext).with_context(|| format!("Unknown source format '{ext}'"))?;
    let targets = format::supported_targets(source.extension());
    if targets.is_empty() {
        println!("{} files cannot be converted", source.extension());
    }
    for target in targets {
        println!("{:<6} {}", target.extension(), dim(&target.label()));
    }
    Ok(())
}

fn print_preview(payload: &PreviewPayload) {
    match payload {
        PreviewPayload::Text { content } | PreviewPayload::Html { content } => {
            println!("{content}");
        }
        PreviewPayload::Image { data_url } | PreviewPayload::Document { data_url } => {
            println!("{}…  ({} chars)", &data_url[..data_url.len().min(64)], data_url.len());
        }
        PreviewPayload::Table {
            rows,
            sheet_names,
            total_rows,
        } => {
            println!(
                "{}",
                bold(&format!(
                    "Sheets: {}  ({} rows)",
                    sheet_names.join(", "),
                    total_rows
                ))
            );
            for row in rows {
                println!("{}", row.join("\t"));
            }
        }
        PreviewPayload::Unavailable { metadata, reason } => {
            println!("{}  {}", bold(&metadata.name), dim(&metadata.size_display));
            println!("{}", red(reason));
        }
    }
}
