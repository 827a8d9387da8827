//! CLI binary for edgequake-html2pdf.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ConversionConfig` and a `ChromiumEngine`, and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_html2pdf::{
    convert_stream, ChromiumEngine, ConversionConfig, ConversionOutput, ConversionProgressCallback,
    ConversionService, ConversionStats, Html2PdfError, OutlineReport, PresentationOptions,
    ProgressCallback, RenderArtifact, RenderSettings, RenderSource,
};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a spinner that names the current stage, plus
/// one log line per finished document. Safe to share between concurrent
/// conversions in batch mode.
struct CliProgressCallback {
    bar: ProgressBar,
    total: usize,
    finished: AtomicUsize,
}

impl CliProgressCallback {
    fn new(total: usize) -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix(if total > 1 {
            format!("0/{total}")
        } else {
            "Rendering".to_string()
        });
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            total,
            finished: AtomicUsize::new(0),
        })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_render_start(&self, source: &str) {
        self.bar.set_message(format!("rendering {source}"));
    }

    fn on_render_complete(&self, success: bool, duration_ms: u64) {
        let mark = if success { green("✓") } else { red("✗") };
        self.bar.println(format!(
            "  {} render  {}",
            mark,
            dim(&format!("{:.1}s", duration_ms as f64 / 1000.0))
        ));
    }

    fn on_outline_start(&self) {
        self.bar.set_message("building outline…");
    }

    fn on_outline_complete(&self, headings_found: usize, bookmarks_written: usize) {
        self.bar.println(format!(
            "  {} outline  {}",
            green("✓"),
            dim(&format!("{bookmarks_written}/{headings_found} headings bookmarked"))
        ));
    }

    fn on_conversion_complete(&self, _success: bool) {
        let done = self.finished.fetch_add(1, Ordering::SeqCst) + 1;
        if self.total > 1 {
            self.bar.set_prefix(format!("{done}/{}", self.total));
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Render a page to a file
  html2pdf https://example.com -o example.pdf

  # Local file with bookmarks from h1..h3
  html2pdf report.html -o report.pdf --outline --outline-level 3

  # Landscape A4 with tighter margins
  html2pdf slides.html -o slides.pdf --landscape --page-size 11.69x8.27 --margins 0.2,0.2,0.2,0.2

  # Print-friendly CSS plus your own stylesheet
  html2pdf article.html -o article.pdf --keep-text-together --css print.css

  # PDF to stdout
  html2pdf page.html > page.pdf

  # Several documents, three at a time
  html2pdf a.html b.html https://example.com/c --out-dir pdfs --jobs 3

  # JSON summary (outline + stats) for scripting
  html2pdf report.html -o report.pdf --outline --json

ENVIRONMENT VARIABLES:
  CHROME                  Path to the Chromium/Chrome executable
  HTML2PDF_ENVIRONMENT    Browser profile/cache directory
  RUST_LOG                Log filter (overrides -v / -q)
"#;

/// Convert HTML pages and URLs to PDF with headless Chromium.
#[derive(Parser, Debug)]
#[command(
    name = "html2pdf",
    version,
    about = "Convert HTML files and URLs to PDF, with bookmarks from the heading outline",
    long_about = "Convert HTML documents (local files or URLs) to PDF using headless Chromium. \
Optionally builds a PDF bookmark outline from the document's h1..h6 headings.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local HTML file paths or HTTP/HTTPS URLs.
    #[arg(required = true)]
    inputs: Vec<String>,

    /// Write the PDF to this file instead of stdout (single input).
    #[arg(short, long, env = "HTML2PDF_OUTPUT", conflicts_with = "out_dir")]
    output: Option<PathBuf>,

    /// Directory for the PDFs when converting several inputs.
    #[arg(long, env = "HTML2PDF_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// Conversions running at once with --out-dir.
    #[arg(short, long, env = "HTML2PDF_JOBS", default_value_t = 2)]
    jobs: usize,

    // ── Page setup ───────────────────────────────────────────────────────
    /// Landscape orientation.
    #[arg(long)]
    landscape: bool,

    /// Paper size in inches, WIDTHxHEIGHT.
    #[arg(long, default_value = "8.5x11", value_parser = parse_page_size)]
    page_size: (f32, f32),

    /// Margins in inches: top,right,bottom,left.
    #[arg(long, default_value = "0.25,0.2,0.15,0.2", value_parser = parse_margins)]
    margins: [f32; 4],

    /// Scale factor (at most 2.0).
    #[arg(long, default_value_t = 1.0)]
    scale: f32,

    /// Pages to print, e.g. 1,3,5-8.
    #[arg(long)]
    page_ranges: Option<String>,

    /// Do not print background colours and images.
    #[arg(long)]
    no_background: bool,

    /// Print header and footer bands.
    #[arg(long)]
    header_footer: bool,

    /// HTML file used as the header template (implies --header-footer).
    #[arg(long)]
    header_template: Option<PathBuf>,

    /// HTML file used as the footer template (implies --header-footer).
    #[arg(long)]
    footer_template: Option<PathBuf>,

    /// Ask the engine for its own native document outline.
    #[arg(long)]
    document_outline: bool,

    // ── Presentation ─────────────────────────────────────────────────────
    /// Inject print CSS that avoids breaking headings, paragraphs and code.
    #[arg(long)]
    keep_text_together: bool,

    /// Inject CSS that switches to native UI font stacks.
    #[arg(long)]
    optimize_fonts: bool,

    /// CSS file injected after the built-in stylesheets.
    #[arg(long)]
    css: Option<PathBuf>,

    // ── Outline ──────────────────────────────────────────────────────────
    /// Add PDF bookmarks built from the h1..h6 headings.
    #[arg(long, env = "HTML2PDF_OUTLINE")]
    outline: bool,

    /// Deepest heading level included in the outline (1–6).
    #[arg(long, default_value_t = 6,
          value_parser = clap::value_parser!(u8).range(1..=6))]
    outline_level: u8,

    // ── Engine ───────────────────────────────────────────────────────────
    /// Render timeout in seconds.
    #[arg(long, env = "HTML2PDF_TIMEOUT", default_value_t = 60)]
    timeout: u64,

    /// Wait this many milliseconds after the page loads before printing.
    #[arg(long, default_value_t = 0)]
    delay: u64,

    /// Browser profile/cache directory.
    #[arg(long, env = "HTML2PDF_ENVIRONMENT")]
    environment: Option<PathBuf>,

    /// HTTP timeout in seconds when fetching a URL for the outline.
    #[arg(long, default_value_t = 120)]
    download_timeout: u64,

    /// Chromium/Chrome executable.
    #[arg(long, env = "CHROME")]
    chrome: Option<PathBuf>,

    /// Disable the Chromium sandbox (needed as root in most containers).
    #[arg(long, env = "HTML2PDF_NO_SANDBOX")]
    no_sandbox: bool,

    // ── Output ───────────────────────────────────────────────────────────
    /// Print a JSON summary (outline + stats) to stdout. Needs -o or --out-dir.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "HTML2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "HTML2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "HTML2PDF_QUIET")]
    quiet: bool,
}

/// One line of the `--json` summary.
#[derive(Serialize)]
struct Summary<'a> {
    source: &'a str,
    output: Option<&'a Path>,
    ok: bool,
    error: Option<String>,
    outline: Option<&'a OutlineReport>,
    stats: Option<&'a ConversionStats>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.inputs.len() > 1 && cli.out_dir.is_none() {
        anyhow::bail!("Several inputs need --out-dir");
    }
    if cli.json && cli.output.is_none() && cli.out_dir.is_none() {
        anyhow::bail!("--json needs -o/--output or --out-dir (stdout is taken by the PDF)");
    }

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the spinner is active; the
    // spinner provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json && io::stderr().is_terminal();
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

    // ── Build config + service ───────────────────────────────────────────
    let progress = show_progress.then(|| CliProgressCallback::new(cli.inputs.len()));
    let config = build_config(
        &cli,
        progress.clone().map(|cb| cb as Arc<dyn ConversionProgressCallback>),
    )
    .await?;

    let mut engine = ChromiumEngine::new()
        .with_sandbox(!cli.no_sandbox)
        .with_idle_timeout(Duration::from_secs(cli.timeout.saturating_add(30)));
    if let Some(ref chrome) = cli.chrome {
        engine = engine.with_executable(chrome);
    }
    let service = ConversionService::new(engine);

    // ── Run conversion ───────────────────────────────────────────────────
    let result = if let Some(ref out_dir) = cli.out_dir {
        run_batch(&cli, &service, &config, out_dir).await
    } else {
        run_single(&cli, &service, &config).await
    };

    if let Some(cb) = progress {
        cb.finish();
    }
    result
}

async fn run_single(
    cli: &Cli,
    service: &ConversionService<ChromiumEngine>,
    config: &ConversionConfig,
) -> Result<()> {
    let input = &cli.inputs[0];
    let source = RenderSource::parse(input);

    let result = match cli.output {
        Some(ref path) => service.convert_to_file(source, path, config).await,
        None => service.convert(source, config).await,
    };

    let output = match result {
        Ok(output) => output,
        Err(Html2PdfError::OutlineAugmentation { artifact, source }) => {
            // The PDF itself is fine; only the bookmarks are missing.
            if !cli.quiet {
                eprintln!("{} outline skipped: {}", yellow("⚠"), source);
            }
            emit_artifact(&artifact)?;
            return Ok(());
        }
        Err(e) => return Err(e).with_context(|| format!("Conversion of {input} failed")),
    };

    emit_artifact(&output.artifact)?;

    if cli.json {
        print_summary(input, Ok(&output))?;
    } else if !cli.quiet {
        print_done(input, &output);
    }
    Ok(())
}

async fn run_batch(
    cli: &Cli,
    service: &ConversionService<ChromiumEngine>,
    config: &ConversionConfig,
    out_dir: &Path,
) -> Result<()> {
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;

    let sources: Vec<RenderSource> = cli.inputs.iter().map(|i| RenderSource::parse(i)).collect();
    let names: Vec<PathBuf> = sources
        .iter()
        .enumerate()
        .map(|(i, s)| out_dir.join(output_file_name(s, i)))
        .collect();

    let mut stream = convert_stream(service, sources, config, cli.jobs);
    let mut failed = 0usize;

    while let Some(item) = stream.next().await {
        let target = &names[item.index];
        let written = match item.result {
            Ok(output) => write_pdf(&output.artifact, target).map(|()| Some(output)),
            Err(Html2PdfError::OutlineAugmentation { artifact, source }) => {
                if !cli.quiet {
                    eprintln!("{} {}: outline skipped: {}", yellow("⚠"), item.source, source);
                }
                write_pdf(&artifact, target).map(|()| None)
            }
            Err(e) => Err(anyhow::Error::new(e)),
        };

        match written {
            Ok(Some(output)) => {
                if cli.json {
                    print_summary(&item.source, Ok(&output))?;
                } else if !cli.quiet {
                    print_done(&item.source, &output);
                }
            }
            Ok(None) => {}
            Err(e) => {
                failed += 1;
                if cli.json {
                    print_summary(&item.source, Err(&e))?;
                } else {
                    eprintln!("{} {}: {:#}", red("✗"), item.source, e);
                }
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} conversions failed", cli.inputs.len());
    }
    Ok(())
}

/// Map CLI args to `ConversionConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ConversionConfig> {
    let [top, right, bottom, left] = cli.margins;
    let mut settings = RenderSettings::builder()
        .landscape(cli.landscape)
        .page_size(cli.page_size.0, cli.page_size.1)
        .margins(top, right, bottom, left)
        .scale_factor(cli.scale)
        .print_background(!cli.no_background)
        .print_header_footer(
            cli.header_footer || cli.header_template.is_some() || cli.footer_template.is_some(),
        )
        .generate_document_outline(cli.document_outline);
    if let Some(ref ranges) = cli.page_ranges {
        settings = settings.page_ranges(ranges);
    }
    if let Some(ref path) = cli.header_template {
        settings = settings.header_template(read_text(path, "header template").await?);
    }
    if let Some(ref path) = cli.footer_template {
        settings = settings.footer_template(read_text(path, "footer template").await?);
    }

    let css_to_inject = match cli.css {
        Some(ref path) => Some(read_text(path, "CSS").await?),
        None => None,
    };

    let mut builder = ConversionConfig::builder()
        .settings(settings.build())
        .presentation(PresentationOptions {
            keep_text_together: cli.keep_text_together,
            optimize_pdf_fonts: cli.optimize_fonts,
            css_to_inject,
        })
        .generate_outline(cli.outline)
        .max_outline_level(cli.outline_level)
        .render_timeout_secs(cli.timeout)
        .content_delay_ms(cli.delay)
        .download_timeout_secs(cli.download_timeout);

    if let Some(ref env) = cli.environment {
        builder = builder.environment_path(env);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn read_text(path: &Path, what: &str) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read {what} from {}", path.display()))
}

/// In stream mode the PDF goes to stdout; in file mode it is already on disk.
fn emit_artifact(artifact: &RenderArtifact) -> Result<()> {
    if let RenderArtifact::Bytes(bytes) = artifact {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(bytes)
            .and_then(|()| handle.flush())
            .context("Failed to write PDF to stdout")?;
    }
    Ok(())
}

fn write_pdf(artifact: &RenderArtifact, target: &Path) -> Result<()> {
    match artifact {
        RenderArtifact::Bytes(bytes) => std::fs::write(target, bytes)
            .with_context(|| format!("Failed to write {}", target.display())),
        RenderArtifact::File(path) if path == target => Ok(()),
        RenderArtifact::File(path) => std::fs::copy(path, target)
            .map(|_| ())
            .with_context(|| format!("Failed to copy {} to {}", path.display(), target.display())),
    }
}

fn print_done(source: &str, output: &ConversionOutput) {
    let outline = if output.outline.requested {
        format!("  {} bookmarks", output.outline.bookmark_count())
    } else {
        String::new()
    };
    eprintln!(
        "{}  {}  {}{}  {}",
        green("✔"),
        bold(source),
        dim(&format!("{} bytes", output.stats.pdf_bytes)),
        outline,
        dim(&format!("{}ms", output.stats.total_duration_ms)),
    );
}

fn print_summary(
    source: &str,
    result: std::result::Result<&ConversionOutput, &anyhow::Error>,
) -> Result<()> {
    let summary = match result {
        Ok(output) => Summary {
            source,
            output: output.artifact.path(),
            ok: true,
            error: None,
            outline: Some(&output.outline),
            stats: Some(&output.stats),
        },
        Err(e) => Summary {
            source,
            output: None,
            ok: false,
            error: Some(format!("{e:#}")),
            outline: None,
            stats: None,
        },
    };
    println!(
        "{}",
        serde_json::to_string(&summary).context("Failed to serialise summary")?
    );
    Ok(())
}

/// `NNN-<stem>.pdf`, numbered so two inputs never collide.
fn output_file_name(source: &RenderSource, index: usize) -> String {
    let stem = match source {
        RenderSource::File(path) => path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
        RenderSource::Url(url) => url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches(".html")
            .trim_end_matches(".htm")
            .to_string(),
        RenderSource::Html(_) => String::new(),
    };
    let stem: String = stem
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        format!("{:03}-document.pdf", index + 1)
    } else {
        format!("{:03}-{stem}.pdf", index + 1)
    }
}

/// Parse `--page-size` (`8.5x11`).
fn parse_page_size(s: &str) -> std::result::Result<(f32, f32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{s}'"))?;
    let w: f32 = w.trim().parse().map_err(|_| format!("invalid width '{w}'"))?;
    let h: f32 = h.trim().parse().map_err(|_| format!("invalid height '{h}'"))?;
    if w <= 0.0 || h <= 0.0 {
        return Err(format!("page size must be positive, got {w}x{h}"));
    }
    Ok((w, h))
}

/// Parse `--margins` (`top,right,bottom,left`).
fn parse_margins(s: &str) -> std::result::Result<[f32; 4], String> {
    let values = s
        .split(',')
        .map(|v| {
            v.trim()
                .parse::<f32>()
                .map_err(|_| format!("invalid margin '{}'", v.trim()))
        })
        .collect::<std::result::Result<Vec<f32>, String>>()?;
    <[f32; 4]>::try_from(values)
        .map_err(|v| format!("expected 4 margins (top,right,bottom,left), got {}", v.len()))
}
