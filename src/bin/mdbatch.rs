//! CLI binary for mdbatch.
//!
//! A thin shim over the library crate that maps CLI flags to a
//! `BatchConfig`, runs one processing pass and exports the results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use mdbatch::config::DEFAULT_EXPORT_PREFIX;
use mdbatch::{
    BatchConfig, BatchObserver, BatchQueue, BatchReport, CollisionPolicy, CommandConverter,
    Exporter,
};
use std::collections::HashMap;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
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
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI observer using indicatif ─────────────────────────────────────────────

/// Terminal observer: a live progress bar plus one log line per file.
///
/// With progress disabled the bar is hidden and only the error prompt
/// remains active.
struct CliObserver {
    bar: ProgressBar,
    /// Per-item wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    /// Whether a human can answer the continue-after-error prompt.
    interactive: bool,
    show_summary: bool,
}

impl CliObserver {
    fn new(show_progress: bool) -> Arc<Self> {
        let bar = if show_progress {
            let bar = ProgressBar::new(0);
            let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS);
            bar.set_style(spinner_style);
            bar.set_prefix("Preparing");
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        } else {
            ProgressBar::hidden()
        };

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            interactive: io::stdin().is_terminal() && io::stderr().is_terminal(),
            show_summary: show_progress,
        })
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&index)
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }

    fn ask_to_continue(&self, name: &str) -> bool {
        self.bar.suspend(|| {
            eprint!("{} Continue with the remaining files? [Y/n] ", cyan("?"));
            let _ = io::stderr().flush();
            let mut answer = String::new();
            if io::stdin().lock().read_line(&mut answer).is_err() {
                return false;
            }
            let answer = answer.trim().to_ascii_lowercase();
            let go_on = answer.is_empty() || answer == "y" || answer == "yes";
            if !go_on {
                eprintln!("{} Stopping after {}", red("✘"), name);
            }
            go_on
        })
    }
}

impl BatchObserver for CliObserver {
    fn on_batch_start(&self, to_process: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(to_process as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Converting {to_process} files…"))
        ));
    }

    fn on_item_start(&self, index: usize, name: &str) {
        self.start_times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(index, Instant::now());
        self.bar.set_message(name.to_string());
    }

    fn on_item_complete(&self, index: usize, name: &str, markdown_len: usize) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} {:<40}  {:<12}  {}",
            green("✓"),
            name,
            dim(&format!("{markdown_len:>7} bytes")),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_item_error(&self, index: usize, name: &str, error: &str) {
        let secs = self.elapsed_secs(index);

        // Keep one line per file; the full message is in the summary.
        let first_line = error.lines().next().unwrap_or_default();
        let msg: String = if first_line.chars().count() > 80 {
            first_line.chars().take(79).chain(['…']).collect()
        } else {
            first_line.to_string()
        };

        self.bar.println(format!(
            "  {} {:<40}  {}  {}",
            red("✗"),
            name,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn continue_after_error(&self, _index: usize, name: &str, _error: &str) -> bool {
        if !self.interactive {
            return false;
        }
        // Reading stdin blocks; keep the runtime's other tasks moving.
        tokio::task::block_in_place(|| self.ask_to_continue(name))
    }

    fn on_batch_complete(&self, report: &BatchReport) {
        self.bar.finish_and_clear();
        if !self.show_summary {
            return;
        }

        let mark = if report.failed == 0 {
            green("✔")
        } else if report.completed == 0 {
            red("✘")
        } else {
            cyan("⚠")
        };
        let mut line = format!(
            "{} {}/{} files converted  {}",
            mark,
            bold(&report.completed.to_string()),
            report.attempted,
            dim(&format!("{}ms", report.duration_ms)),
        );
        if report.failed > 0 {
            line.push_str(&format!("  ({} failed)", red(&report.failed.to_string())));
        }
        if report.skipped > 0 {
            line.push_str(&format!("  ({} already done)", report.skipped));
        }
        if report.cancelled {
            line.push_str("  [cancelled]");
        } else if report.halted {
            line.push_str("  [stopped]");
        }
        eprintln!("{line}");
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert one file and print its Markdown
  mdbatch report.docx

  # Convert a folder tree into a timestamped ZIP inside the existing ./out
  mdbatch ./inbox --zip ./out

  # Export to a folder, flattened, without the README index
  mdbatch ./inbox --out-dir ./exports --flatten --no-index

  # Ask before continuing after a failed file
  mdbatch ./inbox --zip archive.zip --stop-on-error

  # Use a different converter program with extra arguments
  mdbatch slides.pptx --converter /opt/bin/markitdown --converter-arg=--keep-data-uris

  # Machine-readable summary
  mdbatch ./inbox --json > summary.json

RECOGNISED FORMATS:
  Office   doc docx xls xlsx ppt pptx       PDF     pdf
  Images   jpg jpeg png gif bmp tiff        Audio   mp3 wav m4a flac
  Web      html htm csv json xml            Other   zip epub txt

  Folders are scanned recursively for these extensions. Files named
  explicitly are always attempted.

ENVIRONMENT VARIABLES:
  MDBATCH_CONVERTER       Converter program (default: markitdown)
  MDBATCH_ZIP             Same as --zip
  MDBATCH_OUT_DIR         Same as --out-dir
  RUST_LOG                Override the log filter

SETUP:
  pip install 'markitdown[all]'
"#;

/// Batch-convert documents to Markdown.
#[derive(Parser, Debug)]
#[command(
    name = "mdbatch",
    version,
    about = "Batch-convert documents to Markdown and export them as a ZIP or folder",
    long_about = "Queue documents (Office files, PDFs, images, audio, web pages, e-books), \
convert each to Markdown with an external converter (markitdown by default), and export \
the results as a ZIP archive or a directory tree with an index and a JSON summary.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Files or directories to convert.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Write a ZIP archive here (a directory gets a timestamped archive inside it).
    #[arg(long, env = "MDBATCH_ZIP")]
    zip: Option<PathBuf>,

    /// Write a timestamped export directory under this directory.
    #[arg(long, env = "MDBATCH_OUT_DIR")]
    out_dir: Option<PathBuf>,

    /// Put every Markdown file at the export root instead of mirroring folders.
    #[arg(long, env = "MDBATCH_FLATTEN")]
    flatten: bool,

    /// Do not write the README.md index.
    #[arg(long, env = "MDBATCH_NO_INDEX")]
    no_index: bool,

    /// Ask whether to continue after each failed file (stops when not interactive).
    #[arg(long, env = "MDBATCH_STOP_ON_ERROR")]
    stop_on_error: bool,

    /// What to do when two files export to the same path.
    #[arg(long, env = "MDBATCH_ON_COLLISION", value_enum, default_value = "overwrite")]
    on_collision: CollisionArg,

    /// Name prefix for export archives and directories.
    #[arg(long, env = "MDBATCH_PREFIX", default_value = DEFAULT_EXPORT_PREFIX)]
    prefix: String,

    /// Converter program; invoked as `<program> [ARGS...] <file>`.
    #[arg(long, env = "MDBATCH_CONVERTER", default_value = "markitdown")]
    converter: PathBuf,

    /// Extra argument passed to the converter before the file (repeatable).
    #[arg(long = "converter-arg", allow_hyphen_values = true)]
    converter_args: Vec<String>,

    /// Normalise the converter's output (line endings, trailing whitespace,
    /// blank runs). Off by default: output is stored exactly as produced.
    #[arg(long, env = "MDBATCH_CLEAN")]
    clean: bool,

    /// Print the conversion summary as JSON on stdout.
    #[arg(long, env = "MDBATCH_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "MDBATCH_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "MDBATCH_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "MDBATCH_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum CollisionArg {
    Overwrite,
    Error,
}

impl From<CollisionArg> for CollisionPolicy {
    fn from(v: CollisionArg) -> Self {
        match v {
            CollisionArg::Overwrite => CollisionPolicy::Overwrite,
            CollisionArg::Error => CollisionPolicy::Error,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && io::stderr().is_terminal();
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

    // ── Build queue ──────────────────────────────────────────────────────
    let config = build_config(&cli)?;
    let queue = BatchQueue::new(config);

    for input in &cli.inputs {
        if input.is_dir() {
            queue
                .add_directory(input)
                .with_context(|| format!("Failed to scan {}", input.display()))?;
        } else {
            queue
                .add([input])
                .with_context(|| format!("Failed to queue {}", input.display()))?;
        }
    }
    if queue.is_empty() {
        anyhow::bail!("No convertible files found in the given inputs");
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let converter = Arc::new(CommandConverter::new(&cli.converter).args(&cli.converter_args));
    let observer = CliObserver::new(show_progress);

    let mut handle = queue
        .spawn_processing(converter, observer)
        .context("Failed to start processing")?;

    // First Ctrl-C lets the current file finish; a second one abandons it.
    let quiet = cli.quiet;
    let mut presses = 0u32;
    let ctrl_c = move || {
        presses += 1;
        let first = presses == 1;
        async move {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
            if first && !quiet {
                eprintln!(
                    "{} Stopping after the current file… (Ctrl-C again to abort)",
                    cyan("◆")
                );
            }
        }
    };
    let Some(report) = queue
        .join_interruptible(&mut handle, ctrl_c)
        .await
        .context("Processing task failed")?
    else {
        eprintln!("{} Aborted", red("✘"));
        // The hung converter thread cannot be joined; exit without waiting
        // for the runtime to drain the blocking pool.
        std::process::exit(130);
    };

    if !cli.quiet && !show_progress {
        eprintln!(
            "Converted {}/{} files in {}ms",
            report.completed, report.attempted, report.duration_ms
        );
        if report.failed > 0 {
            eprintln!("  {} files failed", report.failed);
        }
    }

    let items = queue.snapshot();
    let unfinished = items.iter().filter(|i| !i.status().is_finished()).count();
    if unfinished > 0 && !cli.quiet {
        let reason = if queue.is_cancelled() { "cancelled" } else { "halted" };
        eprintln!("{} {unfinished} files not processed ({reason})", yellow("⚠"));
    }
    let stats = queue.stats();
    let exporter =
        Exporter::new(queue.config().export.clone()).context("Invalid export options")?;

    // ── Export ───────────────────────────────────────────────────────────
    if stats.completed > 0 {
        if let Some(ref zip) = cli.zip {
            let export = exporter
                .export_zip(&items, zip)
                .context("ZIP export failed")?;
            if !cli.quiet {
                eprintln!(
                    "{}  {} files  →  {}",
                    green("✔"),
                    export.files_written,
                    bold(&export.location.display().to_string())
                );
            }
        }
        if let Some(ref out_dir) = cli.out_dir {
            let export = exporter
                .export_folder(&items, out_dir)
                .context("Folder export failed")?;
            if !cli.quiet {
                eprintln!(
                    "{}  {} files  →  {}",
                    green("✔"),
                    export.files_written,
                    bold(&export.location.display().to_string())
                );
            }
        }
    }

    // ── Stdout ───────────────────────────────────────────────────────────
    if cli.json {
        let json = exporter
            .summary(&items)
            .to_json()
            .context("Failed to serialise summary")?;
        println!("{json}");
    } else if cli.zip.is_none() && cli.out_dir.is_none() {
        print_markdown(&queue).context("Failed to write to stdout")?;
    }

    if stats.completed == 0 {
        anyhow::bail!("No files were converted ({} failed)", stats.errors);
    }
    Ok(())
}

/// Map CLI args to `BatchConfig`.
fn build_config(cli: &Cli) -> Result<BatchConfig> {
    BatchConfig::builder()
        .skip_errors(!cli.stop_on_error)
        .clean_output(cli.clean)
        .preserve_structure(!cli.flatten)
        .create_index(!cli.no_index)
        .collision_policy(cli.on_collision.into())
        .export_prefix(cli.prefix.clone())
        .build()
        .context("Invalid configuration")
}

/// Write completed Markdown to stdout. Several files are each preceded by a
/// `<!-- file: name -->` marker.
fn print_markdown(queue: &BatchQueue) -> io::Result<()> {
    let completed = queue.completed_items();
    let stdout = io::stdout();
    let mut handle = stdout.lock();

    for (i, item) in completed.iter().enumerate() {
        if completed.len() > 1 {
            if i > 0 {
                handle.write_all(b"\n")?;
            }
            writeln!(handle, "<!-- file: {} -->", item.display_name())?;
        }
        handle.write_all(item.content().as_bytes())?;
        if !item.content().ends_with('\n') {
            handle.write_all(b"\n")?;
        }
    }
    handle.flush()
}
