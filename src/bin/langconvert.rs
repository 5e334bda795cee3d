//! CLI binary for langconvert.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConversionConfig`, submits a batch job, and renders its progress.

use anyhow::{bail, Context, Result};
use clap::Parser;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use langconvert::{
    progress_stream, submit, Bundle, BundleFile, ConversionConfig, FileStatus, JobRegistry,
    JobState,
};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

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

// ── CLI progress rendering using indicatif ───────────────────────────────────

/// Terminal progress renderer: one live bar anchored at the bottom, plus a
/// log line per converted file. The bar starts as a spinner and switches to
/// a counted bar once the job reports its file total.
struct CliProgress {
    bar: ProgressBar,
    bar_active: bool,
    logged: usize,
}

impl CliProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(0); // length set once the total is known

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Extracting bundle…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Self {
            bar,
            bar_active: false,
            logged: 0,
        }
    }

    /// Switch to the full progress-bar style once we know `total`.
    fn activate_bar(&mut self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} files  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Converting");
        self.bar.reset_eta();
        self.bar_active = true;
    }

    /// Apply one progress snapshot to the bar and the per-file log.
    fn render(&mut self, snap: &langconvert::ProgressSnapshot) {
        if !self.bar_active && snap.state != JobState::Preparing {
            self.activate_bar(snap.total);
        }

        // Newly finished files since the last snapshot get a log line each.
        for rel in snap.converted_files.iter().skip(self.logged) {
            self.bar.println(format!(
                "  {} {:<40} {}",
                green("✓"),
                rel,
                dim(&format!("{}/{}", self.logged + 1, snap.total)),
            ));
            self.logged += 1;
        }
        self.bar.set_position(snap.processed as u64);

        if let Some(ref name) = snap.current_file {
            if snap.current_file_status == Some(FileStatus::Converting) {
                self.bar.set_message(name.clone());
            }
        }
    }

    fn finish(&self, snap: &langconvert::ProgressSnapshot) {
        self.bar.finish_and_clear();
        match snap.state {
            JobState::Completed => eprintln!(
                "{} {} files converted successfully",
                green("✔"),
                bold(&snap.processed.to_string())
            ),
            JobState::Error => eprintln!(
                "{} conversion aborted after {}/{} files",
                red("✘"),
                snap.processed,
                snap.total
            ),
            _ => {}
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a project folder from C to Python
  langconvert ./my-project --from c --to python

  # Convert a zipped project, custom output path
  langconvert project.zip --from python --to js -o converted.zip

  # Use a specific model and endpoint
  langconvert src/ --from java --to go \
      --model deepseek-coder-v2 --api-base https://api.deepseek.com

SUPPORTED LANGUAGES:
  c (.c .h)   cpp (.cpp .hpp .cc .hh)   python (.py)   java (.java)
  js (.js .jsx)   go (.go)   rust (.rs)   ruby (.rb)

ENVIRONMENT VARIABLES:
  LANGCONVERT_API_KEY    API key for the completion endpoint
  LANGCONVERT_API_BASE   Base URL (default: https://api.deepseek.com)
  LANGCONVERT_MODEL      Model ID (default: deepseek-coder-v2)

SETUP:
  1. Set API key:   export LANGCONVERT_API_KEY=sk-...
  2. Convert:       langconvert ./project --from c --to python
"#;

/// Convert source code projects between programming languages.
#[derive(Parser, Debug)]
#[command(
    name = "langconvert",
    version,
    about = "Convert source code projects between programming languages using LLMs",
    long_about = "Convert a project folder or zip archive from one programming language to \
another by delegating per-file translation to an OpenAI-compatible completion endpoint. \
The batch is all-or-nothing: a single failed file aborts the run and no partial archive \
is written.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Project folder or .zip archive to convert.
    input: PathBuf,

    /// Source language (e.g. c, cpp, python, java, js, go, rust, ruby).
    #[arg(long = "from", value_name = "LANG")]
    source: String,

    /// Target language.
    #[arg(long = "to", value_name = "LANG")]
    target: String,

    /// Write the result archive to this path.
    #[arg(short, long, default_value = "converted_project.zip")]
    output: PathBuf,

    /// Model ID sent to the completion endpoint.
    #[arg(long, env = "LANGCONVERT_MODEL")]
    model: Option<String>,

    /// API key for the completion endpoint.
    #[arg(long, env = "LANGCONVERT_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the OpenAI-compatible endpoint.
    #[arg(long, env = "LANGCONVERT_API_BASE")]
    api_base: Option<String>,

    /// Max tokens the model may generate per file.
    #[arg(long, env = "LANGCONVERT_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "LANGCONVERT_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Retries per file on a transient model failure.
    #[arg(long, env = "LANGCONVERT_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Per-model-call timeout in seconds.
    #[arg(long, env = "LANGCONVERT_API_TIMEOUT", default_value_t = 30)]
    api_timeout: u64,

    /// Disable the progress bar.
    #[arg(long, env = "LANGCONVERT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "LANGCONVERT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "LANGCONVERT_QUIET")]
    quiet: bool,
}

/// Load the input path into an upload bundle: a `.zip` file becomes a
/// zip-mode bundle, a directory becomes a folder-mode bundle of every
/// file under it (relative paths preserved).
fn load_bundle(input: &Path) -> Result<Bundle> {
    if input.is_file() {
        if input
            .extension()
            .map(|e| e.eq_ignore_ascii_case("zip"))
            .unwrap_or(false)
        {
            let name = input
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "upload.zip".to_string());
            let bytes = std::fs::read(input)
                .with_context(|| format!("Failed to read {}", input.display()))?;
            return Ok(Bundle::Archives(vec![BundleFile::new(name, bytes)]));
        }
        bail!(
            "{} is a file but not a .zip archive; pass a folder or a zip",
            input.display()
        );
    }

    if !input.is_dir() {
        bail!("{} is neither a folder nor a .zip archive", input.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(input).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", input.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(input)
            .expect("walkdir yields paths under input")
            .to_string_lossy()
            .replace('\\', "/");
        let bytes = std::fs::read(entry.path())
            .with_context(|| format!("Failed to read {}", entry.path().display()))?;
        files.push(BundleFile::new(rel, bytes));
    }

    if files.is_empty() {
        bail!("{} contains no files", input.display());
    }
    Ok(Bundle::Files(files))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress;
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

    // ── Build config ─────────────────────────────────────────────────────
    let mut builder = ConversionConfig::builder()
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .max_retries(cli.max_retries)
        .api_timeout_secs(cli.api_timeout);
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(ref base) = cli.api_base {
        builder = builder.api_base(base.clone());
    }
    let config = builder.build().context("Invalid configuration")?;

    // ── Submit ───────────────────────────────────────────────────────────
    let bundle = load_bundle(&cli.input)?;
    let registry = JobRegistry::new();
    let id = submit(bundle, &cli.source, &cli.target, &config, &registry)
        .context("Failed to submit conversion job")?;

    if !cli.quiet {
        eprintln!(
            "{} {}",
            cyan("◆"),
            bold(&format!(
                "Converting {} ({} → {})",
                cli.input.display(),
                cli.source,
                cli.target
            ))
        );
    }

    // ── Observe until terminal ───────────────────────────────────────────
    let mut stream = Box::pin(
        progress_stream(&registry, &id, &config).context("Failed to observe job progress")?,
    );

    let mut renderer = show_progress.then(CliProgress::new);
    let mut last = None;
    while let Some(snap) = stream.next().await {
        if let Some(ref mut r) = renderer {
            r.render(&snap);
        }
        last = Some(snap);
    }

    let last = last.context("Job ended without reporting a final state")?;
    if let Some(ref r) = renderer {
        r.finish(&last);
    }

    if last.state == JobState::Error {
        bail!(
            "conversion failed: {}",
            last.error.as_deref().unwrap_or("unknown error")
        );
    }

    // ── Retrieve and write the archive ───────────────────────────────────
    let archive = registry
        .retrieve_archive(&id)
        .await
        .context("Failed to retrieve result archive")?;
    std::fs::write(&cli.output, &archive)
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;

    if !cli.quiet {
        eprintln!(
            "{} wrote {} {}",
            green("✔"),
            bold(&cli.output.display().to_string()),
            dim(&format!("({} bytes)", archive.len()))
        );
    }
    Ok(())
}
