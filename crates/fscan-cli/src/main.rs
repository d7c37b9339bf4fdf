//! CLI entry point for the fscan directory scanner.
//!
//! This binary wires the scanner to a terminal: it parses arguments, sets
//! up logging, loads configuration, forwards Ctrl-C to
//! [`Scanner::interrupt`], and turns scan outcomes into output and exit
//! statuses.
//!
//! # Usage
//!
//! ```bash
//! fscan [OPTIONS] <COMMAND>
//!
//! # One scan, one path per line
//! fscan scan --path /var/log --mask '*.log' --min-size-kb 4
//!
//! # Content search with JSON output
//! fscan scan --path ./docs --mask '*.md' --contains TODO --format json
//!
//! # Many scans sharing one cache, one JSON request per stdin line
//! echo '{"path": "/var/log", "mask": "*.gz"}' | fscan batch
//! ```
//!
//! # Exit Status
//!
//! | Status | Meaning                                   |
//! |--------|-------------------------------------------|
//! | 0      | at least one file matched                 |
//! | 1      | the scan could not run                    |
//! | 2      | no file matched                           |
//! | 64     | the request was malformed                 |
//! | 130    | interrupted; partial results were printed |

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use fscan_core::{Config, ScanParams};
use fscan_scanner::{ScanError, ScanOutcome, Scanner, StatsSnapshot};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status for a scan that could not run.
const EXIT_FAILURE: u8 = 1;
/// Exit status for a scan without matches.
const EXIT_NOT_FOUND: u8 = 2;
/// Exit status for a malformed request (`EX_USAGE`).
const EXIT_INVALID_ARGUMENT: u8 = 64;
/// Exit status for an interrupted scan (128 + SIGINT).
const EXIT_INTERRUPTED: u8 = 130;

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Find files by name, size, modification date and content.
#[derive(Parser)]
#[command(name = "fscan", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file.
    #[arg(short, long, global = true, env = "FSCAN_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Lifetime of cached results in milliseconds (overrides the config file).
    #[arg(long, global = true, env = "FSCAN_CACHE_TTL_MS")]
    cache_ttl_ms: Option<u64>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Scan one directory tree.
    Scan(ScanArgs),

    /// Read one JSON request per line from stdin and answer each with one
    /// JSON line on stdout.
    Batch,
}

/// Filters for a single scan.
#[derive(Args)]
struct ScanArgs {
    /// Directory to scan.
    #[arg(short, long)]
    path: String,

    /// Wildcard for file names: `*` is any run of characters, `?` exactly one.
    #[arg(short, long)]
    mask: String,

    /// Worker threads: `auto` or a positive count.
    #[arg(short, long, default_value = "auto")]
    threads: String,

    /// Minimum file size in KiB, inclusive.
    #[arg(long)]
    min_size_kb: Option<u64>,

    /// Maximum file size in KiB, inclusive.
    #[arg(long)]
    max_size_kb: Option<u64>,

    /// Only files modified on or after this day (YYYY-MM-DD).
    #[arg(long)]
    modified_after: Option<String>,

    /// Only files modified on or before the start of this day (YYYY-MM-DD).
    #[arg(long)]
    modified_before: Option<String>,

    /// Only text files containing this literal text.
    #[arg(long = "contains")]
    contains_text: Option<String>,

    /// Output format.
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl ScanArgs {
    fn to_params(&self) -> ScanParams {
        ScanParams {
            path: self.path.clone(),
            mask: self.mask.clone(),
            threads: Some(self.threads.clone()),
            min_size_kb: self.min_size_kb,
            max_size_kb: self.max_size_kb,
            modified_after: self.modified_after.clone(),
            modified_before: self.modified_before.clone(),
            contains_text: self.contains_text.clone(),
        }
    }
}

/// Scan output format.
#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One path per line.
    Text,
    /// A single JSON document.
    Json,
}

// =============================================================================
// RESPONSES
// =============================================================================

/// The answer to one scan request.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum Response {
    /// At least one file matched.
    Found {
        paths: Vec<Utf8PathBuf>,
        cached: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        stats: Option<StatsSnapshot>,
    },
    /// Nothing matched.
    NotFound { message: String },
    /// The scan was interrupted; `paths` is what it found until then.
    Interrupted { paths: Vec<Utf8PathBuf> },
    /// The request was malformed.
    InvalidArgument { message: String },
    /// The scan could not run.
    Error { message: String },
}

impl Response {
    fn from_result(mask: &str, result: Result<ScanOutcome, ScanError>) -> Self {
        match result {
            Ok(ScanOutcome::Interrupted(report)) => Self::Interrupted {
                paths: report.paths,
            },
            Ok(outcome) if outcome.paths().is_empty() => Self::not_found(mask),
            Ok(ScanOutcome::Completed(report)) => Self::Found {
                paths: report.paths,
                cached: false,
                stats: Some(report.stats),
            },
            Ok(ScanOutcome::Cached(paths)) => Self::Found {
                paths,
                cached: true,
                stats: None,
            },
            Err(e) if e.is_invalid_argument() => Self::InvalidArgument {
                message: e.to_string(),
            },
            Err(e) => Self::Error {
                message: e.to_string(),
            },
        }
    }

    fn not_found(mask: &str) -> Self {
        Self::NotFound {
            message: format!("Not found with mask: {mask}"),
        }
    }

    const fn exit_code(&self) -> u8 {
        match self {
            Self::Found { .. } => 0,
            Self::NotFound { .. } => EXIT_NOT_FOUND,
            Self::Interrupted { .. } => EXIT_INTERRUPTED,
            Self::InvalidArgument { .. } => EXIT_INVALID_ARGUMENT,
            Self::Error { .. } => EXIT_FAILURE,
        }
    }
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default. Logs go
/// to stderr so stdout carries only results.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},ignore=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Builds the [`Config`] from the config file and CLI overrides.
fn load_config(cli: &Cli) -> color_eyre::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            info!(path = %path, "Loading configuration");
            Config::from_json_file(path)?
        }
        None => Config::default(),
    };

    if let Some(ttl_ms) = cli.cache_ttl_ms {
        config.cache.ttl_ms = ttl_ms;
    }
    config.validate()?;

    Ok(config)
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Runs one scan on the blocking pool, interrupting it on Ctrl-C.
///
/// Returns the scan result and whether Ctrl-C was received.
async fn execute(
    scanner: &Scanner,
    params: ScanParams,
) -> color_eyre::Result<(Result<ScanOutcome, ScanError>, bool)> {
    let worker = scanner.clone();
    let mut task = tokio::task::spawn_blocking(move || worker.scan_params(params));

    tokio::select! {
        joined = &mut task => Ok((joined?, false)),
        _ = tokio::signal::ctrl_c() => {
            warn!("Received Ctrl-C, interrupting scan");
            scanner.interrupt();
            Ok((task.await?, true))
        }
    }
}

/// Runs a single scan and prints its response.
async fn run_scan(scanner: &Scanner, args: &ScanArgs) -> color_eyre::Result<ExitCode> {
    let (result, _) = execute(scanner, args.to_params()).await?;
    let response = Response::from_result(&args.mask, result);

    match args.format {
        OutputFormat::Json => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            serde_json::to_writer_pretty(&mut handle, &response)?;
            writeln!(handle)?;
        }
        OutputFormat::Text => print_text(&response)?,
    }

    Ok(ExitCode::from(response.exit_code()))
}

/// Answers JSON-lines requests from stdin until EOF or Ctrl-C.
///
/// Every request is answered, malformed ones included. The exit status is
/// 130 after an interrupt and 0 otherwise.
async fn run_batch(scanner: &Scanner) -> color_eyre::Result<ExitCode> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut answered = 0_usize;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                info!(answered, "Batch interrupted while idle");
                return Ok(ExitCode::from(EXIT_INTERRUPTED));
            }
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let (response, interrupted) = match serde_json::from_str::<ScanParams>(&line) {
            Ok(params) => {
                let mask = params.mask.clone();
                let (result, interrupted) = execute(scanner, params).await?;
                (Response::from_result(&mask, result), interrupted)
            }
            Err(e) => (
                Response::InvalidArgument {
                    message: format!("malformed request: {e}"),
                },
                false,
            ),
        };

        {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            serde_json::to_writer(&mut handle, &response)?;
            writeln!(handle)?;
            handle.flush()?;
        }
        answered += 1;

        if interrupted {
            info!(answered, "Batch interrupted");
            return Ok(ExitCode::from(EXIT_INTERRUPTED));
        }
    }

    info!(answered, "Batch complete");
    Ok(ExitCode::SUCCESS)
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Prints a response as plain text: paths on stdout, problems on stderr.
fn print_text(response: &Response) -> std::io::Result<()> {
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let stderr = std::io::stderr();
    let mut err = stderr.lock();

    match response {
        Response::Found { paths, .. } => {
            for path in paths {
                writeln!(out, "{path}")?;
            }
        }
        Response::NotFound { message } => writeln!(out, "{message}")?,
        Response::Interrupted { paths } => {
            for path in paths {
                writeln!(out, "{path}")?;
            }
            writeln!(err, "Scan interrupted, {} partial result(s)", paths.len())?;
        }
        Response::InvalidArgument { message } => writeln!(err, "Invalid argument: {message}")?,
        Response::Error { message } => writeln!(err, "Scan failed: {message}")?,
    }

    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<ExitCode> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Load configuration and create the one scanner all requests share
    let config = load_config(&cli)?;
    let scanner = Scanner::new(&config);

    // 5. Route to appropriate command
    match &cli.command {
        Commands::Scan(args) => run_scan(&scanner, args).await,
        Commands::Batch => run_batch(&scanner).await,
    }
}
