//! Touchprint CLI - offline tooling for the stroke biometrics client
//!
//! Commands:
//! - extract: Turn recorded touch events into feature records
//! - count: Ask the store how many strokes it holds for a user
//! - replay: Drive a live session with recorded touch events
//! - doctor: Show resolved configuration and probe the store and matcher

use clap::{Parser, Subcommand, ValueEnum};
use std::env;
use std::fs;
use std::io::{self, BufRead, BufReader, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use touchprint::config::ClientConfig;
use touchprint::session::{Mode, QueuedListener, Session};
use touchprint::stroke::{FeatureExtractor, StrokeAssembler, TouchEvent};
use touchprint::wire::{MatchService, WireClient};
use touchprint::{TouchprintError, PRODUCER_NAME, TOUCHPRINT_VERSION};

const DEBUG_LOG_ENV: &str = "TOUCHPRINT_DEBUG_LOG";

/// Touchprint - touch-stroke feature extraction and verification client
#[derive(Parser)]
#[command(name = "touchprint")]
#[command(author = "Synheart AI Inc")]
#[command(version = TOUCHPRINT_VERSION)]
#[command(about = "Extract stroke features and talk to the stroke matcher", long_about = None)]
struct Cli {
    /// JSON config file (environment variables still override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Turn recorded touch events (NDJSON) into feature records (NDJSON)
    Extract {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// User id stamped into each record
        #[arg(long, default_value = "0")]
        user: i64,

        /// Percentile of pairwise velocity to report (defaults to the config value)
        #[arg(long)]
        percentile: Option<f64>,
    },

    /// Ask the store how many strokes it holds for a user
    Count {
        #[arg(long)]
        user: i64,
    },

    /// Drive a live session with recorded touch events
    Replay {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long)]
        user: i64,

        #[arg(long, value_enum, default_value = "training")]
        mode: ModeArg,

        /// Strokes accepted in a training phase
        #[arg(long, default_value = "20")]
        cap: u32,

        /// Strokes already collected for this phase
        #[arg(long, default_value = "0")]
        start: u32,

        /// Seconds to wait for outstanding requests before exiting
        #[arg(long, default_value = "10")]
        settle_secs: u64,
    },

    /// Show resolved configuration and probe the store and matcher
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Training,
    Free,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Training => Mode::Training,
            ModeArg::Free => Mode::Free,
        }
    }
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let error = CliError::from(e);
            eprintln!(
                "{}",
                serde_json::to_string(&error).unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn init_logging() {
    let debug_enabled = env::var(DEBUG_LOG_ENV)
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false);
    let filter = if debug_enabled {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn run(cli: Cli) -> Result<(), TouchprintCliError> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Extract {
            input,
            user,
            percentile,
        } => cmd_extract(&input, user, percentile.unwrap_or(config.velocity_percentile)),

        Commands::Count { user } => cmd_count(config, user),

        Commands::Replay {
            input,
            user,
            mode,
            cap,
            start,
            settle_secs,
        } => cmd_replay(
            config,
            &input,
            user,
            mode.into(),
            cap,
            start,
            Duration::from_secs(settle_secs),
        ),

        Commands::Doctor { json } => cmd_doctor(&config, json),
    }
}

fn load_config(path: Option<&Path>) -> Result<ClientConfig, TouchprintCliError> {
    let config = match path {
        Some(path) => ClientConfig::from_json(&fs::read_to_string(path)?)?,
        None => ClientConfig::default(),
    };
    Ok(config.with_env_overrides()?)
}

fn open_input(input: &Path) -> Result<Box<dyn BufRead>, TouchprintCliError> {
    if input.as_os_str() == "-" {
        Ok(Box::new(BufReader::new(io::stdin())))
    } else {
        Ok(Box::new(BufReader::new(fs::File::open(input)?)))
    }
}

/// Parse NDJSON touch events, skipping blank lines
fn read_events(input: &Path) -> Result<Vec<TouchEvent>, TouchprintCliError> {
    let mut events = Vec::new();
    for (index, line) in open_input(input)?.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let event: TouchEvent = serde_json::from_str(&line).map_err(|e| {
            TouchprintCliError::ParseError(format!("line {}: {}", index + 1, e))
        })?;
        events.push(event);
    }
    if events.is_empty() {
        return Err(TouchprintCliError::NoEvents);
    }
    Ok(events)
}

fn cmd_extract(input: &Path, user: i64, percentile: f64) -> Result<(), TouchprintCliError> {
    let events = read_events(input)?;
    let extractor = FeatureExtractor::new(percentile);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut assembler = StrokeAssembler::new();
    let mut emitted = 0usize;
    for event in events {
        if let Some(stroke) = assembler.push(event) {
            let record = extractor.extract(user, &stroke);
            writeln!(out, "{}", record.to_json()?)?;
            emitted += 1;
        }
    }
    out.flush()?;

    if emitted == 0 {
        return Err(TouchprintCliError::NoStrokes);
    }
    debug!(strokes = emitted, "Extraction finished");
    Ok(())
}

fn cmd_count(config: ClientConfig, user: i64) -> Result<(), TouchprintCliError> {
    let count = WireClient::new(config).count(user)?;
    println!("{count}");
    Ok(())
}

fn cmd_replay(
    config: ClientConfig,
    input: &Path,
    user: i64,
    mode: Mode,
    cap: u32,
    start: u32,
    settle: Duration,
) -> Result<(), TouchprintCliError> {
    let events = read_events(input)?;
    let notifications = QueuedListener::new();
    let mut session = Session::from_config(config, notifications.clone());
    session.initialize(user, mode, cap, start)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut strokes = 0usize;

    for event in events {
        if let Some(outcome) = session.handle_event(event) {
            strokes += 1;
            writeln!(out, "{}", serde_json::to_string(&outcome)?)?;
        }
        session.process_completions();
        for note in notifications.drain() {
            writeln!(out, "{}", serde_json::to_string(&note)?)?;
        }
    }

    session.settle(settle);
    for note in notifications.drain() {
        writeln!(out, "{}", serde_json::to_string(&note)?)?;
    }

    let report = ReplayReport {
        strokes,
        finished_at: Utc::now().to_rfc3339(),
        session: session.summary(),
    };
    if atty::is(atty::Stream::Stdout) {
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        writeln!(out, "{}", serde_json::to_string(&report)?)?;
    }
    out.flush()?;

    info!(strokes, pending = report.session.pending_requests, "Replay finished");
    Ok(())
}

fn cmd_doctor(config: &ClientConfig, json: bool) -> Result<(), TouchprintCliError> {
    let checks = vec![
        probe("store", &config.store_addr, config.connect_timeout()),
        probe("matcher", &config.auth_addr, config.connect_timeout()),
    ];

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: TOUCHPRINT_VERSION.to_string(),
        config: config.clone(),
        checks,
    };
    let failed = report
        .checks
        .iter()
        .any(|c| matches!(c.status, CheckStatus::Error));

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Touchprint Doctor Report");
        println!("========================");
        println!("Producer: {}", report.producer);
        println!("Version: {}", report.version);
        println!("Store: {}", report.config.store_addr);
        println!(
            "Matcher: {}{}/<user>",
            report.config.auth_addr, report.config.auth_path
        );
        println!();
        for check in &report.checks {
            let icon = match check.status {
                CheckStatus::Ok => "✓",
                CheckStatus::Error => "✗",
            };
            println!("{} {}: {}", icon, check.name, check.message);
        }
    }

    if failed {
        return Err(TouchprintCliError::DoctorFailed);
    }
    Ok(())
}

fn probe(name: &str, addr: &str, timeout: Duration) -> DoctorCheck {
    let resolved = addr.to_socket_addrs().map(|mut addrs| addrs.next());
    let (status, message) = match resolved {
        Ok(Some(socket)) => match TcpStream::connect_timeout(&socket, timeout) {
            Ok(_) => (CheckStatus::Ok, format!("{addr} is reachable")),
            Err(e) => (CheckStatus::Error, format!("{addr} is unreachable: {e}")),
        },
        Ok(None) => (CheckStatus::Error, format!("{addr} resolved to no addresses")),
        Err(e) => (CheckStatus::Error, format!("cannot resolve {addr}: {e}")),
    };
    DoctorCheck {
        name: name.to_string(),
        status,
        message,
    }
}

// Error types

#[derive(Debug)]
enum TouchprintCliError {
    Io(io::Error),
    Client(TouchprintError),
    Json(serde_json::Error),
    NoEvents,
    NoStrokes,
    DoctorFailed,
    ParseError(String),
}

impl From<io::Error> for TouchprintCliError {
    fn from(e: io::Error) -> Self {
        TouchprintCliError::Io(e)
    }
}

impl From<TouchprintError> for TouchprintCliError {
    fn from(e: TouchprintError) -> Self {
        TouchprintCliError::Client(e)
    }
}

impl From<serde_json::Error> for TouchprintCliError {
    fn from(e: serde_json::Error) -> Self {
        TouchprintCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<TouchprintCliError> for CliError {
    fn from(e: TouchprintCliError) -> Self {
        match e {
            TouchprintCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            TouchprintCliError::Client(e) => {
                let hint = match &e {
                    TouchprintError::NetworkFailure(_) => {
                        Some("Run 'touchprint doctor' to check connectivity".to_string())
                    }
                    TouchprintError::ConfigError(_) => {
                        Some("Check the config file and TOUCHPRINT_* variables".to_string())
                    }
                    _ => None,
                };
                CliError {
                    code: e.code().to_uppercase(),
                    message: e.to_string(),
                    hint,
                }
            }
            TouchprintCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            TouchprintCliError::NoEvents => CliError {
                code: "NO_EVENTS".to_string(),
                message: "No touch events found in input".to_string(),
                hint: Some("Ensure input file is not empty".to_string()),
            },
            TouchprintCliError::NoStrokes => CliError {
                code: "NO_STROKES".to_string(),
                message: "No completed strokes found in input".to_string(),
                hint: Some("Each stroke needs a down event and a matching up event".to_string()),
            },
            TouchprintCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
            TouchprintCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some(
                    "Each line must be a touch event: {\"action\":\"down\",...}".to_string(),
                ),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ReplayReport {
    strokes: usize,
    finished_at: String,
    session: touchprint::session::SessionSummary,
}

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    config: ClientConfig,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Error,
}
