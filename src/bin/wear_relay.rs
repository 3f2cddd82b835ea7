//! Relay CLI - Command-line interface for the Healthwear relay
//!
//! Commands:
//! - run: Dispatch NDJSON raw events and write outbound records (streaming mode)
//! - validate: Report which report each event would select and whether it decodes
//! - schema: Print the report tag table

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use healthwear_relay::dispatcher::{DispatchOutcome, DispatchStats, TelemetryDispatcher};
use healthwear_relay::sink::{CollectingSink, NdjsonSink};
use healthwear_relay::{
    EventKey, RawTelemetryEvent, RelayConfig, RelayError, ReportTag, PRODUCER_NAME,
    RELAY_VERSION,
};

/// Relay - demultiplex smart-ring telemetry into UI records
#[derive(Parser)]
#[command(name = "wear-relay")]
#[command(version = RELAY_VERSION)]
#[command(about = "Decode raw ring telemetry into outbound metric records", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dispatch raw events and write outbound records as NDJSON
    Run {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Relay configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Minimum spacing between records of the same report kind (overrides config)
        #[arg(long)]
        throttle_ms: Option<u64>,

        /// Do not relay device audio state/result events
        #[arg(long)]
        no_audio: bool,

        /// Flush output after each record
        #[arg(long)]
        flush: bool,
    },

    /// Check raw events without writing records
    Validate {
        /// Input file path (use - for stdin)
        #[arg(short, long, default_value = "-")]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the report tag table
    Schema {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout carries only records
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn run(cli: Cli) -> Result<(), RelayCliError> {
    match cli.command {
        Commands::Run {
            input,
            output,
            config,
            throttle_ms,
            no_audio,
            flush,
        } => {
            let mut relay_config = match config {
                Some(path) => RelayConfig::load(&path)?,
                None => RelayConfig::default(),
            };
            if throttle_ms.is_some() {
                relay_config.throttle_interval_ms = throttle_ms;
            }
            if no_audio {
                relay_config.relay_audio = false;
            }
            relay_config.validate()?;

            cmd_run(&input, &output, &relay_config, flush)
        }

        Commands::Validate { input, json } => cmd_validate(&input, json),

        Commands::Schema { json } => cmd_schema(json),
    }
}

fn is_stdio(path: &Path) -> bool {
    path.to_string_lossy() == "-"
}

fn open_input(input: &Path) -> Result<Box<dyn BufRead>, RelayCliError> {
    if is_stdio(input) {
        Ok(Box::new(BufReader::new(io::stdin())))
    } else {
        Ok(Box::new(BufReader::new(fs::File::open(input)?)))
    }
}

fn cmd_run(
    input: &Path,
    output: &Path,
    config: &RelayConfig,
    flush: bool,
) -> Result<(), RelayCliError> {
    if is_stdio(input) && atty::is(atty::Stream::Stdin) {
        eprintln!("Reading raw events from the terminal; one JSON object per line, Ctrl-D to finish");
    }

    let writer: Box<dyn Write> = if is_stdio(output) {
        Box::new(io::stdout())
    } else {
        Box::new(BufWriter::new(fs::File::create(output)?))
    };

    let sink = NdjsonSink::new(writer).with_flush(flush);
    let mut dispatcher = TelemetryDispatcher::with_config(sink, config);
    tracing::info!(
        session = %dispatcher.session_id(),
        throttle_ms = ?config.throttle_interval_ms,
        relay_audio = config.relay_audio,
        "relay started"
    );

    for (index, line) in open_input(input)?.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        dispatcher
            .dispatch_json(trimmed)
            .map_err(|e| RelayCliError::ParseError(format!("line {}: {}", index + 1, e)))?;
    }

    let stats = dispatcher.stats();
    let sink = dispatcher.into_sink();
    let (written, failed) = (sink.written(), sink.failed());
    let mut writer = sink.into_inner();
    writer.flush()?;

    print_summary(&stats, written, failed);
    if failed > 0 {
        return Err(RelayCliError::WriteFailed(failed));
    }
    Ok(())
}

fn print_summary(stats: &DispatchStats, written: usize, failed: usize) {
    eprintln!(
        "{} {}: {} delivered ({} written, {} write failures), {} dropped, {} unrecognized",
        PRODUCER_NAME,
        RELAY_VERSION,
        stats.delivered,
        written,
        failed,
        stats.dropped,
        stats.unrecognized
    );
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), RelayCliError> {
    // A fresh dispatcher with stock settings replays the stream so ECG phase
    // matches what `run` would see.
    let mut dispatcher = TelemetryDispatcher::new(CollectingSink::new());
    let mut lines: Vec<LineReport> = Vec::new();

    for (index, line) in open_input(input)?.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        let report = match RawTelemetryEvent::from_json(trimmed) {
            Ok(event) => {
                let outcome = dispatcher.dispatch(&event);
                dispatcher.sink_mut().drain();
                LineReport::from_outcome(index + 1, outcome)
            }
            Err(e) => LineReport {
                line: index + 1,
                tag: None,
                status: LineStatus::ParseError,
                detail: Some(e.to_string()),
            },
        };
        lines.push(report);
    }

    let report = ValidationReport {
        total_events: lines.len(),
        decoded: count(&lines, LineStatus::Decoded),
        dropped: count(&lines, LineStatus::Dropped),
        unrecognized: count(&lines, LineStatus::Unrecognized),
        parse_errors: count(&lines, LineStatus::ParseError),
        lines,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Validation Report");
        println!("=================");
        println!("Total events:   {}", report.total_events);
        println!("Decoded:        {}", report.decoded);
        println!("Dropped:        {}", report.dropped);
        println!("Unrecognized:   {}", report.unrecognized);
        println!("Parse errors:   {}", report.parse_errors);

        if !report.lines.is_empty() {
            println!("\nEvents:");
            for line in &report.lines {
                println!(
                    "  - line {}: {} ({}){}",
                    line.line,
                    line.tag.map(|t| t.wire_key()).unwrap_or("-"),
                    line.status.as_str(),
                    line.detail
                        .as_deref()
                        .map(|d| format!(" {}", d))
                        .unwrap_or_default()
                );
            }
        }
    }

    if report.parse_errors > 0 {
        Err(RelayCliError::ValidationFailed(report.parse_errors))
    } else {
        Ok(())
    }
}

fn count(lines: &[LineReport], status: LineStatus) -> usize {
    lines.iter().filter(|l| l.status == status).count()
}

fn cmd_schema(json: bool) -> Result<(), RelayCliError> {
    let rows: Vec<SchemaRow> = ReportTag::PRIORITY
        .iter()
        .map(|tag| SchemaRow {
            priority: tag.priority(),
            wire_key: tag.wire_key(),
            payload: tag.payload_shape(),
            outputs: EventKey::for_tag(*tag).iter().map(|k| k.as_str()).collect(),
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("Report tags (first match wins)");
        println!();
        for row in &rows {
            println!("{:>2}. {}", row.priority, row.wire_key);
            println!("    payload: {}", row.payload);
            println!("    outputs: {}", row.outputs.join(", "));
        }
    }

    Ok(())
}

// Error types

#[derive(Debug)]
enum RelayCliError {
    Io(io::Error),
    Relay(RelayError),
    Json(serde_json::Error),
    ValidationFailed(usize),
    WriteFailed(usize),
    ParseError(String),
}

impl From<io::Error> for RelayCliError {
    fn from(e: io::Error) -> Self {
        RelayCliError::Io(e)
    }
}

impl From<RelayError> for RelayCliError {
    fn from(e: RelayError) -> Self {
        RelayCliError::Relay(e)
    }
}

impl From<serde_json::Error> for RelayCliError {
    fn from(e: serde_json::Error) -> Self {
        RelayCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<RelayCliError> for CliError {
    fn from(e: RelayCliError) -> Self {
        match e {
            RelayCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            RelayCliError::Relay(RelayError::ConfigError(msg)) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: msg,
                hint: Some("Check the configuration file and flags".to_string()),
            },
            RelayCliError::Relay(e) => CliError {
                code: "RELAY_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            RelayCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            RelayCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} events failed to parse", count),
                hint: Some("Each line must be a JSON object keyed by report tag".to_string()),
            },
            RelayCliError::WriteFailed(count) => CliError {
                code: "WRITE_FAILED".to_string(),
                message: format!("{} records could not be written", count),
                hint: Some("Check that the output is writable and not closed early".to_string()),
            },
            RelayCliError::ParseError(msg) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: msg,
                hint: Some("Run 'wear-relay validate' for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
enum LineStatus {
    Decoded,
    Dropped,
    Unrecognized,
    ParseError,
}

impl LineStatus {
    fn as_str(&self) -> &'static str {
        match self {
            LineStatus::Decoded => "decoded",
            LineStatus::Dropped => "dropped",
            LineStatus::Unrecognized => "unrecognized",
            LineStatus::ParseError => "parse error",
        }
    }
}

#[derive(serde::Serialize)]
struct LineReport {
    line: usize,
    tag: Option<ReportTag>,
    status: LineStatus,
    detail: Option<String>,
}

impl LineReport {
    fn from_outcome(line: usize, outcome: DispatchOutcome) -> Self {
        match outcome {
            DispatchOutcome::Delivered { tag, key } => LineReport {
                line,
                tag: Some(tag),
                status: LineStatus::Decoded,
                detail: Some(key.as_str().to_string()),
            },
            DispatchOutcome::Dropped { tag, reason } => LineReport {
                line,
                tag: Some(tag),
                status: LineStatus::Dropped,
                detail: serde_json::to_value(reason)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_string)),
            },
            DispatchOutcome::Unrecognized => LineReport {
                line,
                tag: None,
                status: LineStatus::Unrecognized,
                detail: None,
            },
        }
    }
}

#[derive(serde::Serialize)]
struct ValidationReport {
    total_events: usize,
    decoded: usize,
    dropped: usize,
    unrecognized: usize,
    parse_errors: usize,
    lines: Vec<LineReport>,
}

#[derive(serde::Serialize)]
struct SchemaRow {
    priority: usize,
    wire_key: &'static str,
    payload: &'static str,
    outputs: Vec<&'static str>,
}
