//! Performance Log Analyzer CLI Application
//!
//! Command-line front end for the perf-log-decoder library. It adds:
//! - TOML configuration with command-line overrides
//! - ID list loading and saving
//! - Event notes from the command line
//! - Report generation (TXT/JSON)

use anyhow::{bail, Context, Result};
use clap::Parser;
use perf_log_decoder::{Analyzer, LoadMode};
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

mod config;
mod report;

use config::{AppConfig, OutputFormat};
use report::ReportOptions;

/// Performance Log Analyzer - Merge cFS performance logs and report timing statistics
#[derive(Parser, Debug)]
#[command(name = "perf-log-cli")]
#[command(about = "Analyze cFS performance logs", long_about = None)]
#[command(version)]
struct Args {
    /// Performance log file(s) (can be repeated, or ';'-separated)
    #[arg(short, long, value_name = "FILE")]
    log: Vec<String>,

    /// ID list file to load before the logs
    #[arg(long, value_name = "FILE")]
    ids: Option<PathBuf>,

    /// Write the identifier list to this file after analysis
    #[arg(long, value_name = "FILE")]
    save_ids: Option<PathBuf>,

    /// Compress the gaps between concatenated files
    #[arg(long)]
    hide_gaps: bool,

    /// Directory holding the notes sidecar files
    #[arg(long, value_name = "DIR")]
    notes_dir: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,

    /// Output file for the report (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Path to configuration file (config.toml)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Include the log file headers in the report
    #[arg(long)]
    headers: bool,

    /// Include every event in the report
    #[arg(long)]
    events: bool,

    /// Set the note of an event (INDEX:TEXT, can be repeated; empty TEXT clears)
    #[arg(long, value_name = "INDEX:TEXT")]
    note: Vec<String>,

    /// Decimal places for times (default: derived from the log clock)
    #[arg(long, value_name = "DIGITS")]
    time_precision: Option<usize>,

    /// Verbosity level (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("Performance Log Analyzer CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using decoder library v{}", perf_log_decoder::VERSION);

    let config = resolve_config(&args)?;

    if config.input.logs.is_empty() {
        println!("Performance Log Analyzer - No input specified");
        println!("\nQuick Start:");
        println!("  perf-log-cli --log cpu1_perf.dat");
        println!("  perf-log-cli --log \"a.dat;b.dat\" --ids perf_ids.txt --hide-gaps");
        println!("\nFor repeatable runs:");
        println!("  perf-log-cli --config config.toml");
        println!("\nUse --help for more options");
        return Ok(());
    }

    run(&args, config)
}

/// Load the config file (if any) and apply the command-line overrides
fn resolve_config(args: &Args) -> Result<AppConfig> {
    let mut config = match &args.config {
        Some(path) => {
            log::info!("Loading configuration from: {:?}", path);
            config::load_config(path)?
        }
        None => AppConfig::default(),
    };

    let logs = split_log_args(&args.log);
    if !logs.is_empty() {
        config.input.logs = logs;
    }
    if args.ids.is_some() {
        config.input.ids = args.ids.clone();
    }
    if args.hide_gaps {
        config.analysis.show_gaps = false;
    }
    if let Some(dir) = &args.notes_dir {
        config.analysis.notes_dir = Some(dir.clone());
    }
    if let Some(format) = args.format {
        config.output.format = format;
    }
    if args.output.is_some() {
        config.output.output_file = args.output.clone();
    }
    if args.time_precision.is_some() {
        config.output.time_precision = args.time_precision;
    }
    config.output.include_headers |= args.headers;
    config.output.include_events |= args.events;

    Ok(config)
}

/// Accept both repeated `--log` flags and ';'-separated lists
fn split_log_args(values: &[String]) -> Vec<PathBuf> {
    values
        .iter()
        .flat_map(|v| v.split(';'))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
        .collect()
}

/// Parse `INDEX:TEXT`
fn parse_note(value: &str) -> Result<(usize, &str)> {
    let Some((index, text)) = value.split_once(':') else {
        bail!("Invalid note {:?}: expected INDEX:TEXT", value);
    };
    let index = index
        .trim()
        .parse::<usize>()
        .with_context(|| format!("Invalid event index in note {:?}", value))?;
    Ok((index, text))
}

fn run(args: &Args, config: AppConfig) -> Result<()> {
    let mut analyzer = Analyzer::with_config(config.analysis.clone());

    // IDs first so the names are known when the log's IDs get sorted
    let id_summary = match &config.input.ids {
        Some(path) => Some(
            analyzer
                .load_ids(path)
                .with_context(|| format!("Failed to load ID file: {:?}", path))?,
        ),
        None => None,
    };

    let load = analyzer
        .load_logs(&config.input.logs, LoadMode::Replace)
        .context("Failed to load performance logs")?;
    for failure in &load.failures {
        log::warn!("Skipped {}", failure);
    }
    for failure in &load.notes_failures {
        log::warn!("Ignored notes: {}", failure);
    }

    for value in &args.note {
        let (index, text) = parse_note(value)?;
        analyzer
            .set_event_note(index, text)
            .with_context(|| format!("Failed to set note on event {}", index))?;
        log::info!("Note set on event {}", index);
    }

    if let Some(path) = &args.save_ids {
        analyzer
            .save_ids(path)
            .with_context(|| format!("Failed to save ID file: {:?}", path))?;
        log::info!("ID file written: {:?}", path);
    }

    let options = ReportOptions {
        time_precision: config
            .output
            .time_precision
            .unwrap_or_else(|| analyzer.time_precision()),
        include_headers: config.output.include_headers,
        include_events: config.output.include_events,
    };
    let report = report::build_report(&analyzer, &load, id_summary.as_ref(), &options);

    let rendered = match config.output.format {
        OutputFormat::Txt => report::txt::render(&report),
        OutputFormat::Json => report::json::render(&report)?,
    };

    match &config.output.output_file {
        Some(path) => {
            fs::write(path, rendered)
                .with_context(|| format!("Failed to write report: {:?}", path))?;
            log::info!("Report written: {:?}", path);
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
        }
    }

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
