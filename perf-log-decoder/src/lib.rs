//! Performance Log Decoder Library
//!
//! A reusable library for decoding cFE performance logs and computing timing
//! statistics for the performance IDs they record.
//!
//! # Architecture
//!
//! The pipeline runs leaf-first:
//! - Reads each log file's header and ring buffer records (endian-aware)
//! - Merges files in capture order into one timeline, recording gaps
//! - Flags out-of-order time stamps and repeated entry/exit events
//! - Maps logged IDs onto the identifier registry (names, colors, frequencies)
//! - Computes per-ID and aggregate durations, intervals and overruns
//!
//! The library does NOT:
//! - Plot or otherwise visualize events
//! - Scan source code for ID definitions
//! - Ingest logs while they are being written
//!
//! Report rendering lives in the application layer (perf-log-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use perf_log_decoder::{AnalysisConfig, Analyzer, LoadMode};
//! use std::path::{Path, PathBuf};
//!
//! let config = AnalysisConfig::new()
//!     .with_show_gaps(false)
//!     .with_notes_dir("notes");
//! let mut analyzer = Analyzer::with_config(config);
//!
//! // Names and expected frequencies for the IDs
//! analyzer.load_ids(Path::new("perf_ids.txt")).unwrap();
//!
//! let logs = vec![PathBuf::from("cpu1_a.dat"), PathBuf::from("cpu1_b.dat")];
//! let report = analyzer.load_logs(&logs, LoadMode::Replace).unwrap();
//! for failure in &report.failures {
//!     eprintln!("Skipped {}", failure);
//! }
//!
//! for identifier in analyzer.registry().iter() {
//!     println!(
//!         "{}: {} entries, {:.6} s active",
//!         identifier.effective_name(),
//!         identifier.stats.entry_count,
//!         identifier.stats.total_active
//!     );
//! }
//! println!("Overall active: {:.6} s", analyzer.statistics().total_active);
//! ```

// Public modules
pub mod aggregator;
pub mod analyzer;
pub mod config;
pub mod consistency;
pub mod formats;
pub mod ids;
pub mod notes;
pub mod statistics;
pub mod timeline;
pub mod types;

// Re-export main types for convenience
pub use aggregator::{LoadMode, LoadReport, LogAggregator};
pub use analyzer::Analyzer;
pub use config::AnalysisConfig;
pub use consistency::ConsistencyReport;
pub use formats::{Endianness, LogFileHeader, TriggerMode, TriggerState};
pub use ids::{IdLoadSummary, IdRegistry, PerformanceIdentifier};
pub use statistics::{
    percent_of, AggregateExtremum, AggregateMinMax, AggregateStatistics, Extremum, IdStatistics,
    MinMax,
};
pub use timeline::{Gap, Segment, Timeline};
pub use types::{format_perf_id, DecoderError, FileFailure, LogEvent, Result, Rgb};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
