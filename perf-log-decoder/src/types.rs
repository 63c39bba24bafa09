//! Core types for the performance log decoder library
//!
//! This module defines the error taxonomy, the event record that makes up the
//! merged timeline, and the small value types shared by the identifier
//! registry and the statistics engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, DecoderError>;

/// Errors that can occur while reading logs, ID lists and notes files
#[derive(Debug, thiserror::Error)]
pub enum DecoderError {
    #[error("Content type mismatch in {path:?}: found 0x{found:08x}")]
    ContentMismatch { path: PathBuf, found: u32 },

    #[error("Truncated read of {field} in {path:?}")]
    TruncatedRead { path: PathBuf, field: String },

    #[error("Implausible header in {path:?}: {reason}")]
    ImplausibleHeader { path: PathBuf, reason: String },

    #[error("Format error in {path:?} line {line}: {reason}")]
    Format {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Cannot access {path:?}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No log data could be read ({} file(s) failed)", .0.len())]
    NoLogData(Vec<FileFailure>),

    #[error("Event index {index} out of range (timeline holds {len} events)")]
    EventIndexOutOfRange { index: usize, len: usize },

    #[error("Performance ID 0x{0:08x} is already defined")]
    DuplicateIdentifier(u32),
}

impl DecoderError {
    /// Wrap an I/O error with the path it occurred on
    pub fn file_access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DecoderError::FileAccess {
            path: path.into(),
            source,
        }
    }
}

/// A log file that could not be loaded, and why
#[derive(Debug)]
pub struct FileFailure {
    /// Path as given by the caller
    pub path: PathBuf,
    /// The error that rejected the file
    pub error: DecoderError,
}

impl fmt::Display for FileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}

/// One entry or exit event in the merged timeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEvent {
    /// Performance ID with the entry/exit flag bit stripped
    pub perf_id: u32,
    /// Seconds relative to the base time of the earliest loaded file
    pub time_stamp: f64,
    /// True for an entry event, false for an exit event
    pub is_entry: bool,
    /// Same event type as the previous event for this ID
    pub sequence_error: bool,
    /// Seconds by which this event overran the ID's expected period
    pub overrun: f64,
    /// User annotation, loaded from the notes sidecar
    pub notes: String,
}

impl LogEvent {
    /// Create a fresh event with no flags, overrun or notes
    pub fn new(perf_id: u32, time_stamp: f64, is_entry: bool) -> Self {
        Self {
            perf_id,
            time_stamp,
            is_entry,
            sequence_error: false,
            overrun: 0.0,
            notes: String::new(),
        }
    }
}

/// 24-bit RGB display color
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb(pub u32);

impl Rgb {
    pub const GREEN: Rgb = Rgb(0x00ff00);
    pub const YELLOW: Rgb = Rgb(0xffff00);
    pub const BLUE: Rgb = Rgb(0x0000ff);
    pub const ORANGE: Rgb = Rgb(0xffc800);
    pub const MAGENTA: Rgb = Rgb(0xff00ff);
    pub const CYAN: Rgb = Rgb(0x00ffff);
    pub const LIGHT_GRAY: Rgb = Rgb(0xc0c0c0);
    pub const PINK: Rgb = Rgb(0xffafaf);

    /// Color value with anything above the low 24 bits dropped
    pub fn value(&self) -> u32 {
        self.0 & 0x00ff_ffff
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:06x}", self.value())
    }
}

/// Display colors handed out, in order, to identifiers without one
pub const ID_PALETTE: [Rgb; 8] = [
    Rgb::GREEN,
    Rgb::YELLOW,
    Rgb::BLUE,
    Rgb::ORANGE,
    Rgb::MAGENTA,
    Rgb::CYAN,
    Rgb::LIGHT_GRAY,
    Rgb::PINK,
];

/// Format a performance ID the way it appears in ID lists and reports
pub fn format_perf_id(perf_id: u32) -> String {
    format!("0x{:08x}", perf_id)
}
