//! Log file format parsers
//!
//! This module contains the parser for cFE performance log files. The
//! reader is split into a header pass and a record pass so that a batch of
//! files can be ordered by capture time before any records are read.

pub mod perf_log;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export parser types
pub use perf_log::{
    BaseTime, Endianness, LogFileHeader, PerfLogReader, RawRecord, TriggerMode, TriggerState,
};
