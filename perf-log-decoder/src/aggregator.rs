//! Multi-file log aggregation
//!
//! Reads a batch of log files in two passes. The header pass validates every
//! file and fixes the ID capacity; the record pass appends each file's events
//! to a fresh timeline in capture-time order. A file that fails either pass
//! is skipped and reported, the rest of the batch still loads.

use crate::config::AnalysisConfig;
use crate::formats::{BaseTime, LogFileHeader, PerfLogReader};
use crate::notes;
use crate::timeline::Timeline;
use crate::types::{FileFailure, LogEvent};
use std::collections::HashSet;
use std::path::PathBuf;

/// How a new batch of files combines with what is already loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadMode {
    /// Discard the committed files and load only the new ones
    #[default]
    Replace,
    /// Reload the committed files together with the new ones
    Append,
}

/// Outcome of aggregating one batch of files
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Files whose events made it into the timeline
    pub files_loaded: usize,
    /// Files rejected during the header or record pass
    pub failures: Vec<FileFailure>,
    /// Notes sidecars that could not be applied
    pub notes_failures: Vec<FileFailure>,
    /// Events in the merged timeline
    pub event_count: usize,
    /// Events dropped because their ID exceeds the mask capacity
    pub excluded_events: usize,
    /// Distinct performance IDs referenced by the timeline
    pub distinct_ids: usize,
}

/// Builds a merged timeline from a set of log files
pub struct LogAggregator<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> LogAggregator<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    /// Read every path and merge the readable ones into a new timeline
    pub fn aggregate(&self, paths: &[PathBuf]) -> (Timeline, LoadReport) {
        let mut report = LoadReport::default();

        let mut headers: Vec<LogFileHeader> = Vec::with_capacity(paths.len());
        for path in paths {
            match PerfLogReader::read_header(path, self.config) {
                Ok(header) => headers.push(header),
                Err(error) => {
                    log::warn!("Skipping {:?}: {}", path, error);
                    report.failures.push(FileFailure {
                        path: path.clone(),
                        error,
                    });
                }
            }
        }

        let maximum_ids = headers.iter().map(|h| h.max_ids()).max().unwrap_or(0);
        headers.sort_by_key(|h| h.capture_time());

        let mut timeline = Timeline::new();
        let mut base: Option<BaseTime> = None;

        for header in headers {
            let records = match PerfLogReader::read_records(&header) {
                Ok(records) => records,
                Err(error) => {
                    log::warn!("Skipping {:?}: {}", header.file_path, error);
                    report.failures.push(FileFailure {
                        path: header.file_path.clone(),
                        error,
                    });
                    continue;
                }
            };

            let mut events = Vec::with_capacity(records.len());
            let mut positions = Vec::with_capacity(records.len());
            for (position, record) in records.iter().enumerate() {
                let base = *base.get_or_insert_with(|| BaseTime::from_record(record));

                if record.perf_id() as u64 >= maximum_ids {
                    log::trace!(
                        "Excluding ID 0x{:08x} beyond capacity {}",
                        record.perf_id(),
                        maximum_ids
                    );
                    report.excluded_events += 1;
                    continue;
                }

                events.push(LogEvent::new(
                    record.perf_id(),
                    base.time_stamp(record, header.ticks_per_second),
                    record.is_entry(),
                ));
                positions.push(position);
            }

            self.apply_notes(&header, &mut events, &positions, records.len(), &mut report);

            log::info!(
                "Loaded {} events from {:?}",
                events.len(),
                header.file_path
            );
            timeline.append_segment(header, events, positions);
            report.files_loaded += 1;
        }

        timeline.finish(maximum_ids);

        if report.excluded_events > 0 {
            log::warn!(
                "{} events reference IDs beyond the capacity of {} IDs",
                report.excluded_events,
                maximum_ids
            );
        }

        report.event_count = timeline.len();
        report.distinct_ids = timeline
            .events()
            .iter()
            .map(|e| e.perf_id)
            .collect::<HashSet<_>>()
            .len();

        (timeline, report)
    }

    /// Attach sidecar notes, whose indices count every record in the file
    fn apply_notes(
        &self,
        header: &LogFileHeader,
        events: &mut [LogEvent],
        positions: &[usize],
        record_count: usize,
        report: &mut LoadReport,
    ) {
        let path = notes::notes_path(self.config.notes_dir(), header);

        match notes::read_notes(&path) {
            Ok(entries) => {
                for (index, text) in entries {
                    match positions.binary_search(&index) {
                        Ok(position) => events[position].notes = text,
                        Err(_) if index < record_count => log::warn!(
                            "Ignoring note for record {} in {:?}: record was excluded",
                            index,
                            path
                        ),
                        Err(_) => log::warn!(
                            "Ignoring note for record {} in {:?}: file holds {} records",
                            index,
                            path,
                            record_count
                        ),
                    }
                }
            }
            Err(error) => {
                log::warn!("Cannot apply notes from {:?}: {}", path, error);
                report.notes_failures.push(FileFailure { path, error });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::test_support::LogImage;
    use crate::types::DecoderError;
    use std::fs;
    use tempfile::TempDir;

    fn aggregate(dir: &TempDir, paths: &[PathBuf]) -> (Timeline, LoadReport) {
        let config = AnalysisConfig::new().with_notes_dir(dir.path());
        LogAggregator::new(&config).aggregate(paths)
    }

    #[test]
    fn test_merge_in_capture_order() {
        let dir = TempDir::new().unwrap();
        let first = LogImage::new(10, 0)
            .with_events(&[(1, true, 5000), (1, false, 5100)])
            .write_to(dir.path(), "a.dat");
        let second = LogImage::new(5, 0)
            .with_events(&[(2, true, 0), (2, false, 100)])
            .write_to(dir.path(), "b.dat");
        let third = LogImage::new(20, 0)
            .with_events(&[(3, true, 9000)])
            .write_to(dir.path(), "c.dat");

        let (timeline, report) = aggregate(&dir, &[first, second, third]);

        let ids: Vec<u32> = timeline.events().iter().map(|e| e.perf_id).collect();
        assert_eq!(ids, vec![2, 2, 1, 1, 3]);
        assert_eq!(timeline.gap_indices().collect::<Vec<_>>(), vec![2, 4]);
        assert_eq!(timeline.events()[0].time_stamp, 0.0);
        assert_eq!(timeline.events()[2].time_stamp, 5.0);
        assert_eq!(report.files_loaded, 3);
        assert_eq!(report.distinct_ids, 3);
    }

    #[test]
    fn test_capacity_boundary() {
        let dir = TempDir::new().unwrap();
        let path = LogImage::new(1, 0)
            .with_events(&[(31, true, 0), (32, true, 10), (31, false, 20)])
            .write_to(dir.path(), "cap.dat");

        let (timeline, report) = aggregate(&dir, &[path]);

        assert_eq!(timeline.maximum_ids(), 32);
        assert_eq!(timeline.len(), 2);
        assert!(timeline.events().iter().all(|e| e.perf_id == 31));
        assert_eq!(report.excluded_events, 1);
    }

    #[test]
    fn test_bad_file_is_skipped() {
        let dir = TempDir::new().unwrap();
        let good = LogImage::new(1, 0)
            .with_events(&[(1, true, 0)])
            .write_to(dir.path(), "good.dat");
        let bad = dir.path().join("bad.dat");
        fs::write(&bad, b"not a log").unwrap();
        let missing = dir.path().join("missing.dat");

        let (timeline, report) = aggregate(&dir, &[bad, good, missing]);

        assert_eq!(timeline.len(), 1);
        assert_eq!(report.files_loaded, 1);
        assert_eq!(report.failures.len(), 2);
        assert!(matches!(report.failures[0].error, DecoderError::ContentMismatch { .. }));
        assert!(matches!(report.failures[1].error, DecoderError::FileAccess { .. }));
    }

    #[test]
    fn test_notes_are_file_relative() {
        let dir = TempDir::new().unwrap();
        let early = LogImage::new(1, 0)
            .with_events(&[(1, true, 0), (1, false, 10)])
            .write_to(dir.path(), "early.dat");
        let late = LogImage::new(2, 7)
            .with_events(&[(1, true, 3000), (1, false, 3010)])
            .write_to(dir.path(), "late.dat");
        fs::write(dir.path().join("perf.2.7.notes"), "1,finished late\n").unwrap();

        let (timeline, report) = aggregate(&dir, &[late, early]);

        assert_eq!(timeline.events()[3].notes, "finished late");
        assert!(timeline.events()[..3].iter().all(|e| e.notes.is_empty()));
        assert!(report.notes_failures.is_empty());
    }

    #[test]
    fn test_notes_follow_records_past_excluded_ids() {
        let dir = TempDir::new().unwrap();
        // One mask word: capacity of 32 IDs, so ID 40 is excluded
        let narrow = LogImage::new(1, 0)
            .with_events(&[(40, true, 0), (1, true, 5), (1, false, 9)])
            .write_to(dir.path(), "narrow.dat");
        let wide = LogImage::new(2, 0)
            .with_mask(vec![0, 0])
            .with_events(&[(40, true, 100)])
            .write_to(dir.path(), "wide.dat");
        fs::write(dir.path().join("perf.1.0.notes"), "2,exit of id1\n0,on excluded\n").unwrap();

        let (alone, report) = aggregate(&dir, &[narrow.clone()]);
        assert_eq!(report.excluded_events, 1);
        assert_eq!(alone.len(), 2);
        assert!(!alone.events()[1].is_entry);
        assert_eq!(alone.events()[1].notes, "exit of id1");
        assert!(alone.events()[0].notes.is_empty());

        let (merged, report) = aggregate(&dir, &[narrow, wide]);
        assert_eq!(report.excluded_events, 0);
        assert_eq!(merged.events()[0].notes, "on excluded");
        assert_eq!(merged.events()[2].notes, "exit of id1");
        assert!(merged.events()[1].notes.is_empty());
    }

    #[test]
    fn test_malformed_notes_do_not_block_load() {
        let dir = TempDir::new().unwrap();
        let path = LogImage::new(4, 0)
            .with_events(&[(1, true, 0)])
            .write_to(dir.path(), "n.dat");
        fs::write(dir.path().join("perf.4.0.notes"), "zero,oops\n").unwrap();

        let (timeline, report) = aggregate(&dir, &[path]);

        assert_eq!(timeline.len(), 1);
        assert_eq!(report.notes_failures.len(), 1);
    }
}
