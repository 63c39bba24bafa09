//! Main analyzer API
//!
//! The `Analyzer` owns the committed analysis state: the merged timeline, the
//! identifier registry, the consistency report and the aggregate statistics.
//! Loading logs builds all of it afresh and only replaces the committed state
//! when at least one file produced events, so a failed load leaves the
//! previous result intact.

use crate::aggregator::{LoadMode, LoadReport, LogAggregator};
use crate::config::AnalysisConfig;
use crate::consistency::{check_consistency, ConsistencyReport};
use crate::formats::LogFileHeader;
use crate::ids::{self, IdLoadSummary, IdRegistry, PerformanceIdentifier};
use crate::notes;
use crate::statistics::{AggregateStatistics, StatisticsEngine};
use crate::timeline::{Gap, Timeline};
use crate::types::{DecoderError, LogEvent, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Entry point for loading performance logs and querying their statistics
#[derive(Debug, Clone)]
pub struct Analyzer {
    config: AnalysisConfig,
    timeline: Timeline,
    registry: IdRegistry,
    consistency: ConsistencyReport,
    statistics: AggregateStatistics,
}

impl Analyzer {
    /// Create an analyzer with the default configuration
    pub fn new() -> Self {
        Self::with_config(AnalysisConfig::default())
    }

    pub fn with_config(config: AnalysisConfig) -> Self {
        Self {
            config,
            timeline: Timeline::new(),
            registry: IdRegistry::new(),
            consistency: ConsistencyReport::default(),
            statistics: AggregateStatistics::default(),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Load a batch of log files
    ///
    /// Files that cannot be read are listed in the returned report. If no
    /// file yields any events, `NoLogData` is returned and nothing changes.
    ///
    /// # Example
    /// ```no_run
    /// use perf_log_decoder::{Analyzer, LoadMode};
    /// use std::path::PathBuf;
    ///
    /// let mut analyzer = Analyzer::new();
    /// let report = analyzer
    ///     .load_logs(&[PathBuf::from("cpu1_perf.dat")], LoadMode::Replace)
    ///     .unwrap();
    /// println!("{} events, {} IDs", report.event_count, report.distinct_ids);
    /// ```
    pub fn load_logs(&mut self, paths: &[PathBuf], mode: LoadMode) -> Result<LoadReport> {
        let mut batch: Vec<PathBuf> = match mode {
            LoadMode::Replace => Vec::new(),
            LoadMode::Append => self.timeline.headers().map(|h| h.file_path.clone()).collect(),
        };
        for path in paths {
            if !batch.contains(path) {
                batch.push(path.clone());
            }
        }

        log::info!("Loading {} log file(s) ({:?})", batch.len(), mode);

        let (mut timeline, report) = LogAggregator::new(&self.config).aggregate(&batch);
        if !timeline.has_log_data() {
            log::warn!("No log data read from {} file(s)", batch.len());
            return Err(DecoderError::NoLogData(report.failures));
        }

        let mut registry = self.registry.clone();
        registry.map_log_to_identifiers(
            timeline.events(),
            timeline.maximum_ids(),
            self.config.sort_ids,
            false,
        );

        let consistency = check_consistency(timeline.events_mut(), &mut registry);
        timeline.set_gaps_shown(self.config.show_gaps);
        let statistics = StatisticsEngine::compute(&mut timeline, &mut registry);

        self.timeline = timeline;
        self.registry = registry;
        self.consistency = consistency;
        self.statistics = statistics;

        log::info!(
            "Loaded {} events from {} file(s), {} distinct IDs",
            report.event_count,
            report.files_loaded,
            report.distinct_ids
        );
        Ok(report)
    }

    /// Merge an ID list file into the registry
    ///
    /// A malformed file is rejected as a whole and the registry is unchanged.
    pub fn load_ids(&mut self, path: &Path) -> Result<IdLoadSummary> {
        log::info!("Loading ID file: {:?}", path);

        let identifiers = ids::read_id_file(path)?;
        let summary = ids::merge_identifiers(
            &mut self.registry,
            identifiers,
            self.timeline.maximum_ids(),
        );

        self.registry.map_log_to_identifiers(
            self.timeline.events(),
            self.timeline.maximum_ids(),
            false,
            false,
        );
        self.recompute_statistics();

        if summary.exceeding_capacity > 0 {
            log::warn!(
                "{} ID(s) in {:?} exceed the log capacity of {} IDs",
                summary.exceeding_capacity,
                path,
                self.timeline.maximum_ids()
            );
        }
        log::info!(
            "ID file loaded: {} IDs, {} added",
            summary.total,
            summary.added
        );
        Ok(summary)
    }

    /// Write the registry to an ID list file
    pub fn save_ids(&mut self, path: &Path) -> Result<()> {
        self.registry.assign_colors();
        ids::write_id_file(path, &self.registry)
    }

    /// Register a new identifier; an existing ID is rejected
    pub fn add_identifier(&mut self, identifier: PerformanceIdentifier) -> Result<()> {
        self.registry.add(identifier)?;
        self.registry.assign_colors();
        self.recompute_statistics();
        Ok(())
    }

    /// Remove every identifier, then re-register the IDs present in the log
    pub fn clear_identifiers(&mut self) {
        self.registry.clear();
        self.registry.map_log_to_identifiers(
            self.timeline.events(),
            self.timeline.maximum_ids(),
            self.config.sort_ids,
            false,
        );
        self.recompute_statistics();
    }

    /// Show or hide the gaps between concatenated files
    pub fn set_show_gaps(&mut self, show: bool) {
        if self.config.show_gaps == show && self.timeline.gaps_shown() == show {
            return;
        }

        self.config.show_gaps = show;
        self.timeline.set_gaps_shown(show);
        self.recompute_statistics();
    }

    /// Set or clear the note of one event and persist it in the file's sidecar
    pub fn set_event_note(&mut self, index: usize, text: &str) -> Result<()> {
        let text = text.replace(&['\r', '\n'][..], " ");
        let len = self.timeline.len();
        let (_, segment) = self
            .timeline
            .segment_of(index)
            .ok_or(DecoderError::EventIndexOutOfRange { index, len })?;
        let record = segment
            .record_position(index)
            .ok_or(DecoderError::EventIndexOutOfRange { index, len })?;

        let path = notes::notes_path(self.config.notes_dir(), &segment.header);
        notes::update_note(&path, record, &text)?;

        self.timeline.set_note(index, text)
    }

    /// Recompute statistics over the committed timeline
    pub fn recompute_statistics(&mut self) {
        if self.timeline.has_log_data() {
            self.statistics = StatisticsEngine::compute(&mut self.timeline, &mut self.registry);
        } else {
            self.registry.reset_statistics();
            self.statistics = AggregateStatistics::default();
        }
    }

    /// Number of plotted IDs that were already active when capture started
    ///
    /// With `segment` set, only that file's events are considered.
    pub fn initially_active_ids(&self, segment: Option<usize>) -> usize {
        let events = match segment {
            None => self.timeline.events(),
            Some(k) => match self.timeline.segments().get(k) {
                Some(s) => &self.timeline.events()[s.start..s.start + s.len],
                None => return 0,
            },
        };

        let mut seen = HashSet::new();
        events
            .iter()
            .filter(|e| seen.insert(e.perf_id))
            .filter(|e| !e.is_entry)
            .filter(|e| self.registry.get(e.perf_id).map_or(false, |i| i.plot_enabled))
            .count()
    }

    /// True if any loaded header has the ID set in its filter mask
    pub fn is_in_filter_mask(&self, perf_id: u32) -> bool {
        self.timeline.headers().any(|h| h.is_in_filter_mask(perf_id))
    }

    /// True if any loaded header has the ID set in its trigger mask
    pub fn is_in_trigger_mask(&self, perf_id: u32) -> bool {
        self.timeline.headers().any(|h| h.is_in_trigger_mask(perf_id))
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn events(&self) -> &[LogEvent] {
        self.timeline.events()
    }

    pub fn event(&self, index: usize) -> Option<&LogEvent> {
        self.timeline.event(index)
    }

    pub fn gaps(&self) -> &[Gap] {
        self.timeline.gaps()
    }

    pub fn headers(&self) -> impl Iterator<Item = &LogFileHeader> + '_ {
        self.timeline.headers()
    }

    pub fn registry(&self) -> &IdRegistry {
        &self.registry
    }

    pub fn identifier(&self, id: u32) -> Option<&PerformanceIdentifier> {
        self.registry.get(id)
    }

    pub fn consistency(&self) -> &ConsistencyReport {
        &self.consistency
    }

    pub fn statistics(&self) -> &AggregateStatistics {
        &self.statistics
    }

    pub fn has_log_data(&self) -> bool {
        self.timeline.has_log_data()
    }

    pub fn maximum_time_stamp(&self) -> f64 {
        self.timeline.maximum_time_stamp()
    }

    pub fn adjusted_time_span(&self) -> f64 {
        self.timeline.adjusted_time_span()
    }

    pub fn time_precision(&self) -> usize {
        self.timeline.time_precision()
    }

    pub fn maximum_ids(&self) -> u64 {
        self.timeline.maximum_ids()
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}
