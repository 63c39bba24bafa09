//! Report generation
//!
//! Collects everything worth reporting from an `Analyzer` into a plain,
//! serializable structure and renders it as an aligned text report or as
//! JSON.

pub mod json;
pub mod txt;

use perf_log_decoder::{
    format_perf_id, percent_of, AggregateExtremum, Analyzer, Extremum, IdLoadSummary,
    LoadReport, LogFileHeader,
};
use serde::Serialize;

/// What to include and how precisely to print times
#[derive(Debug, Clone, Copy)]
pub struct ReportOptions {
    pub time_precision: usize,
    pub include_headers: bool,
    pub include_events: bool,
}

/// Complete report contents
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub generated: String,
    pub tool_version: String,
    #[serde(skip)]
    pub time_precision: usize,
    pub load: LoadSection,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<HeaderSection>,
    pub statistics: Vec<StatisticsRow>,
    pub overall: StatisticsRow,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<EventRow>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoadSection {
    pub files_loaded: usize,
    pub failures: Vec<String>,
    pub notes_failures: Vec<String>,
    pub event_count: usize,
    pub distinct_ids: usize,
    pub excluded_events: usize,
    pub maximum_ids: u64,
    pub gaps: usize,
    pub gaps_shown: bool,
    pub backward_jumps: usize,
    pub consecutive_events: usize,
    pub adjusted_time_span: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_file: Option<IdFileSection>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IdFileSection {
    pub total: usize,
    pub added: usize,
    pub exceeding_capacity: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeaderSection {
    pub file_name: String,
    pub description: String,
    pub capture_time: String,
    pub spacecraft_id: u32,
    pub processor_id: u32,
    pub application_id: u32,
    pub version: u8,
    pub endianness: String,
    pub ticks_per_second: u32,
    pub timer_rollover: u32,
    pub trigger_state: String,
    pub trigger_mode: String,
    pub trigger_count: u32,
    pub data_start: u32,
    pub data_end: u32,
    pub data_count: u32,
    pub invalid_marker_count: u32,
    pub mask_size: u32,
    pub filter_mask: String,
    pub trigger_mask: String,
}

impl From<&LogFileHeader> for HeaderSection {
    fn from(header: &LogFileHeader) -> Self {
        Self {
            file_name: header.file_name(),
            description: header.description.clone(),
            capture_time: format!("{}.{}", header.time_seconds, header.time_sub_seconds),
            spacecraft_id: header.spacecraft_id,
            processor_id: header.processor_id,
            application_id: header.application_id,
            version: header.version,
            endianness: header.endianness.to_string(),
            ticks_per_second: header.ticks_per_second,
            timer_rollover: header.timer_rollover,
            trigger_state: header.trigger_state.to_string(),
            trigger_mode: header.trigger_mode.to_string(),
            trigger_count: header.trigger_count,
            data_start: header.data_start,
            data_end: header.data_end,
            data_count: header.data_count,
            invalid_marker_count: header.invalid_marker_count,
            mask_size: header.mask_size,
            filter_mask: header.filter_mask_text(),
            trigger_mask: header.trigger_mask_text(),
        }
    }
}

/// Extreme value with where it happened
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ExtremeCell {
    pub value: f64,
    pub time_stamp: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u32>,
}

impl From<Extremum> for ExtremeCell {
    fn from(e: Extremum) -> Self {
        Self {
            value: e.value,
            time_stamp: e.time_stamp,
            id: None,
        }
    }
}

impl From<AggregateExtremum> for ExtremeCell {
    fn from(e: AggregateExtremum) -> Self {
        Self {
            value: e.value,
            time_stamp: e.time_stamp,
            id: Some(e.id),
        }
    }
}

/// One line of the statistics table
#[derive(Debug, Clone, Serialize)]
pub struct StatisticsRow {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub entries: u64,
    pub exits: u64,
    pub avg_frequency: f64,
    pub expected_frequency: Option<f64>,
    pub time_active: f64,
    pub percent_active: f64,
    pub time_inactive: f64,
    pub percent_inactive: f64,
    pub min_active: Option<ExtremeCell>,
    pub max_active: Option<ExtremeCell>,
    pub min_interval: Option<ExtremeCell>,
    pub max_interval: Option<ExtremeCell>,
    pub min_overrun: Option<ExtremeCell>,
    pub max_overrun: Option<ExtremeCell>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventRow {
    pub index: usize,
    pub time_stamp: f64,
    pub id: String,
    pub name: String,
    pub kind: &'static str,
    pub sequence_error: bool,
    pub overrun: f64,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub notes: String,
}

/// Gather the report contents from a loaded analyzer
pub fn build_report(
    analyzer: &Analyzer,
    load: &LoadReport,
    id_file: Option<&IdLoadSummary>,
    options: &ReportOptions,
) -> Report {
    let span = analyzer.adjusted_time_span();
    let consistency = analyzer.consistency();

    let statistics = analyzer
        .registry()
        .iter()
        .filter(|i| i.plot_enabled)
        .map(|identifier| {
            let stats = &identifier.stats;
            StatisticsRow {
                name: identifier.effective_name(),
                id: Some(format_perf_id(identifier.id)),
                entries: stats.entry_count,
                exits: stats.exit_count,
                avg_frequency: stats.avg_frequency,
                expected_frequency: (identifier.expected_frequency != 0.0)
                    .then_some(identifier.expected_frequency),
                time_active: stats.total_active,
                percent_active: percent_of(stats.total_active, span),
                time_inactive: span - stats.total_active,
                percent_inactive: percent_of(span - stats.total_active, span),
                min_active: stats.active.min.map(Into::into),
                max_active: stats.active.max.map(Into::into),
                min_interval: stats.interval.min.map(Into::into),
                max_interval: stats.interval.max.map(Into::into),
                min_overrun: stats.overrun.min.map(Into::into),
                max_overrun: stats.overrun.max.map(Into::into),
            }
        })
        .collect();

    let aggregate = analyzer.statistics();
    let overall = StatisticsRow {
        name: "Overall".to_string(),
        id: None,
        entries: aggregate.entry_count,
        exits: aggregate.exit_count,
        avg_frequency: aggregate.avg_frequency,
        expected_frequency: None,
        time_active: aggregate.total_active,
        percent_active: percent_of(aggregate.total_active, span),
        time_inactive: aggregate.total_inactive(),
        percent_inactive: percent_of(aggregate.total_inactive(), span),
        min_active: aggregate.active.min.map(Into::into),
        max_active: aggregate.active.max.map(Into::into),
        min_interval: aggregate.interval.min.map(Into::into),
        max_interval: aggregate.interval.max.map(Into::into),
        min_overrun: aggregate.overrun.min.map(Into::into),
        max_overrun: aggregate.overrun.max.map(Into::into),
    };

    let headers = if options.include_headers {
        analyzer.headers().map(HeaderSection::from).collect()
    } else {
        Vec::new()
    };

    let events = if options.include_events {
        analyzer
            .events()
            .iter()
            .enumerate()
            .map(|(index, event)| EventRow {
                index,
                time_stamp: event.time_stamp,
                id: format_perf_id(event.perf_id),
                name: analyzer
                    .identifier(event.perf_id)
                    .map(|i| i.effective_name())
                    .unwrap_or_else(|| format_perf_id(event.perf_id)),
                kind: if event.is_entry { "entry" } else { "exit" },
                sequence_error: event.sequence_error,
                overrun: event.overrun,
                notes: event.notes.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    Report {
        generated: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        tool_version: env!("CARGO_PKG_VERSION").to_string(),
        time_precision: options.time_precision,
        load: LoadSection {
            files_loaded: load.files_loaded,
            failures: load.failures.iter().map(|f| f.to_string()).collect(),
            notes_failures: load.notes_failures.iter().map(|f| f.to_string()).collect(),
            event_count: load.event_count,
            distinct_ids: load.distinct_ids,
            excluded_events: load.excluded_events,
            maximum_ids: analyzer.maximum_ids(),
            gaps: analyzer.gaps().len(),
            gaps_shown: analyzer.timeline().gaps_shown(),
            backward_jumps: consistency.backward_jumps,
            consecutive_events: consistency.consecutive_events,
            adjusted_time_span: span,
            id_file: id_file.map(|s| IdFileSection {
                total: s.total,
                added: s.added,
                exceeding_capacity: s.exceeding_capacity,
            }),
        },
        headers,
        statistics,
        overall,
        events,
    }
}
