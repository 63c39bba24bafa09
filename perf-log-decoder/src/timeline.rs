//! Merged event timeline and gap model
//!
//! Files captured separately are concatenated in capture order. Where one
//! file's events end and the next file's begin, a gap boundary records the
//! merged index and the elapsed time between the two files minus one tick.
//!
//! Every event keeps the time stamp it was read with (gaps shown). The
//! visible time stamp is derived from it, so hiding and showing gaps any
//! number of times always lands on the same values.

use crate::formats::LogFileHeader;
use crate::types::{DecoderError, LogEvent, Result};
use serde::Serialize;

/// Discontinuity between two concatenated files
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Gap {
    /// Merged index of the first event after the gap
    pub index: usize,
    /// Seconds removed from later time stamps when gaps are hidden
    pub duration: f64,
}

/// Events contributed by one physical file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub header: LogFileHeader,
    /// Merged index of the file's first event
    pub start: usize,
    /// Number of events the file contributed
    pub len: usize,
    /// Position of each contributed event among all records of the file
    pub record_positions: Vec<usize>,
}

impl Segment {
    pub fn contains(&self, index: usize) -> bool {
        index >= self.start && index < self.start + self.len
    }

    /// Record position within the file of a merged event index
    pub fn record_position(&self, index: usize) -> Option<usize> {
        if self.contains(index) {
            self.record_positions.get(index - self.start).copied()
        } else {
            None
        }
    }
}

/// The merged, chronologically ordered event list of all loaded files
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    events: Vec<LogEvent>,
    captured: Vec<f64>,
    gaps: Vec<Gap>,
    segments: Vec<Segment>,
    captured_max: f64,
    maximum_time_stamp: f64,
    maximum_ids: u64,
    max_ticks_per_second: u32,
    gaps_shown: bool,
}

impl Timeline {
    pub fn new() -> Self {
        Self {
            gaps_shown: true,
            ..Default::default()
        }
    }

    /// Append one file's events, recording a gap if events already precede them
    ///
    /// `record_positions` holds, for each event, its position among all
    /// records read from the file, including records that were excluded.
    pub(crate) fn append_segment(
        &mut self,
        header: LogFileHeader,
        events: Vec<LogEvent>,
        record_positions: Vec<usize>,
    ) {
        debug_assert_eq!(events.len(), record_positions.len());
        let start = self.events.len();

        if start > 0 && !events.is_empty() {
            self.gaps.push(Gap {
                index: start,
                duration: 0.0,
            });
        }

        self.max_ticks_per_second = self.max_ticks_per_second.max(header.ticks_per_second);

        self.segments.push(Segment {
            header,
            start,
            len: events.len(),
            record_positions,
        });
        self.captured.extend(events.iter().map(|e| e.time_stamp));
        self.events.extend(events);
    }

    /// Compute gap durations once all files have been appended
    pub(crate) fn finish(&mut self, maximum_ids: u64) {
        self.maximum_ids = maximum_ids;

        let tick = self
            .segments
            .first()
            .map(|s| 1.0 / s.header.ticks_per_second as f64)
            .unwrap_or(0.0);

        for gap in &mut self.gaps {
            gap.duration = self.captured[gap.index] - self.captured[gap.index - 1] - tick;
        }

        self.captured_max = self.captured.last().copied().unwrap_or(0.0);
        self.maximum_time_stamp = self.captured_max;
        self.gaps_shown = true;

        log::debug!(
            "Timeline holds {} events from {} files with {} gaps",
            self.events.len(),
            self.segments.len(),
            self.gaps.len()
        );
    }

    /// Show the real elapsed time between files, or compress it out
    pub fn set_gaps_shown(&mut self, show: bool) {
        let mut accumulated = 0.0;
        let mut next_gap = 0;

        for (index, (event, &captured)) in self.events.iter_mut().zip(&self.captured).enumerate() {
            while next_gap < self.gaps.len() && self.gaps[next_gap].index == index {
                accumulated += self.gaps[next_gap].duration;
                next_gap += 1;
            }
            event.time_stamp = if show { captured } else { captured - accumulated };
        }

        self.maximum_time_stamp = if show || self.events.is_empty() {
            self.captured_max
        } else {
            self.captured_max - accumulated
        };
        self.gaps_shown = show;
    }

    pub fn gaps_shown(&self) -> bool {
        self.gaps_shown
    }

    pub fn events(&self) -> &[LogEvent] {
        &self.events
    }

    pub(crate) fn events_mut(&mut self) -> &mut [LogEvent] {
        &mut self.events
    }

    pub fn event(&self, index: usize) -> Option<&LogEvent> {
        self.events.get(index)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// True once at least one file has contributed events
    pub fn has_log_data(&self) -> bool {
        !self.events.is_empty()
    }

    pub fn gaps(&self) -> &[Gap] {
        &self.gaps
    }

    /// Merged indices where a new file's events begin
    pub fn gap_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.gaps.iter().map(|g| g.index)
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Headers of the loaded files in capture order
    pub fn headers(&self) -> impl Iterator<Item = &LogFileHeader> + '_ {
        self.segments.iter().map(|s| &s.header)
    }

    /// Segment owning a merged event index, with its position in the segment list
    pub fn segment_of(&self, index: usize) -> Option<(usize, &Segment)> {
        self.segments.iter().enumerate().find(|(_, s)| s.contains(index))
    }

    /// Time stamp of the last event as currently displayed
    pub fn maximum_time_stamp(&self) -> f64 {
        self.maximum_time_stamp
    }

    /// Captured time span with every gap removed
    pub fn adjusted_time_span(&self) -> f64 {
        self.captured_max - self.total_gap_duration()
    }

    pub fn total_gap_duration(&self) -> f64 {
        self.gaps.iter().map(|g| g.duration).sum()
    }

    /// ID capacity implied by the largest mask among the loaded files
    pub fn maximum_ids(&self) -> u64 {
        self.maximum_ids
    }

    /// Decimal places needed to show one timer tick of the finest clock
    pub fn time_precision(&self) -> usize {
        self.max_ticks_per_second.saturating_sub(1).to_string().len()
    }

    pub(crate) fn set_note(&mut self, index: usize, text: String) -> Result<()> {
        let len = self.events.len();
        let event = self
            .events
            .get_mut(index)
            .ok_or(DecoderError::EventIndexOutOfRange { index, len })?;
        event.notes = text;
        Ok(())
    }
}
