//! Timing statistics engine
//!
//! Walks the merged timeline once and fills in, for every registered ID,
//! entry/exit counts, average frequency, active time and the min/max of
//! active duration, inter-entry interval and overrun. The aggregate row
//! folds the per-ID results and adds the union of all active periods.
//!
//! # Per-ID bookkeeping
//!
//! Each ID tracks the time stamp of its last valid entry. A valid entry
//! starts an active period and, from the second entry on, closes an
//! interval. A valid exit closes the active period. Events flagged as
//! sequence errors are counted but leave the state untouched. At every gap
//! boundary the last entry time of every ID moves to the first event after
//! the gap, so no duration spans two files.

use crate::ids::IdRegistry;
use crate::timeline::Timeline;
use crate::types::LogEvent;
use serde::Serialize;
use std::collections::HashMap;

/// One extreme observation and when it happened
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extremum {
    pub value: f64,
    pub time_stamp: f64,
}

/// Running minimum and maximum, unset until the first observation
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MinMax {
    pub min: Option<Extremum>,
    pub max: Option<Extremum>,
}

impl MinMax {
    /// Record an observation; ties keep the earlier one
    pub fn update(&mut self, value: f64, time_stamp: f64) {
        if self.min.map_or(true, |m| value < m.value) {
            self.min = Some(Extremum { value, time_stamp });
        }
        if self.max.map_or(true, |m| value > m.value) {
            self.max = Some(Extremum { value, time_stamp });
        }
    }
}

/// Statistics of one performance ID
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct IdStatistics {
    pub entry_count: u64,
    pub exit_count: u64,
    /// Entries per second of adjusted time span
    pub avg_frequency: f64,
    /// Seconds spent between valid entries and exits
    pub total_active: f64,
    /// Duration of individual active periods
    pub active: MinMax,
    /// Time between consecutive valid entries
    pub interval: MinMax,
    /// Amount by which an event came later than the expected period
    pub overrun: MinMax,
}

/// Aggregate extreme with the ID that produced it
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AggregateExtremum {
    pub value: f64,
    pub time_stamp: f64,
    pub id: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AggregateMinMax {
    pub min: Option<AggregateExtremum>,
    pub max: Option<AggregateExtremum>,
}

impl AggregateMinMax {
    fn absorb(&mut self, per_id: &MinMax, id: u32) {
        if let Some(m) = per_id.min {
            if self.min.map_or(true, |a| m.value < a.value) {
                self.min = Some(AggregateExtremum {
                    value: m.value,
                    time_stamp: m.time_stamp,
                    id,
                });
            }
        }
        if let Some(m) = per_id.max {
            if self.max.map_or(true, |a| m.value > a.value) {
                self.max = Some(AggregateExtremum {
                    value: m.value,
                    time_stamp: m.time_stamp,
                    id,
                });
            }
        }
    }
}

/// Statistics over all IDs
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct AggregateStatistics {
    pub entry_count: u64,
    pub exit_count: u64,
    pub avg_frequency: f64,
    /// Seconds during which at least one ID was active
    pub total_active: f64,
    pub active: AggregateMinMax,
    pub interval: AggregateMinMax,
    pub overrun: AggregateMinMax,
    /// At least one event overran its ID's expected period
    pub overrun_detected: bool,
    /// Time span the frequencies and percentages refer to
    pub adjusted_time_span: f64,
}

impl AggregateStatistics {
    /// Seconds during which no ID was active
    pub fn total_inactive(&self) -> f64 {
        self.adjusted_time_span - self.total_active
    }
}

/// `value` as a percentage of `span`, zero for an empty span
pub fn percent_of(value: f64, span: f64) -> f64 {
    if span > 0.0 {
        value / span * 100.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct IdCursor {
    previous: f64,
    active: bool,
}

/// Computes per-ID and aggregate statistics over a timeline
pub struct StatisticsEngine;

impl StatisticsEngine {
    /// Recompute every ID's statistics and each event's overrun
    pub fn compute(timeline: &mut Timeline, registry: &mut IdRegistry) -> AggregateStatistics {
        let gap_indices: Vec<usize> = timeline.gap_indices().collect();
        let maximum_time_stamp = timeline.maximum_time_stamp();
        let span = timeline.adjusted_time_span();

        let position: HashMap<u32, usize> = registry
            .iter()
            .enumerate()
            .map(|(i, ident)| (ident.id, i))
            .collect();
        let periods: Vec<Option<f64>> = registry
            .iter()
            .map(|ident| (ident.expected_frequency != 0.0).then(|| 1.0 / ident.expected_frequency))
            .collect();

        let mut stats = vec![IdStatistics::default(); registry.len()];
        let mut cursors = vec![IdCursor::default(); registry.len()];
        let mut aggregate = AggregateStatistics {
            adjusted_time_span: span,
            ..Default::default()
        };

        let mut next_gap = gap_indices.iter().peekable();
        let events = timeline.events_mut();

        for (index, event) in events.iter_mut().enumerate() {
            if next_gap.next_if(|&&g| g == index).is_some() {
                for cursor in &mut cursors {
                    cursor.previous = event.time_stamp;
                }
            }

            event.overrun = 0.0;
            let Some(&slot) = position.get(&event.perf_id) else {
                continue;
            };

            let delta = Self::advance(&mut cursors[slot], &mut stats[slot], event);

            if let Some(period) = periods[slot] {
                if delta > period {
                    event.overrun = delta - period;
                    aggregate.overrun_detected = true;
                    stats[slot].overrun.update(event.overrun, event.time_stamp);
                }
            }
        }

        for ((ident, mut id_stats), cursor) in registry.identifiers_mut().iter_mut().zip(stats).zip(&cursors) {
            if cursor.active {
                id_stats.total_active += maximum_time_stamp - cursor.previous;
            }
            id_stats.avg_frequency = if span > 0.0 {
                id_stats.entry_count as f64 / span
            } else {
                0.0
            };

            aggregate.entry_count += id_stats.entry_count;
            aggregate.exit_count += id_stats.exit_count;
            aggregate.active.absorb(&id_stats.active, ident.id);
            aggregate.interval.absorb(&id_stats.interval, ident.id);
            aggregate.overrun.absorb(&id_stats.overrun, ident.id);

            ident.stats = id_stats;
        }

        aggregate.avg_frequency = if span > 0.0 {
            aggregate.entry_count as f64 / span
        } else {
            0.0
        };
        aggregate.total_active = Self::total_active_time(timeline, registry);

        if aggregate.overrun_detected {
            log::info!("Frequency overruns detected");
        }
        log::debug!(
            "Statistics: {} entries, {} exits, {:.6} s active over {:.6} s",
            aggregate.entry_count,
            aggregate.exit_count,
            aggregate.total_active,
            span
        );

        aggregate
    }

    /// Apply one event to its ID's state, returning the delta used for overrun
    fn advance(cursor: &mut IdCursor, stats: &mut IdStatistics, event: &LogEvent) -> f64 {
        let delta = event.time_stamp - cursor.previous;

        if event.is_entry {
            stats.entry_count += 1;
            if !event.sequence_error {
                cursor.active = true;
                if stats.entry_count > 1 {
                    stats.interval.update(delta, cursor.previous);
                }
                cursor.previous = event.time_stamp;
            }
        } else {
            stats.exit_count += 1;
            if !event.sequence_error {
                cursor.active = false;
                stats.total_active += delta;
                if stats.entry_count != 0 {
                    stats.active.update(delta, cursor.previous);
                }
            }
        }

        delta
    }

    /// Time during which at least one ID was active, overlaps counted once
    pub fn total_active_time(timeline: &Timeline, registry: &mut IdRegistry) -> f64 {
        let events = timeline.events();

        // IDs whose first event is an exit were already active at the start
        registry.reset_used_flags(None);
        let mut active_count: i64 = 0;
        for event in events {
            if let Some(ident) = registry.get_mut(event.perf_id) {
                if ident.used.is_none() {
                    ident.used = Some(true);
                    if !event.is_entry {
                        active_count += 1;
                    }
                }
            }
        }
        registry.reset_used_flags(None);

        let mut gaps = timeline.gap_indices().peekable();
        let mut span_start = 0.0;
        let mut total = 0.0;

        for (index, event) in events.iter().enumerate() {
            if gaps.next_if(|&g| g == index).is_some() {
                span_start = event.time_stamp;
            }
            if event.sequence_error {
                continue;
            }

            if event.is_entry {
                active_count += 1;
                if active_count == 1 {
                    span_start = event.time_stamp;
                }
            } else {
                active_count -= 1;
                if active_count == 0 {
                    total += event.time_stamp - span_start;
                }
            }
        }

        if active_count > 0 {
            total += timeline.maximum_time_stamp() - span_start;
        }

        total
    }
}
