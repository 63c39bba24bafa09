//! Timeline consistency checks
//!
//! Flags events that repeat the previous event type of their ID (two entries
//! or two exits in a row) and counts time stamps that run backwards. Nothing
//! is dropped; flagged events are left out of duration math downstream.

use crate::ids::IdRegistry;
use crate::types::LogEvent;
use serde::Serialize;

/// Counts of inconsistencies found in a timeline
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    /// Events whose time stamp is earlier than the preceding event's
    pub backward_jumps: usize,
    /// Events of the same type as the previous event for their ID
    pub consecutive_events: usize,
}

impl ConsistencyReport {
    pub fn is_clean(&self) -> bool {
        self.backward_jumps == 0 && self.consecutive_events == 0
    }
}

/// Scan the timeline once, setting each event's sequence error flag
pub fn check_consistency(events: &mut [LogEvent], registry: &mut IdRegistry) -> ConsistencyReport {
    let mut report = ConsistencyReport::default();
    let mut previous_time = 0.0;

    registry.reset_used_flags(None);

    for event in events.iter_mut() {
        if event.time_stamp < previous_time {
            report.backward_jumps += 1;
        }
        previous_time = event.time_stamp;

        event.sequence_error = false;
        if let Some(identifier) = registry.get_mut(event.perf_id) {
            if identifier.used == Some(event.is_entry) {
                event.sequence_error = true;
                report.consecutive_events += 1;
            }
            identifier.used = Some(event.is_entry);
        }
    }

    registry.reset_used_flags(None);

    if !report.is_clean() {
        log::warn!(
            "Log inconsistencies: {} backward time jumps, {} consecutive same-type events",
            report.backward_jumps,
            report.consecutive_events
        );
    }

    report
}
