//! Performance identifier registry
//!
//! Keeps identifiers in display order with a hash index from ID to
//! position, so lookups stay cheap without disturbing that order.

use crate::statistics::IdStatistics;
use crate::types::{format_perf_id, DecoderError, LogEvent, Result, Rgb, ID_PALETTE};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// One instrumented code region and its display settings
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceIdentifier {
    /// Performance ID, entry/exit flag cleared
    pub id: u32,
    /// Display name; empty means the hex ID is shown instead
    pub name: String,
    pub plot_enabled: bool,
    pub color: Option<Rgb>,
    /// Expected events per second, zero disables overrun checks
    pub expected_frequency: f64,
    pub notes: String,
    /// Scratch flag for timeline scans
    #[serde(skip)]
    pub(crate) used: Option<bool>,
    pub stats: IdStatistics,
}

impl PerformanceIdentifier {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            name: String::new(),
            plot_enabled: false,
            color: None,
            expected_frequency: 0.0,
            notes: String::new(),
            used: None,
            stats: IdStatistics::default(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_expected_frequency(mut self, frequency: f64) -> Self {
        self.expected_frequency = frequency;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Name if set, otherwise the ID in hex
    pub fn effective_name(&self) -> String {
        if self.name.is_empty() {
            format_perf_id(self.id)
        } else {
            self.name.clone()
        }
    }
}

/// Order names on the base-36 digit value of each character
///
/// Digits sort before letters and letters compare case-insensitively;
/// characters without a digit value sort first. Digit values cover ASCII
/// and the fullwidth forms of `0-9`, `A-Z` and `a-z`. Every other non-ASCII
/// character, including letters and digits of other scripts, has no value.
/// Names with equal digit values fall back to plain string order, so the
/// order stays total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.chars()
        .map(digit_value)
        .cmp(b.chars().map(digit_value))
        .then_with(|| a.cmp(b))
}

fn digit_value(c: char) -> i64 {
    const FULLWIDTH_OFFSET: u32 = 0xFEE0;

    let narrow = match c {
        '\u{FF10}'..='\u{FF19}' | '\u{FF21}'..='\u{FF3A}' | '\u{FF41}'..='\u{FF5A}' => {
            char::from_u32(c as u32 - FULLWIDTH_OFFSET).unwrap_or(c)
        }
        _ => c,
    };
    narrow.to_digit(36).map_or(-1, i64::from)
}

/// Ordered set of performance identifiers keyed by ID
#[derive(Debug, Clone, Default)]
pub struct IdRegistry {
    identifiers: Vec<PerformanceIdentifier>,
    index: HashMap<u32, usize>,
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.identifiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }

    /// Identifiers in display order
    pub fn iter(&self) -> impl Iterator<Item = &PerformanceIdentifier> + '_ {
        self.identifiers.iter()
    }

    pub fn identifiers(&self) -> &[PerformanceIdentifier] {
        &self.identifiers
    }

    pub(crate) fn identifiers_mut(&mut self) -> &mut [PerformanceIdentifier] {
        &mut self.identifiers
    }

    pub fn get(&self, id: u32) -> Option<&PerformanceIdentifier> {
        self.index.get(&id).map(|&i| &self.identifiers[i])
    }

    pub(crate) fn get_mut(&mut self, id: u32) -> Option<&mut PerformanceIdentifier> {
        self.index.get(&id).map(|&i| &mut self.identifiers[i])
    }

    pub fn contains(&self, id: u32) -> bool {
        self.index.contains_key(&id)
    }

    /// Add a new identifier at the end of the display order
    pub fn add(&mut self, identifier: PerformanceIdentifier) -> Result<()> {
        if self.contains(identifier.id) {
            return Err(DecoderError::DuplicateIdentifier(identifier.id));
        }

        self.push_new(identifier);
        Ok(())
    }

    /// Append an identifier whose ID the caller has just looked up and not found
    pub(crate) fn push_new(
        &mut self,
        identifier: PerformanceIdentifier,
    ) -> &mut PerformanceIdentifier {
        debug_assert!(!self.contains(identifier.id));
        let position = self.identifiers.len();
        self.index.insert(identifier.id, position);
        self.identifiers.push(identifier);
        &mut self.identifiers[position]
    }

    pub fn clear(&mut self) {
        self.identifiers.clear();
        self.index.clear();
    }

    /// Make sure every ID in the log has an identifier and mark it for plotting
    ///
    /// Unless `preserve_plot_flags` is set, identifiers absent from the log
    /// lose their plot flag. Identifiers without a color get one from the
    /// palette afterwards.
    pub fn map_log_to_identifiers(
        &mut self,
        events: &[LogEvent],
        maximum_ids: u64,
        sort: bool,
        preserve_plot_flags: bool,
    ) {
        if !preserve_plot_flags {
            for identifier in &mut self.identifiers {
                identifier.plot_enabled = false;
            }
        }

        let mut added = 0;
        for event in events.iter().filter(|e| (e.perf_id as u64) < maximum_ids) {
            match self.get_mut(event.perf_id) {
                Some(identifier) => {
                    if !preserve_plot_flags {
                        identifier.plot_enabled = true;
                    }
                }
                None => {
                    self.push_new(PerformanceIdentifier::new(event.perf_id)).plot_enabled = true;
                    added += 1;
                }
            }
        }

        if added > 0 {
            log::debug!("Added {} identifiers found in the log", added);
        }

        if sort {
            self.sort_by_name();
        }
        self.assign_colors();
    }

    /// Reorder by effective name
    pub fn sort_by_name(&mut self) {
        self.identifiers
            .sort_by(|a, b| compare_names(&a.effective_name(), &b.effective_name()));
        self.reindex();
    }

    /// Give every identifier without a color the next palette entry
    pub fn assign_colors(&mut self) {
        let mut palette = ID_PALETTE.iter().cycle();

        for identifier in self.identifiers.iter_mut().filter(|i| i.color.is_none()) {
            identifier.color = palette.next().copied();
        }
    }

    /// Set every identifier's scratch flag
    pub fn reset_used_flags(&mut self, value: Option<bool>) {
        for identifier in &mut self.identifiers {
            identifier.used = value;
        }
    }

    /// Clear the statistics of every identifier
    pub fn reset_statistics(&mut self) {
        for identifier in &mut self.identifiers {
            identifier.stats = IdStatistics::default();
        }
    }

    fn reindex(&mut self) {
        self.index = self
            .identifiers
            .iter()
            .enumerate()
            .map(|(i, identifier)| (identifier.id, i))
            .collect();
    }
}
