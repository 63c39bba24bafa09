//! Analysis configuration types
//!
//! This module defines the small set of knobs the analysis pipeline needs.
//! Presentation choices beyond gap display (report layout, precision) are
//! handled by the application layer.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the analysis pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Show the real elapsed time between concatenated files (false = compress gaps)
    #[serde(default = "default_true")]
    pub show_gaps: bool,

    /// Sort identifiers by display name after mapping a freshly loaded log
    #[serde(default = "default_true")]
    pub sort_ids: bool,

    /// Directory holding the per-file notes sidecars (default: current directory)
    #[serde(default)]
    pub notes_dir: Option<PathBuf>,

    /// Largest header description accepted before the header is rejected
    #[serde(default = "default_max_description_len")]
    pub max_description_len: usize,

    /// Largest filter/trigger mask (in 32-bit words) accepted before the header is rejected
    #[serde(default = "default_max_mask_words")]
    pub max_mask_words: u32,
}

fn default_true() -> bool {
    true
}

fn default_max_description_len() -> usize {
    4096
}

fn default_max_mask_words() -> u32 {
    4096
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            show_gaps: true,
            sort_ids: true,
            notes_dir: None,
            max_description_len: default_max_description_len(),
            max_mask_words: default_max_mask_words(),
        }
    }
}

impl AnalysisConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: show or hide data gaps
    pub fn with_show_gaps(mut self, show: bool) -> Self {
        self.show_gaps = show;
        self
    }

    /// Builder method: enable or disable identifier sorting after a log load
    pub fn with_sort_ids(mut self, sort: bool) -> Self {
        self.sort_ids = sort;
        self
    }

    /// Builder method: set the notes sidecar directory
    pub fn with_notes_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.notes_dir = Some(dir.into());
        self
    }

    /// Builder method: set the header allocation bounds
    pub fn with_header_limits(mut self, max_description_len: usize, max_mask_words: u32) -> Self {
        self.max_description_len = max_description_len;
        self.max_mask_words = max_mask_words;
        self
    }

    /// Directory the notes sidecars live in
    pub fn notes_dir(&self) -> &Path {
        self.notes_dir.as_deref().unwrap_or_else(|| Path::new("."))
    }
}
