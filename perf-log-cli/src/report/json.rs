//! JSON report

use super::Report;
use anyhow::{Context, Result};

/// Render the report as pretty-printed JSON
pub fn render(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report")
}
