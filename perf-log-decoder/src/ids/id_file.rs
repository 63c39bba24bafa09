//! ID list text files
//!
//! One identifier per line, five comma-separated fields:
//! `name,id,color,frequency,notes`. The ID is hex with a `0x` prefix or
//! decimal, the color is written as `0x%06x`. Notes take the rest of the
//! line and may contain commas.

use super::registry::{IdRegistry, PerformanceIdentifier};
use crate::formats::perf_log::ID_MASK;
use crate::types::{format_perf_id, DecoderError, Result, Rgb};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

const FIELD_COUNT: usize = 5;

/// Counts reported after merging an ID file into a registry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdLoadSummary {
    /// Identifiers listed in the file
    pub total: usize,
    /// Identifiers that were not yet registered
    pub added: usize,
    /// Identifiers at or above the ID capacity of the loaded logs
    pub exceeding_capacity: usize,
}

/// Parse a whole ID file; any malformed line, blank ones included, rejects the file
pub fn read_id_file(path: &Path) -> Result<Vec<PerformanceIdentifier>> {
    let content = fs::read_to_string(path).map_err(|e| DecoderError::file_access(path, e))?;

    let identifiers = content
        .lines()
        .enumerate()
        .map(|(number, line)| parse_line(path, number + 1, line))
        .collect::<Result<Vec<_>>>()?;

    log::debug!("Read {} identifiers from {:?}", identifiers.len(), path);
    Ok(identifiers)
}

fn parse_line(path: &Path, line_number: usize, line: &str) -> Result<PerformanceIdentifier> {
    let format_error = |reason: String| DecoderError::Format {
        path: path.to_path_buf(),
        line: line_number,
        reason,
    };

    let fields: Vec<&str> = line.splitn(FIELD_COUNT, ',').collect();
    if fields.len() != FIELD_COUNT {
        return Err(format_error(format!(
            "expected {} fields, found {}",
            FIELD_COUNT,
            fields.len()
        )));
    }

    let id = parse_integer(fields[1])
        .ok_or_else(|| format_error(format!("invalid performance ID '{}'", fields[1])))?;
    if id > ID_MASK as u64 {
        return Err(format_error(format!("performance ID '{}' out of range", fields[1])));
    }

    let color = match fields[2].trim() {
        "" => None,
        text => Some(Rgb(parse_color(text).ok_or_else(|| {
            format_error(format!("invalid color '{}'", text))
        })?)),
    };

    let expected_frequency = fields[3]
        .trim()
        .parse::<f64>()
        .map_err(|e| format_error(format!("invalid frequency '{}': {}", fields[3], e)))?;

    let mut identifier = PerformanceIdentifier::new(id as u32)
        .with_name(fields[0])
        .with_expected_frequency(expected_frequency)
        .with_notes(fields[4]);
    identifier.color = color;

    Ok(identifier)
}

fn parse_integer(text: &str) -> Option<u64> {
    let text = text.trim();
    match text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => text.parse().ok(),
    }
}

fn parse_color(text: &str) -> Option<u32> {
    let value = match text.strip_prefix('#') {
        Some(hex) => u64::from_str_radix(hex, 16).ok(),
        None => parse_integer(text),
    }?;
    u32::try_from(value).ok().filter(|v| *v <= 0x00ff_ffff)
}

/// Frequency text that parses back to exactly the same value
fn format_frequency(frequency: f64) -> String {
    let fixed = format!("{:.6}", frequency);
    if fixed.parse::<f64>().ok() == Some(frequency) {
        fixed
    } else {
        frequency.to_string()
    }
}

/// Merge identifiers read from a file into the registry
///
/// New IDs are added with plotting off; an already registered ID only takes
/// the file's name when it has none of its own.
pub fn merge_identifiers(
    registry: &mut IdRegistry,
    identifiers: Vec<PerformanceIdentifier>,
    maximum_ids: u64,
) -> IdLoadSummary {
    let mut summary = IdLoadSummary {
        total: identifiers.len(),
        ..Default::default()
    };

    for mut identifier in identifiers {
        if maximum_ids != 0 && identifier.id as u64 >= maximum_ids {
            summary.exceeding_capacity += 1;
        }

        match registry.get_mut(identifier.id) {
            Some(existing) => {
                if existing.name.is_empty() {
                    existing.name = identifier.name;
                }
            }
            None => {
                identifier.plot_enabled = false;
                registry.push_new(identifier);
                summary.added += 1;
            }
        }
    }

    summary
}

/// Write every identifier in display order
pub fn write_id_file(path: &Path, registry: &IdRegistry) -> Result<()> {
    let file = fs::File::create(path).map_err(|e| DecoderError::file_access(path, e))?;
    let mut writer = BufWriter::new(file);

    for identifier in registry.iter() {
        writeln!(
            writer,
            "{},{},{},{},{}",
            identifier.name,
            format_perf_id(identifier.id),
            identifier.color.unwrap_or_default(),
            format_frequency(identifier.expected_frequency),
            identifier.notes
        )
        .map_err(|e| DecoderError::file_access(path, e))?;
    }

    writer.flush().map_err(|e| DecoderError::file_access(path, e))?;
    log::info!("Wrote {} identifiers to {:?}", registry.len(), path);
    Ok(())
}
