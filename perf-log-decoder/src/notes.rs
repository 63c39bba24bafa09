//! Event notes sidecar files
//!
//! Each log file may have a plain text sidecar holding one `index,text` line
//! per annotated event. The index counts events within that one file, so a
//! sidecar stays valid whichever other files it is merged with.

use crate::formats::LogFileHeader;
use crate::types::{DecoderError, Result};
use std::fs;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// One annotation: file-relative event index and note text
pub type NoteEntry = (usize, String);

/// Location of the sidecar belonging to a log file
pub fn notes_path(dir: &Path, header: &LogFileHeader) -> PathBuf {
    dir.join(header.notes_file_name())
}

/// Read a sidecar; a missing file holds no notes
pub fn read_notes(path: &Path) -> Result<Vec<NoteEntry>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = fs::File::open(path).map_err(|e| DecoderError::file_access(path, e))?;
    let mut entries = Vec::new();

    for (number, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| DecoderError::file_access(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        entries.push(parse_line(path, number + 1, &line)?);
    }

    log::debug!("Read {} notes from {:?}", entries.len(), path);
    Ok(entries)
}

fn parse_line(path: &Path, line_number: usize, line: &str) -> Result<NoteEntry> {
    let format_error = |reason: String| DecoderError::Format {
        path: path.to_path_buf(),
        line: line_number,
        reason,
    };

    let (index, text) = line
        .split_once(',')
        .ok_or_else(|| format_error("expected 'index,text'".to_string()))?;
    let index = index
        .trim()
        .parse::<usize>()
        .map_err(|e| format_error(format!("invalid event index '{}': {}", index, e)))?;

    Ok((index, text.to_string()))
}

/// Replace the note for one event, dropping it when `text` is empty
///
/// The sidecar is rewritten through a temporary file next to it and removed
/// once it no longer holds any note.
pub fn update_note(path: &Path, index: usize, text: &str) -> Result<()> {
    let mut entries: Vec<NoteEntry> = read_notes(path)?
        .into_iter()
        .filter(|(i, _)| *i != index)
        .collect();
    if !text.is_empty() {
        entries.push((index, text.to_string()));
    }

    if entries.is_empty() {
        if path.exists() {
            fs::remove_file(path).map_err(|e| DecoderError::file_access(path, e))?;
            log::debug!("Removed empty notes file {:?}", path);
        }
        return Ok(());
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    write_entries(&temp_path, &entries)?;
    fs::rename(&temp_path, path).map_err(|e| DecoderError::file_access(path, e))?;

    log::debug!("Wrote {} notes to {:?}", entries.len(), path);
    Ok(())
}

fn write_entries(path: &Path, entries: &[NoteEntry]) -> Result<()> {
    let file = fs::File::create(path).map_err(|e| DecoderError::file_access(path, e))?;
    let mut writer = BufWriter::new(file);

    for (index, text) in entries {
        writeln!(writer, "{},{}", index, text).map_err(|e| DecoderError::file_access(path, e))?;
    }
    writer.flush().map_err(|e| DecoderError::file_access(path, e))
}
