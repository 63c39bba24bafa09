//! cFE performance log file parser
//!
//! A performance log is a cFE file header (big-endian), a metadata block whose
//! byte order is given by its own endian flag, two ID bitmasks and a
//! circular buffer of 12-byte records.
//!
//! ## Layout
//! - 8 big-endian words: content type, sub type, length, spacecraft ID,
//!   processor ID, application ID, time seconds, time subseconds
//! - description: `length - 32` bytes
//! - version (u8), endian flag (u8, 1 = big), 2 spare bytes
//! - 10 words: ticks/second, rollover, state, mode, trigger count,
//!   data start, data end, data count, invalid marker count, mask size
//! - filter mask and trigger mask, `mask size` words each
//! - `data count` records of `(tagged ID, timer upper, timer lower)`
//!
//! Records are stored as a physical image of the ring buffer, so they are
//! read from `data start` to the end of the image and then from the start of
//! the image, which yields them in chronological order.

use crate::config::AnalysisConfig;
use crate::types::{DecoderError, Result};
use byteorder::{BigEndian, LittleEndian, ReadBytesExt};
use serde::Serialize;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

/// Content type tag every cFE file starts with ("cFE1")
pub const CONTENT_TYPE_MAGIC: u32 = 0x6346_4531;

/// High bit of a tagged ID, set on exit events
pub const EXIT_FLAG: u32 = 0x8000_0000;

/// Mask that strips the entry/exit flag from a tagged ID
pub const ID_MASK: u32 = 0x7fff_ffff;

/// Size of one ring buffer record in bytes
pub const RECORD_SIZE: u64 = 12;

const WORD_SIZE: u64 = 4;
const FIXED_HEADER_WORDS: u64 = 8;
const METADATA_WORDS: u64 = 10;
const METADATA_BYTE_FIELDS: u64 = 4;
const BITS_PER_MASK_WORD: u64 = 32;

// Upper bound on the records pre-allocated before any have been read
const MAX_RECORD_PREALLOC: usize = 1 << 20;

/// Byte order of the metadata block and records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Endianness {
    Big,
    Little,
}

impl Endianness {
    /// Decode the metadata endian flag (1 = big, anything else = little)
    pub fn from_flag(flag: u8) -> Self {
        if flag == 1 {
            Endianness::Big
        } else {
            Endianness::Little
        }
    }
}

impl fmt::Display for Endianness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endianness::Big => write!(f, "Big"),
            Endianness::Little => write!(f, "Little"),
        }
    }
}

/// Trigger state recorded when the log was dumped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TriggerState {
    Idle,
    Waiting,
    Triggered,
    Unknown(u32),
}

impl TriggerState {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => TriggerState::Idle,
            1 => TriggerState::Waiting,
            2 => TriggerState::Triggered,
            other => TriggerState::Unknown(other),
        }
    }
}

impl fmt::Display for TriggerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerState::Idle => write!(f, "Idle"),
            TriggerState::Waiting => write!(f, "Waiting"),
            TriggerState::Triggered => write!(f, "Triggered"),
            TriggerState::Unknown(raw) => write!(f, "Unknown ({})", raw),
        }
    }
}

/// Where the trigger sits within the captured window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TriggerMode {
    Start,
    Center,
    End,
    Unknown(u32),
}

impl TriggerMode {
    pub fn from_raw(raw: u32) -> Self {
        match raw {
            0 => TriggerMode::Start,
            1 => TriggerMode::Center,
            2 => TriggerMode::End,
            other => TriggerMode::Unknown(other),
        }
    }
}

impl fmt::Display for TriggerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerMode::Start => write!(f, "Start"),
            TriggerMode::Center => write!(f, "Center"),
            TriggerMode::End => write!(f, "End"),
            TriggerMode::Unknown(raw) => write!(f, "Unknown ({})", raw),
        }
    }
}

/// Header and metadata of one physical log file
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogFileHeader {
    /// Content type tag as text (always "cFE1" for an accepted file)
    pub content_type: String,
    pub sub_type: u32,
    /// Length field of the cFE header; the description occupies `length - 32` bytes
    pub length: u32,
    pub spacecraft_id: u32,
    pub processor_id: u32,
    pub application_id: u32,
    /// Capture time, whole seconds
    pub time_seconds: u32,
    /// Capture time, subseconds
    pub time_sub_seconds: u32,
    /// Description with non-printable characters removed
    pub description: String,
    /// Raw description length as stored in the file
    pub description_len: usize,
    pub version: u8,
    pub endianness: Endianness,
    pub ticks_per_second: u32,
    pub timer_rollover: u32,
    pub trigger_state: TriggerState,
    pub trigger_mode: TriggerMode,
    pub trigger_count: u32,
    /// Ring buffer index of the oldest record
    pub data_start: u32,
    /// Ring buffer index of the next free record
    pub data_end: u32,
    /// Number of records in the ring buffer image
    pub data_count: u32,
    pub invalid_marker_count: u32,
    /// Size of each mask in 32-bit words
    pub mask_size: u32,
    /// One bit per performance ID, word 0 holds IDs 0..32
    pub filter_mask: Vec<u32>,
    pub trigger_mask: Vec<u32>,
    /// Path the header was read from
    pub file_path: PathBuf,
}

impl LogFileHeader {
    /// Byte offset of the first record
    pub fn header_byte_length(&self) -> u64 {
        WORD_SIZE * (FIXED_HEADER_WORDS + METADATA_WORDS)
            + METADATA_BYTE_FIELDS
            + self.description_len as u64
            + WORD_SIZE * self.mask_size as u64 * 2
    }

    /// Number of performance IDs the masks can describe
    pub fn max_ids(&self) -> u64 {
        self.mask_size as u64 * BITS_PER_MASK_WORD
    }

    /// Key that orders headers by capture time
    pub fn capture_time(&self) -> (u32, u32) {
        (self.time_seconds, self.time_sub_seconds)
    }

    /// True if the ID's bit is set in the filter mask
    pub fn is_in_filter_mask(&self, perf_id: u32) -> bool {
        mask_bit(&self.filter_mask, perf_id)
    }

    /// True if the ID's bit is set in the trigger mask
    pub fn is_in_trigger_mask(&self, perf_id: u32) -> bool {
        mask_bit(&self.trigger_mask, perf_id)
    }

    /// Filter mask as hex words, most significant word first
    pub fn filter_mask_text(&self) -> String {
        mask_text(&self.filter_mask)
    }

    /// Trigger mask as hex words, most significant word first
    pub fn trigger_mask_text(&self) -> String {
        mask_text(&self.trigger_mask)
    }

    /// File name of the notes sidecar belonging to this log
    pub fn notes_file_name(&self) -> String {
        format!("perf.{}.{}.notes", self.time_seconds, self.time_sub_seconds)
    }

    /// File name without its directory, for display
    pub fn file_name(&self) -> String {
        self.file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.file_path.display().to_string())
    }
}

fn mask_bit(mask: &[u32], perf_id: u32) -> bool {
    let word = (perf_id as u64 / BITS_PER_MASK_WORD) as usize;
    let bit = perf_id as u64 % BITS_PER_MASK_WORD;
    mask.get(word).map_or(false, |w| (w >> bit) & 1 == 1)
}

fn mask_text(mask: &[u32]) -> String {
    mask.iter()
        .rev()
        .map(|word| format!("{:08x}", word))
        .collect::<Vec<_>>()
        .join(" ")
}

/// One ring buffer record, exactly as stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord {
    /// Performance ID with the exit flag in the high bit
    pub tagged_id: u32,
    pub timer_upper: u32,
    pub timer_lower: u32,
}

impl RawRecord {
    /// Performance ID with the entry/exit flag stripped
    pub fn perf_id(&self) -> u32 {
        self.tagged_id & ID_MASK
    }

    /// Entry events have the flag bit clear
    pub fn is_entry(&self) -> bool {
        self.tagged_id & EXIT_FLAG == 0
    }
}

/// Timer value every timestamp is measured from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaseTime {
    upper: i64,
    lower: i64,
}

impl BaseTime {
    /// Take the base from the first record of the earliest file
    pub fn from_record(record: &RawRecord) -> Self {
        Self {
            upper: i64::from(record.timer_upper),
            lower: i64::from(record.timer_lower),
        }
    }

    /// Seconds between the base and the record's timer value
    pub fn time_stamp(&self, record: &RawRecord, ticks_per_second: u32) -> f64 {
        let ticks = i64::from(ticks_per_second);
        let mut upper = i64::from(record.timer_upper);
        let mut lower = i64::from(record.timer_lower);

        // Borrow one second from the upper word
        if lower < self.lower {
            lower += ticks;
            upper -= 1;
        }

        upper -= self.upper;
        lower -= self.lower;
        upper as f64 + lower as f64 / ticks as f64
    }
}

/// Performance log file parser
pub struct PerfLogReader;

impl PerfLogReader {
    /// Read and validate the header and metadata of a log file
    pub fn read_header(path: &Path, config: &AnalysisConfig) -> Result<LogFileHeader> {
        log::debug!("Reading performance log header: {:?}", path);

        let file = File::open(path).map_err(|e| DecoderError::file_access(path, e))?;
        parse_header(&mut BufReader::new(file), path, config)
    }

    /// Read the ring buffer records of a file whose header was already read
    pub fn read_records(header: &LogFileHeader) -> Result<Vec<RawRecord>> {
        let path = header.file_path.as_path();
        log::debug!(
            "Reading {} records from {:?} (start index {})",
            header.data_count,
            path,
            header.data_start
        );

        let file = File::open(path).map_err(|e| DecoderError::file_access(path, e))?;
        parse_records(&mut BufReader::new(file), header)
    }
}

/// Parse the header and metadata from the start of `reader`
pub fn parse_header<R: Read>(
    reader: &mut R,
    path: &Path,
    config: &AnalysisConfig,
) -> Result<LogFileHeader> {
    let mut fields = FieldReader { reader, path };

    let content_type = fields.u32(Endianness::Big, "content type")?;
    if content_type != CONTENT_TYPE_MAGIC {
        return Err(DecoderError::ContentMismatch {
            path: path.to_path_buf(),
            found: content_type,
        });
    }

    let sub_type = fields.u32(Endianness::Big, "sub type")?;
    let length = fields.u32(Endianness::Big, "length")?;
    let spacecraft_id = fields.u32(Endianness::Big, "spacecraft ID")?;
    let processor_id = fields.u32(Endianness::Big, "processor ID")?;
    let application_id = fields.u32(Endianness::Big, "application ID")?;
    let time_seconds = fields.u32(Endianness::Big, "time seconds")?;
    let time_sub_seconds = fields.u32(Endianness::Big, "time subseconds")?;

    let fixed_len = (WORD_SIZE * FIXED_HEADER_WORDS) as u32;
    let description_len = length
        .checked_sub(fixed_len)
        .map(|len| len as usize)
        .ok_or_else(|| implausible(path, format!("header length {} is below {}", length, fixed_len)))?;
    if description_len > config.max_description_len {
        return Err(implausible(
            path,
            format!(
                "description length {} exceeds {}",
                description_len, config.max_description_len
            ),
        ));
    }
    let description_bytes = fields.bytes(description_len, "description")?;
    let description = description_bytes
        .iter()
        .filter(|b| (b' '..=b'~').contains(*b))
        .map(|&b| b as char)
        .collect::<String>();

    let version = fields.u8("version")?;
    let endianness = Endianness::from_flag(fields.u8("endian flag")?);
    fields.bytes(2, "spare")?;

    let ticks_per_second = fields.u32(endianness, "ticks per second")?;
    let timer_rollover = fields.u32(endianness, "timer rollover")?;
    let state = fields.u32(endianness, "trigger state")?;
    let mode = fields.u32(endianness, "trigger mode")?;
    let trigger_count = fields.u32(endianness, "trigger count")?;
    let data_start = fields.u32(endianness, "data start")?;
    let data_end = fields.u32(endianness, "data end")?;
    let data_count = fields.u32(endianness, "data count")?;
    let invalid_marker_count = fields.u32(endianness, "invalid marker count")?;
    let mask_size = fields.u32(endianness, "mask size")?;

    if ticks_per_second == 0 {
        return Err(implausible(path, "ticks per second is zero".to_string()));
    }
    if mask_size > config.max_mask_words {
        return Err(implausible(
            path,
            format!("mask size {} exceeds {} words", mask_size, config.max_mask_words),
        ));
    }

    let filter_mask = fields.words(endianness, mask_size, "filter mask")?;
    let trigger_mask = fields.words(endianness, mask_size, "trigger mask")?;

    let header = LogFileHeader {
        content_type: String::from_utf8_lossy(&CONTENT_TYPE_MAGIC.to_be_bytes()).into_owned(),
        sub_type,
        length,
        spacecraft_id,
        processor_id,
        application_id,
        time_seconds,
        time_sub_seconds,
        description,
        description_len,
        version,
        endianness,
        ticks_per_second,
        timer_rollover,
        trigger_state: TriggerState::from_raw(state),
        trigger_mode: TriggerMode::from_raw(mode),
        trigger_count,
        data_start,
        data_end,
        data_count,
        invalid_marker_count,
        mask_size,
        filter_mask,
        trigger_mask,
        file_path: path.to_path_buf(),
    };

    log::debug!(
        "Header for {:?}: {} endian, {} ticks/s, {} records, {} IDs",
        path,
        header.endianness,
        header.ticks_per_second,
        header.data_count,
        header.max_ids()
    );

    Ok(header)
}

/// Parse the ring buffer records that follow the header
pub fn parse_records<R: Read + Seek>(reader: &mut R, header: &LogFileHeader) -> Result<Vec<RawRecord>> {
    let path = header.file_path.as_path();
    let count = header.data_count as u64;
    let start = header.data_start as u64;
    let base = header.header_byte_length();

    // Oldest records sit from `data start` to the end of the image
    let tail = count.saturating_sub(start);
    let head = count - tail;

    let mut records = Vec::with_capacity((count as usize).min(MAX_RECORD_PREALLOC));

    let seek = |reader: &mut R, offset: u64| {
        reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| DecoderError::file_access(path, e))
    };

    seek(reader, base + RECORD_SIZE * start.min(count))?;
    read_record_run(reader, header, tail, &mut records)?;

    seek(reader, base)?;
    read_record_run(reader, header, head, &mut records)?;

    log::trace!("Read {} records from {:?}", records.len(), path);
    Ok(records)
}

fn read_record_run<R: Read>(
    reader: &mut R,
    header: &LogFileHeader,
    run: u64,
    records: &mut Vec<RawRecord>,
) -> Result<()> {
    let mut fields = FieldReader {
        reader,
        path: header.file_path.as_path(),
    };

    for _ in 0..run {
        let number = records.len();
        let tagged_id = fields.u32(header.endianness, &format!("record {} ID", number))?;
        let timer_upper = fields.u32(header.endianness, &format!("record {} upper timer", number))?;
        let timer_lower = fields.u32(header.endianness, &format!("record {} lower timer", number))?;
        records.push(RawRecord {
            tagged_id,
            timer_upper,
            timer_lower,
        });
    }

    Ok(())
}

fn implausible(path: &Path, reason: String) -> DecoderError {
    DecoderError::ImplausibleHeader {
        path: path.to_path_buf(),
        reason,
    }
}

/// Reads fixed-size fields, turning short reads into `TruncatedRead`
struct FieldReader<'a, R> {
    reader: R,
    path: &'a Path,
}

impl<'a, R: Read> FieldReader<'a, R> {
    fn map_err(&self, err: std::io::Error, field: &str) -> DecoderError {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            DecoderError::TruncatedRead {
                path: self.path.to_path_buf(),
                field: field.to_string(),
            }
        } else {
            DecoderError::file_access(self.path, err)
        }
    }

    fn u8(&mut self, field: &str) -> Result<u8> {
        self.reader.read_u8().map_err(|e| self.map_err(e, field))
    }

    fn u32(&mut self, endianness: Endianness, field: &str) -> Result<u32> {
        let value = match endianness {
            Endianness::Big => self.reader.read_u32::<BigEndian>(),
            Endianness::Little => self.reader.read_u32::<LittleEndian>(),
        };
        value.map_err(|e| self.map_err(e, field))
    }

    fn words(&mut self, endianness: Endianness, count: u32, field: &str) -> Result<Vec<u32>> {
        (0..count).map(|_| self.u32(endianness, field)).collect()
    }

    fn bytes(&mut self, len: usize, field: &str) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.reader
            .read_exact(&mut buf)
            .map_err(|e| self.map_err(e, field))?;
        Ok(buf)
    }
}
