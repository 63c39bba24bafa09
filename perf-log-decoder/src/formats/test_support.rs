//! Synthetic performance log images for unit tests

use super::perf_log::{Endianness, CONTENT_TYPE_MAGIC, EXIT_FLAG};
use std::path::{Path, PathBuf};

/// Builder for an in-memory performance log file
#[derive(Debug, Clone)]
pub(crate) struct LogImage {
    time_seconds: u32,
    time_sub_seconds: u32,
    description: Vec<u8>,
    endianness: Endianness,
    ticks_per_second: u32,
    mask: Vec<u32>,
    data_start: u32,
    records: Vec<(u32, u32, u32)>,
}

impl LogImage {
    pub fn new(time_seconds: u32, time_sub_seconds: u32) -> Self {
        Self {
            time_seconds,
            time_sub_seconds,
            description: Vec::new(),
            endianness: Endianness::Big,
            ticks_per_second: 1000,
            mask: vec![0xffff_ffff],
            data_start: 0,
            records: Vec::new(),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.as_bytes().to_vec();
        self
    }

    pub fn little_endian(mut self) -> Self {
        self.endianness = Endianness::Little;
        self
    }

    pub fn with_ticks_per_second(mut self, ticks: u32) -> Self {
        self.ticks_per_second = ticks;
        self
    }

    pub fn with_mask(mut self, mask: Vec<u32>) -> Self {
        self.mask = mask;
        self
    }

    pub fn with_data_start(mut self, start: u32) -> Self {
        self.data_start = start;
        self
    }

    /// Raw records in physical ring buffer order
    pub fn with_records(mut self, records: Vec<(u32, u32, u32)>) -> Self {
        self.records = records;
        self
    }

    /// Records given as (id, entry, tick count), in chronological order
    pub fn with_events(mut self, events: &[(u32, bool, u64)]) -> Self {
        let ticks = self.ticks_per_second as u64;
        self.records = events
            .iter()
            .map(|&(id, entry, at)| {
                let tagged = if entry { id } else { id | EXIT_FLAG };
                (tagged, (at / ticks) as u32, (at % ticks) as u32)
            })
            .collect();
        self
    }

    pub fn description_len(&self) -> usize {
        self.description.len()
    }

    pub fn header_len(&self) -> usize {
        32 + self.description.len() + 4 + 40 + 8 * self.mask.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.header_len() + 12 * self.records.len());

        let outer = [
            CONTENT_TYPE_MAGIC,
            0x43_5045_52,
            32 + self.description.len() as u32,
            0x42,
            1,
            0x1f,
            self.time_seconds,
            self.time_sub_seconds,
        ];
        for word in outer {
            out.extend_from_slice(&word.to_be_bytes());
        }
        out.extend_from_slice(&self.description);

        let flag = if self.endianness == Endianness::Big { 1 } else { 0 };
        out.extend_from_slice(&[1, flag, 0, 0]);

        let count = self.records.len() as u32;
        let metadata = [
            self.ticks_per_second,
            0xffff_ffff,
            2,
            1,
            3,
            self.data_start,
            self.data_start,
            count,
            0,
            self.mask.len() as u32,
        ];
        for word in metadata {
            self.put(&mut out, word);
        }
        for _ in 0..2 {
            for &word in &self.mask {
                self.put(&mut out, word);
            }
        }
        for &(tagged, upper, lower) in &self.records {
            self.put(&mut out, tagged);
            self.put(&mut out, upper);
            self.put(&mut out, lower);
        }

        out
    }

    pub fn write_to(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.to_bytes()).unwrap();
        path
    }

    fn put(&self, out: &mut Vec<u8>, word: u32) {
        match self.endianness {
            Endianness::Big => out.extend_from_slice(&word.to_be_bytes()),
            Endianness::Little => out.extend_from_slice(&word.to_le_bytes()),
        }
    }
}
