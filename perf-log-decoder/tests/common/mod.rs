// Shared helpers: write synthetic performance logs to disk
#![allow(dead_code)]

use std::path::{Path, PathBuf};

pub const MAGIC: u32 = 0x6346_4531;
pub const EXIT: u32 = 0x8000_0000;

/// One record: ID, entry flag, time in timer ticks since zero
#[derive(Debug, Clone, Copy)]
pub struct Rec {
    pub id: u32,
    pub entry: bool,
    pub ticks: u64,
}

pub fn entry(id: u32, ticks: u64) -> Rec {
    Rec { id, entry: true, ticks }
}

pub fn exit(id: u32, ticks: u64) -> Rec {
    Rec { id, entry: false, ticks }
}

/// A performance log file under construction
pub struct SyntheticLog {
    pub seconds: u32,
    pub sub_seconds: u32,
    pub big_endian: bool,
    pub ticks_per_second: u32,
    pub mask_words: u32,
    pub description: String,
    pub records: Vec<Rec>,
}

impl SyntheticLog {
    pub fn new(seconds: u32, sub_seconds: u32) -> Self {
        Self {
            seconds,
            sub_seconds,
            big_endian: true,
            ticks_per_second: 1000,
            mask_words: 1,
            description: "synthetic".to_string(),
            records: Vec::new(),
        }
    }

    pub fn little_endian(mut self) -> Self {
        self.big_endian = false;
        self
    }

    pub fn ticks_per_second(mut self, ticks: u32) -> Self {
        self.ticks_per_second = ticks;
        self
    }

    pub fn mask_words(mut self, words: u32) -> Self {
        self.mask_words = words;
        self
    }

    pub fn records(mut self, records: &[Rec]) -> Self {
        self.records = records.to_vec();
        self
    }

    pub fn bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let be = |out: &mut Vec<u8>, v: u32| out.extend_from_slice(&v.to_be_bytes());
        let word = |out: &mut Vec<u8>, v: u32| {
            if self.big_endian {
                out.extend_from_slice(&v.to_be_bytes())
            } else {
                out.extend_from_slice(&v.to_le_bytes())
            }
        };

        be(&mut out, MAGIC);
        be(&mut out, 0);
        be(&mut out, 32 + self.description.len() as u32);
        be(&mut out, 0);
        be(&mut out, 1);
        be(&mut out, 0);
        be(&mut out, self.seconds);
        be(&mut out, self.sub_seconds);
        out.extend_from_slice(self.description.as_bytes());
        out.extend_from_slice(&[1, if self.big_endian { 1 } else { 0 }, 0, 0]);

        let count = self.records.len() as u32;
        for v in [self.ticks_per_second, 0xffff_ffff, 0, 0, 0, 0, count, count, 0, self.mask_words] {
            word(&mut out, v);
        }
        for _ in 0..(2 * self.mask_words) {
            word(&mut out, 0xffff_ffff);
        }

        let tps = self.ticks_per_second as u64;
        for rec in &self.records {
            word(&mut out, if rec.entry { rec.id } else { rec.id | EXIT });
            word(&mut out, (rec.ticks / tps) as u32);
            word(&mut out, (rec.ticks % tps) as u32);
        }

        out
    }

    pub fn write(&self, dir: &Path, name: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, self.bytes()).unwrap();
        path
    }
}
