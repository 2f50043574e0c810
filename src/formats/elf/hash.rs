//! Hash table summaries (`.gnu.hash`, `.hash`)

use crate::formats::elf::types::Section;
use crate::formats::elf::utils::ByteReader;
use serde::{Deserialize, Serialize};

/// Header fields and bucket occupancy of a GNU hash table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GnuHashSummary {
    pub nbuckets: u32,
    pub symndx: u32,
    pub maskwords: u32,
    pub shift2: u32,
    pub non_empty_buckets: u32,
}

impl GnuHashSummary {
    /// `None` when the 16-byte header is unreadable. Buckets follow a bloom
    /// filter of `maskwords` class-sized words; only readable buckets count.
    pub fn parse(reader: &ByteReader<'_>, section: &Section) -> Option<Self> {
        let base = section.offset();
        let nbuckets = reader.u32(base).ok()?;
        let symndx = reader.u32(base.checked_add(4)?).ok()?;
        let maskwords = reader.u32(base.checked_add(8)?).ok()?;
        let shift2 = reader.u32(base.checked_add(12)?).ok()?;

        let buckets = base
            .checked_add(16)?
            .checked_add(maskwords as u64 * reader.class().word_size())?;
        let non_empty_buckets = count_buckets(reader, buckets, nbuckets, |b| b != 0);

        Some(Self {
            nbuckets,
            symndx,
            maskwords,
            shift2,
            non_empty_buckets,
        })
    }
}

/// Header fields and bucket occupancy of a System V hash table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SysvHashSummary {
    pub nbucket: u32,
    pub nchain: u32,
    pub non_empty_buckets: u32,
}

impl SysvHashSummary {
    /// `None` when the 8-byte header is unreadable. A bucket of `0` or
    /// `0xffffffff` is empty.
    pub fn parse(reader: &ByteReader<'_>, section: &Section) -> Option<Self> {
        let base = section.offset();
        let nbucket = reader.u32(base).ok()?;
        let nchain = reader.u32(base.checked_add(4)?).ok()?;
        let non_empty_buckets =
            count_buckets(reader, base.checked_add(8)?, nbucket, |b| b != 0 && b != u32::MAX);

        Some(Self {
            nbucket,
            nchain,
            non_empty_buckets,
        })
    }
}

fn count_buckets(reader: &ByteReader<'_>, start: u64, count: u32, occupied: impl Fn(u32) -> bool) -> u32 {
    let mut n = 0;
    for i in 0..count as u64 {
        match start.checked_add(i * 4).map(|off| reader.u32(off)) {
            Some(Ok(b)) => {
                if occupied(b) {
                    n += 1;
                }
            }
            _ => break,
        }
    }
    n
}
