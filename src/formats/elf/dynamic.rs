//! Dynamic section parsing

use crate::formats::elf::types::*;
use crate::formats::elf::utils::{resolve_name, ByteReader};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Dynamic entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DynamicEntry {
    pub d_tag: i64,
    pub d_val: u64,
}

/// Dynamic linking information collected from `.dynamic`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DynamicInfo {
    pub needed: Vec<String>,
    pub soname: Option<String>,
    pub rpath: Option<String>,
    pub runpath: Option<String>,
    pub bind_now: bool,
    /// Entries walked before `DT_NULL` or the end of the section.
    pub entry_count: usize,
}

impl DynamicInfo {
    /// Walk the dynamic section and resolve string-valued tags.
    ///
    /// The walk stops at the first `DT_NULL`, at `sh_size / stride` entries,
    /// or at the first entry that would run past the buffer. With no string
    /// table the string tags are skipped.
    pub fn parse(reader: &ByteReader<'_>, dynamic: &Section, strtab: Option<&Section>) -> Self {
        let entries = parse_entries(reader, dynamic);
        let strings = strtab
            .map(|s| reader.slice_clamped(s.offset(), s.size()))
            .unwrap_or(&[]);

        let mut info = DynamicInfo {
            entry_count: entries.len(),
            ..Default::default()
        };
        let mut flags = 0u64;

        for entry in &entries {
            let name = || {
                u32::try_from(entry.d_val)
                    .map(|off| resolve_name(strings, off))
                    .unwrap_or_default()
            };
            match entry.d_tag {
                // Kept even when empty so neededLibs matches the tag count
                DT_NEEDED if strtab.is_some() => info.needed.push(name()),
                // Repeated string tags: the last one wins
                DT_SONAME => info.soname = non_empty(name()),
                DT_RPATH => info.rpath = non_empty(name()),
                DT_RUNPATH => info.runpath = non_empty(name()),
                DT_BIND_NOW => info.bind_now = true,
                DT_FLAGS => flags |= entry.d_val,
                _ => {}
            }
        }
        if flags & DF_BIND_NOW != 0 {
            info.bind_now = true;
        }

        debug!(
            entries = info.entry_count,
            needed = info.needed.len(),
            "Parsed dynamic section"
        );
        info
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Read raw `(d_tag, d_val)` pairs up to `DT_NULL`.
pub fn parse_entries(reader: &ByteReader<'_>, dynamic: &Section) -> Vec<DynamicEntry> {
    let natural = reader.class().dynamic_entry_size();
    let stride = dynamic.entry_size_or(natural);
    let count = dynamic.size() / stride;
    let needed = stride.max(natural);
    let word = reader.class().word_size();

    let mut entries = Vec::with_capacity(count.min(1024) as usize);
    for i in 0..count {
        let offset = match i
            .checked_mul(stride)
            .and_then(|o| o.checked_add(dynamic.offset()))
        {
            Some(o) if reader.contains(o, needed) => o,
            _ => break,
        };
        let (Ok(d_tag), Ok(d_val)) = (reader.sword(offset), reader.word(offset + word)) else {
            break;
        };
        if d_tag == DT_NULL {
            break;
        }
        entries.push(DynamicEntry { d_tag, d_val });
    }
    entries
}
