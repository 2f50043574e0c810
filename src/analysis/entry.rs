//! Entry-point candidates for native libraries.
//!
//! Shared objects loaded by a managed runtime rarely use `e_entry`; code runs
//! from well-known exported hooks and from `.init_array`.

use crate::formats::elf::Symbol;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Most exports listed in `likely_entry_exports`
pub const MAX_ENTRY_EXPORTS: usize = 50;

static RE_NATIVE_BRIDGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(Java_|JNI_On|ANative)").expect("valid native bridge regex"));

/// Hook symbols a loader calls by name, with the convention they belong to
const KNOWN_ENTRIES: [(&str, &str); 3] = [
    ("JNI", "JNI_OnLoad"),
    ("JNI", "JNI_OnUnload"),
    ("AndroidActivity", "ANativeActivity_onCreate"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownEntry {
    pub convention: String,
    pub symbol: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryCandidates {
    pub known_entries: Vec<KnownEntry>,
    /// Pointers in `.init_array`; `None` when the section is absent
    pub init_array_count: Option<u64>,
    pub likely_entry_exports: Vec<String>,
}

impl EntryCandidates {
    pub fn is_empty(&self) -> bool {
        self.known_entries.is_empty()
            && self.init_array_count.unwrap_or(0) == 0
            && self.likely_entry_exports.is_empty()
    }
}

/// Collect entry candidates from exported symbols.
pub fn find_entry_candidates<'a, I>(exports: I, init_array_count: Option<u64>) -> EntryCandidates
where
    I: IntoIterator<Item = &'a Symbol>,
{
    let exports: Vec<&Symbol> = exports.into_iter().collect();

    let known_entries = KNOWN_ENTRIES
        .iter()
        .filter(|(_, name)| exports.iter().any(|s| s.name == *name))
        .map(|(convention, name)| KnownEntry {
            convention: convention.to_string(),
            symbol: name.to_string(),
        })
        .collect();

    let likely_entry_exports = exports
        .iter()
        .filter(|s| s.is_function() || RE_NATIVE_BRIDGE.is_match(&s.name))
        .take(MAX_ENTRY_EXPORTS)
        .map(|s| s.name.clone())
        .collect();

    EntryCandidates {
        known_entries,
        init_array_count,
        likely_entry_exports,
    }
}
