//! The analysis report and its JSON form.
//!
//! Every collection is a `Vec` or `BTreeMap`, so serializing the same
//! report twice yields byte-identical output.

use crate::analysis::{
    Anomaly, EntryCandidates, FilterMatches, Hotspot, ImportStats, SuspiciousGroup,
};
use crate::demangle::DemangleSummary;
use crate::error::Result;
use crate::formats::elf::dynamic::DynamicInfo;
use crate::formats::elf::hash::{GnuHashSummary, SysvHashSummary};
use crate::formats::elf::{
    file_type_name, machine_name, section_type_name, segment_type_name, ElfHeader,
    ProgramHeader, Section, SecurityFeatures,
};
use serde::{Deserialize, Serialize};

pub fn to_hex(value: u64) -> String {
    format!("{:#x}", value)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderSummary {
    pub class: String,
    pub endian: String,
    pub machine: String,
    pub file_type: String,
    pub entry: String,
    pub phnum: u16,
    pub shnum: u16,
    pub imports: usize,
    pub needed_libs: usize,
    pub plt_relocs: usize,
    pub dyn_relocs: usize,
}

impl HeaderSummary {
    pub fn new(header: &ElfHeader) -> Self {
        Self {
            class: header.class().label().to_string(),
            endian: header.endian().label().to_string(),
            machine: machine_name(header.e_machine),
            file_type: file_type_name(header.e_type),
            entry: to_hex(header.entry_point()),
            phnum: header.e_phnum,
            shnum: header.e_shnum,
            imports: 0,
            needed_libs: 0,
            plt_relocs: 0,
            dyn_relocs: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionSummary {
    pub name: String,
    #[serde(rename = "type")]
    pub sh_type: u32,
    pub type_name: String,
    pub addr: String,
    pub off: String,
    pub size: u64,
    pub flags: u64,
}

impl From<&Section> for SectionSummary {
    fn from(s: &Section) -> Self {
        Self {
            name: s.name.clone(),
            sh_type: s.header.sh_type,
            type_name: section_type_name(s.header.sh_type),
            addr: to_hex(s.addr()),
            off: to_hex(s.offset()),
            size: s.size(),
            flags: s.header.sh_flags,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentSummary {
    #[serde(rename = "type")]
    pub p_type: u32,
    pub type_name: String,
    pub flags: String,
    pub offset: String,
    pub vaddr: String,
    pub filesz: u64,
    pub memsz: u64,
}

impl From<&ProgramHeader> for SegmentSummary {
    fn from(ph: &ProgramHeader) -> Self {
        Self {
            p_type: ph.p_type,
            type_name: segment_type_name(ph.p_type),
            flags: ph.flags_label(),
            offset: to_hex(ph.p_offset),
            vaddr: to_hex(ph.p_vaddr),
            filesz: ph.p_filesz,
            memsz: ph.p_memsz,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelocationSummary {
    pub plt_count: usize,
    pub dyn_count: usize,
    pub top_plt_symbols: Vec<Hotspot>,
    pub top_dyn_symbols: Vec<Hotspot>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HashSummaries {
    pub gnu_hash: Option<GnuHashSummary>,
    pub sysv_hash: Option<SysvHashSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedReport {
    pub markdown: String,
}

/// Everything one analysis run produces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub header: HeaderSummary,
    pub sections: Vec<SectionSummary>,
    pub segments: Vec<SegmentSummary>,
    pub interpreter: Option<String>,
    pub security: SecurityFeatures,
    /// Defaulted when the image has no dynamic section
    pub dynamic: DynamicInfo,
    pub imports: ImportStats,
    pub relocations: RelocationSummary,
    pub hashes: HashSummaries,
    pub anomalies: Vec<Anomaly>,
    pub suspicious_imports: Vec<SuspiciousGroup>,
    pub entry_candidates: EntryCandidates,
    /// Present only when a filter was supplied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matches: Option<FilterMatches>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demangle: Option<DemangleSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub render: Option<RenderedReport>,
}

impl AnalysisReport {
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}
