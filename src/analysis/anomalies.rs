//! Structural anomaly detection.
//!
//! A pure function over the parsed header, section table and dynamic info.
//! Every rule runs; one finding never suppresses another.

use crate::formats::elf::dynamic::DynamicInfo;
use crate::formats::elf::sections::SectionTable;
use crate::formats::elf::{ElfHeader, ET_DYN};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Path-traversal, whitespace or separator characters in a search path
static RE_UNSAFE_SEARCH_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\.\.|\s|;").expect("valid search path regex"));

const ORIGIN_TOKEN: &str = "$ORIGIN";

/// Sections that should never be empty when present
const NON_EMPTY_SECTIONS: [&str; 3] = [".text", ".dynsym", ".dynstr"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warn,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warn => "warn",
            Severity::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyCode {
    EtType,
    TextFlags,
    DataNowrite,
    RodataWritable,
    SecZero,
    SecHuge,
    SecOffsetOob,
    SecSpanOob,
    RunpathSuspicious,
    RpathSuspicious,
    ManyNeeded,
    NoDynsym,
    NoDynstr,
    ShdrTruncated,
    PhdrTruncated,
}

impl AnomalyCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyCode::EtType => "ET_TYPE",
            AnomalyCode::TextFlags => "TEXT_FLAGS",
            AnomalyCode::DataNowrite => "DATA_NOWRITE",
            AnomalyCode::RodataWritable => "RODATA_WRITABLE",
            AnomalyCode::SecZero => "SEC_ZERO",
            AnomalyCode::SecHuge => "SEC_HUGE",
            AnomalyCode::SecOffsetOob => "SEC_OFFSET_OOB",
            AnomalyCode::SecSpanOob => "SEC_SPAN_OOB",
            AnomalyCode::RunpathSuspicious => "RUNPATH_SUSPICIOUS",
            AnomalyCode::RpathSuspicious => "RPATH_SUSPICIOUS",
            AnomalyCode::ManyNeeded => "MANY_NEEDED",
            AnomalyCode::NoDynsym => "NO_DYNSYM",
            AnomalyCode::NoDynstr => "NO_DYNSTR",
            AnomalyCode::ShdrTruncated => "SHDR_TRUNCATED",
            AnomalyCode::PhdrTruncated => "PHDR_TRUNCATED",
        }
    }
}

impl fmt::Display for AnomalyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Anomaly {
    pub severity: Severity,
    pub code: AnomalyCode,
    pub message: String,
}

impl Anomaly {
    fn warn(code: AnomalyCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warn,
            code,
            message: message.into(),
        }
    }
}

/// Tunable limits for the size and dependency rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnomalyThresholds {
    /// `MANY_NEEDED` fires above this many `DT_NEEDED` entries
    pub many_needed: usize,
    /// `SEC_HUGE` fires when a section is larger than this multiple of the file
    pub huge_section_factor: u64,
    /// `SEC_SPAN_OOB` slack past end of file, in percent
    pub span_slack_percent: u64,
}

impl Default for AnomalyThresholds {
    fn default() -> Self {
        Self {
            many_needed: 100,
            huge_section_factor: 4,
            span_slack_percent: 10,
        }
    }
}

fn suspicious_search_path(path: &str) -> bool {
    RE_UNSAFE_SEARCH_PATH.is_match(path) && !path.contains(ORIGIN_TOKEN)
}

/// Run every anomaly rule.
///
/// `file_size` is the length of the whole image; all size comparisons are
/// done in `u128` so hostile header values cannot overflow.
pub fn detect_anomalies(
    header: &ElfHeader,
    sections: &SectionTable,
    dynamic: Option<&DynamicInfo>,
    file_size: u64,
    thresholds: &AnomalyThresholds,
) -> Vec<Anomaly> {
    let mut out = Vec::new();

    if header.e_type != ET_DYN {
        out.push(Anomaly::warn(
            AnomalyCode::EtType,
            format!("e_type={} is not ET_DYN(3)", header.e_type),
        ));
    }

    if header.e_shnum > 0 && header.section_table_end() > file_size as u128 {
        out.push(Anomaly {
            severity: Severity::Error,
            code: AnomalyCode::ShdrTruncated,
            message: format!(
                "section header table declares {} entries but only {} fit in the file",
                header.e_shnum,
                sections.count()
            ),
        });
    }
    if header.e_phnum > 0 && header.program_table_end() > file_size as u128 {
        out.push(Anomaly {
            severity: Severity::Error,
            code: AnomalyCode::PhdrTruncated,
            message: format!(
                "program header table ends at {:#x}, past end of file ({:#x})",
                header.program_table_end(),
                file_size
            ),
        });
    }

    if let Some(text) = sections.by_name(".text") {
        if !text.is_executable() {
            out.push(Anomaly::warn(
                AnomalyCode::TextFlags,
                ".text is not marked executable (SHF_EXECINSTR)",
            ));
        }
    }
    if let Some(data) = sections.by_name(".data") {
        if !data.is_writable() {
            out.push(Anomaly::warn(
                AnomalyCode::DataNowrite,
                ".data is not marked writable (SHF_WRITE)",
            ));
        }
    }
    if let Some(rodata) = sections.by_name(".rodata") {
        if rodata.is_writable() {
            out.push(Anomaly::warn(
                AnomalyCode::RodataWritable,
                ".rodata is marked writable (SHF_WRITE)",
            ));
        }
    }

    let fs = file_size as u128;
    for s in sections.sections() {
        let size = s.size() as u128;
        let off = s.offset() as u128;

        if size == 0 && NON_EMPTY_SECTIONS.contains(&s.name()) {
            out.push(Anomaly::warn(
                AnomalyCode::SecZero,
                format!("{} has zero size", s.name()),
            ));
        }
        if s.is_nobits() || file_size == 0 {
            continue;
        }
        if size > fs * thresholds.huge_section_factor as u128 {
            out.push(Anomaly::warn(
                AnomalyCode::SecHuge,
                format!(
                    "{} size ({}) far exceeds file size ({})",
                    s.name(),
                    size,
                    file_size
                ),
            ));
        }
        if off > fs {
            out.push(Anomaly::warn(
                AnomalyCode::SecOffsetOob,
                format!(
                    "{} offset out of bounds (off={} > file={})",
                    s.name(),
                    off,
                    file_size
                ),
            ));
        }
        // off + min(size, file) > file * (1 + slack); scaled by 100 to stay integral
        let span = off + size.min(fs);
        if span * 100 > fs * (100 + thresholds.span_slack_percent as u128) {
            out.push(Anomaly::warn(
                AnomalyCode::SecSpanOob,
                format!("{} (off+size) extends past end of file", s.name()),
            ));
        }
    }

    if let Some(dynamic) = dynamic {
        if let Some(rp) = dynamic.runpath.as_deref().filter(|p| suspicious_search_path(p)) {
            out.push(Anomaly::warn(
                AnomalyCode::RunpathSuspicious,
                format!("suspicious RUNPATH: {}", rp),
            ));
        }
        if let Some(rp) = dynamic.rpath.as_deref().filter(|p| suspicious_search_path(p)) {
            out.push(Anomaly::warn(
                AnomalyCode::RpathSuspicious,
                format!("suspicious RPATH: {}", rp),
            ));
        }
        if dynamic.needed.len() > thresholds.many_needed {
            out.push(Anomaly {
                severity: Severity::Info,
                code: AnomalyCode::ManyNeeded,
                message: format!("many NEEDED dependencies: {}", dynamic.needed.len()),
            });
        }
    }

    if sections.by_name(".dynsym").is_none() {
        out.push(Anomaly::warn(AnomalyCode::NoDynsym, "missing .dynsym"));
    }
    if sections.by_name(".dynstr").is_none() {
        out.push(Anomaly::warn(AnomalyCode::NoDynstr, "missing .dynstr"));
    }

    out
}
