//! Human-readable rendering of an [`AnalysisReport`].

use crate::analysis::Hotspot;
use crate::error::{ElfSiftError, Result};
use crate::report::AnalysisReport;
use std::fmt::Write;

/// Rows shown per table or list
const LIST_LIMIT: usize = 20;
/// Symbols shown per suspicious-import category
const CATEGORY_LIMIT: usize = 30;

/// Turns a finished report into text.
pub trait ReportRenderer {
    fn render(&self, report: &AnalysisReport) -> Result<String>;
}

/// Markdown layout: overview first, then one section per populated part.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownRenderer;

impl ReportRenderer for MarkdownRenderer {
    fn render(&self, report: &AnalysisReport) -> Result<String> {
        render_markdown(report).map_err(|e| ElfSiftError::Render(e.to_string()))
    }
}

fn render_markdown(r: &AnalysisReport) -> std::result::Result<String, std::fmt::Error> {
    let mut out = String::new();
    let h = &r.header;

    writeln!(out, "# ELF Analysis Report")?;
    writeln!(out)?;
    writeln!(out, "## Overview")?;
    writeln!(out, "- Class: {}", h.class)?;
    writeln!(out, "- Endianness: {}", h.endian)?;
    writeln!(out, "- Machine: {}", h.machine)?;
    writeln!(out, "- Type: {}", h.file_type)?;
    writeln!(out, "- Entry: {}", h.entry)?;
    writeln!(out, "- Sections: {} | Segments: {}", h.shnum, h.phnum)?;
    writeln!(out, "- Needed libraries: {} | Imports: {}", h.needed_libs, h.imports)?;
    writeln!(out, "- Relocations: PLT={} / DYN={}", h.plt_relocs, h.dyn_relocs)?;
    if let Some(interp) = &r.interpreter {
        writeln!(out, "- Interpreter: {}", interp)?;
    }
    if let Some(soname) = &r.dynamic.soname {
        writeln!(out, "- SONAME: {}", soname)?;
    }
    writeln!(out)?;

    if !r.dynamic.needed.is_empty() {
        writeln!(out, "## Needed Libraries (NEEDED)")?;
        for lib in &r.dynamic.needed {
            writeln!(out, "- {}", lib)?;
        }
        writeln!(out)?;
    }

    if !r.sections.is_empty() {
        let shown = r.sections.len().min(LIST_LIMIT);
        writeln!(out, "## Sections (Top {})", shown)?;
        writeln!(out, "| Name | Type | Address | Offset | Size | Flags |")?;
        writeln!(out, "|---|---:|---:|---:|---:|---:|")?;
        for s in r.sections.iter().take(LIST_LIMIT) {
            writeln!(
                out,
                "| {} | {} | {} | {} | {} | {} |",
                s.name, s.type_name, s.addr, s.off, s.size, s.flags
            )?;
        }
        writeln!(out)?;
    }

    let imports = &r.imports;
    writeln!(out, "## Import Statistics")?;
    writeln!(out, "- Total: {}", imports.count)?;
    if !imports.by_type.is_empty() {
        writeln!(out, "- By type:")?;
        for c in &imports.by_type {
            writeln!(out, "  - {}: {}", c.name, c.count)?;
        }
    }
    if !imports.by_bind.is_empty() {
        writeln!(out, "- By binding:")?;
        for c in &imports.by_bind {
            writeln!(out, "  - {}: {}", c.name, c.count)?;
        }
    }
    if !imports.sample_demangled.is_empty() {
        writeln!(out, "- Sample (demangled):")?;
        for n in imports.sample_demangled.iter().take(LIST_LIMIT) {
            writeln!(out, "  - {}", n)?;
        }
    }
    writeln!(out)?;

    if !r.suspicious_imports.is_empty() {
        writeln!(out, "## Suspicious Imports")?;
        for group in &r.suspicious_imports {
            writeln!(out, "- {} ({})", group.category.label(), group.count)?;
            for n in group.symbols.iter().take(CATEGORY_LIMIT) {
                writeln!(out, "  - {}", n)?;
            }
        }
        writeln!(out)?;
    }

    let relocs = &r.relocations;
    if !relocs.top_plt_symbols.is_empty() || !relocs.top_dyn_symbols.is_empty() {
        writeln!(out, "## Relocation Hotspots")?;
        write_hotspots(&mut out, "PLT", &relocs.top_plt_symbols)?;
        write_hotspots(&mut out, "DYN", &relocs.top_dyn_symbols)?;
        writeln!(out)?;
    }

    let entries = &r.entry_candidates;
    if !entries.is_empty() {
        writeln!(out, "## Entry Candidates")?;
        for e in &entries.known_entries {
            writeln!(out, "- {}: {}", e.convention, e.symbol)?;
        }
        if let Some(count) = entries.init_array_count.filter(|&c| c > 0) {
            writeln!(out, "- initArray: {} entries", count)?;
        }
        if !entries.likely_entry_exports.is_empty() {
            writeln!(out, "- Likely entry exports:")?;
            for n in entries.likely_entry_exports.iter().take(LIST_LIMIT) {
                writeln!(out, "  - {}", n)?;
            }
        }
        writeln!(out)?;
    }

    if r.hashes.gnu_hash.is_some() || r.hashes.sysv_hash.is_some() {
        writeln!(out, "## Symbol Hash Tables")?;
        if let Some(g) = &r.hashes.gnu_hash {
            writeln!(
                out,
                "- GNU Hash: buckets={}, nonEmpty={}, symndx={}",
                g.nbuckets, g.non_empty_buckets, g.symndx
            )?;
        }
        if let Some(s) = &r.hashes.sysv_hash {
            writeln!(
                out,
                "- SysV Hash: nbucket={}, nonEmpty={}",
                s.nbucket, s.non_empty_buckets
            )?;
        }
        writeln!(out)?;
    }

    if !r.anomalies.is_empty() {
        writeln!(out, "## Anomalies")?;
        for a in &r.anomalies {
            writeln!(out, "- [{}] {}: {}", a.severity.as_str(), a.code, a.message)?;
        }
        writeln!(out)?;
    }

    Ok(out)
}

fn write_hotspots(out: &mut String, title: &str, list: &[Hotspot]) -> std::fmt::Result {
    if list.is_empty() {
        return Ok(());
    }
    writeln!(out, "- {}", title)?;
    for h in list.iter().take(LIST_LIMIT) {
        writeln!(out, "  - {}: {}", h.demangled_name, h.count)?;
    }
    Ok(())
}
