//! ELF (Executable and Linkable Format) parser
//!
//! Parses untrusted ELF32/ELF64 images of either byte order. Only the file
//! header is mandatory: every table behind it is read with bounds checks and
//! truncated, rather than rejected, when it runs past the end of the buffer.

pub mod dynamic;
pub mod hash;
pub mod headers;
pub mod relocations;
pub mod sections;
pub mod segments;
pub mod symbols;
pub mod types;
pub mod utils;

use dynamic::DynamicInfo;
use hash::{GnuHashSummary, SysvHashSummary};
use headers::parse_header;
use relocations::RelocationTable;
use sections::SectionTable;
use segments::SegmentTable;
use symbols::SymbolTable;
pub use types::*;
use utils::ByteReader;

/// Main ELF parser
pub struct ElfParser<'data> {
    reader: ByteReader<'data>,
    header: ElfHeader,
    segments: SegmentTable,
    sections: SectionTable,
}

impl<'data> ElfParser<'data> {
    /// Parse ELF from raw data.
    ///
    /// Fails only when the file header itself is invalid. Program and
    /// section tables are parsed eagerly so later lookups are infallible.
    pub fn parse(data: &'data [u8]) -> Result<Self> {
        let header = parse_header(data)?;
        let reader = ByteReader::new(data, header.class(), header.endian());
        let segments = SegmentTable::parse(&reader, &header);
        let sections = SectionTable::parse(&reader, &header);

        Ok(Self {
            reader,
            header,
            segments,
            sections,
        })
    }

    /// Get ELF header
    pub fn header(&self) -> &ElfHeader {
        &self.header
    }

    /// Get raw data
    pub fn data(&self) -> &'data [u8] {
        self.reader.data()
    }

    pub fn reader(&self) -> &ByteReader<'data> {
        &self.reader
    }

    /// Get sections
    pub fn sections(&self) -> &SectionTable {
        &self.sections
    }

    /// Get segments
    pub fn segments(&self) -> &SegmentTable {
        &self.segments
    }

    /// Section named `name`, else the first one of type `sh_type`.
    fn find_section(&self, name: &str, sh_type: u32) -> Option<&Section> {
        self.sections
            .by_name(name)
            .or_else(|| self.sections.by_type(sh_type))
    }

    /// String table for a dynamic-linking section: its `sh_link` target when
    /// that is a string table, else `.dynstr`.
    fn dynamic_strings(&self, section: &Section) -> Option<&Section> {
        self.sections
            .linked_strtab(section)
            .or_else(|| self.sections.by_name(".dynstr"))
    }

    /// Get dynamic section
    pub fn dynamic(&self) -> Option<DynamicInfo> {
        let dynamic = self.find_section(".dynamic", SHT_DYNAMIC)?;
        let strtab = self.dynamic_strings(dynamic);
        Some(DynamicInfo::parse(&self.reader, dynamic, strtab))
    }

    /// Get dynamic symbol table
    pub fn dynamic_symbols(&self) -> Option<SymbolTable> {
        let dynsym = self.find_section(".dynsym", SHT_DYNSYM)?;
        let strtab = self.dynamic_strings(dynsym);
        Some(SymbolTable::parse(&self.reader, dynsym, strtab))
    }

    /// Get PLT relocations
    pub fn plt_relocations(&self) -> Option<RelocationTable> {
        self.relocations(&[".rel.plt", ".rela.plt"])
    }

    /// Get dynamic (non-PLT) relocations
    pub fn dyn_relocations(&self) -> Option<RelocationTable> {
        self.relocations(&[".rel.dyn", ".rela.dyn"])
    }

    fn relocations(&self, names: &[&str]) -> Option<RelocationTable> {
        let section = self.sections.first_named(names)?;
        Some(RelocationTable::parse(&self.reader, section))
    }

    /// Summarize `.gnu.hash`
    pub fn gnu_hash(&self) -> Option<GnuHashSummary> {
        let section = self.find_section(".gnu.hash", SHT_GNU_HASH)?;
        GnuHashSummary::parse(&self.reader, section)
    }

    /// Summarize `.hash`
    pub fn sysv_hash(&self) -> Option<SysvHashSummary> {
        let section = self.find_section(".hash", SHT_HASH)?;
        SysvHashSummary::parse(&self.reader, section)
    }

    /// Number of pointers in `.init_array`
    pub fn init_array_count(&self) -> Option<u64> {
        let section = self.find_section(".init_array", SHT_INIT_ARRAY)?;
        let entsize = section.entry_size_or(self.header.class().word_size());
        Some(section.size() / entsize)
    }

    /// Get interpreter path
    pub fn interpreter(&self) -> Option<String> {
        self.segments.interpreter(&self.reader)
    }

    /// Derive hardening features from already-parsed dynamic and symbol data.
    pub fn security_features(
        &self,
        dynamic: Option<&DynamicInfo>,
        symbols: Option<&SymbolTable>,
    ) -> SecurityFeatures {
        let bind_now = dynamic.map(|d| d.bind_now).unwrap_or(false);
        let relro = if !self.segments.has_relro() {
            RelroLevel::None
        } else if bind_now {
            RelroLevel::Full
        } else {
            RelroLevel::Partial
        };

        let has_import = |pred: &dyn Fn(&str) -> bool| {
            symbols
                .map(|s| s.imports().any(|sym| pred(&sym.name)))
                .unwrap_or(false)
        };

        SecurityFeatures {
            nx: self.segments.nx_stack(),
            pie: self.header.is_shared_object() && self.segments.interpreter(&self.reader).is_some(),
            relro,
            bind_now,
            stack_canary: has_import(&|n| n == "__stack_chk_fail"),
            fortify: has_import(&|n| n == "__fortify_fail" || n.ends_with("_chk") && n.starts_with("__")),
        }
    }
}
