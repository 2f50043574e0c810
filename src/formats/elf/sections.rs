//! Section table management

use crate::formats::elf::types::*;
use crate::formats::elf::utils::{resolve_name, ByteReader};
use std::collections::HashMap;
use tracing::debug;

/// Section table with names resolved against the section-name string table
#[derive(Debug, Clone, Default)]
pub struct SectionTable {
    sections: Vec<Section>,
    by_name: HashMap<String, usize>,
}

impl SectionTable {
    /// Parse section table from ELF data.
    ///
    /// Raw headers are read first, stopping at the first entry that would run
    /// past the buffer. Names are resolved in a second pass once the
    /// `e_shstrndx` section is known; a missing or out-of-range string table
    /// leaves every name empty.
    pub fn parse(reader: &ByteReader<'_>, header: &ElfHeader) -> Self {
        let count = header.e_shnum as u64;
        if count == 0 || header.e_shoff == 0 {
            return Self::default();
        }

        let stride = header.section_header_stride();
        let needed = stride.max(reader.class().section_header_size());
        let mut headers = Vec::with_capacity(count.min(4096) as usize);
        for i in 0..count {
            let offset = match i
                .checked_mul(stride)
                .and_then(|o| o.checked_add(header.e_shoff))
            {
                Some(o) if reader.contains(o, needed) => o,
                _ => break,
            };
            match parse_section_header(reader, offset) {
                Ok(sh) => headers.push(sh),
                Err(_) => break,
            }
        }

        if headers.len() < count as usize {
            debug!(
                declared = count,
                parsed = headers.len(),
                "Section header table truncated"
            );
        }

        let strings = headers
            .get(header.e_shstrndx as usize)
            .and_then(|sh| reader.slice(sh.sh_offset, sh.sh_size))
            .unwrap_or(&[]);

        let sections: Vec<Section> = headers
            .into_iter()
            .enumerate()
            .map(|(index, header)| Section {
                index,
                name: resolve_name(strings, header.sh_name),
                header,
            })
            .collect();

        // First section wins when names repeat
        let mut by_name = HashMap::new();
        for s in &sections {
            if !s.name.is_empty() {
                by_name.entry(s.name.clone()).or_insert(s.index);
            }
        }

        Self { sections, by_name }
    }

    /// Get section by name
    pub fn by_name(&self, name: &str) -> Option<&Section> {
        self.by_name.get(name).and_then(|&idx| self.by_index(idx))
    }

    /// Get section by index
    pub fn by_index(&self, index: usize) -> Option<&Section> {
        self.sections.get(index)
    }

    /// First section of the given type
    pub fn by_type(&self, sh_type: u32) -> Option<&Section> {
        self.sections.iter().find(|s| s.header.sh_type == sh_type)
    }

    /// First section found among `names`, tried in order
    pub fn first_named(&self, names: &[&str]) -> Option<&Section> {
        names.iter().find_map(|n| self.by_name(n))
    }

    /// The string table a section links to via `sh_link`, if it is one.
    pub fn linked_strtab(&self, section: &Section) -> Option<&Section> {
        self.by_index(section.header.sh_link as usize)
            .filter(|s| s.header.sh_type == SHT_STRTAB)
    }

    /// Get all sections
    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Count sections
    pub fn count(&self) -> usize {
        self.sections.len()
    }
}

/// Parse a single section header
fn parse_section_header(r: &ByteReader<'_>, offset: u64) -> Result<SectionHeader> {
    match r.class() {
        ElfClass::Elf32 => Ok(SectionHeader {
            sh_name: r.u32(offset)?,
            sh_type: r.u32(offset + 4)?,
            sh_flags: r.word(offset + 8)?,
            sh_addr: r.word(offset + 12)?,
            sh_offset: r.word(offset + 16)?,
            sh_size: r.word(offset + 20)?,
            sh_link: r.u32(offset + 24)?,
            sh_info: r.u32(offset + 28)?,
            sh_addralign: r.word(offset + 32)?,
            sh_entsize: r.word(offset + 36)?,
        }),
        ElfClass::Elf64 => Ok(SectionHeader {
            sh_name: r.u32(offset)?,
            sh_type: r.u32(offset + 4)?,
            sh_flags: r.word(offset + 8)?,
            sh_addr: r.word(offset + 16)?,
            sh_offset: r.word(offset + 24)?,
            sh_size: r.word(offset + 32)?,
            sh_link: r.u32(offset + 40)?,
            sh_info: r.u32(offset + 44)?,
            sh_addralign: r.word(offset + 48)?,
            sh_entsize: r.word(offset + 56)?,
        }),
    }
}
