//! Relocation processing

use crate::formats::elf::types::*;
use crate::formats::elf::utils::ByteReader;
use tracing::debug;

/// Decoded REL or RELA section
#[derive(Debug, Clone, Default)]
pub struct RelocationTable {
    relocations: Vec<Relocation>,
    is_rela: bool,
}

impl RelocationTable {
    /// Decode every entry of a relocation section.
    ///
    /// The layout follows the section type: `SHT_RELA` entries carry an
    /// addend, anything else is decoded as REL. The stride is `sh_entsize`
    /// or the natural entry size for the class and kind.
    pub fn parse(reader: &ByteReader<'_>, section: &Section) -> Self {
        let is_rela = section.header.sh_type == SHT_RELA;
        let natural = reader.class().relocation_size(is_rela);
        let stride = section.entry_size_or(natural);
        let count = section.size() / stride;
        let needed = stride.max(natural);

        let mut relocations = Vec::with_capacity(count.min(65536) as usize);
        for i in 0..count {
            let offset = match i
                .checked_mul(stride)
                .and_then(|o| o.checked_add(section.offset()))
            {
                Some(o) if reader.contains(o, needed) => o,
                _ => break,
            };
            match parse_relocation(reader, offset, is_rela) {
                Ok(reloc) => relocations.push(reloc),
                Err(_) => break,
            }
        }

        debug!(
            section = %section.name,
            is_rela,
            declared = count,
            parsed = relocations.len(),
            "Parsed relocations"
        );

        Self {
            relocations,
            is_rela,
        }
    }

    /// Get all relocations
    pub fn entries(&self) -> &[Relocation] {
        &self.relocations
    }

    /// Get relocation at address
    pub fn by_offset(&self, offset: u64) -> Option<&Relocation> {
        self.relocations.iter().find(|r| r.offset == offset)
    }

    /// Count relocations
    pub fn count(&self) -> usize {
        self.relocations.len()
    }

    /// Check if using RELA format
    pub fn is_rela(&self) -> bool {
        self.is_rela
    }
}

/// Parse a single relocation entry
fn parse_relocation(r: &ByteReader<'_>, offset: u64, is_rela: bool) -> Result<Relocation> {
    let word = r.class().word_size();
    let r_offset = r.word(offset)?;
    let r_info = r.word(offset + word)?;
    let (symbol, kind) = match r.class() {
        ElfClass::Elf32 => ((r_info >> 8) as u32, (r_info & 0xff) as u32),
        ElfClass::Elf64 => ((r_info >> 32) as u32, (r_info & 0xffff_ffff) as u32),
    };
    let addend = if is_rela {
        Some(r.sword(offset + 2 * word)?)
    } else {
        None
    };

    Ok(Relocation {
        offset: r_offset,
        kind,
        symbol,
        addend,
    })
}
