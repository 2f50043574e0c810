//! ELF header parsing

use crate::formats::elf::types::*;
use crate::formats::elf::utils::ByteReader;

/// Smallest buffer that can hold any ELF header (ELF32).
pub const MIN_HEADER_SIZE: usize = 52;

/// Parse ELF identification bytes
pub fn parse_ident(data: &[u8]) -> Result<ElfIdent> {
    if data.len() < MIN_HEADER_SIZE {
        return Err(ElfError::Truncated {
            len: data.len(),
            needed: MIN_HEADER_SIZE,
        });
    }

    if &data[0..4] != ELF_MAGIC {
        return Err(ElfError::InvalidMagic);
    }

    Ok(ElfIdent {
        class: ElfClass::from_u8(data[EI_CLASS])?,
        data: ElfData::from_u8(data[EI_DATA])?,
        version: data[EI_VERSION],
        osabi: data[EI_OSABI],
    })
}

/// Parse ELF header
pub fn parse_header(data: &[u8]) -> Result<ElfHeader> {
    let ident = parse_ident(data)?;

    let header_size = ident.class.header_size();
    if data.len() < header_size {
        return Err(ElfError::Truncated {
            len: data.len(),
            needed: header_size,
        });
    }

    let r = ByteReader::new(data, ident.class, ident.data);

    let e_type = r.u16(16)?;
    let e_machine = r.u16(18)?;
    let e_version = r.u32(20)?;

    // Past e_version every field shifts by the width of the three address fields.
    let (e_entry, e_phoff, e_shoff, tail) = match ident.class {
        ElfClass::Elf32 => (r.word(24)?, r.word(28)?, r.word(32)?, 36),
        ElfClass::Elf64 => (r.word(24)?, r.word(32)?, r.word(40)?, 48),
    };

    Ok(ElfHeader {
        ident,
        e_type,
        e_machine,
        e_version,
        e_entry,
        e_phoff,
        e_shoff,
        e_flags: r.u32(tail)?,
        e_ehsize: r.u16(tail + 4)?,
        e_phentsize: r.u16(tail + 6)?,
        e_phnum: r.u16(tail + 8)?,
        e_shentsize: r.u16(tail + 10)?,
        e_shnum: r.u16(tail + 12)?,
        e_shstrndx: r.u16(tail + 14)?,
    })
}
