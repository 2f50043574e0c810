//! Program header table management

use crate::formats::elf::types::*;
use crate::formats::elf::utils::ByteReader;
use tracing::debug;

/// Program headers in file order
#[derive(Debug, Clone, Default)]
pub struct SegmentTable {
    headers: Vec<ProgramHeader>,
}

impl SegmentTable {
    /// Parse the program header table.
    ///
    /// Iteration stops at the first entry that would run past the buffer, so a
    /// truncated table yields the entries that fit rather than an error.
    pub fn parse(reader: &ByteReader<'_>, header: &ElfHeader) -> Self {
        let count = header.e_phnum as u64;
        if count == 0 || header.e_phoff == 0 {
            return Self::default();
        }

        let stride = header.program_header_stride();
        let needed = stride.max(reader.class().program_header_size());
        let mut headers = Vec::with_capacity(count.min(1024) as usize);
        for i in 0..count {
            let offset = match i
                .checked_mul(stride)
                .and_then(|o| o.checked_add(header.e_phoff))
            {
                Some(o) if reader.contains(o, needed) => o,
                _ => break,
            };
            match parse_program_header(reader, offset) {
                Ok(ph) => headers.push(ph),
                Err(_) => break,
            }
        }

        if headers.len() < count as usize {
            debug!(
                declared = count,
                parsed = headers.len(),
                "Program header table truncated"
            );
        }

        Self { headers }
    }

    /// Get all segments
    pub fn segments(&self) -> &[ProgramHeader] {
        &self.headers
    }

    /// Get all LOAD segments
    pub fn load_segments(&self) -> impl Iterator<Item = &ProgramHeader> + '_ {
        self.headers.iter().filter(|ph| ph.p_type == PT_LOAD)
    }

    /// `PT_GNU_STACK` decides NX; `None` when the segment is absent.
    pub fn nx_stack(&self) -> Option<bool> {
        self.headers
            .iter()
            .find(|ph| ph.p_type == PT_GNU_STACK)
            .map(|ph| !ph.is_executable())
    }

    /// Check for PT_GNU_RELRO
    pub fn has_relro(&self) -> bool {
        self.headers.iter().any(|ph| ph.p_type == PT_GNU_RELRO)
    }

    /// Get interpreter path
    pub fn interpreter(&self, reader: &ByteReader<'_>) -> Option<String> {
        let ph = self.headers.iter().find(|ph| ph.p_type == PT_INTERP)?;
        let bytes = reader.slice(ph.p_offset, ph.p_filesz)?;
        let len = memchr::memchr(0, bytes).unwrap_or(bytes.len());
        Some(String::from_utf8_lossy(&bytes[..len]).into_owned())
    }

    /// Count segments
    pub fn count(&self) -> usize {
        self.headers.len()
    }
}

/// Parse a single program header
fn parse_program_header(r: &ByteReader<'_>, offset: u64) -> Result<ProgramHeader> {
    match r.class() {
        ElfClass::Elf32 => Ok(ProgramHeader {
            p_type: r.u32(offset)?,
            p_offset: r.word(offset + 4)?,
            p_vaddr: r.word(offset + 8)?,
            p_paddr: r.word(offset + 12)?,
            p_filesz: r.word(offset + 16)?,
            p_memsz: r.word(offset + 20)?,
            p_flags: r.u32(offset + 24)?,
            p_align: r.word(offset + 28)?,
        }),
        ElfClass::Elf64 => Ok(ProgramHeader {
            p_type: r.u32(offset)?,
            p_flags: r.u32(offset + 4)?,
            p_offset: r.word(offset + 8)?,
            p_vaddr: r.word(offset + 16)?,
            p_paddr: r.word(offset + 24)?,
            p_filesz: r.word(offset + 32)?,
            p_memsz: r.word(offset + 40)?,
            p_align: r.word(offset + 48)?,
        }),
    }
}
