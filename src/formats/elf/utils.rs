//! Utility functions for ELF parsing

use crate::formats::elf::types::{ElfClass, ElfData, ElfError, Result};
use std::borrow::Cow;

/// Endian-aware reader over an immutable byte buffer.
///
/// Class and endianness are fixed at construction, once the ident bytes have
/// been validated, and apply to every read made through the reader.
#[derive(Debug, Clone, Copy)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    class: ElfClass,
    endian: ElfData,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8], class: ElfClass, endian: ElfData) -> Self {
        Self {
            data,
            class,
            endian,
        }
    }

    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn class(&self) -> ElfClass {
        self.class
    }

    pub fn endian(&self) -> ElfData {
        self.endian
    }

    fn array<const N: usize>(&self, offset: u64) -> Result<[u8; N]> {
        let bytes = self
            .slice(offset, N as u64)
            .ok_or(ElfError::OutOfBounds { offset, needed: N })?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    pub fn u8(&self, offset: u64) -> Result<u8> {
        Ok(self.array::<1>(offset)?[0])
    }

    pub fn u16(&self, offset: u64) -> Result<u16> {
        let bytes = self.array(offset)?;
        Ok(match self.endian {
            ElfData::Little => u16::from_le_bytes(bytes),
            ElfData::Big => u16::from_be_bytes(bytes),
        })
    }

    pub fn u32(&self, offset: u64) -> Result<u32> {
        let bytes = self.array(offset)?;
        Ok(match self.endian {
            ElfData::Little => u32::from_le_bytes(bytes),
            ElfData::Big => u32::from_be_bytes(bytes),
        })
    }

    pub fn u64(&self, offset: u64) -> Result<u64> {
        let bytes = self.array(offset)?;
        Ok(match self.endian {
            ElfData::Little => u64::from_le_bytes(bytes),
            ElfData::Big => u64::from_be_bytes(bytes),
        })
    }

    /// Read an address-sized field based on ELF class
    pub fn word(&self, offset: u64) -> Result<u64> {
        match self.class {
            ElfClass::Elf32 => self.u32(offset).map(u64::from),
            ElfClass::Elf64 => self.u64(offset),
        }
    }

    /// Read a signed address-sized field (`d_tag`, `r_addend`)
    pub fn sword(&self, offset: u64) -> Result<i64> {
        match self.class {
            ElfClass::Elf32 => self.u32(offset).map(|v| v as i32 as i64),
            ElfClass::Elf64 => self.u64(offset).map(|v| v as i64),
        }
    }

    /// True when `[offset, offset + len)` lies inside the buffer.
    pub fn contains(&self, offset: u64, len: u64) -> bool {
        offset
            .checked_add(len)
            .map(|end| end <= self.len())
            .unwrap_or(false)
    }

    /// Exact sub-slice, or `None` when any byte of the range is missing.
    pub fn slice(&self, offset: u64, len: u64) -> Option<&'a [u8]> {
        if !self.contains(offset, len) {
            return None;
        }
        let start = usize::try_from(offset).ok()?;
        let end = usize::try_from(offset + len).ok()?;
        self.data.get(start..end)
    }

    /// Sub-slice clamped to the end of the buffer; empty when `offset` is past it.
    pub fn slice_clamped(&self, offset: u64, len: u64) -> &'a [u8] {
        let Ok(start) = usize::try_from(offset) else {
            return &[];
        };
        if start >= self.data.len() {
            return &[];
        }
        let end = offset
            .saturating_add(len)
            .min(self.len());
        let end = usize::try_from(end).unwrap_or(self.data.len());
        &self.data[start..end]
    }
}

/// Longest name resolved from a string table, in bytes.
pub const MAX_NAME_LEN: usize = 4096;

/// Read a null-terminated string from a string table.
///
/// Returns `None` when `offset` lies outside the table. At most `max_len`
/// bytes are scanned; a missing terminator within that window truncates the
/// string. Invalid UTF-8 is replaced lossily.
pub fn read_cstring(table: &[u8], offset: usize, max_len: usize) -> Option<Cow<'_, str>> {
    let slice = table.get(offset..)?;
    if slice.is_empty() {
        return None;
    }
    let window = &slice[..slice.len().min(max_len)];
    let end = memchr::memchr(0, window).unwrap_or(window.len());
    Some(String::from_utf8_lossy(&window[..end]))
}

/// Resolve a name offset, treating offset 0 and unreadable offsets as the empty name.
pub fn resolve_name(table: &[u8], offset: u32) -> String {
    if offset == 0 {
        return String::new();
    }
    read_cstring(table, offset as usize, MAX_NAME_LEN)
        .map(Cow::into_owned)
        .unwrap_or_default()
}
