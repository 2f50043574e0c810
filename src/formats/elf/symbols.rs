//! Symbol table parsing

use crate::formats::elf::types::*;
use crate::formats::elf::utils::{resolve_name, ByteReader};
use std::collections::HashMap;
use tracing::debug;

/// Dynamic symbol table with names resolved
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_name: HashMap<String, usize>,
}

impl SymbolTable {
    /// Parse symbols from `symtab`, resolving names against `strtab`.
    ///
    /// The stride is `sh_entsize`, or the class's symbol size when that is
    /// zero. Entries that would run past the buffer truncate the table.
    pub fn parse(reader: &ByteReader<'_>, symtab: &Section, strtab: Option<&Section>) -> Self {
        let natural = reader.class().symbol_size();
        let stride = symtab.entry_size_or(natural);
        let count = symtab.size() / stride;
        let needed = stride.max(natural);
        let strings = strtab
            .map(|s| reader.slice_clamped(s.offset(), s.size()))
            .unwrap_or(&[]);

        let mut symbols = Vec::with_capacity(count.min(65536) as usize);
        for i in 0..count {
            let offset = match i
                .checked_mul(stride)
                .and_then(|o| o.checked_add(symtab.offset()))
            {
                Some(o) if reader.contains(o, needed) => o,
                _ => break,
            };
            match parse_symbol(reader, offset, strings) {
                Ok(sym) => symbols.push(sym),
                Err(_) => break,
            }
        }

        if (symbols.len() as u64) < count {
            debug!(
                declared = count,
                parsed = symbols.len(),
                "Symbol table truncated"
            );
        }

        let mut by_name = HashMap::new();
        for (idx, sym) in symbols.iter().enumerate() {
            if !sym.name.is_empty() {
                by_name.entry(sym.name.clone()).or_insert(idx);
            }
        }

        Self { symbols, by_name }
    }

    /// Get symbol by index
    pub fn by_index(&self, index: usize) -> Option<&Symbol> {
        self.symbols.get(index)
    }

    /// Get symbol by name
    pub fn by_name(&self, name: &str) -> Option<&Symbol> {
        self.by_name.get(name).and_then(|&idx| self.by_index(idx))
    }

    /// Resolved name of the symbol at `index`; empty when out of range.
    pub fn name_of(&self, index: u32) -> &str {
        self.by_index(index as usize)
            .map(|s| s.name.as_str())
            .unwrap_or("")
    }

    /// Get all symbols
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Undefined, named symbols
    pub fn imports(&self) -> impl Iterator<Item = &Symbol> + Clone + '_ {
        self.symbols.iter().filter(|s| s.is_import())
    }

    /// Defined, named symbols
    pub fn exports(&self) -> impl Iterator<Item = &Symbol> + Clone + '_ {
        self.symbols.iter().filter(|s| s.is_export())
    }

    /// Count symbols
    pub fn count(&self) -> usize {
        self.symbols.len()
    }
}

/// Parse a single symbol
fn parse_symbol(r: &ByteReader<'_>, offset: u64, strings: &[u8]) -> Result<Symbol> {
    let st_name = r.u32(offset)?;
    let (st_value, st_size, st_info, st_other, st_shndx) = match r.class() {
        ElfClass::Elf32 => (
            r.word(offset + 4)?,
            r.word(offset + 8)?,
            r.u8(offset + 12)?,
            r.u8(offset + 13)?,
            r.u16(offset + 14)?,
        ),
        ElfClass::Elf64 => (
            r.word(offset + 8)?,
            r.word(offset + 16)?,
            r.u8(offset + 4)?,
            r.u8(offset + 5)?,
            r.u16(offset + 6)?,
        ),
    };

    Ok(Symbol {
        name: resolve_name(strings, st_name),
        st_value,
        st_size,
        st_info,
        st_other,
        st_shndx,
    })
}
