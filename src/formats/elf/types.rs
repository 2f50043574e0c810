//! Core ELF types and constants

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// ELF parsing errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElfError {
    #[error("Invalid ELF magic")]
    InvalidMagic,
    #[error("Truncated header: {len} bytes, needed {needed}")]
    Truncated { len: usize, needed: usize },
    #[error("Unsupported ELF class: {0}")]
    UnsupportedClass(u8),
    #[error("Unsupported ELF data encoding: {0}")]
    UnsupportedData(u8),
    #[error("Read of {needed} bytes at {offset:#x} is out of bounds")]
    OutOfBounds { offset: u64, needed: usize },
}

pub type Result<T> = std::result::Result<T, ElfError>;

/// ELF magic number
pub const ELF_MAGIC: &[u8; 4] = b"\x7fELF";

/// Offsets into `e_ident`
pub const EI_CLASS: usize = 4;
pub const EI_DATA: usize = 5;
pub const EI_VERSION: usize = 6;
pub const EI_OSABI: usize = 7;

/// ELF class (32-bit or 64-bit)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfClass {
    Elf32 = 1,
    Elf64 = 2,
}

impl ElfClass {
    pub fn from_u8(val: u8) -> Result<Self> {
        match val {
            1 => Ok(ElfClass::Elf32),
            2 => Ok(ElfClass::Elf64),
            _ => Err(ElfError::UnsupportedClass(val)),
        }
    }

    pub fn bits(&self) -> u8 {
        match self {
            ElfClass::Elf32 => 32,
            ElfClass::Elf64 => 64,
        }
    }

    /// Size of an address/offset field (and of a pointer in `.init_array`).
    pub fn word_size(&self) -> u64 {
        match self {
            ElfClass::Elf32 => 4,
            ElfClass::Elf64 => 8,
        }
    }

    pub fn header_size(&self) -> usize {
        match self {
            ElfClass::Elf32 => 52,
            ElfClass::Elf64 => 64,
        }
    }

    pub fn program_header_size(&self) -> u64 {
        match self {
            ElfClass::Elf32 => 32,
            ElfClass::Elf64 => 56,
        }
    }

    pub fn section_header_size(&self) -> u64 {
        match self {
            ElfClass::Elf32 => 40,
            ElfClass::Elf64 => 64,
        }
    }

    pub fn symbol_size(&self) -> u64 {
        match self {
            ElfClass::Elf32 => 16,
            ElfClass::Elf64 => 24,
        }
    }

    pub fn dynamic_entry_size(&self) -> u64 {
        match self {
            ElfClass::Elf32 => 8,
            ElfClass::Elf64 => 16,
        }
    }

    pub fn relocation_size(&self, is_rela: bool) -> u64 {
        match (self, is_rela) {
            (ElfClass::Elf32, false) => 8,  // Elf32_Rel
            (ElfClass::Elf32, true) => 12,  // Elf32_Rela
            (ElfClass::Elf64, false) => 16, // Elf64_Rel
            (ElfClass::Elf64, true) => 24,  // Elf64_Rela
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ElfClass::Elf32 => "ELF32",
            ElfClass::Elf64 => "ELF64",
        }
    }
}

/// ELF data encoding (endianness)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfData {
    Little = 1,
    Big = 2,
}

impl ElfData {
    pub fn from_u8(val: u8) -> Result<Self> {
        match val {
            1 => Ok(ElfData::Little),
            2 => Ok(ElfData::Big),
            _ => Err(ElfError::UnsupportedData(val)),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ElfData::Little => "LE",
            ElfData::Big => "BE",
        }
    }
}

/// ELF file types
pub const ET_NONE: u16 = 0;
pub const ET_REL: u16 = 1;
pub const ET_EXEC: u16 = 2;
pub const ET_DYN: u16 = 3;
pub const ET_CORE: u16 = 4;

pub fn file_type_name(e_type: u16) -> String {
    match e_type {
        ET_NONE => "ET_NONE".to_string(),
        ET_REL => "ET_REL".to_string(),
        ET_EXEC => "ET_EXEC".to_string(),
        ET_DYN => "ET_DYN".to_string(),
        ET_CORE => "ET_CORE".to_string(),
        other => format!("ET_{}", other),
    }
}

/// Machine name in the `EM_*` spelling; unknown codes render as `EM_<n>`.
pub fn machine_name(e_machine: u16) -> String {
    match e_machine {
        3 => "EM_386".to_string(),
        8 => "EM_MIPS".to_string(),
        20 => "EM_PPC".to_string(),
        21 => "EM_PPC64".to_string(),
        40 => "EM_ARM".to_string(),
        62 => "EM_X86_64".to_string(),
        183 => "EM_AARCH64".to_string(),
        243 => "EM_RISCV".to_string(),
        other => format!("EM_{}", other),
    }
}

/// ELF identification (first 16 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfIdent {
    pub class: ElfClass,
    pub data: ElfData,
    pub version: u8,
    pub osabi: u8,
}

/// ELF header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElfHeader {
    pub ident: ElfIdent,
    pub e_type: u16,
    pub e_machine: u16,
    pub e_version: u32,
    pub e_entry: u64,
    pub e_phoff: u64,
    pub e_shoff: u64,
    pub e_flags: u32,
    pub e_ehsize: u16,
    pub e_phentsize: u16,
    pub e_phnum: u16,
    pub e_shentsize: u16,
    pub e_shnum: u16,
    pub e_shstrndx: u16,
}

impl ElfHeader {
    pub fn class(&self) -> ElfClass {
        self.ident.class
    }

    pub fn endian(&self) -> ElfData {
        self.ident.data
    }

    pub fn entry_point(&self) -> u64 {
        self.e_entry
    }

    pub fn is_shared_object(&self) -> bool {
        self.e_type == ET_DYN
    }

    /// Stride used to walk the program header table.
    pub fn program_header_stride(&self) -> u64 {
        match self.e_phentsize {
            0 => self.ident.class.program_header_size(),
            n => n as u64,
        }
    }

    /// Stride used to walk the section header table.
    pub fn section_header_stride(&self) -> u64 {
        match self.e_shentsize {
            0 => self.ident.class.section_header_size(),
            n => n as u64,
        }
    }

    /// End offset of the program header table as declared by the header.
    pub fn program_table_end(&self) -> u128 {
        self.e_phoff as u128 + self.e_phnum as u128 * self.program_header_stride() as u128
    }

    /// End offset of the section header table as declared by the header.
    pub fn section_table_end(&self) -> u128 {
        self.e_shoff as u128 + self.e_shnum as u128 * self.section_header_stride() as u128
    }
}

/// Section header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SectionHeader {
    pub sh_name: u32,
    pub sh_type: u32,
    pub sh_flags: u64,
    pub sh_addr: u64,
    pub sh_offset: u64,
    pub sh_size: u64,
    pub sh_link: u32,
    pub sh_info: u32,
    pub sh_addralign: u64,
    pub sh_entsize: u64,
}

/// Section types
pub const SHT_NULL: u32 = 0;
pub const SHT_PROGBITS: u32 = 1;
pub const SHT_SYMTAB: u32 = 2;
pub const SHT_STRTAB: u32 = 3;
pub const SHT_RELA: u32 = 4;
pub const SHT_HASH: u32 = 5;
pub const SHT_DYNAMIC: u32 = 6;
pub const SHT_NOTE: u32 = 7;
pub const SHT_NOBITS: u32 = 8;
pub const SHT_REL: u32 = 9;
pub const SHT_DYNSYM: u32 = 11;
pub const SHT_INIT_ARRAY: u32 = 14;
pub const SHT_FINI_ARRAY: u32 = 15;
pub const SHT_GNU_HASH: u32 = 0x6ffffff6;
pub const SHT_GNU_VERNEED: u32 = 0x6ffffffe;
pub const SHT_GNU_VERSYM: u32 = 0x6fffffff;

pub fn section_type_name(sh_type: u32) -> String {
    match sh_type {
        SHT_NULL => "NULL".to_string(),
        SHT_PROGBITS => "PROGBITS".to_string(),
        SHT_SYMTAB => "SYMTAB".to_string(),
        SHT_STRTAB => "STRTAB".to_string(),
        SHT_RELA => "RELA".to_string(),
        SHT_HASH => "HASH".to_string(),
        SHT_DYNAMIC => "DYNAMIC".to_string(),
        SHT_NOTE => "NOTE".to_string(),
        SHT_NOBITS => "NOBITS".to_string(),
        SHT_REL => "REL".to_string(),
        SHT_DYNSYM => "DYNSYM".to_string(),
        SHT_INIT_ARRAY => "INIT_ARRAY".to_string(),
        SHT_FINI_ARRAY => "FINI_ARRAY".to_string(),
        SHT_GNU_HASH => "GNU_HASH".to_string(),
        SHT_GNU_VERNEED => "GNU_VERNEED".to_string(),
        SHT_GNU_VERSYM => "GNU_VERSYM".to_string(),
        other => format!("{:#x}", other),
    }
}

/// Section flags
pub const SHF_WRITE: u64 = 0x1;
pub const SHF_ALLOC: u64 = 0x2;
pub const SHF_EXECINSTR: u64 = 0x4;

/// Special section indices
pub const SHN_UNDEF: u16 = 0;

/// Program header
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgramHeader {
    pub p_type: u32,
    pub p_flags: u32,
    pub p_offset: u64,
    pub p_vaddr: u64,
    pub p_paddr: u64,
    pub p_filesz: u64,
    pub p_memsz: u64,
    pub p_align: u64,
}

impl ProgramHeader {
    pub fn is_executable(&self) -> bool {
        (self.p_flags & PF_X) != 0
    }

    pub fn is_writable(&self) -> bool {
        (self.p_flags & PF_W) != 0
    }

    pub fn is_readable(&self) -> bool {
        (self.p_flags & PF_R) != 0
    }

    /// `R`/`W`/`X` flag string, `-` for cleared bits.
    pub fn flags_label(&self) -> String {
        let mut s = String::with_capacity(3);
        s.push(if self.is_readable() { 'R' } else { '-' });
        s.push(if self.is_writable() { 'W' } else { '-' });
        s.push(if self.is_executable() { 'X' } else { '-' });
        s
    }
}

/// Program header types
pub const PT_NULL: u32 = 0;
pub const PT_LOAD: u32 = 1;
pub const PT_DYNAMIC: u32 = 2;
pub const PT_INTERP: u32 = 3;
pub const PT_NOTE: u32 = 4;
pub const PT_PHDR: u32 = 6;
pub const PT_TLS: u32 = 7;
pub const PT_GNU_EH_FRAME: u32 = 0x6474e550;
pub const PT_GNU_STACK: u32 = 0x6474e551;
pub const PT_GNU_RELRO: u32 = 0x6474e552;

pub fn segment_type_name(p_type: u32) -> String {
    match p_type {
        PT_NULL => "NULL".to_string(),
        PT_LOAD => "LOAD".to_string(),
        PT_DYNAMIC => "DYNAMIC".to_string(),
        PT_INTERP => "INTERP".to_string(),
        PT_NOTE => "NOTE".to_string(),
        PT_PHDR => "PHDR".to_string(),
        PT_TLS => "TLS".to_string(),
        PT_GNU_EH_FRAME => "GNU_EH_FRAME".to_string(),
        PT_GNU_STACK => "GNU_STACK".to_string(),
        PT_GNU_RELRO => "GNU_RELRO".to_string(),
        other => format!("{:#x}", other),
    }
}

/// Program header flags
pub const PF_X: u32 = 0x1;
pub const PF_W: u32 = 0x2;
pub const PF_R: u32 = 0x4;

/// Symbol binding
pub const STB_LOCAL: u8 = 0;
pub const STB_GLOBAL: u8 = 1;
pub const STB_WEAK: u8 = 2;
pub const STB_GNU_UNIQUE: u8 = 10;

/// Symbol types
pub const STT_NOTYPE: u8 = 0;
pub const STT_OBJECT: u8 = 1;
pub const STT_FUNC: u8 = 2;
pub const STT_SECTION: u8 = 3;
pub const STT_FILE: u8 = 4;
pub const STT_COMMON: u8 = 5;
pub const STT_TLS: u8 = 6;
pub const STT_GNU_IFUNC: u8 = 10;

pub fn bind_name(bind: u8) -> String {
    match bind {
        STB_LOCAL => "LOCAL".to_string(),
        STB_GLOBAL => "GLOBAL".to_string(),
        STB_WEAK => "WEAK".to_string(),
        STB_GNU_UNIQUE => "GNU_UNIQUE".to_string(),
        other => format!("BIND_{}", other),
    }
}

pub fn symbol_type_name(kind: u8) -> String {
    match kind {
        STT_NOTYPE => "NOTYPE".to_string(),
        STT_OBJECT => "OBJECT".to_string(),
        STT_FUNC => "FUNC".to_string(),
        STT_SECTION => "SECTION".to_string(),
        STT_FILE => "FILE".to_string(),
        STT_COMMON => "COMMON".to_string(),
        STT_TLS => "TLS".to_string(),
        STT_GNU_IFUNC => "GNU_IFUNC".to_string(),
        other => format!("TYPE_{}", other),
    }
}

/// Symbol entry with its name already resolved against the string table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub name: String,
    pub st_value: u64,
    pub st_size: u64,
    pub st_info: u8,
    pub st_other: u8,
    pub st_shndx: u16,
}

impl Symbol {
    pub fn st_bind(&self) -> u8 {
        self.st_info >> 4
    }

    pub fn st_type(&self) -> u8 {
        self.st_info & 0xf
    }

    pub fn is_undefined(&self) -> bool {
        self.st_shndx == SHN_UNDEF
    }

    /// Imported iff undefined and named.
    pub fn is_import(&self) -> bool {
        self.is_undefined() && !self.name.is_empty()
    }

    pub fn is_export(&self) -> bool {
        !self.is_undefined() && !self.name.is_empty()
    }

    pub fn is_function(&self) -> bool {
        self.st_type() == STT_FUNC
    }
}

/// Dynamic tags
pub const DT_NULL: i64 = 0;
pub const DT_NEEDED: i64 = 1;
pub const DT_SONAME: i64 = 14;
pub const DT_RPATH: i64 = 15;
pub const DT_BIND_NOW: i64 = 24;
pub const DT_RUNPATH: i64 = 29;
pub const DT_FLAGS: i64 = 30;

/// Dynamic flags
pub const DF_BIND_NOW: u64 = 0x8;

/// Relocation entry. `addend` is present only for `SHT_RELA` sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relocation {
    pub offset: u64,
    pub kind: u32,
    pub symbol: u32,
    pub addend: Option<i64>,
}

/// Section with its name resolved against `.shstrtab`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub index: usize,
    pub name: String,
    pub header: SectionHeader,
}

impl Section {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size(&self) -> u64 {
        self.header.sh_size
    }

    pub fn offset(&self) -> u64 {
        self.header.sh_offset
    }

    pub fn addr(&self) -> u64 {
        self.header.sh_addr
    }

    pub fn is_executable(&self) -> bool {
        (self.header.sh_flags & SHF_EXECINSTR) != 0
    }

    pub fn is_writable(&self) -> bool {
        (self.header.sh_flags & SHF_WRITE) != 0
    }

    /// `SHT_NOBITS` sections occupy no file bytes.
    pub fn is_nobits(&self) -> bool {
        self.header.sh_type == SHT_NOBITS
    }

    /// Declared entry size, or `fallback` when the header leaves it at zero
    /// or declares less than one whole entry.
    pub fn entry_size_or(&self, fallback: u64) -> u64 {
        match self.header.sh_entsize {
            n if n < fallback => fallback,
            n => n,
        }
    }
}

/// RELRO hardening level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelroLevel {
    None,
    Partial,
    Full,
}

/// Hardening features derived from segments, dynamic tags and symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityFeatures {
    /// `None` when there is no `PT_GNU_STACK` segment.
    pub nx: Option<bool>,
    pub pie: bool,
    pub relro: RelroLevel,
    pub bind_now: bool,
    pub stack_canary: bool,
    pub fortify: bool,
}
