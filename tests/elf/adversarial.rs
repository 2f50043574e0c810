use elfsift::analysis::{AnomalyCode, Severity};
use elfsift::formats::elf::utils::MAX_NAME_LEN;
use elfsift::formats::elf::{
    ElfParser, SHF_ALLOC, SHN_UNDEF, SHT_DYNSYM, SHT_PROGBITS, SHT_STRTAB, STB_GLOBAL, STT_FUNC,
};
use elfsift::{AnalysisReport, AnalyzeOptions, ElfSiftError};

use crate::common::{
    builtin_analyzer, sample_shared_object, ElfBuilder, SectionSpec, StringTable,
};

fn analyze(data: &[u8]) -> elfsift::Result<AnalysisReport> {
    let options = AnalyzeOptions {
        demangle: false,
        ..Default::default()
    };
    builtin_analyzer(options).analyze_bytes(data)
}

fn codes(report: &AnalysisReport) -> Vec<AnomalyCode> {
    report.anomalies.iter().map(|a| a.code).collect()
}

#[test]
fn rejects_bad_headers() {
    let mut data = sample_shared_object(true, true);
    data[1] = b'X';
    assert!(matches!(
        analyze(&data),
        Err(ElfSiftError::InvalidFormat(_))
    ));

    let mut data = sample_shared_object(true, true);
    data[4] = 3; // no such class
    assert!(matches!(
        analyze(&data),
        Err(ElfSiftError::InvalidFormat(_))
    ));

    let mut data = sample_shared_object(true, true);
    data[5] = 0; // no such byte order
    assert!(matches!(
        analyze(&data),
        Err(ElfSiftError::InvalidFormat(_))
    ));

    assert!(matches!(
        analyze(&[]),
        Err(ElfSiftError::InvalidFormat(_))
    ));
    assert!(matches!(
        analyze(b"\x7fELF\x02\x01\x01"),
        Err(ElfSiftError::InvalidFormat(_))
    ));
}

#[test]
fn truncated_section_table_keeps_what_fits() {
    let full = sample_shared_object(true, true);
    let shoff = ElfParser::parse(&full).unwrap().header().e_shoff as usize;
    // Five 64-byte headers plus part of the sixth
    let data = &full[..shoff + 5 * 64 + 10];

    let report = analyze(data).expect("truncation is not fatal");
    assert_eq!(report.sections.len(), 5);
    // .shstrtab was the last header, so no name resolves
    assert!(report.sections.iter().all(|s| s.name.is_empty()));

    let truncated: Vec<_> = report
        .anomalies
        .iter()
        .filter(|a| a.code == AnomalyCode::ShdrTruncated)
        .collect();
    assert_eq!(truncated.len(), 1);
    assert_eq!(truncated[0].severity, Severity::Error);
}

#[test]
fn hostile_section_header_fields_do_not_panic() {
    let mut data = sample_shared_object(true, true);
    // e_shoff near u64::MAX, e_shentsize 0, e_shnum 0xffff
    data[40..48].copy_from_slice(&(u64::MAX - 10).to_le_bytes());
    data[58..60].copy_from_slice(&0u16.to_le_bytes());
    data[60..62].copy_from_slice(&0xffffu16.to_le_bytes());

    let report = analyze(&data).expect("hostile header fields are contained");
    assert!(report.sections.is_empty());
    assert!(codes(&report).contains(&AnomalyCode::ShdrTruncated));
}

#[test]
fn truncated_program_headers_are_reported() {
    let mut data = sample_shared_object(false, true);
    // e_phnum for ELF32 lives at offset 44
    data[44..46].copy_from_slice(&500u16.to_le_bytes());

    let report = analyze(&data).expect("analyze");
    assert!(codes(&report).contains(&AnomalyCode::PhdrTruncated));
}

#[test]
fn section_offset_oob_is_strictly_greater_than_file_size() {
    fn with_probe(offset: u64) -> Vec<u8> {
        let mut b = ElfBuilder::new(true, true);
        b.section(SectionSpec::new(".probe", SHT_PROGBITS, SHF_ALLOC, Vec::new()).offset(offset));
        b.build()
    }

    // The offset field does not change the image length
    let len = with_probe(0).len() as u64;

    let at_end = analyze(&with_probe(len)).unwrap();
    assert!(!codes(&at_end).contains(&AnomalyCode::SecOffsetOob));

    let past_end = analyze(&with_probe(len + 1)).unwrap();
    let oob: Vec<_> = past_end
        .anomalies
        .iter()
        .filter(|a| a.code == AnomalyCode::SecOffsetOob)
        .collect();
    assert_eq!(oob.len(), 1);
    assert!(oob[0].message.contains(".probe"));
}

#[test]
fn oversized_symbol_table_is_truncated() {
    let mut b = ElfBuilder::new(true, true);
    let mut strings = StringTable::default();
    let name = strings.add("mmap");
    let dynstr = b.section(SectionSpec::new(".dynstr", SHT_STRTAB, SHF_ALLOC, strings.bytes()));

    let mut syms = Vec::new();
    b.enc.symbol(&mut syms, 0, 0, 0, 0);
    b.enc.symbol(&mut syms, name, 0, (STB_GLOBAL << 4) | STT_FUNC, SHN_UNDEF);
    b.section(
        SectionSpec::new(".dynsym", SHT_DYNSYM, SHF_ALLOC, syms)
            .link(dynstr)
            .entsize(24)
            .size(0xffff_ffff),
    );

    let report = analyze(&b.build()).expect("analyze");
    assert!(report.imports.count >= 1);
    assert_eq!(report.imports.sample[0], "mmap");
    assert!(codes(&report).contains(&AnomalyCode::SecHuge));
}

#[test]
fn every_prefix_is_handled() {
    for data in [
        sample_shared_object(true, true),
        sample_shared_object(false, false),
    ] {
        for len in (0..=data.len()).step_by(5) {
            match analyze(&data[..len]) {
                Ok(_) | Err(ElfSiftError::InvalidFormat(_)) => {}
                Err(other) => panic!("unexpected error at length {len}: {other}"),
            }
        }
    }
}

#[test]
fn string_offsets_out_of_range_resolve_empty() {
    let mut b = ElfBuilder::new(true, true);
    let strings = StringTable::default();
    let dynstr = b.section(SectionSpec::new(".dynstr", SHT_STRTAB, SHF_ALLOC, strings.bytes()));
    let mut syms = Vec::new();
    b.enc.symbol(&mut syms, 0, 0, 0, 0);
    b.enc.symbol(&mut syms, 0xdead_beef, 0, (STB_GLOBAL << 4) | STT_FUNC, SHN_UNDEF);
    b.section(
        SectionSpec::new(".dynsym", SHT_DYNSYM, SHF_ALLOC, syms)
            .link(dynstr)
            .entsize(24),
    );

    let report = analyze(&b.build()).expect("analyze");
    // A nameless undefined symbol is not an import
    assert_eq!(report.imports.count, 0);
}

#[test]
fn unterminated_string_table_names_are_capped() {
    let mut b = ElfBuilder::new(true, true);
    let mut strings = vec![0u8];
    strings.extend(std::iter::repeat(b'A').take(256 * 1024));
    let dynstr = b.section(SectionSpec::new(".dynstr", SHT_STRTAB, SHF_ALLOC, strings));

    let mut syms = Vec::new();
    b.enc.symbol(&mut syms, 0, 0, 0, 0);
    for _ in 0..4096 {
        b.enc.symbol(&mut syms, 1, 0, (STB_GLOBAL << 4) | STT_FUNC, SHN_UNDEF);
    }
    b.section(
        SectionSpec::new(".dynsym", SHT_DYNSYM, SHF_ALLOC, syms)
            .link(dynstr)
            .entsize(24),
    );
    let data = b.build();

    let elf = ElfParser::parse(&data).expect("parse");
    let symbols = elf.dynamic_symbols().expect("dynsym");
    assert_eq!(symbols.count(), 4097);
    let total: usize = symbols.symbols().iter().map(|s| s.name.len()).sum();
    assert_eq!(total, 4096 * MAX_NAME_LEN);
    assert!(symbols.symbols().iter().all(|s| s.name.len() <= MAX_NAME_LEN));

    let report = analyze(&data).expect("analyze");
    assert_eq!(report.imports.count, 4096);
}
