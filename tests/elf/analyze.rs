use std::io::Write;

use elfsift::analysis::{Category, Severity};
use elfsift::demangle::DemangleStatus;
use elfsift::formats::elf::{ElfParser, RelroLevel};
use elfsift::{AnalyzeOptions, ElfSiftError, FilterSpec};

use crate::common::{builtin_analyzer, sample_shared_object, SAMPLE_EXPORTS, SAMPLE_IMPORTS};

fn hotspot_pairs(list: &[elfsift::analysis::Hotspot]) -> Vec<(&str, usize)> {
    list.iter().map(|h| (h.name.as_str(), h.count)).collect()
}

#[test]
fn sample_elf64_le_full_report() {
    let data = sample_shared_object(true, true);
    let report = builtin_analyzer(AnalyzeOptions::default())
        .analyze_bytes(&data)
        .expect("analyze sample");

    let h = &report.header;
    assert_eq!(h.class, "ELF64");
    assert_eq!(h.endian, "LE");
    assert_eq!(h.machine, "EM_X86_64");
    assert_eq!(h.file_type, "ET_DYN");
    assert_eq!(h.shnum, 13);
    assert_eq!(h.phnum, 2);
    assert_eq!(h.imports, SAMPLE_IMPORTS.len());
    assert_eq!(h.needed_libs, 2);
    assert_eq!(h.plt_relocs, 6);
    assert_eq!(h.dyn_relocs, 3);

    // Null section first, .shstrtab appended last by the builder
    assert_eq!(report.sections.len(), 13);
    assert_eq!(report.sections[0].name, "");
    assert_eq!(report.sections[1].name, ".text");
    assert_eq!(report.sections[12].name, ".shstrtab");
    assert_eq!(report.sections[3].type_name, "DYNSYM");

    assert_eq!(report.dynamic.needed, vec!["libc.so.6", "libdl.so.2"]);
    assert_eq!(report.dynamic.soname.as_deref(), Some("libsample.so"));
    assert_eq!(report.dynamic.runpath.as_deref(), Some("$ORIGIN/../lib"));
    assert!(report.dynamic.bind_now);

    assert_eq!(report.imports.count, SAMPLE_IMPORTS.len());
    assert_eq!(report.imports.sample, SAMPLE_IMPORTS.to_vec());
    assert!(!report.imports.func_sample.contains(&"foo".to_string()));
    assert_eq!(report.imports.func_sample.len(), SAMPLE_IMPORTS.len() - 1);

    assert_eq!(
        hotspot_pairs(&report.relocations.top_plt_symbols),
        vec![("_ZN3foo3barEv", 3), ("dlopen", 2), ("ptrace", 1)]
    );
    assert_eq!(
        hotspot_pairs(&report.relocations.top_dyn_symbols),
        vec![("foo", 2)]
    );

    let sysv = report.hashes.sysv_hash.expect("sysv hash");
    assert_eq!((sysv.nbucket, sysv.nchain, sysv.non_empty_buckets), (3, 11, 1));
    assert!(report.hashes.gnu_hash.is_none());

    assert!(
        report.anomalies.is_empty(),
        "unexpected anomalies: {:?}",
        report.anomalies
    );

    let categories: Vec<Category> = report
        .suspicious_imports
        .iter()
        .map(|g| g.category)
        .collect();
    assert_eq!(
        categories,
        vec![
            Category::AntiDebug,
            Category::CodeLoading,
            Category::NetIo,
            Category::FileOps,
            Category::Crypto
        ]
    );

    let entries = &report.entry_candidates;
    assert_eq!(entries.known_entries.len(), 1);
    assert_eq!(entries.known_entries[0].symbol, "JNI_OnLoad");
    assert_eq!(entries.init_array_count, Some(2));
    assert_eq!(entries.likely_entry_exports, SAMPLE_EXPORTS.to_vec());

    let sec = report.security;
    assert_eq!(sec.nx, Some(true));
    assert_eq!(sec.relro, RelroLevel::Full);
    assert!(sec.bind_now);
    assert!(sec.stack_canary);
    assert!(!sec.pie);
    assert!(!sec.fortify);

    assert!(report.matches.is_none());
    let markdown = &report.render.as_ref().expect("rendered").markdown;
    assert!(markdown.contains("## Needed Libraries (NEEDED)"));
    assert!(markdown.contains("- JNI: JNI_OnLoad"));
}

#[test]
fn sample_elf32_be_matches_elf64() {
    let data = sample_shared_object(false, false);
    let report = builtin_analyzer(AnalyzeOptions::default())
        .analyze_bytes(&data)
        .expect("analyze sample");

    assert_eq!(report.header.class, "ELF32");
    assert_eq!(report.header.endian, "BE");
    assert_eq!(report.header.machine, "EM_386");
    assert_eq!(report.imports.sample, SAMPLE_IMPORTS.to_vec());
    assert_eq!(report.dynamic.needed, vec!["libc.so.6", "libdl.so.2"]);
    assert_eq!(
        hotspot_pairs(&report.relocations.top_plt_symbols),
        vec![("_ZN3foo3barEv", 3), ("dlopen", 2), ("ptrace", 1)]
    );
    assert_eq!(report.entry_candidates.init_array_count, Some(2));
    assert!(report.anomalies.is_empty());
}

#[test]
fn rela_always_has_addend_and_rel_never_does() {
    let data64 = sample_shared_object(true, true);
    let elf = ElfParser::parse(&data64).unwrap();
    let plt = elf.plt_relocations().expect(".rela.plt");
    let dyn_relocs = elf.dyn_relocations().expect(".rela.dyn");
    assert!(plt.is_rela());
    assert!(plt.entries().iter().all(|r| r.addend.is_some()));
    assert_eq!(dyn_relocs.entries()[2].addend, Some(0x1234));
    assert_eq!(dyn_relocs.entries()[2].symbol, 0);

    let data32 = sample_shared_object(false, true);
    let elf = ElfParser::parse(&data32).unwrap();
    let plt = elf.plt_relocations().expect(".rel.plt");
    assert!(!plt.is_rela());
    assert_eq!(plt.count(), 6);
    assert!(plt.entries().iter().all(|r| r.addend.is_none()));
    assert_eq!(plt.entries()[0].symbol, 7);
    assert_eq!(plt.entries()[0].kind, 7);
}

#[test]
fn builtin_demangling_fills_display_fields() {
    let data = sample_shared_object(true, true);
    let report = builtin_analyzer(AnalyzeOptions::default())
        .analyze_bytes(&data)
        .unwrap();

    let top = &report.relocations.top_plt_symbols[0];
    assert_eq!(top.name, "_ZN3foo3barEv");
    assert_eq!(top.demangled_name, "foo::bar()");
    assert_eq!(report.relocations.top_plt_symbols[1].demangled_name, "dlopen");
    assert_eq!(report.imports.sample_demangled[6], "foo::bar()");
    assert_eq!(report.imports.sample[6], "_ZN3foo3barEv");

    let summary = report.demangle.expect("demangle summary");
    assert_eq!(summary.status, DemangleStatus::Complete);
    assert_eq!(summary.requested, 1);
    assert_eq!(summary.resolved, 1);
}

#[test]
fn demangling_disabled_keeps_raw_names() {
    let options = AnalyzeOptions {
        demangle: false,
        ..Default::default()
    };
    let report = builtin_analyzer(options)
        .analyze_bytes(&sample_shared_object(true, true))
        .unwrap();
    assert!(report.demangle.is_none());
    assert_eq!(
        report.relocations.top_plt_symbols[0].demangled_name,
        "_ZN3foo3barEv"
    );
    assert_eq!(report.imports.sample_demangled, report.imports.sample);
}

#[test]
fn include_filter_matches_every_list() {
    let options = AnalyzeOptions {
        filters: Some(FilterSpec {
            include: Some("open".into()),
            regex: None,
        }),
        ..Default::default()
    };
    let report = builtin_analyzer(options)
        .analyze_bytes(&sample_shared_object(true, true))
        .unwrap();
    let matches = report.matches.expect("matches present");
    assert_eq!(matches.imports, vec!["dlopen", "fopen"]);
    // One entry per relocation
    assert_eq!(matches.plt, vec!["dlopen", "dlopen"]);
    assert!(matches.dyn_.is_empty());
}

#[test]
fn regex_filter_is_case_insensitive() {
    let options = AnalyzeOptions {
        filters: Some(FilterSpec {
            include: None,
            regex: Some("^(FOO|_zn)".into()),
        }),
        ..Default::default()
    };
    let report = builtin_analyzer(options)
        .analyze_bytes(&sample_shared_object(false, true))
        .unwrap();
    let matches = report.matches.expect("matches present");
    assert_eq!(matches.imports, vec!["foo", "_ZN3foo3barEv"]);
    assert_eq!(matches.plt, vec!["_ZN3foo3barEv"; 3]);
    assert_eq!(matches.dyn_, vec!["foo", "foo"]);
}

#[test]
fn invalid_regex_is_reported_not_parsed() {
    let options = AnalyzeOptions {
        filters: Some(FilterSpec {
            include: None,
            regex: Some("(dlopen".into()),
        }),
        ..Default::default()
    };
    let err = builtin_analyzer(options)
        .analyze_bytes(&sample_shared_object(true, true))
        .unwrap_err();
    assert!(matches!(err, ElfSiftError::InvalidFilter { .. }));
}

#[test]
fn caps_apply_to_sections_and_lists() {
    let options = AnalyzeOptions {
        max_sections: 3,
        top_n: 1,
        ..Default::default()
    };
    let report = builtin_analyzer(options)
        .analyze_bytes(&sample_shared_object(true, true))
        .unwrap();
    assert_eq!(report.sections.len(), 3);
    assert_eq!(report.header.shnum, 13);
    assert_eq!(report.imports.count, SAMPLE_IMPORTS.len());
    assert_eq!(report.imports.sample, vec!["ptrace"]);
    assert_eq!(
        hotspot_pairs(&report.relocations.top_plt_symbols),
        vec![("_ZN3foo3barEv", 3)]
    );
    assert_eq!(report.relocations.plt_count, 6);
}

#[test]
fn analyze_path_matches_analyze_bytes() {
    let data = sample_shared_object(true, true);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&data).unwrap();
    file.flush().unwrap();

    let analyzer = builtin_analyzer(AnalyzeOptions::default());
    let from_path = analyzer.analyze_path(file.path()).unwrap();
    let from_bytes = analyzer.analyze_bytes(&data).unwrap();
    assert_eq!(
        from_path.to_json_string().unwrap(),
        from_bytes.to_json_string().unwrap()
    );
}

#[test]
fn file_size_limit_is_enforced() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&sample_shared_object(true, true)).unwrap();
    file.flush().unwrap();

    let mut options = AnalyzeOptions::default();
    options.io.max_file_size = 128;
    let err = builtin_analyzer(options)
        .analyze_path(file.path())
        .unwrap_err();
    assert!(matches!(err, ElfSiftError::FileTooLarge { limit: 128, .. }));
}

#[test]
fn interpreter_makes_executable_pie() {
    use crate::common::ElfBuilder;

    let mut b = ElfBuilder::new(true, true);
    b.interp("/lib64/ld-linux-x86-64.so.2");
    let report = builtin_analyzer(AnalyzeOptions::default())
        .analyze_bytes(&b.build())
        .unwrap();
    assert_eq!(
        report.interpreter.as_deref(),
        Some("/lib64/ld-linux-x86-64.so.2")
    );
    assert!(report.security.pie);
    assert_eq!(report.segments[0].type_name, "INTERP");
    // No dynsym or dynstr in this image
    let warn_codes: Vec<&str> = report
        .anomalies
        .iter()
        .filter(|a| a.severity == Severity::Warn)
        .map(|a| a.code.as_str())
        .collect();
    assert_eq!(warn_codes, vec!["NO_DYNSYM", "NO_DYNSTR"]);
}
