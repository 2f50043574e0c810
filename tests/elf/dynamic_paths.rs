use elfsift::analysis::{AnomalyCode, Severity};
use elfsift::formats::elf::{
    DT_NEEDED, DT_NULL, DT_RPATH, DT_RUNPATH, SHF_ALLOC, SHF_WRITE, SHT_DYNAMIC, SHT_STRTAB,
};
use elfsift::AnalyzeOptions;

use crate::common::{builtin_analyzer, ElfBuilder, SectionSpec, StringTable};

/// Image whose `.dynamic` holds `needed` libraries plus the given path tags.
fn with_dynamic(needed: usize, paths: &[(i64, &str)]) -> Vec<u8> {
    let mut b = ElfBuilder::new(true, true);
    let e = b.enc;
    let mut strings = StringTable::default();
    let libs: Vec<u32> = (0..needed).map(|i| strings.add(&format!("lib{i}.so"))).collect();
    let path_offsets: Vec<(i64, u32)> = paths
        .iter()
        .map(|(tag, p)| (*tag, strings.add(p)))
        .collect();
    let dynstr = b.section(SectionSpec::new(".dynstr", SHT_STRTAB, SHF_ALLOC, strings.bytes()));

    let mut dynamic = Vec::new();
    for lib in libs {
        e.dyn_entry(&mut dynamic, DT_NEEDED, lib as u64);
    }
    for (tag, off) in path_offsets {
        e.dyn_entry(&mut dynamic, tag, off as u64);
    }
    e.dyn_entry(&mut dynamic, DT_NULL, 0);
    b.section(
        SectionSpec::new(".dynamic", SHT_DYNAMIC, SHF_ALLOC | SHF_WRITE, dynamic)
            .link(dynstr)
            .entsize(16),
    );
    b.build()
}

fn anomaly_codes(data: &[u8], options: AnalyzeOptions) -> Vec<AnomalyCode> {
    builtin_analyzer(options)
        .analyze_bytes(data)
        .unwrap()
        .anomalies
        .iter()
        .map(|a| a.code)
        .collect()
}

#[test]
fn rpath_runpath_fields_are_extracted() {
    let data = with_dynamic(1, &[(DT_RPATH, "/opt/test/lib"), (DT_RUNPATH, "/opt/test/run")]);
    let report = builtin_analyzer(AnalyzeOptions::default())
        .analyze_bytes(&data)
        .unwrap();
    assert_eq!(report.dynamic.needed, vec!["lib0.so"]);
    assert_eq!(report.dynamic.rpath.as_deref(), Some("/opt/test/lib"));
    assert_eq!(report.dynamic.runpath.as_deref(), Some("/opt/test/run"));
    assert_eq!(report.dynamic.entry_count, 3);
    assert!(!report.dynamic.bind_now);
}

#[test]
fn repeated_path_tag_keeps_last_value() {
    let data = with_dynamic(0, &[(DT_RPATH, "/first"), (DT_RPATH, "/second")]);
    let report = builtin_analyzer(AnalyzeOptions::default())
        .analyze_bytes(&data)
        .unwrap();
    assert_eq!(report.dynamic.rpath.as_deref(), Some("/second"));
}

#[test]
fn suspicious_search_paths() {
    let opts = AnalyzeOptions::default;

    let codes = anomaly_codes(&with_dynamic(0, &[(DT_RPATH, "/opt/../tmp")]), opts());
    assert!(codes.contains(&AnomalyCode::RpathSuspicious));

    let codes = anomaly_codes(&with_dynamic(0, &[(DT_RUNPATH, "/usr/lib;/tmp")]), opts());
    assert!(codes.contains(&AnomalyCode::RunpathSuspicious));

    let codes = anomaly_codes(&with_dynamic(0, &[(DT_RUNPATH, "/my libs")]), opts());
    assert!(codes.contains(&AnomalyCode::RunpathSuspicious));

    // $ORIGIN-relative paths are expected to climb directories
    let codes = anomaly_codes(&with_dynamic(0, &[(DT_RPATH, "$ORIGIN/../lib")]), opts());
    assert!(!codes.contains(&AnomalyCode::RpathSuspicious));

    let codes = anomaly_codes(&with_dynamic(0, &[(DT_RUNPATH, "/usr/lib")]), opts());
    assert!(!codes.contains(&AnomalyCode::RunpathSuspicious));
}

#[test]
fn many_needed_is_informational_and_configurable() {
    let data = with_dynamic(101, &[]);
    let report = builtin_analyzer(AnalyzeOptions::default())
        .analyze_bytes(&data)
        .unwrap();
    let many: Vec<_> = report
        .anomalies
        .iter()
        .filter(|a| a.code == AnomalyCode::ManyNeeded)
        .collect();
    assert_eq!(many.len(), 1);
    assert_eq!(many[0].severity, Severity::Info);

    // Exactly at the threshold does not fire
    let codes = anomaly_codes(&with_dynamic(100, &[]), AnalyzeOptions::default());
    assert!(!codes.contains(&AnomalyCode::ManyNeeded));

    let mut options = AnalyzeOptions::default();
    options.thresholds.many_needed = 2;
    let codes = anomaly_codes(&with_dynamic(3, &[]), options);
    assert!(codes.contains(&AnomalyCode::ManyNeeded));
}

#[test]
fn system_libc_if_present() {
    let candidates = [
        "/lib/x86_64-linux-gnu/libc.so.6",
        "/usr/lib/x86_64-linux-gnu/libc.so.6",
        "/lib/aarch64-linux-gnu/libc.so.6",
        "/usr/lib64/libc.so.6",
    ];
    let Some(path) = candidates.iter().find(|p| std::path::Path::new(p).exists()) else {
        return; // skip if missing
    };
    let options = AnalyzeOptions {
        demangle: false,
        ..Default::default()
    };
    let report = builtin_analyzer(options).analyze_path(path).unwrap();
    assert_eq!(report.header.file_type, "ET_DYN");
    assert_eq!(report.dynamic.soname.as_deref(), Some("libc.so.6"));
    assert!(!report.entry_candidates.likely_entry_exports.is_empty());
    assert!(report
        .anomalies
        .iter()
        .all(|a| a.severity != Severity::Error));
}
