#![no_main]
use elfsift::demangle::BuiltinDemangler;
use elfsift::{AnalyzeOptions, Analyzer};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let analyzer = Analyzer::new(AnalyzeOptions::default()).with_demangler(BuiltinDemangler);
    if let Ok(report) = analyzer.analyze_bytes(data) {
        let _ = report.to_json_string();
    }
});
