#![no_main]
use elfsift::formats::elf::ElfParser;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(elf) = ElfParser::parse(data) {
        let dynamic = elf.dynamic();
        let symbols = elf.dynamic_symbols();
        let _ = elf.plt_relocations();
        let _ = elf.dyn_relocations();
        let _ = elf.gnu_hash();
        let _ = elf.sysv_hash();
        let _ = elf.init_array_count();
        let _ = elf.interpreter();
        let _ = elf.security_features(dynamic.as_ref(), symbols.as_ref());
    }
});
