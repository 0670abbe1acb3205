#![no_main]

use input_dispatch::spec::parse_specifier;
use libfuzzer_sys::fuzz_target;

// Raw fuzz bytes interpreted as a specifier string. parse_specifier never
// fails hard (unrecognized segments become Decorator::Opaque), so the only
// thing this target hunts for is a panic.
fuzz_target!(|data: &[u8]| {
    if let Ok(spec) = std::str::from_utf8(data) {
        let parsed = parse_specifier(spec);
        let _ = parsed.base_chain();
        let _ = parsed.conditions();
    }
});
