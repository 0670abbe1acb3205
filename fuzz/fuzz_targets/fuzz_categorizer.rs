#![no_main]

use std::rc::Rc;

use arbitrary::Arbitrary;
use input_dispatch::action::Effect;
use input_dispatch::categorize::{categorize, RawEntry};
use libfuzzer_sys::fuzz_target;

const MAX_ENTRIES: usize = 64;

#[derive(Arbitrary, Debug)]
struct FuzzEntry {
    specifier: String,
    label: String,
}

// Hunts for panics in the categorizer (pass 1-6 of `categorize`) when fed
// arbitrary specifier/label pairs, including malformed decorators,
// duplicate condition sets, and degenerate variable patterns. A `Err`
// result (e.g. `DuplicateConditionSet`) is an expected outcome, not a bug.
fuzz_target!(|data: &[u8]| {
    let mut u = arbitrary::Unstructured::new(data);
    let Ok(fuzz_entries) = Vec::<FuzzEntry>::arbitrary(&mut u) else {
        return;
    };

    let entries: Vec<RawEntry> = fuzz_entries
        .into_iter()
        .take(MAX_ENTRIES)
        .map(|fe| RawEntry::new(fe.specifier, fe.label, Effect::NoArgs(Rc::new(|| {}))))
        .collect();

    let _ = categorize(&entries);
});
