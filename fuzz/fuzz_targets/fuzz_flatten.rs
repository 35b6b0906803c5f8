#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Malformed descriptors must produce an error, never a panic
    if let Ok(flattened) = ovaimport::parse_descriptor(data) {
        assert!(flattened.properties.len() <= ovaimport::MAX_PROPERTIES);
        let _ = flattened.facts.flavor();
    }
});
