#![no_main]

use libfuzzer_sys::fuzz_target;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Member listing and layout detection over arbitrary archives
    if let Ok(mut package) = ovaimport::Package::open(Cursor::new(data)) {
        if let Ok(layout) = package.layout() {
            let _ = package.get_file_binary(&layout.descriptor);
        }
    }
});
