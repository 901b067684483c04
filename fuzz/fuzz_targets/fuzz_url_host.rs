#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(url) = std::str::from_utf8(data) {
        // Host extraction should never panic
        let _ = stratus::pending::url_host(url);
    }
});
