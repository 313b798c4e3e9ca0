#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Snapshot files hold visits; parsing them must never panic
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = serde_json::from_str::<placerank_types::Visit>(s);
    }
});
