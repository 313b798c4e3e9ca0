#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(event) = serde_json::from_str::<placerank_types::LinkEvent>(s) {
            let _ = event.kind();
            let _ = serde_json::to_string(&event);
        }
    }
});
