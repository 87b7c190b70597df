//! Fuzz target for the text container reader
//!
//! Marker scanning over arbitrary bytes must terminate without panicking.

#![no_main]

use fatbundle::TextHandler;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for comment in ["//", "#", ";", "!"] {
        let mut handler = TextHandler::new(comment);
        let _ = handler.read_header(data);
        while let Ok(Some(_)) = handler.read_bundle_start(data) {
            let mut sink = Vec::new();
            let _ = handler.read_bundle(&mut sink, data);
            if handler.read_bundle_end(data).is_err() {
                break;
            }
        }
    }
});
