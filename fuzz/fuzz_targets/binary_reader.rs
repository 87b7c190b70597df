//! Fuzz target for the binary container reader
//!
//! Tests header parsing robustness against malformed containers; the
//! reader must degrade to "zero bundles" rather than panic.

#![no_main]

use fatbundle::BinaryHandler;
use fatbundle_core::BundlerConfig;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let config = BundlerConfig::default();
    let mut handler = BinaryHandler::new(&config);

    if handler.read_header(data).is_err() {
        return;
    }
    while let Ok(Some(_)) = handler.read_bundle_start(data) {
        let mut sink = Vec::new();
        let _ = handler.read_bundle(&mut sink, data);
        if handler.read_bundle_end(data).is_err() {
            break;
        }
    }
});
