//! Fuzz target for bundle entry id parsing
//!
//! Parsing and re-rendering arbitrary ids should never panic.

#![no_main]

use fatbundle_core::{is_code_object_compatible, BundlerConfig, OffloadTarget};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let target = OffloadTarget::parse(text);
    let _ = target.to_string();
    let _ = target.is_kind_valid();
    let _ = target.is_triple_valid();

    // Compatibility must be reflexive for anything parseable.
    let config = BundlerConfig::default();
    assert!(is_code_object_compatible(&target, &target, &config));
});
