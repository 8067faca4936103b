// SPDX-License-Identifier: PMPL-1.0-or-later
//
// Fuzz target for WAL segment name handling.
// Run with: cargo +nightly fuzz run fuzz_segment_name
//
// Object names come straight from archive listings, so parsing and
// canonicalization must reject anything malformed without panicking.

#![no_main]

use libfuzzer_sys::fuzz_target;
use pitr_wal::{canonicalize, parse_timeline, SegmentName};

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        if input.len() <= 256 {
            let _ = parse_timeline(input);
            let _ = canonicalize(input);

            if let Ok(name) = SegmentName::parse(input) {
                assert_eq!(SegmentName::parse(name.as_str()).ok(), Some(name.clone()));
                // The successor of a valid name is itself valid.
                if let Some(next) = name.successor() {
                    assert!(SegmentName::parse(next.as_str()).is_ok());
                    assert_eq!(next.timeline(), name.timeline());
                }
            }
        }
    }
});
