// SPDX-License-Identifier: PMPL-1.0-or-later
// Fuzz target for decoding stored metadata.json objects

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Stored metadata may be truncated or hand-edited; decoding must fail cleanly.
    if let Ok(metadata) = serde_json::from_slice::<pitr_wal::PitrMetadata>(data) {
        let _ = metadata.first_gap();
        let _ = serde_json::to_vec(&metadata);
    }
});
