// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use hdds_marshal::{
    buffer_to_sequence, decode_units, sequence_count, StringFormat, WideCharWidth, COUNT_SIZE,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Untrusted count prefix: only decode when the body really holds `count` u32s
    if data.len() >= COUNT_SIZE {
        if let Ok(count) = unsafe { sequence_count(data.as_ptr()) } {
            if count <= (data.len() - COUNT_SIZE) / 4 {
                let values: Vec<u32> =
                    unsafe { buffer_to_sequence(data.as_ptr(), 0) }.expect("bounded decode");
                assert_eq!(values.len(), count);
            }
        }
    }

    // Arbitrary code units never fail to decode
    let _ = decode_units(data, StringFormat::Narrow);
    let _ = decode_units(data, StringFormat::Wide(WideCharWidth::Utf16));
    let _ = decode_units(data, StringFormat::Wide(WideCharWidth::Utf32));
});
