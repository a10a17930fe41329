// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![no_main]

use hdds_marshal::{
    array_to_buffer, buffer_to_array, buffer_to_sequence, buffer_to_string, sequence_to_buffer,
    string_to_buffer, AllocationLedger, NdArray, StringFormat, WideCharWidth,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut ledger = AllocationLedger::new();

    // Bytes as an i16 sequence (odd trailing byte dropped)
    let values: Vec<i16> = data
        .chunks_exact(2)
        .map(|c| i16::from_le_bytes([c[0], c[1]]))
        .collect();
    let buf = sequence_to_buffer(&mut ledger, &values).expect("i16 sequence");
    let back: Vec<i16> = unsafe { buffer_to_sequence(buf.as_ptr(), 0) }.expect("decode i16");
    assert_eq!(back, values);

    // Bytes as text, NULs stripped, in every string format
    let text: String = String::from_utf8_lossy(data).chars().filter(|c| *c != '\0').collect();
    for format in [
        StringFormat::Narrow,
        StringFormat::Wide(WideCharWidth::Utf16),
        StringFormat::Wide(WideCharWidth::Utf32),
    ] {
        let buf = string_to_buffer(&mut ledger, &text, format).expect("string");
        assert_eq!(unsafe { buffer_to_string(buf.as_ptr(), format) }, text);
    }

    // First byte picks a rank-3 shape; the rest fills it
    if let Some((&shape, rest)) = data.split_first() {
        let extents = [
            usize::from(shape & 0x3) + 1,
            usize::from((shape >> 2) & 0x3) + 1,
            usize::from(shape >> 4) + 1,
        ];
        let mut cursor = rest.iter().copied().cycle();
        let source = NdArray::from_fn(&extents, |_| cursor.next().unwrap_or(0)).expect("shape");
        let buf = array_to_buffer(&mut ledger, &source).expect("array");
        let mut target = NdArray::filled(&extents, 0_u8).expect("shape");
        unsafe { buffer_to_array(buf.as_ptr(), &mut target) }.expect("decode array");
        assert_eq!(target, source);
    }
});
