// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! String transcoding.
//!
//! Strings cross the boundary NUL-terminated, either as narrow 1-byte code
//! units (UTF-8) or as wide units whose width is the target's `wchar_t`
//! width ([`WideCharWidth`]). Sequences of strings use a pointer table:
//!
//! ```text
//! [int32 count][ptr_0]...[ptr_{count-1}]
//!                 |
//!                 +--> independently allocated NUL-terminated string
//! ```
//!
//! Decoding never fails on content: invalid units become U+FFFD.

use crate::buffer::{layout_size, HostAllocator, RawBuffer, POINTER_SIZE};
use crate::config::{WideCharWidth, MAX_SEQUENCE_LEN};
use crate::error::{MarshalError, Result};
use crate::ledger::AllocationLedger;
use crate::sequence::{checked_count, read_count, COUNT_SIZE};
use crate::span::SpanReader;
use std::char::REPLACEMENT_CHARACTER;
use std::ptr;

/// Code unit encoding of a native string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StringFormat {
    /// One byte per code unit (UTF-8).
    Narrow,
    /// Native wide characters.
    Wide(WideCharWidth),
}

impl StringFormat {
    /// Wide format for the build target.
    pub const fn native_wide() -> Self {
        StringFormat::Wide(WideCharWidth::native())
    }

    /// Bytes per code unit (and per terminator).
    pub const fn unit_size(self) -> usize {
        match self {
            StringFormat::Narrow => 1,
            StringFormat::Wide(width) => width.bytes(),
        }
    }
}

/// Encode `value` into NUL-terminated code units.
pub fn encode_units(value: &str, format: StringFormat) -> Result<Vec<u8>> {
    match format {
        StringFormat::Narrow => {
            if let Some(index) = value.bytes().position(|b| b == 0) {
                return Err(MarshalError::InteriorNul { index });
            }
            let mut out = Vec::with_capacity(value.len() + 1);
            out.extend_from_slice(value.as_bytes());
            out.push(0);
            Ok(out)
        }
        StringFormat::Wide(WideCharWidth::Utf16) => {
            let mut out = Vec::with_capacity((value.len() + 1) * 2);
            for (index, unit) in value.encode_utf16().enumerate() {
                if unit == 0 {
                    return Err(MarshalError::InteriorNul { index });
                }
                out.extend_from_slice(&unit.to_ne_bytes());
            }
            out.extend_from_slice(&0u16.to_ne_bytes());
            Ok(out)
        }
        StringFormat::Wide(WideCharWidth::Utf32) => {
            let mut out = Vec::with_capacity((value.len() + 1) * 4);
            for (index, ch) in value.chars().enumerate() {
                if ch == '\0' {
                    return Err(MarshalError::InteriorNul { index });
                }
                out.extend_from_slice(&u32::from(ch).to_ne_bytes());
            }
            out.extend_from_slice(&0u32.to_ne_bytes());
            Ok(out)
        }
    }
}

/// Decode code units (without terminator) into a host string.
pub fn decode_units(units: &[u8], format: StringFormat) -> String {
    match format {
        StringFormat::Narrow => String::from_utf8_lossy(units).into_owned(),
        StringFormat::Wide(WideCharWidth::Utf16) => {
            let wide: Vec<u16> = units
                .chunks_exact(2)
                .map(|c| u16::from_ne_bytes([c[0], c[1]]))
                .collect();
            String::from_utf16_lossy(&wide)
        }
        StringFormat::Wide(WideCharWidth::Utf32) => units
            .chunks_exact(4)
            .map(|c| {
                char::from_u32(u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
                    .unwrap_or(REPLACEMENT_CHARACTER)
            })
            .collect(),
    }
}

/// Write one character as a single wide unit.
///
/// With 2-byte units, characters outside the Basic Multilingual Plane have
/// no single-unit form and are rejected.
pub fn encode_wide_char(ch: char, width: WideCharWidth, out: &mut [u8]) -> Result<()> {
    let code_point = u32::from(ch);
    match width {
        WideCharWidth::Utf16 => {
            let unit = u16::try_from(code_point).map_err(|_| MarshalError::Unrepresentable {
                code_point,
                width: 2,
            })?;
            out.copy_from_slice(&unit.to_ne_bytes());
        }
        WideCharWidth::Utf32 => out.copy_from_slice(&code_point.to_ne_bytes()),
    }
    Ok(())
}

/// Read one wide unit; lone surrogates and out-of-range values map to U+FFFD.
pub fn decode_wide_char(src: &[u8], width: WideCharWidth) -> char {
    let code_point = match width {
        WideCharWidth::Utf16 => u32::from(u16::from_ne_bytes([src[0], src[1]])),
        WideCharWidth::Utf32 => u32::from_ne_bytes([src[0], src[1], src[2], src[3]]),
    };
    char::from_u32(code_point).unwrap_or(REPLACEMENT_CHARACTER)
}

/// Allocate a NUL-terminated copy of `value` tracked by `ledger`.
pub fn string_to_buffer<A: HostAllocator>(
    ledger: &mut AllocationLedger<A>,
    value: &str,
    format: StringFormat,
) -> Result<RawBuffer> {
    let units = encode_units(value, format)?;
    Ok(ledger.allocate_with(units.len(), |w| w.write_bytes(&units)))
}

/// Count code units before the terminator.
///
/// # Safety
///
/// `ptr` must point to a readable run of `unit` byte units ending in an
/// all-zero unit.
unsafe fn unit_count(ptr: *const u8, unit: usize) -> usize {
    let mut count = 0;
    loop {
        let at = ptr.add(count * unit);
        let zero = match unit {
            1 => *at == 0,
            2 => ptr::read_unaligned(at.cast::<u16>()) == 0,
            _ => ptr::read_unaligned(at.cast::<u32>()) == 0,
        };
        if zero {
            return count;
        }
        count += 1;
    }
}

/// Decode a NUL-terminated native string. A null pointer yields `""`.
///
/// # Safety
///
/// `ptr` must be null or point to a NUL-terminated string in `format`.
pub unsafe fn buffer_to_string(ptr: *const u8, format: StringFormat) -> String {
    if ptr.is_null() {
        return String::new();
    }
    let unit = format.unit_size();
    let count = unit_count(ptr, unit);
    let units = std::slice::from_raw_parts(ptr, count * unit);
    decode_units(units, format)
}

/// Allocate one string per item and return the pointer table slot
/// addresses, in order.
pub(crate) fn allocate_strings<A: HostAllocator, S: AsRef<str>>(
    ledger: &mut AllocationLedger<A>,
    items: &[S],
    format: StringFormat,
) -> Result<Vec<*const u8>> {
    items
        .iter()
        .map(|item| {
            string_to_buffer(ledger, item.as_ref(), format).map(|b| b.as_ptr().cast_const())
        })
        .collect()
}

pub(crate) fn string_sequence_to_buffer_bounded<A: HostAllocator, S: AsRef<str>>(
    ledger: &mut AllocationLedger<A>,
    items: &[S],
    format: StringFormat,
    limit: usize,
) -> Result<RawBuffer> {
    let count = checked_count(items.len(), limit)?;
    let len = layout_size(COUNT_SIZE, POINTER_SIZE, items.len()).ok_or(
        MarshalError::LengthOverflow {
            len: items.len(),
            limit,
        },
    )?;
    let slots = allocate_strings(ledger, items, format)?;
    Ok(ledger.allocate_with(len, |w| {
        w.write(&count);
        for slot in &slots {
            w.write_ptr(*slot);
        }
    }))
}

/// Encode a sequence of strings as `[int32 count][ptr...]`.
///
/// Tracks `items.len() + 1` allocations in `ledger`: one per string plus
/// the pointer table. An empty sequence is a bare zero count.
pub fn string_sequence_to_buffer<A: HostAllocator, S: AsRef<str>>(
    ledger: &mut AllocationLedger<A>,
    items: &[S],
    format: StringFormat,
) -> Result<RawBuffer> {
    string_sequence_to_buffer_bounded(ledger, items, format, MAX_SEQUENCE_LEN)
}

pub(crate) unsafe fn buffer_to_string_sequence_into_bounded(
    ptr: *const u8,
    format: StringFormat,
    target: &mut Vec<String>,
    limit: usize,
) -> Result<()> {
    target.clear();
    if ptr.is_null() {
        return Ok(());
    }
    let count = read_count(ptr, limit)?;
    let len = count
        .checked_mul(POINTER_SIZE)
        .ok_or(MarshalError::LengthOverflow { len: count, limit })?;
    let table = std::slice::from_raw_parts(ptr.add(COUNT_SIZE), len);
    let mut reader = SpanReader::new(table);
    target.reserve(count);
    for _ in 0..count {
        target.push(buffer_to_string(reader.read_ptr(), format));
    }
    Ok(())
}

/// Decode a `[int32 count][ptr...]` string table into an existing vector,
/// clearing it first. A null pointer leaves it empty; null slots decode to
/// empty strings.
///
/// # Safety
///
/// `ptr` must be null or point to a string table whose slots are null or
/// NUL-terminated strings in `format`.
pub unsafe fn buffer_to_string_sequence_into(
    ptr: *const u8,
    format: StringFormat,
    target: &mut Vec<String>,
) -> Result<()> {
    buffer_to_string_sequence_into_bounded(ptr, format, target, MAX_SEQUENCE_LEN)
}

/// Decode a `[int32 count][ptr...]` string table into a new vector.
///
/// # Safety
///
/// Same contract as [`buffer_to_string_sequence_into`].
pub unsafe fn buffer_to_string_sequence(
    ptr: *const u8,
    format: StringFormat,
    capacity_hint: usize,
) -> Result<Vec<String>> {
    let mut out = Vec::with_capacity(capacity_hint);
    buffer_to_string_sequence_into(ptr, format, &mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORMATS: [StringFormat; 3] = [
        StringFormat::Narrow,
        StringFormat::Wide(WideCharWidth::Utf16),
        StringFormat::Wide(WideCharWidth::Utf32),
    ];

    const SAMPLES: [&str; 5] = [
        "",
        "hello",
        "temp\u{b0}C",
        "\u{65e5}\u{672c}\u{8a9e}",
        "emoji \u{1F600}!",
    ];

    #[test]
    fn test_string_roundtrip_all_formats() {
        let mut ledger = AllocationLedger::new();
        for format in FORMATS {
            for sample in SAMPLES {
                let buf = string_to_buffer(&mut ledger, sample, format).expect("encode");
                // SAFETY: buf is a live NUL-terminated string in `format`.
                let back = unsafe { buffer_to_string(buf.as_ptr(), format) };
                assert_eq!(back, sample, "format {:?}", format);
            }
        }
    }

    #[test]
    fn test_empty_string_is_single_terminator() {
        for format in FORMATS {
            let units = encode_units("", format).expect("encode");
            assert_eq!(units.len(), format.unit_size());
            assert!(units.iter().all(|b| *b == 0));
        }
    }

    #[test]
    fn test_wide_unit_sizes() {
        let utf16 = encode_units("ab", StringFormat::Wide(WideCharWidth::Utf16)).expect("encode");
        assert_eq!(utf16.len(), 6);
        let utf32 = encode_units("ab", StringFormat::Wide(WideCharWidth::Utf32)).expect("encode");
        assert_eq!(utf32.len(), 12);
        // Surrogate pair takes two 2-byte units but one 4-byte unit.
        let pair =
            encode_units("\u{1F600}", StringFormat::Wide(WideCharWidth::Utf16)).expect("encode");
        assert_eq!(pair.len(), 6);
        let single =
            encode_units("\u{1F600}", StringFormat::Wide(WideCharWidth::Utf32)).expect("encode");
        assert_eq!(single.len(), 8);
    }

    #[test]
    fn test_interior_nul_rejected() {
        for format in FORMATS {
            let err = encode_units("ab\0cd", format).unwrap_err();
            assert!(matches!(err, MarshalError::InteriorNul { index: 2 }));
        }
    }

    #[test]
    fn test_null_pointer_decodes_empty() {
        for format in FORMATS {
            // SAFETY: null is explicitly allowed.
            assert_eq!(unsafe { buffer_to_string(ptr::null(), format) }, "");
        }
    }

    #[test]
    fn test_invalid_units_decode_lossy() {
        assert_eq!(decode_units(&[0xFF, b'a'], StringFormat::Narrow), "\u{FFFD}a");
        let lone = 0xD800u16.to_ne_bytes();
        assert_eq!(
            decode_units(&lone, StringFormat::Wide(WideCharWidth::Utf16)),
            "\u{FFFD}"
        );
        let huge = 0x0011_0000u32.to_ne_bytes();
        assert_eq!(
            decode_units(&huge, StringFormat::Wide(WideCharWidth::Utf32)),
            "\u{FFFD}"
        );
    }

    #[test]
    fn test_wide_char_bmp_limit() {
        let mut slot = [0u8; 2];
        encode_wide_char('\u{e9}', WideCharWidth::Utf16, &mut slot).expect("BMP char");
        assert_eq!(decode_wide_char(&slot, WideCharWidth::Utf16), '\u{e9}');

        let err = encode_wide_char('\u{1F600}', WideCharWidth::Utf16, &mut slot).unwrap_err();
        assert!(matches!(
            err,
            MarshalError::Unrepresentable {
                code_point: 0x1F600,
                width: 2
            }
        ));

        let mut wide = [0u8; 4];
        encode_wide_char('\u{1F600}', WideCharWidth::Utf32, &mut wide).expect("UTF-32 char");
        assert_eq!(decode_wide_char(&wide, WideCharWidth::Utf32), '\u{1F600}');
    }

    #[test]
    fn test_string_sequence_layout() {
        let mut ledger = AllocationLedger::new();
        let buf = string_sequence_to_buffer(&mut ledger, &["a", "bc"], StringFormat::Narrow)
            .expect("encode");
        assert_eq!(buf.len(), COUNT_SIZE + 2 * POINTER_SIZE);
        assert_eq!(ledger.len(), 3);

        // SAFETY: buf is a live table of COUNT_SIZE + 2 pointers.
        let bytes = unsafe { std::slice::from_raw_parts(buf.as_ptr(), buf.len()) };
        let mut reader = SpanReader::new(bytes);
        assert_eq!(reader.read::<i32>(), 2);
        let first = reader.read_ptr();
        // SAFETY: slot points at a string tracked by the ledger.
        assert_eq!(unsafe { buffer_to_string(first, StringFormat::Narrow) }, "a");
    }

    #[test]
    fn test_string_sequence_roundtrip() {
        let items = vec!["alpha".to_string(), String::new(), "\u{3b3}amma".to_string()];
        for format in FORMATS {
            let mut ledger = AllocationLedger::new();
            let buf = string_sequence_to_buffer(&mut ledger, &items, format).expect("encode");
            assert_eq!(ledger.len(), items.len() + 1);
            // SAFETY: buf is a live string table in `format`.
            let back =
                unsafe { buffer_to_string_sequence(buf.as_ptr(), format, 0) }.expect("decode");
            assert_eq!(back, items);
        }
    }

    #[test]
    fn test_empty_string_sequence_is_count_only() {
        let mut ledger = AllocationLedger::new();
        let empty: [&str; 0] = [];
        let buf =
            string_sequence_to_buffer(&mut ledger, &empty, StringFormat::Narrow).expect("encode");
        assert_eq!(buf.len(), COUNT_SIZE);
        assert_eq!(ledger.len(), 1);
        // SAFETY: buf holds a 4-byte zero count.
        let bytes = unsafe { std::slice::from_raw_parts(buf.as_ptr(), buf.len()) };
        assert_eq!(bytes, &[0, 0, 0, 0]);
    }

    #[test]
    fn test_decode_into_reuses_target() {
        let mut ledger = AllocationLedger::new();
        let buf =
            string_sequence_to_buffer(&mut ledger, &["x"], StringFormat::Narrow).expect("encode");
        let mut target = vec!["stale".to_string(), "entries".to_string()];
        // SAFETY: buf is a live string table.
        unsafe { buffer_to_string_sequence_into(buf.as_ptr(), StringFormat::Narrow, &mut target) }
            .expect("decode");
        assert_eq!(target, vec!["x".to_string()]);

        // SAFETY: null is explicitly allowed.
        unsafe { buffer_to_string_sequence_into(ptr::null(), StringFormat::Narrow, &mut target) }
            .expect("decode");
        assert!(target.is_empty());
    }

    #[test]
    fn test_failed_encode_still_tracks_earlier_strings() {
        let mut ledger = AllocationLedger::new();
        let err = string_sequence_to_buffer(&mut ledger, &["ok", "bad\0"], StringFormat::Narrow)
            .unwrap_err();
        assert!(matches!(err, MarshalError::InteriorNul { .. }));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.release_all(), 1);
    }
}
