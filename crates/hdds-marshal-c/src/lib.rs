// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # HDDS Marshal C FFI
//!
//! Native counterpart for the `hdds-marshal` buffer layouts. The entry points
//! accept host-built buffers, hand back natively allocated copies, and
//! expose the release functions those copies must go through.
//!
//! | Returned by | Release with |
//! |-------------|--------------|
//! | `hdds_marshal_sequence_clone` | `hdds_marshal_release` |
//! | `hdds_marshal_string_clone` | `hdds_marshal_release` |
//! | `hdds_marshal_string_sequence_clone` | `hdds_marshal_string_sequence_release` |
//!
//! # Safety
//!
//! All public functions are `unsafe` and require the caller to uphold the
//! invariants documented in each function's safety comment.

mod logging;
mod native;

pub use logging::*;

use std::os::raw::c_void;
use std::ptr;

use hdds_marshal::{
    buffer_to_sequence, buffer_to_string, buffer_to_string_sequence, encode_units, sequence_count,
    MarshalError, SpanReader, SpanWriter, StringFormat, WideCharWidth, COUNT_SIZE, POINTER_SIZE,
};

/// Error codes (C-compatible enum)
///
/// # Error Code Categories
///
/// - **0-9**: Success and generic errors
/// - **10-19**: Configuration errors
/// - **30-39**: Layout and encoding errors
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HddsMarshalError {
    /// Operation completed successfully
    HddsMarshalOk = 0,
    /// Invalid argument provided (null out-pointer, invalid value)
    HddsMarshalInvalidArgument = 1,
    /// Generic operation failure
    HddsMarshalOperationFailed = 3,
    /// Requested size cannot be allocated
    HddsMarshalOutOfMemory = 4,

    // === Configuration errors (10-19) ===
    /// Invalid configuration settings
    HddsMarshalConfigError = 10,

    // === Layout and encoding errors (30-39) ===
    /// Count does not fit the int32 prefix or the configured bound
    HddsMarshalLengthOverflow = 30,
    /// Count prefix is negative
    HddsMarshalNegativeCount = 31,
    /// String contains an interior NUL
    HddsMarshalInteriorNul = 32,
    /// Character does not fit one wide unit
    HddsMarshalUnrepresentable = 33,
    /// Array storage does not match its extents
    HddsMarshalShapeMismatch = 34,
}

impl From<&MarshalError> for HddsMarshalError {
    fn from(err: &MarshalError) -> Self {
        match err {
            MarshalError::LengthOverflow { .. } => HddsMarshalError::HddsMarshalLengthOverflow,
            MarshalError::NegativeCount(_) => HddsMarshalError::HddsMarshalNegativeCount,
            MarshalError::InteriorNul { .. } => HddsMarshalError::HddsMarshalInteriorNul,
            MarshalError::Unrepresentable { .. } => HddsMarshalError::HddsMarshalUnrepresentable,
            MarshalError::ShapeMismatch { .. } | MarshalError::ExtentOverflow(_) => {
                HddsMarshalError::HddsMarshalShapeMismatch
            }
            MarshalError::Config(_) => HddsMarshalError::HddsMarshalConfigError,
        }
    }
}

fn map_marshal_error(err: &MarshalError) -> HddsMarshalError {
    log::debug!("[hdds-marshal-c] {}", err);
    err.into()
}

fn string_format(wide: bool) -> StringFormat {
    if wide {
        StringFormat::native_wide()
    } else {
        StringFormat::Narrow
    }
}

/// Store `bytes` in a native buffer behind `out`.
unsafe fn publish(bytes: &[u8], out: *mut *mut u8) -> HddsMarshalError {
    match native::copy_out(bytes) {
        Some(ptr) => {
            *out = ptr.as_ptr();
            HddsMarshalError::HddsMarshalOk
        }
        None => HddsMarshalError::HddsMarshalOutOfMemory,
    }
}

/// Width in bytes of this library's wide characters (2 on Windows, 4
/// elsewhere). Hosts use it to pick their `WideCharWidth`.
#[no_mangle]
pub extern "C" fn hdds_marshal_wide_char_width() -> u32 {
    match WideCharWidth::native() {
        WideCharWidth::Utf16 => 2,
        WideCharWidth::Utf32 => 4,
    }
}

/// Number of native buffers handed out and not yet released.
#[no_mangle]
pub extern "C" fn hdds_marshal_live_allocations() -> usize {
    native::live()
}

/// Release a flat buffer returned by this library.
///
/// # Safety
/// - `ptr` must be NULL or a flat buffer returned by this library that has
///   not been released yet. Host-allocated buffers must never be passed.
#[no_mangle]
pub unsafe extern "C" fn hdds_marshal_release(ptr: *mut c_void) {
    native::release(ptr.cast());
}

/// Release a string sequence returned by `hdds_marshal_string_sequence_clone`:
/// every string, then the pointer table.
///
/// # Safety
/// - `ptr` must be NULL or a string sequence returned by
///   `hdds_marshal_string_sequence_clone` that has not been released yet.
#[no_mangle]
pub unsafe extern "C" fn hdds_marshal_string_sequence_release(ptr: *mut c_void) {
    let table = ptr.cast::<u8>();
    if table.is_null() {
        return;
    }
    match sequence_count(table) {
        Ok(count) => {
            let slots = std::slice::from_raw_parts(table.add(COUNT_SIZE), count * POINTER_SIZE);
            let mut reader = SpanReader::new(slots);
            for _ in 0..count {
                native::release(reader.read_ptr().cast_mut());
            }
        }
        Err(e) => log::warn!("[hdds-marshal-c] corrupt string sequence {:p}: {}", table, e),
    }
    native::release(table);
}

/// Copy a count-prefixed sequence into a native buffer.
///
/// A NULL `input` yields a NULL `*out`.
///
/// # Safety
/// - `input` must be NULL or a `[int32 count][elements]` buffer whose
///   elements are `element_size` bytes each.
/// - `out` must be a valid pointer. The result must be released with
///   `hdds_marshal_release`.
#[no_mangle]
pub unsafe extern "C" fn hdds_marshal_sequence_clone(
    input: *const u8,
    element_size: usize,
    out: *mut *mut u8,
) -> HddsMarshalError {
    if out.is_null() {
        return HddsMarshalError::HddsMarshalInvalidArgument;
    }
    *out = ptr::null_mut();
    if input.is_null() {
        return HddsMarshalError::HddsMarshalOk;
    }

    let count = match sequence_count(input) {
        Ok(count) => count,
        Err(e) => return map_marshal_error(&e),
    };
    let Some(len) = count
        .checked_mul(element_size)
        .and_then(|body| body.checked_add(COUNT_SIZE))
    else {
        return HddsMarshalError::HddsMarshalOutOfMemory;
    };
    log::trace!("[hdds-marshal-c] sequence clone count={} len={}", count, len);
    publish(std::slice::from_raw_parts(input, len), out)
}

/// Copy a NUL-terminated string into a native buffer.
///
/// `wide` selects this library's native wide characters instead of UTF-8.
/// Invalid code units are replaced by U+FFFD in the copy. A NULL `input`
/// yields a NULL `*out`.
///
/// # Safety
/// - `input` must be NULL or a NUL-terminated string in the selected format.
/// - `out` must be a valid pointer. The result must be released with
///   `hdds_marshal_release`.
#[no_mangle]
pub unsafe extern "C" fn hdds_marshal_string_clone(
    input: *const u8,
    wide: bool,
    out: *mut *mut u8,
) -> HddsMarshalError {
    if out.is_null() {
        return HddsMarshalError::HddsMarshalInvalidArgument;
    }
    *out = ptr::null_mut();
    if input.is_null() {
        return HddsMarshalError::HddsMarshalOk;
    }

    let format = string_format(wide);
    match encode_units(&buffer_to_string(input, format), format) {
        Ok(units) => publish(&units, out),
        Err(e) => map_marshal_error(&e),
    }
}

/// Deep-copy a `[int32 count][ptr...]` string sequence into native memory.
///
/// # Safety
/// - `input` must be NULL or a string table whose slots are NULL or
///   NUL-terminated strings in the selected format.
/// - `out` must be a valid pointer. The result must be released with
///   `hdds_marshal_string_sequence_release`.
#[no_mangle]
pub unsafe extern "C" fn hdds_marshal_string_sequence_clone(
    input: *const u8,
    wide: bool,
    out: *mut *mut u8,
) -> HddsMarshalError {
    if out.is_null() {
        return HddsMarshalError::HddsMarshalInvalidArgument;
    }
    *out = ptr::null_mut();
    if input.is_null() {
        return HddsMarshalError::HddsMarshalOk;
    }

    let format = string_format(wide);
    let items = match buffer_to_string_sequence(input, format, 0) {
        Ok(items) => items,
        Err(e) => return map_marshal_error(&e),
    };
    let Some(table) = native::allocate(COUNT_SIZE + items.len() * POINTER_SIZE) else {
        return HddsMarshalError::HddsMarshalOutOfMemory;
    };
    // Slots stay NULL until filled, so the release path below is always valid.
    let bytes =
        std::slice::from_raw_parts_mut(table.as_ptr(), COUNT_SIZE + items.len() * POINTER_SIZE);
    let mut writer = SpanWriter::new(bytes);
    // Count fits: it was read from an int32 prefix.
    writer.write(&(items.len() as i32));

    for item in &items {
        let copy = encode_units(item, format)
            .map_err(|e| map_marshal_error(&e))
            .and_then(|units| {
                native::copy_out(&units).ok_or(HddsMarshalError::HddsMarshalOutOfMemory)
            });
        match copy {
            Ok(ptr) => writer.write_ptr(ptr.as_ptr()),
            Err(code) => {
                hdds_marshal_string_sequence_release(table.as_ptr().cast());
                return code;
            }
        }
    }
    *out = table.as_ptr();
    HddsMarshalError::HddsMarshalOk
}

/// Sum an `int32` sequence. A NULL `input` sums to zero.
///
/// # Safety
/// - `input` must be NULL or a `[int32 count][int32...]` buffer.
/// - `out_sum` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn hdds_marshal_i32_sequence_sum(
    input: *const u8,
    out_sum: *mut i64,
) -> HddsMarshalError {
    if out_sum.is_null() {
        return HddsMarshalError::HddsMarshalInvalidArgument;
    }
    match buffer_to_sequence::<i32>(input, 0) {
        Ok(values) => {
            *out_sum = values.iter().map(|v| i64::from(*v)).sum();
            HddsMarshalError::HddsMarshalOk
        }
        Err(e) => map_marshal_error(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_mapping() {
        assert_eq!(
            HddsMarshalError::from(&MarshalError::NegativeCount(-1)),
            HddsMarshalError::HddsMarshalNegativeCount
        );
        assert_eq!(
            HddsMarshalError::from(&MarshalError::ExtentOverflow(vec![usize::MAX, 2])),
            HddsMarshalError::HddsMarshalShapeMismatch
        );
        assert_eq!(
            HddsMarshalError::from(&MarshalError::InteriorNul { index: 3 }),
            HddsMarshalError::HddsMarshalInteriorNul
        );
    }

    #[test]
    fn test_null_out_pointer_rejected() {
        // SAFETY: a null out-pointer is checked before anything is read.
        unsafe {
            assert_eq!(
                hdds_marshal_sequence_clone(ptr::null(), 4, ptr::null_mut()),
                HddsMarshalError::HddsMarshalInvalidArgument
            );
            assert_eq!(
                hdds_marshal_i32_sequence_sum(ptr::null(), ptr::null_mut()),
                HddsMarshalError::HddsMarshalInvalidArgument
            );
        }
    }

    #[test]
    fn test_negative_count_reported() {
        let raw = (-2_i32).to_le_bytes();
        let mut out = ptr::null_mut();
        // SAFETY: raw holds a readable 4-byte prefix.
        let code = unsafe { hdds_marshal_sequence_clone(raw.as_ptr(), 1, &mut out) };
        assert_eq!(code, HddsMarshalError::HddsMarshalNegativeCount);
        assert!(out.is_null());
    }

    #[test]
    fn test_wide_width_matches_target() {
        assert_eq!(hdds_marshal_wide_char_width() as usize, WideCharWidth::native().bytes());
    }
}
