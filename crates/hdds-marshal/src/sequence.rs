// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Length-prefixed sequence transcoding.
//!
//! ```text
//! [int32 count][element_0][element_1]...[element_{count-1}]
//! ```
//!
//! Elements are fixed-size and packed with no padding. An empty collection
//! is a bare 4-byte zero count (never a null pointer); decoding a null
//! pointer yields an empty collection.

use crate::buffer::{layout_size, HostAllocator, RawBuffer};
use crate::config::{WideCharWidth, MAX_SEQUENCE_LEN};
use crate::element::{Element, EnumElement, EnumRepr};
use crate::error::{MarshalError, Result};
use crate::ledger::AllocationLedger;
use crate::span::SpanReader;
use crate::string::{decode_wide_char, encode_wide_char};
use bytemuck::Pod;
use std::ptr;

/// Size of the `int32` count prefix.
pub const COUNT_SIZE: usize = 4;

/// Convert a host length into the count prefix value.
pub(crate) fn checked_count(len: usize, limit: usize) -> Result<i32> {
    let limit = limit.min(MAX_SEQUENCE_LEN);
    if len > limit {
        return Err(MarshalError::LengthOverflow { len, limit });
    }
    i32::try_from(len).map_err(|_| MarshalError::LengthOverflow { len, limit })
}

/// Read and validate the count prefix at `ptr`.
///
/// # Safety
///
/// `ptr` must point to at least [`COUNT_SIZE`] readable bytes.
pub(crate) unsafe fn read_count(ptr: *const u8, limit: usize) -> Result<usize> {
    let raw = i32::from_le_bytes(ptr::read_unaligned(ptr.cast::<[u8; COUNT_SIZE]>()));
    let count = usize::try_from(raw).map_err(|_| MarshalError::NegativeCount(raw))?;
    let limit = limit.min(MAX_SEQUENCE_LEN);
    if count > limit {
        return Err(MarshalError::LengthOverflow { len: count, limit });
    }
    Ok(count)
}

/// Element count of a count-prefixed buffer without decoding it. A null
/// pointer has no elements.
///
/// # Safety
///
/// `ptr` must be null or point to at least [`COUNT_SIZE`] readable bytes.
pub unsafe fn sequence_count(ptr: *const u8) -> Result<usize> {
    if ptr.is_null() {
        return Ok(0);
    }
    read_count(ptr, MAX_SEQUENCE_LEN)
}

/// Lay out `items` behind a count prefix, handing each element slot to
/// `writer`.
pub(crate) fn encode_sequence_with<A: HostAllocator, T>(
    ledger: &mut AllocationLedger<A>,
    items: &[T],
    element_size: usize,
    limit: usize,
    mut writer: impl FnMut(&T, &mut [u8]) -> Result<()>,
) -> Result<RawBuffer> {
    let count = checked_count(items.len(), limit)?;
    let len = layout_size(COUNT_SIZE, element_size, items.len()).ok_or(
        MarshalError::LengthOverflow {
            len: items.len(),
            limit,
        },
    )?;
    ledger.try_allocate_with(len, |w| {
        w.write(&count);
        for item in items {
            let mut result = Ok(());
            w.write_with(element_size, |slot| result = writer(item, slot));
            result?;
        }
        Ok(())
    })
}

/// Decode a count-prefixed buffer into `target` (cleared first), reading
/// each element slot with `reader`.
///
/// # Safety
///
/// `ptr` must be null or point to a count prefix followed by `count`
/// elements of `element_size` bytes.
pub(crate) unsafe fn decode_sequence_with<T>(
    ptr: *const u8,
    element_size: usize,
    limit: usize,
    target: &mut Vec<T>,
    mut reader: impl FnMut(&[u8]) -> T,
) -> Result<()> {
    target.clear();
    if ptr.is_null() {
        return Ok(());
    }
    let count = read_count(ptr, limit)?;
    let len = count
        .checked_mul(element_size)
        .ok_or(MarshalError::LengthOverflow { len: count, limit })?;
    let body = std::slice::from_raw_parts(ptr.add(COUNT_SIZE), len);
    let mut span = SpanReader::new(body);
    target.reserve(count);
    for _ in 0..count {
        target.push(reader(span.read_bytes(element_size)));
    }
    Ok(())
}

/// Encode fixed-size elements as `[int32 count][elements...]`.
pub fn sequence_to_buffer<A: HostAllocator, T: Element>(
    ledger: &mut AllocationLedger<A>,
    items: &[T],
) -> Result<RawBuffer> {
    encode_sequence_with(ledger, items, T::SIZE, MAX_SEQUENCE_LEN, |item, slot| {
        item.write_to(slot);
        Ok(())
    })
}

/// Decode a count-prefixed buffer into `target`, reusing its allocation.
///
/// # Safety
///
/// `ptr` must be null or point to a sequence of `T` laid out by
/// [`sequence_to_buffer`] (or the native equivalent).
pub unsafe fn buffer_to_sequence_into<T: Element>(
    ptr: *const u8,
    target: &mut Vec<T>,
) -> Result<()> {
    decode_sequence_with(ptr, T::SIZE, MAX_SEQUENCE_LEN, target, T::read_from)
}

/// Decode a count-prefixed buffer into a new vector with at least
/// `capacity_hint` capacity.
///
/// # Safety
///
/// Same contract as [`buffer_to_sequence_into`].
pub unsafe fn buffer_to_sequence<T: Element>(
    ptr: *const u8,
    capacity_hint: usize,
) -> Result<Vec<T>> {
    let mut out = Vec::with_capacity(capacity_hint);
    buffer_to_sequence_into(ptr, &mut out)?;
    Ok(out)
}

/// Encode plain-old-data elements with a single block copy.
pub fn raw_sequence_to_buffer<A: HostAllocator, T: Pod>(
    ledger: &mut AllocationLedger<A>,
    items: &[T],
) -> Result<RawBuffer> {
    let count = checked_count(items.len(), MAX_SEQUENCE_LEN)?;
    let bytes: &[u8] = bytemuck::cast_slice(items);
    let len = bytes.len().checked_add(COUNT_SIZE).ok_or(MarshalError::LengthOverflow {
        len: items.len(),
        limit: MAX_SEQUENCE_LEN,
    })?;
    Ok(ledger.allocate_with(len, |w| {
        w.write(&count);
        w.write_bytes(bytes);
    }))
}

/// Decode plain-old-data elements into `target`, reusing its allocation.
///
/// Elements are read unaligned: the body starts 4 bytes into the buffer.
///
/// # Safety
///
/// `ptr` must be null or point to a sequence of `T` laid out by
/// [`raw_sequence_to_buffer`].
pub unsafe fn raw_buffer_to_sequence_into<T: Pod>(
    ptr: *const u8,
    target: &mut Vec<T>,
) -> Result<()> {
    decode_sequence_with(
        ptr,
        std::mem::size_of::<T>(),
        MAX_SEQUENCE_LEN,
        target,
        bytemuck::pod_read_unaligned,
    )
}

/// # Safety
///
/// Same contract as [`raw_buffer_to_sequence_into`].
pub unsafe fn raw_buffer_to_sequence<T: Pod>(
    ptr: *const u8,
    capacity_hint: usize,
) -> Result<Vec<T>> {
    let mut out = Vec::with_capacity(capacity_hint);
    raw_buffer_to_sequence_into(ptr, &mut out)?;
    Ok(out)
}

/// Encode enumerators as 4-byte `int32` values behind a count prefix.
pub fn enum_sequence_to_buffer<A: HostAllocator, E: EnumRepr>(
    ledger: &mut AllocationLedger<A>,
    items: &[E],
) -> Result<RawBuffer> {
    encode_sequence_with(
        ledger,
        items,
        EnumElement::<E>::SIZE,
        MAX_SEQUENCE_LEN,
        |item, slot| {
            EnumElement(*item).write_to(slot);
            Ok(())
        },
    )
}

/// # Safety
///
/// `ptr` must be null or point to an enum sequence laid out by
/// [`enum_sequence_to_buffer`].
pub unsafe fn buffer_to_enum_sequence_into<E: EnumRepr>(
    ptr: *const u8,
    target: &mut Vec<E>,
) -> Result<()> {
    decode_sequence_with(
        ptr,
        EnumElement::<E>::SIZE,
        MAX_SEQUENCE_LEN,
        target,
        |slot| EnumElement::<E>::read_from(slot).0,
    )
}

/// # Safety
///
/// Same contract as [`buffer_to_enum_sequence_into`].
pub unsafe fn buffer_to_enum_sequence<E: EnumRepr>(
    ptr: *const u8,
    capacity_hint: usize,
) -> Result<Vec<E>> {
    let mut out = Vec::with_capacity(capacity_hint);
    buffer_to_enum_sequence_into(ptr, &mut out)?;
    Ok(out)
}

pub(crate) fn wchar_sequence_to_buffer_bounded<A: HostAllocator>(
    ledger: &mut AllocationLedger<A>,
    items: &[char],
    width: WideCharWidth,
    limit: usize,
) -> Result<RawBuffer> {
    encode_sequence_with(ledger, items, width.bytes(), limit, |ch, slot| {
        encode_wide_char(*ch, width, slot)
    })
}

/// Encode wide characters, one unit of `width` bytes each.
pub fn wchar_sequence_to_buffer<A: HostAllocator>(
    ledger: &mut AllocationLedger<A>,
    items: &[char],
    width: WideCharWidth,
) -> Result<RawBuffer> {
    wchar_sequence_to_buffer_bounded(ledger, items, width, MAX_SEQUENCE_LEN)
}

/// # Safety
///
/// `ptr` must be null or point to a wide-character sequence of `width`.
pub unsafe fn buffer_to_wchar_sequence_into(
    ptr: *const u8,
    width: WideCharWidth,
    target: &mut Vec<char>,
) -> Result<()> {
    decode_sequence_with(ptr, width.bytes(), MAX_SEQUENCE_LEN, target, |slot| {
        decode_wide_char(slot, width)
    })
}

/// # Safety
///
/// Same contract as [`buffer_to_wchar_sequence_into`].
pub unsafe fn buffer_to_wchar_sequence(
    ptr: *const u8,
    width: WideCharWidth,
    capacity_hint: usize,
) -> Result<Vec<char>> {
    let mut out = Vec::with_capacity(capacity_hint);
    buffer_to_wchar_sequence_into(ptr, width, &mut out)?;
    Ok(out)
}
