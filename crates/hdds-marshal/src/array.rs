// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-rank, fixed-extent array transcoding.
//!
//! Arrays carry no header: both sides know the rank and extents up front.
//! The buffer holds `extent[0] * ... * extent[n-1]` elements in row-major
//! order, addressed by walking a [`DimensionIndex`]:
//!
//! ```text
//! extents [3, 4]     index [0,0] [0,1] [0,2] [0,3] [1,0] ... [2,3]
//!                                               ^ carry: col wraps, row += 1
//! ```
//!
//! Decoding writes into a host array the caller has already shaped.

use crate::buffer::{HostAllocator, RawBuffer, POINTER_SIZE};
use crate::config::WideCharWidth;
use crate::element::{Element, EnumElement, EnumRepr};
use crate::error::{MarshalError, Result};
use crate::ledger::AllocationLedger;
use crate::span::SpanReader;
use crate::string::{
    buffer_to_string, decode_wide_char, encode_wide_char, string_to_buffer, StringFormat,
};

/// Row-major multi-dimensional index with carry propagation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DimensionIndex {
    extents: Vec<usize>,
    index: Vec<usize>,
}

impl DimensionIndex {
    /// Start at the all-zero index.
    pub fn new(extents: &[usize]) -> Self {
        Self {
            extents: extents.to_vec(),
            index: vec![0; extents.len()],
        }
    }

    pub fn current(&self) -> &[usize] {
        &self.index
    }

    /// Step to the next element in row-major order.
    ///
    /// The last rank moves fastest. When a rank reaches its extent it resets
    /// to zero and the carry moves one rank left. The first rank is never
    /// wrapped; callers bound the walk by the total element count.
    pub fn advance(&mut self) {
        let mut rank = self.index.len();
        while rank > 0 {
            rank -= 1;
            self.index[rank] += 1;
            if rank == 0 || self.index[rank] < self.extents[rank] {
                return;
            }
            self.index[rank] = 0;
        }
    }
}

/// Total element count for `extents`, or an error if it overflows.
pub fn element_total(extents: &[usize]) -> Result<usize> {
    extents
        .iter()
        .try_fold(1usize, |acc, &extent| acc.checked_mul(extent))
        .ok_or_else(|| MarshalError::ExtentOverflow(extents.to_vec()))
}

/// Host-side array with a known rank and extents, addressed by index vector.
pub trait HostArray<T> {
    /// Extent of each rank, outermost first.
    fn extents(&self) -> Vec<usize>;

    /// Number of elements actually stored.
    fn element_count(&self) -> usize;

    fn get(&self, index: &[usize]) -> Option<&T>;

    fn get_mut(&mut self, index: &[usize]) -> Option<&mut T>;

    /// Confirm every rank is filled to its extent.
    ///
    /// Checked before any element is read or written, so a ragged host
    /// array is rejected without being modified. Dense storage is
    /// rectangular by construction.
    fn check_rectangular(&self) -> Result<()> {
        Ok(())
    }
}

/// Dense row-major array of any rank.
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray<T> {
    extents: Vec<usize>,
    data: Vec<T>,
}

impl<T> NdArray<T> {
    /// Build an array from row-major storage.
    pub fn from_vec(extents: &[usize], data: Vec<T>) -> Result<Self> {
        let total = element_total(extents)?;
        if data.len() != total {
            return Err(MarshalError::ShapeMismatch {
                expected: total,
                found: data.len(),
            });
        }
        Ok(Self {
            extents: extents.to_vec(),
            data,
        })
    }

    /// Build an array by evaluating `f` at every index, in row-major order.
    pub fn from_fn(extents: &[usize], mut f: impl FnMut(&[usize]) -> T) -> Result<Self> {
        let total = element_total(extents)?;
        let mut walk = DimensionIndex::new(extents);
        let mut data = Vec::with_capacity(total);
        for _ in 0..total {
            data.push(f(walk.current()));
            walk.advance();
        }
        Ok(Self {
            extents: extents.to_vec(),
            data,
        })
    }

    pub fn rank(&self) -> usize {
        self.extents.len()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    fn offset(&self, index: &[usize]) -> Option<usize> {
        if index.len() != self.extents.len() {
            return None;
        }
        let mut offset = 0usize;
        for (&i, &extent) in index.iter().zip(&self.extents) {
            if i >= extent {
                return None;
            }
            offset = offset * extent + i;
        }
        Some(offset)
    }
}

impl<T: Clone> NdArray<T> {
    /// Array of the given shape with every element set to `value`.
    pub fn filled(extents: &[usize], value: T) -> Result<Self> {
        let total = element_total(extents)?;
        Ok(Self {
            extents: extents.to_vec(),
            data: vec![value; total],
        })
    }
}

impl<T> HostArray<T> for NdArray<T> {
    fn extents(&self) -> Vec<usize> {
        self.extents.clone()
    }

    fn element_count(&self) -> usize {
        self.data.len()
    }

    fn get(&self, index: &[usize]) -> Option<&T> {
        self.offset(index).and_then(|o| self.data.get(o))
    }

    fn get_mut(&mut self, index: &[usize]) -> Option<&mut T> {
        self.offset(index).and_then(move |o| self.data.get_mut(o))
    }
}

/// Rank-2 array stored as rows; every row must have the first row's length.
impl<T> HostArray<T> for Vec<Vec<T>> {
    fn check_rectangular(&self) -> Result<()> {
        let width = self.first().map_or(0, Vec::len);
        match self.iter().find(|row| row.len() != width) {
            Some(row) => Err(MarshalError::ShapeMismatch {
                expected: width,
                found: row.len(),
            }),
            None => Ok(()),
        }
    }

    fn extents(&self) -> Vec<usize> {
        vec![self.len(), self.first().map_or(0, Vec::len)]
    }

    fn element_count(&self) -> usize {
        self.iter().map(Vec::len).sum()
    }

    fn get(&self, index: &[usize]) -> Option<&T> {
        match index {
            [row, col] => self.as_slice().get(*row)?.get(*col),
            _ => None,
        }
    }

    fn get_mut(&mut self, index: &[usize]) -> Option<&mut T> {
        match index {
            [row, col] => self.as_mut_slice().get_mut(*row)?.get_mut(*col),
            _ => None,
        }
    }
}

/// Validate a host array against its declared extents; returns the
/// extents and element total.
fn checked_shape<T, H: HostArray<T> + ?Sized>(array: &H) -> Result<(Vec<usize>, usize)> {
    array.check_rectangular()?;
    let extents = array.extents();
    let total = element_total(&extents)?;
    let found = array.element_count();
    if found != total {
        return Err(MarshalError::ShapeMismatch {
            expected: total,
            found,
        });
    }
    Ok((extents, total))
}

fn buffer_len(extents: &[usize], total: usize, element_size: usize) -> Result<usize> {
    total
        .checked_mul(element_size)
        .ok_or_else(|| MarshalError::ExtentOverflow(extents.to_vec()))
}

fn missing(total: usize, position: usize) -> MarshalError {
    MarshalError::ShapeMismatch {
        expected: total,
        found: position,
    }
}

/// Flatten `array` in row-major order, handing each element slot to `writer`.
pub(crate) fn encode_array_with<A: HostAllocator, T, H: HostArray<T> + ?Sized>(
    ledger: &mut AllocationLedger<A>,
    array: &H,
    element_size: usize,
    mut writer: impl FnMut(&T, &mut [u8]) -> Result<()>,
) -> Result<RawBuffer> {
    let (extents, total) = checked_shape(array)?;
    let len = buffer_len(&extents, total, element_size)?;
    ledger.try_allocate_with(len, |w| {
        let mut walk = DimensionIndex::new(&extents);
        for position in 0..total {
            let item = array.get(walk.current()).ok_or_else(|| missing(total, position))?;
            let mut result = Ok(());
            w.write_with(element_size, |slot| result = writer(item, slot));
            result?;
            walk.advance();
        }
        Ok(())
    })
}

/// Unflatten a headerless buffer into `array`, reading each slot with
/// `reader`. A null pointer leaves `array` untouched.
///
/// # Safety
///
/// `ptr` must be null or point to `total * element_size` readable bytes,
/// where `total` is the product of `array`'s extents.
pub(crate) unsafe fn decode_array_with<T, H: HostArray<T> + ?Sized>(
    ptr: *const u8,
    array: &mut H,
    element_size: usize,
    mut reader: impl FnMut(&[u8]) -> T,
) -> Result<()> {
    if ptr.is_null() {
        return Ok(());
    }
    let (extents, total) = checked_shape(array)?;
    let len = buffer_len(&extents, total, element_size)?;
    let mut span = SpanReader::new(std::slice::from_raw_parts(ptr, len));
    let mut walk = DimensionIndex::new(&extents);
    for position in 0..total {
        let slot = array
            .get_mut(walk.current())
            .ok_or_else(|| missing(total, position))?;
        *slot = reader(span.read_bytes(element_size));
        walk.advance();
    }
    Ok(())
}

/// Flatten a fixed-size-element array (no length prefix).
pub fn array_to_buffer<A: HostAllocator, T: Element, H: HostArray<T> + ?Sized>(
    ledger: &mut AllocationLedger<A>,
    array: &H,
) -> Result<RawBuffer> {
    encode_array_with(ledger, array, T::SIZE, |item, slot| {
        item.write_to(slot);
        Ok(())
    })
}

/// Unflatten into a pre-shaped array.
///
/// # Safety
///
/// `ptr` must be null or point to a flattened array with `array`'s extents.
pub unsafe fn buffer_to_array<T: Element, H: HostArray<T> + ?Sized>(
    ptr: *const u8,
    array: &mut H,
) -> Result<()> {
    decode_array_with(ptr, array, T::SIZE, T::read_from)
}

/// Flatten an enum array as 4-byte `int32` values.
pub fn enum_array_to_buffer<A: HostAllocator, E: EnumRepr, H: HostArray<E> + ?Sized>(
    ledger: &mut AllocationLedger<A>,
    array: &H,
) -> Result<RawBuffer> {
    encode_array_with(ledger, array, EnumElement::<E>::SIZE, |item, slot| {
        EnumElement(*item).write_to(slot);
        Ok(())
    })
}

/// # Safety
///
/// `ptr` must be null or point to a flattened enum array with `array`'s extents.
pub unsafe fn buffer_to_enum_array<E: EnumRepr, H: HostArray<E> + ?Sized>(
    ptr: *const u8,
    array: &mut H,
) -> Result<()> {
    decode_array_with(ptr, array, EnumElement::<E>::SIZE, |slot| {
        EnumElement::<E>::read_from(slot).0
    })
}

/// Flatten a wide-character array, one `width` unit per element.
pub fn wchar_array_to_buffer<A: HostAllocator, H: HostArray<char> + ?Sized>(
    ledger: &mut AllocationLedger<A>,
    array: &H,
    width: WideCharWidth,
) -> Result<RawBuffer> {
    encode_array_with(ledger, array, width.bytes(), |ch, slot| {
        encode_wide_char(*ch, width, slot)
    })
}

/// # Safety
///
/// `ptr` must be null or point to a flattened wide-character array of
/// `width` with `array`'s extents.
pub unsafe fn buffer_to_wchar_array<H: HostArray<char> + ?Sized>(
    ptr: *const u8,
    array: &mut H,
    width: WideCharWidth,
) -> Result<()> {
    decode_array_with(ptr, array, width.bytes(), |slot| decode_wide_char(slot, width))
}

/// Flatten a string array into a headerless pointer table.
///
/// Every element is allocated separately; the ledger tracks one buffer per
/// element plus the table.
pub fn string_array_to_buffer<A: HostAllocator, S: AsRef<str>, H: HostArray<S> + ?Sized>(
    ledger: &mut AllocationLedger<A>,
    array: &H,
    format: StringFormat,
) -> Result<RawBuffer> {
    let (extents, total) = checked_shape(array)?;
    let mut slots = Vec::with_capacity(total);
    let mut walk = DimensionIndex::new(&extents);
    for position in 0..total {
        let item = array.get(walk.current()).ok_or_else(|| missing(total, position))?;
        slots.push(string_to_buffer(ledger, item.as_ref(), format)?.as_ptr().cast_const());
        walk.advance();
    }
    let len = buffer_len(&extents, total, POINTER_SIZE)?;
    Ok(ledger.allocate_with(len, |w| {
        for slot in &slots {
            w.write_ptr(*slot);
        }
    }))
}

/// # Safety
///
/// `ptr` must be null or point to a pointer table with `array`'s extents
/// whose slots are null or NUL-terminated strings in `format`.
pub unsafe fn buffer_to_string_array<H: HostArray<String> + ?Sized>(
    ptr: *const u8,
    array: &mut H,
    format: StringFormat,
) -> Result<()> {
    decode_array_with(ptr, array, POINTER_SIZE, |slot| {
        let mut reader = SpanReader::new(slot);
        buffer_to_string(reader.read_ptr(), format)
    })
}
