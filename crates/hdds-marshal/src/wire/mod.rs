// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Scalar wire codec.
//!
//! [`WireBuffer`] is a growable byte sequence with a read cursor. Scalars are
//! appended at their fixed width (1/2/4/8 bytes, IEEE-754 for floats,
//! little-endian) with no padding between them, and read back in the same
//! order.
//!
//! The wire format is always produced and consumed by this crate, so reading
//! past the written bytes means the two call sites disagree about the
//! layout. That is a programming error and panics.

mod decimal;

pub use decimal::{decimal_from_f64, decimal_to_f64};

use crate::element::Element;
use rust_decimal::Decimal;

/// Generate named write methods for scalar types (eliminates code duplication)
macro_rules! impl_write {
    ($($name:ident: $type:ty),* $(,)?) => {
        $(
            pub fn $name(&mut self, value: $type) {
                self.write(&value);
            }
        )*
    };
}

/// Generate named read methods for scalar types (eliminates code duplication)
macro_rules! impl_read {
    ($($name:ident: $type:ty),* $(,)?) => {
        $(
            pub fn $name(&mut self) -> $type {
                self.read()
            }
        )*
    };
}

/// Growable byte buffer with an advancing read cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WireBuffer {
    data: Vec<u8>,
    read_pos: usize,
}

impl WireBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            read_pos: 0,
        }
    }

    /// Wrap received bytes for reading from offset 0.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { data, read_pos: 0 }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read cursor offset.
    pub fn position(&self) -> usize {
        self.read_pos
    }

    /// Bytes left between the read cursor and the end of the written data.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.read_pos)
    }

    /// Append any fixed-width element.
    pub fn write<T: Element>(&mut self, value: &T) {
        let start = self.data.len();
        self.data.resize(start + T::SIZE, 0);
        value.write_to(&mut self.data[start..]);
    }

    /// Consume one fixed-width element.
    ///
    /// # Panics
    ///
    /// Panics if fewer than `T::SIZE` bytes remain.
    pub fn read<T: Element>(&mut self) -> T {
        T::read_from(self.take(T::SIZE))
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// # Panics
    ///
    /// Panics if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> &[u8] {
        self.take(len)
    }

    impl_write!(
        write_u8: u8,
        write_i8: i8,
        write_u16: u16,
        write_i16: i16,
        write_u32: u32,
        write_i32: i32,
        write_u64: u64,
        write_i64: i64,
        write_f32: f32,
        write_f64: f64,
        write_bool: bool,
    );

    impl_read!(
        read_u8: u8,
        read_i8: i8,
        read_u16: u16,
        read_i16: i16,
        read_u32: u32,
        read_i32: i32,
        read_u64: u64,
        read_i64: i64,
        read_f32: f32,
        read_f64: f64,
        read_bool: bool,
    );

    /// Decimals travel as an IEEE-754 double (lossy at the extremes).
    pub fn write_decimal(&mut self, value: Decimal) {
        self.write_f64(decimal_to_f64(value));
    }

    /// Read a double and bridge it back to a decimal, clamping values outside
    /// the decimal range (NaN maps to [`Decimal::MIN`]).
    pub fn read_decimal(&mut self) -> Decimal {
        decimal_from_f64(self.read_f64())
    }

    fn take(&mut self, len: usize) -> &[u8] {
        let end = self.read_pos.checked_add(len);
        match end {
            Some(end) if end <= self.data.len() => {
                let slice = &self.data[self.read_pos..end];
                self.read_pos = end;
                slice
            }
            _ => panic!(
                "wire buffer underrun: {} bytes requested at offset {}, {} available",
                len,
                self.read_pos,
                self.remaining()
            ),
        }
    }
}
