// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Read/write cursors over an unmanaged buffer viewed as a byte slice.
//!
//! The slice is sized once, when the buffer layout is computed. From then on
//! every offset is plain slice indexing, so an element writer that strays
//! outside the layout panics instead of scribbling over foreign memory.

use crate::buffer::POINTER_SIZE;
use crate::element::Element;

/// Generate common cursor methods (offset, remaining, advance) for both cursors
macro_rules! impl_span_common {
    () => {
        pub fn offset(&self) -> usize {
            self.offset
        }

        pub fn remaining(&self) -> usize {
            self.buffer.len().saturating_sub(self.offset)
        }

        fn advance(&mut self, len: usize) -> std::ops::Range<usize> {
            let start = self.offset;
            let end = start + len;
            assert!(
                end <= self.buffer.len(),
                "span overrun: {} bytes at offset {} exceed layout of {} bytes",
                len,
                start,
                self.buffer.len()
            );
            self.offset = end;
            start..end
        }
    };
}

/// Mutable cursor for laying out an outbound buffer.
pub struct SpanWriter<'a> {
    buffer: &'a mut [u8],
    offset: usize,
}

impl<'a> SpanWriter<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    pub fn write<T: Element>(&mut self, value: &T) {
        let range = self.advance(T::SIZE);
        value.write_to(&mut self.buffer[range]);
    }

    /// Hand the next `len`-byte slot to a caller-supplied writer.
    pub fn write_with(&mut self, len: usize, writer: impl FnOnce(&mut [u8])) {
        let range = self.advance(len);
        writer(&mut self.buffer[range]);
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        let range = self.advance(data.len());
        self.buffer[range].copy_from_slice(data);
    }

    /// Store an address in a pointer-sized slot (native byte order).
    pub fn write_ptr(&mut self, ptr: *const u8) {
        let range = self.advance(POINTER_SIZE);
        self.buffer[range].copy_from_slice(&(ptr as usize).to_ne_bytes());
    }

    impl_span_common!();
}

/// Immutable cursor for walking an inbound buffer.
pub struct SpanReader<'a> {
    buffer: &'a [u8],
    offset: usize,
}

impl<'a> SpanReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    pub fn read<T: Element>(&mut self) -> T {
        let range = self.advance(T::SIZE);
        T::read_from(&self.buffer[range])
    }

    pub fn read_bytes(&mut self, len: usize) -> &'a [u8] {
        let range = self.advance(len);
        let buffer: &'a [u8] = self.buffer;
        &buffer[range]
    }

    /// Load an address from a pointer-sized slot (native byte order).
    pub fn read_ptr(&mut self) -> *const u8 {
        let mut bytes = [0u8; POINTER_SIZE];
        bytes.copy_from_slice(self.read_bytes(POINTER_SIZE));
        usize::from_ne_bytes(bytes) as *const u8
    }

    impl_span_common!();

    pub fn is_eof(&self) -> bool {
        self.offset >= self.buffer.len()
    }
}
