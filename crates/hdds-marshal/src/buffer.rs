// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Unmanaged buffers and the host allocator that backs them.

use std::alloc::{handle_alloc_error, Layout};
use std::fmt;
use std::ptr::NonNull;

/// Handle to an unmanaged allocation: base address plus byte length.
///
/// The handle itself owns nothing. Ownership stays with whoever allocated
/// it (an [`AllocationLedger`](crate::ledger::AllocationLedger) for
/// host-side buffers) until that owner releases it.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawBuffer {
    ptr: NonNull<u8>,
    len: usize,
}

impl RawBuffer {
    pub(crate) fn new(ptr: NonNull<u8>, len: usize) -> Self {
        Self { ptr, len }
    }

    /// Base address, suitable for passing across the native boundary.
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub(crate) fn non_null(&self) -> NonNull<u8> {
        self.ptr
    }
}

impl fmt::Debug for RawBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawBuffer({:p}, {} bytes)", self.ptr, self.len)
    }
}

/// Allocator used for buffers the host side creates before a native call.
pub trait HostAllocator {
    /// Allocate `len` zero-initialized bytes.
    ///
    /// Zero-length requests still return a unique, non-null pointer.
    /// Allocation failure is fatal.
    fn allocate_zeroed(&self, len: usize) -> NonNull<u8>;

    /// Return a buffer to the allocator.
    ///
    /// # Safety
    ///
    /// `ptr` must come from `allocate_zeroed` on this allocator with the
    /// same `len`, and must not have been released already.
    unsafe fn release(&self, ptr: NonNull<u8>, len: usize);
}

/// The C runtime heap (`calloc`/`free`), which native code can read with
/// any scalar alignment.
#[derive(Debug, Clone, Copy, Default)]
pub struct CHeap;

impl HostAllocator for CHeap {
    fn allocate_zeroed(&self, len: usize) -> NonNull<u8> {
        let size = len.max(1);
        // SAFETY: calloc has no preconditions; the result is checked below.
        let raw = unsafe { libc::calloc(size, 1) }.cast::<u8>();
        match NonNull::new(raw) {
            Some(ptr) => ptr,
            None => handle_alloc_error(
                Layout::from_size_align(size, 1).unwrap_or_else(|_| Layout::new::<u8>()),
            ),
        }
    }

    unsafe fn release(&self, ptr: NonNull<u8>, _len: usize) {
        libc::free(ptr.as_ptr().cast());
    }
}

/// Size of a pointer slot inside a pointer table.
pub const POINTER_SIZE: usize = std::mem::size_of::<usize>();

/// Total byte size of `count` elements of `element_size` bytes plus `header`
/// bytes, or `None` on overflow.
pub(crate) fn layout_size(header: usize, element_size: usize, count: usize) -> Option<usize> {
    element_size.checked_mul(count)?.checked_add(header)
}
