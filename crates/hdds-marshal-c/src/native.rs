// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Native-side allocator.
//!
//! Buffers handed back to the host start `HEADER` bytes into an allocation
//! whose header records the total size and a tag. Only
//! `hdds_marshal_release` (and the shape-specific release functions built on
//! it) can free them; passing one to `free` corrupts the heap.

use std::alloc::{alloc_zeroed, dealloc, handle_alloc_error, Layout};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};

const HEADER: usize = 16;
const TAG: u64 = 0x4844_4453_4D52_5348;

static LIVE: AtomicUsize = AtomicUsize::new(0);

/// Allocate `len` zeroed bytes, or `None` if the size is not representable.
pub(crate) fn allocate(len: usize) -> Option<NonNull<u8>> {
    let total = len.checked_add(HEADER)?;
    let layout = Layout::from_size_align(total, HEADER).ok()?;
    // SAFETY: layout has a non-zero size (at least HEADER bytes).
    let base = unsafe { alloc_zeroed(layout) };
    if base.is_null() {
        handle_alloc_error(layout);
    }
    // SAFETY: base is HEADER-aligned and at least HEADER bytes long.
    unsafe {
        base.cast::<u64>().write(total as u64);
        base.add(8).cast::<u64>().write(TAG);
    }
    LIVE.fetch_add(1, Ordering::Relaxed);
    // SAFETY: base + HEADER stays inside the allocation and is non-null.
    Some(unsafe { NonNull::new_unchecked(base.add(HEADER)) })
}

/// Allocate a native copy of `bytes`.
pub(crate) fn copy_out(bytes: &[u8]) -> Option<NonNull<u8>> {
    let ptr = allocate(bytes.len())?;
    // SAFETY: ptr has room for bytes.len() bytes and does not overlap bytes.
    unsafe { std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr.as_ptr(), bytes.len()) };
    Some(ptr)
}

/// Free a buffer from [`allocate`]. Null is a no-op.
///
/// # Safety
///
/// `ptr` must be null or a live pointer returned by [`allocate`].
pub(crate) unsafe fn release(ptr: *mut u8) {
    if ptr.is_null() {
        return;
    }
    let base = ptr.sub(HEADER);
    debug_assert_eq!(
        base.add(8).cast::<u64>().read(),
        TAG,
        "buffer {:p} was not allocated by the native side",
        ptr
    );
    let total = base.cast::<u64>().read() as usize;
    dealloc(base, Layout::from_size_align_unchecked(total, HEADER));
    LIVE.fetch_sub(1, Ordering::Relaxed);
}

/// Number of native buffers not yet released.
pub(crate) fn live() -> usize {
    LIVE.load(Ordering::Relaxed)
}
