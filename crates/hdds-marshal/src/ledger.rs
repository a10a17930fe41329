// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Buffer ownership across the native boundary.
//!
//! Two release paths exist and must never be mixed:
//!
//! | Allocated by | Owned by | Released through |
//! |--------------|----------|------------------|
//! | host (before the call) | [`AllocationLedger`] | the ledger's [`HostAllocator`] |
//! | native (returned from the call) | [`NativeBuffer`] | its shape's [`NativeRelease`] |
//!
//! Host buffers are only reachable as [`RawBuffer`] handles owned by a
//! ledger, and native buffers only as a [`NativeBuffer`], so neither can be
//! handed to the other's release path.
//!
//! ```
//! use hdds_marshal::{sequence_to_buffer, AllocationLedger};
//!
//! let mut ledger = AllocationLedger::new();
//! let buf = sequence_to_buffer(&mut ledger, &[1_i32, 2, 3]).expect("encode");
//! // ... pass buf.as_ptr() to the native call ...
//! # let _ = buf;
//! drop(ledger); // every buffer released, success or failure
//! ```

use crate::buffer::{CHeap, HostAllocator, RawBuffer};
use crate::span::SpanWriter;
use std::ffi::c_void;
use std::fmt;
use std::mem::ManuallyDrop;
use std::ptr::{self, NonNull};

/// Call-scoped record of every host allocation made while encoding.
///
/// Dropping the ledger releases each entry exactly once, including on early
/// returns and unwinding.
pub struct AllocationLedger<A: HostAllocator = CHeap> {
    allocator: A,
    entries: Vec<RawBuffer>,
}

impl AllocationLedger<CHeap> {
    pub fn new() -> Self {
        Self::with_allocator(CHeap)
    }
}

impl Default for AllocationLedger<CHeap> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: HostAllocator> AllocationLedger<A> {
    pub fn with_allocator(allocator: A) -> Self {
        Self {
            allocator,
            entries: Vec::new(),
        }
    }

    /// Allocate `len` zeroed bytes and track them.
    pub fn allocate(&mut self, len: usize) -> RawBuffer {
        let buf = RawBuffer::new(self.allocator.allocate_zeroed(len), len);
        self.entries.push(buf);
        buf
    }

    /// Allocate `len` bytes and lay them out through a [`SpanWriter`].
    ///
    /// # Panics
    ///
    /// Panics if `fill` leaves bytes unwritten or writes past `len`: the
    /// layout computation and the writer disagree. The buffer is already
    /// tracked at that point and is still released.
    pub fn allocate_with(
        &mut self,
        len: usize,
        fill: impl FnOnce(&mut SpanWriter<'_>),
    ) -> RawBuffer {
        let filled: Result<RawBuffer, std::convert::Infallible> =
            self.try_allocate_with(len, |w| {
                fill(w);
                Ok(())
            });
        match filled {
            Ok(buf) => buf,
            Err(never) => match never {},
        }
    }

    /// Fallible form of [`allocate_with`](Self::allocate_with).
    ///
    /// When `fill` fails the partially written buffer stays tracked and is
    /// released with the rest of the ledger.
    pub fn try_allocate_with<E>(
        &mut self,
        len: usize,
        fill: impl FnOnce(&mut SpanWriter<'_>) -> Result<(), E>,
    ) -> Result<RawBuffer, E> {
        let buf = self.allocate(len);
        // SAFETY: `buf` was just allocated with `len` bytes, is tracked (not
        // released) and no other reference to it exists yet.
        let bytes = unsafe { std::slice::from_raw_parts_mut(buf.as_ptr(), len) };
        let mut writer = SpanWriter::new(bytes);
        fill(&mut writer)?;
        assert_eq!(
            writer.remaining(),
            0,
            "layout of {} bytes left {} bytes unwritten",
            len,
            writer.remaining()
        );
        Ok(buf)
    }

    /// Number of tracked allocations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tracked allocations, in allocation order.
    pub fn buffers(&self) -> &[RawBuffer] {
        &self.entries
    }

    /// Sum of tracked allocation sizes.
    pub fn allocated_bytes(&self) -> usize {
        self.entries.iter().map(RawBuffer::len).sum()
    }

    pub fn allocator(&self) -> &A {
        &self.allocator
    }

    /// Release every tracked allocation now; returns how many were freed.
    ///
    /// The ledger is empty afterwards and can be reused for another call.
    pub fn release_all(&mut self) -> usize {
        let count = self.entries.len();
        for buf in self.entries.drain(..) {
            // SAFETY: every entry came from `self.allocator` with this length
            // and is removed from the ledger as it is released.
            unsafe { self.allocator.release(buf.non_null(), buf.len()) };
        }
        if count > 0 {
            log::trace!("[ledger] released {} host buffers", count);
        }
        count
    }
}

impl<A: HostAllocator> Drop for AllocationLedger<A> {
    fn drop(&mut self) {
        self.release_all();
    }
}

impl<A: HostAllocator> fmt::Debug for AllocationLedger<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocationLedger")
            .field("entries", &self.entries)
            .finish()
    }
}

/// Run one outbound native call with a fresh ledger that is drained when
/// the closure returns or unwinds.
pub fn with_ledger<R>(call: impl FnOnce(&mut AllocationLedger) -> R) -> R {
    with_ledger_in(CHeap, call)
}

/// [`with_ledger`] over an explicit host allocator.
pub fn with_ledger_in<A: HostAllocator, R>(
    allocator: A,
    call: impl FnOnce(&mut AllocationLedger<A>) -> R,
) -> R {
    let mut ledger = AllocationLedger::with_allocator(allocator);
    call(&mut ledger)
}

/// Native entry point that frees a buffer the native side allocated.
pub trait NativeRelease {
    /// # Safety
    ///
    /// `ptr` must be a live allocation made by the native side for the shape
    /// this release function handles.
    unsafe fn release(&self, ptr: *mut c_void);
}

/// C signature of a native release entry point.
pub type ReleaseFn = unsafe extern "C" fn(*mut c_void);

impl NativeRelease for ReleaseFn {
    unsafe fn release(&self, ptr: *mut c_void) {
        (*self)(ptr);
    }
}

/// Owning guard for a buffer allocated and returned by the native side.
///
/// Dropping the guard calls the native release function exactly once.
/// A null pointer is a valid, empty guard and releases nothing.
pub struct NativeBuffer<R: NativeRelease> {
    ptr: Option<NonNull<u8>>,
    release: R,
}

impl<R: NativeRelease> NativeBuffer<R> {
    /// Take ownership of a native allocation.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a native allocation that `release` frees, and
    /// nothing else may release it afterwards.
    pub unsafe fn from_raw(ptr: *mut u8, release: R) -> Self {
        Self {
            ptr: NonNull::new(ptr),
            release,
        }
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.ptr.map_or(ptr::null(), |p| p.as_ptr().cast_const())
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_none()
    }

    /// Give ownership back to the caller without releasing.
    pub fn into_raw(self) -> *mut u8 {
        let this = ManuallyDrop::new(self);
        this.ptr.map_or(ptr::null_mut(), NonNull::as_ptr)
    }
}

impl<R: NativeRelease> Drop for NativeBuffer<R> {
    fn drop(&mut self) {
        if let Some(ptr) = self.ptr.take() {
            log::trace!("[ledger] releasing native buffer {:p}", ptr);
            // SAFETY: guaranteed by the `from_raw` contract; `take` makes this
            // the only release.
            unsafe { self.release.release(ptr.as_ptr().cast()) };
        }
    }
}

impl<R: NativeRelease> fmt::Debug for NativeBuffer<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NativeBuffer({:p})", self.as_ptr())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// CHeap wrapper that records every allocation and release.
    #[derive(Default)]
    struct CountingHeap {
        allocated: Cell<usize>,
        released: RefCell<Vec<usize>>,
    }

    impl HostAllocator for CountingHeap {
        fn allocate_zeroed(&self, len: usize) -> NonNull<u8> {
            self.allocated.set(self.allocated.get() + 1);
            CHeap.allocate_zeroed(len)
        }

        unsafe fn release(&self, ptr: NonNull<u8>, len: usize) {
            self.released.borrow_mut().push(ptr.as_ptr() as usize);
            CHeap.release(ptr, len);
        }
    }

    #[test]
    fn test_ledger_releases_each_entry_once() {
        let mut ledger = AllocationLedger::with_allocator(CountingHeap::default());
        let a = ledger.allocate(8);
        let b = ledger.allocate(0);
        let c = ledger.allocate(32);
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.allocated_bytes(), 40);

        assert_eq!(ledger.release_all(), 3);
        assert!(ledger.is_empty());
        assert_eq!(ledger.release_all(), 0);

        let released = ledger.allocator().released.borrow().clone();
        assert_eq!(
            released,
            vec![a.as_ptr() as usize, b.as_ptr() as usize, c.as_ptr() as usize]
        );
        assert_eq!(ledger.allocator().allocated.get(), 3);
    }

    /// Shares one `CountingHeap` between a ledger and the test body.
    struct Shared(Rc<CountingHeap>);

    impl HostAllocator for Shared {
        fn allocate_zeroed(&self, len: usize) -> NonNull<u8> {
            self.0.allocate_zeroed(len)
        }

        unsafe fn release(&self, ptr: NonNull<u8>, len: usize) {
            self.0.release(ptr, len);
        }
    }

    #[test]
    fn test_ledger_drop_releases() {
        let heap = Rc::new(CountingHeap::default());
        {
            let mut ledger = AllocationLedger::with_allocator(Shared(heap.clone()));
            ledger.allocate(4);
            ledger.allocate(4);
        }
        assert_eq!(heap.released.borrow().len(), 2);
    }

    #[test]
    fn test_allocate_with_fills_buffer() {
        let mut ledger = AllocationLedger::new();
        let buf = ledger.allocate_with(6, |w| {
            w.write(&0x0102_0304_i32);
            w.write(&0xAABB_u16);
        });
        // SAFETY: buf is tracked by the live ledger.
        let bytes = unsafe { std::slice::from_raw_parts(buf.as_ptr(), buf.len()) };
        assert_eq!(bytes, &[0x04, 0x03, 0x02, 0x01, 0xBB, 0xAA]);
    }

    #[test]
    #[should_panic(expected = "unwritten")]
    fn test_allocate_with_short_fill_panics() {
        let mut ledger = AllocationLedger::new();
        ledger.allocate_with(8, |w| w.write(&1_u32));
    }

    #[test]
    fn test_with_ledger_releases_on_error_path() {
        let heap = Rc::new(CountingHeap::default());
        let result: Result<(), &str> = with_ledger_in(Shared(heap.clone()), |ledger| {
            ledger.allocate(16);
            assert!(heap.released.borrow().is_empty());
            Err("native call failed")
        });
        assert!(result.is_err());
        assert_eq!(heap.allocated.get(), 1);
        assert_eq!(heap.released.borrow().len(), 1);
    }

    #[test]
    fn test_with_ledger_releases_on_unwind() {
        let heap = Rc::new(CountingHeap::default());
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            with_ledger_in(Shared(heap.clone()), |ledger| {
                ledger.allocate(8);
                ledger.allocate(8);
                panic!("native call aborted");
            })
        }));
        assert!(outcome.is_err());
        assert_eq!(heap.released.borrow().len(), 2);
    }

    static RELEASED: AtomicUsize = AtomicUsize::new(0);

    unsafe extern "C" fn counting_release(ptr: *mut c_void) {
        RELEASED.fetch_add(1, Ordering::SeqCst);
        libc::free(ptr);
    }

    #[test]
    fn test_native_buffer_released_once() {
        let before = RELEASED.load(Ordering::SeqCst);
        // SAFETY: malloc'd buffer handed to a release fn that frees it.
        let native = unsafe {
            NativeBuffer::from_raw(libc::malloc(8).cast(), counting_release as ReleaseFn)
        };
        assert!(!native.is_null());
        drop(native);
        assert_eq!(RELEASED.load(Ordering::SeqCst), before + 1);
    }

    #[test]
    fn test_null_native_buffer_releases_nothing() {
        // SAFETY: null pointers are accepted and never released.
        let native =
            unsafe { NativeBuffer::from_raw(ptr::null_mut(), counting_release as ReleaseFn) };
        assert!(native.is_null());
        assert!(native.as_ptr().is_null());
        assert!(native.into_raw().is_null());
    }

    #[test]
    fn test_native_buffer_into_raw_skips_release() {
        struct Panicking;
        impl NativeRelease for Panicking {
            unsafe fn release(&self, _ptr: *mut c_void) {
                panic!("released after into_raw");
            }
        }

        let raw = CHeap.allocate_zeroed(4);
        // SAFETY: ownership is taken back with into_raw before drop.
        let native = unsafe { NativeBuffer::from_raw(raw.as_ptr(), Panicking) };
        let back = native.into_raw();
        assert_eq!(back, raw.as_ptr());
        // SAFETY: allocated above via CHeap, released once.
        unsafe { CHeap.release(raw, 4) };
    }
}
