// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # HDDS Marshal
//!
//! Transcoding between Rust collections and the fixed unmanaged layouts
//! exchanged with native DDS libraries.
//!
//! ## Quick Start
//!
//! ```rust
//! use hdds_marshal::{buffer_to_sequence, sequence_to_buffer, with_ledger, Result};
//!
//! fn main() -> Result<()> {
//!     let back: Vec<u16> = with_ledger(|ledger| {
//!         let buf = sequence_to_buffer(ledger, &[7_u16, 8, 9])?;
//!         // SAFETY: buf is a live count-prefixed u16 sequence owned by ledger.
//!         unsafe { buffer_to_sequence(buf.as_ptr(), 0) }
//!     })?;
//!     assert_eq!(back, vec![7, 8, 9]);
//!     Ok(())
//! }
//! ```
//!
//! ## Layouts
//!
//! ```text
//! sequence      [int32 count][element 0][element 1]...
//! string seq    [int32 count][ptr 0][ptr 1]...       each ptr -> NUL-terminated string
//! string        [unit 0][unit 1]...[NUL unit]         unit = 1 byte, or 2/4 bytes wide
//! array         [element 0,..,0][element 0,..,1]...  row-major, no prefix
//! ```
//!
//! Scalars are little-endian. Wide-character units and pointer slots use the
//! platform's native representation.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`AllocationLedger`] | Owns every host buffer built for one native call |
//! | [`NativeBuffer`] | Owns a buffer returned by native code until its release entry point runs |
//! | [`WireBuffer`] | Growable little-endian scalar codec |
//! | [`Transcoder`] | Applies a [`MarshalConfig`] to every transcoding call |
//! | [`HandleRegistry`] | Maps native handles back to host instances |
//! | [`NdArray`] | Rectangular host array of any rank |

/// Multi-dimensional array transcoding.
pub mod array;
/// Host buffers and the allocator that backs them.
pub mod buffer;
/// Transcoder configuration (TOML).
pub mod config;
/// Fixed-width element encodings.
pub mod element;
/// Error types.
pub mod error;
/// Ownership of host and native buffers.
pub mod ledger;
/// Native handle to host instance registry.
pub mod registry;
/// Count-prefixed sequence transcoding.
pub mod sequence;
/// Bounds-checked cursors over unmanaged buffers.
pub mod span;
/// Narrow and wide string transcoding.
pub mod string;
mod transcoder;
/// Scalar wire codec.
pub mod wire;

pub use array::{
    array_to_buffer, buffer_to_array, buffer_to_enum_array, buffer_to_string_array,
    buffer_to_wchar_array, element_total, enum_array_to_buffer, string_array_to_buffer,
    wchar_array_to_buffer, DimensionIndex, HostArray, NdArray,
};
pub use buffer::{CHeap, HostAllocator, RawBuffer, POINTER_SIZE};
pub use config::{ConfigError, MarshalConfig, WideCharWidth, MAX_SEQUENCE_LEN};
pub use element::{Element, EnumElement, EnumRepr};
pub use error::{MarshalError, Result};
pub use ledger::{
    with_ledger, with_ledger_in, AllocationLedger, NativeBuffer, NativeRelease, ReleaseFn,
};
pub use registry::{Handle, HandleRegistry};
pub use sequence::{
    buffer_to_enum_sequence, buffer_to_enum_sequence_into, buffer_to_sequence,
    buffer_to_sequence_into, buffer_to_wchar_sequence, buffer_to_wchar_sequence_into,
    enum_sequence_to_buffer, raw_buffer_to_sequence, raw_buffer_to_sequence_into,
    raw_sequence_to_buffer, sequence_count, sequence_to_buffer, wchar_sequence_to_buffer,
    COUNT_SIZE,
};
pub use span::{SpanReader, SpanWriter};
pub use string::{
    buffer_to_string, buffer_to_string_sequence, buffer_to_string_sequence_into, decode_units,
    encode_units, string_sequence_to_buffer, string_to_buffer, StringFormat,
};
pub use transcoder::Transcoder;
pub use wire::{decimal_from_f64, decimal_to_f64, WireBuffer};

/// Re-exported for [`WireBuffer::write_decimal`] callers.
pub use rust_decimal::Decimal;
