// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transcoding errors.
//!
//! Only data problems surface here. Contract violations between the two
//! transcoding call sites (reading past a wire buffer, mis-sized element
//! writers) panic instead, and allocation failure aborts through
//! [`std::alloc::handle_alloc_error`].

use crate::config::ConfigError;
use thiserror::Error;

/// Errors returned by encode/decode operations.
#[derive(Debug, Error)]
pub enum MarshalError {
    /// Host collection is longer than the `int32` count prefix (or the
    /// configured bound) allows.
    #[error("sequence length {len} exceeds limit {limit}")]
    LengthOverflow { len: usize, limit: usize },

    /// A count prefix read from an unmanaged buffer was negative.
    #[error("negative sequence count {0}")]
    NegativeCount(i32),

    /// Strings are NUL-terminated on the native side; an interior NUL would
    /// silently truncate the value.
    #[error("string contains an interior NUL at code unit {index}")]
    InteriorNul { index: usize },

    /// Character does not fit a single wide code unit of the active width.
    #[error("character U+{code_point:04X} does not fit a {width}-byte wide unit")]
    Unrepresentable { code_point: u32, width: usize },

    /// Host array storage does not match its declared extents.
    #[error("array shape mismatch: expected {expected} elements, found {found}")]
    ShapeMismatch { expected: usize, found: usize },

    /// Product of array extents (or a buffer size) overflowed `usize`.
    #[error("array extents {0:?} overflow the addressable size")]
    ExtentOverflow(Vec<usize>),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, MarshalError>;
