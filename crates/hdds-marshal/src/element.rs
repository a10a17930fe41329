// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Fixed-width element encodings shared by the wire codec and the
//! sequence/array transcoders.
//!
//! All multi-byte scalars are little-endian. There is never padding between
//! consecutive elements: an element occupies exactly [`Element::SIZE`] bytes.

/// A value with a fixed-width byte encoding.
///
/// `write_to` receives a slice of exactly `SIZE` bytes and `read_from` is
/// handed the same. Implementations index the slice directly; a slot of the
/// wrong size is a programming error and panics.
pub trait Element: Sized {
    /// Encoded width in bytes.
    const SIZE: usize;

    fn write_to(&self, out: &mut [u8]);

    fn read_from(src: &[u8]) -> Self;
}

/// Generate `Element` for primitive numbers (eliminates code duplication)
///
/// Each generated impl:
/// 1. Converts the value to little-endian bytes via `to_le_bytes()`
/// 2. Copies them into the slot (length mismatch panics)
/// 3. Decodes via `from_le_bytes()` on the way back
macro_rules! impl_element_le {
    ($($type:ty),* $(,)?) => {
        $(
            impl Element for $type {
                const SIZE: usize = std::mem::size_of::<$type>();

                #[inline]
                fn write_to(&self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_le_bytes());
                }

                #[inline]
                fn read_from(src: &[u8]) -> Self {
                    let mut bytes = [0u8; std::mem::size_of::<$type>()];
                    bytes.copy_from_slice(src);
                    <$type>::from_le_bytes(bytes)
                }
            }
        )*
    };
}

impl_element_le!(u8, i8, u16, i16, u32, i32, u64, i64, f32, f64);

/// Booleans take one byte: `0x01` is true, every other value is false.
impl Element for bool {
    const SIZE: usize = 1;

    #[inline]
    fn write_to(&self, out: &mut [u8]) {
        out[0] = u8::from(*self);
    }

    #[inline]
    fn read_from(src: &[u8]) -> Self {
        src[0] == 1
    }
}

/// Enumerations that cross the boundary as their integer value.
pub trait EnumRepr: Copy {
    fn to_repr(self) -> i32;

    fn from_repr(value: i32) -> Self;
}

/// Element adapter transcoding an enumerator as a 4-byte `int32`.
///
/// The width is fixed at 4 bytes regardless of the enum's declared
/// underlying type, so slot sizing and the value write always agree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumElement<E>(pub E);

impl<E: EnumRepr> Element for EnumElement<E> {
    const SIZE: usize = 4;

    #[inline]
    fn write_to(&self, out: &mut [u8]) {
        self.0.to_repr().write_to(out);
    }

    #[inline]
    fn read_from(src: &[u8]) -> Self {
        EnumElement(E::from_repr(i32::read_from(src)))
    }
}

/// Implement [`EnumRepr`] for a fieldless enum with an `Unknown`-style
/// fallback for values the host does not know.
///
/// ```
/// use hdds_marshal::impl_enum_repr;
///
/// #[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// enum Reliability {
///     BestEffort = 1,
///     Reliable = 2,
/// }
///
/// impl_enum_repr!(Reliability { BestEffort, Reliable } else BestEffort);
/// ```
#[macro_export]
macro_rules! impl_enum_repr {
    ($enum:ident { $($variant:ident),+ $(,)? } else $fallback:ident) => {
        impl $crate::element::EnumRepr for $enum {
            fn to_repr(self) -> i32 {
                self as i32
            }

            fn from_repr(value: i32) -> Self {
                $(
                    if value == $enum::$variant as i32 {
                        return $enum::$variant;
                    }
                )+
                $enum::$fallback
            }
        }
    };
}
