// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Configured entry point.
//!
//! [`Transcoder`] binds a validated [`MarshalConfig`] so that call sites do
//! not repeat the wide-character width, the decode capacity hint and the
//! sequence length bound on every call.

use crate::buffer::{HostAllocator, RawBuffer};
use crate::config::MarshalConfig;
use crate::element::Element;
use crate::error::Result;
use crate::ledger::AllocationLedger;
use crate::sequence::{
    decode_sequence_with, encode_sequence_with, wchar_sequence_to_buffer_bounded,
};
use crate::string::{
    buffer_to_string, buffer_to_string_sequence_into_bounded, decode_wide_char,
    string_sequence_to_buffer_bounded, string_to_buffer, StringFormat,
};

#[derive(Debug, Clone, Default)]
pub struct Transcoder {
    config: MarshalConfig,
}

impl Transcoder {
    pub fn new(config: MarshalConfig) -> Result<Self> {
        config.validate()?;
        log::debug!(
            "[transcoder] wide={} capacity_hint={} max_len={}",
            config.wide_char_width,
            config.capacity_hint,
            config.max_sequence_len
        );
        Ok(Self { config })
    }

    pub fn config(&self) -> &MarshalConfig {
        &self.config
    }

    /// Narrow or configured-width wide format.
    pub fn string_format(&self, wide: bool) -> StringFormat {
        if wide {
            StringFormat::Wide(self.config.wide_char_width)
        } else {
            StringFormat::Narrow
        }
    }

    pub fn string_to_buffer<A: HostAllocator>(
        &self,
        ledger: &mut AllocationLedger<A>,
        value: &str,
        wide: bool,
    ) -> Result<RawBuffer> {
        string_to_buffer(ledger, value, self.string_format(wide))
    }

    /// # Safety
    ///
    /// `ptr` must be null or a NUL-terminated string in the selected format.
    pub unsafe fn buffer_to_string(&self, ptr: *const u8, wide: bool) -> String {
        buffer_to_string(ptr, self.string_format(wide))
    }

    pub fn sequence_to_buffer<A: HostAllocator, T: Element>(
        &self,
        ledger: &mut AllocationLedger<A>,
        items: &[T],
    ) -> Result<RawBuffer> {
        let limit = self.config.max_sequence_len;
        encode_sequence_with(ledger, items, T::SIZE, limit, |item, slot| {
            item.write_to(slot);
            Ok(())
        })
    }

    /// # Safety
    ///
    /// `ptr` must be null or a count-prefixed sequence of `T`.
    pub unsafe fn buffer_to_sequence<T: Element>(&self, ptr: *const u8) -> Result<Vec<T>> {
        let mut out = Vec::with_capacity(self.config.capacity_hint);
        let limit = self.config.max_sequence_len;
        decode_sequence_with(ptr, T::SIZE, limit, &mut out, T::read_from)?;
        Ok(out)
    }

    pub fn string_sequence_to_buffer<A: HostAllocator, S: AsRef<str>>(
        &self,
        ledger: &mut AllocationLedger<A>,
        items: &[S],
        wide: bool,
    ) -> Result<RawBuffer> {
        let format = self.string_format(wide);
        string_sequence_to_buffer_bounded(ledger, items, format, self.config.max_sequence_len)
    }

    /// # Safety
    ///
    /// `ptr` must be null or a count-prefixed string table in the selected
    /// format.
    pub unsafe fn buffer_to_string_sequence(
        &self,
        ptr: *const u8,
        wide: bool,
    ) -> Result<Vec<String>> {
        let format = self.string_format(wide);
        let limit = self.config.max_sequence_len;
        let mut out = Vec::with_capacity(self.config.capacity_hint);
        buffer_to_string_sequence_into_bounded(ptr, format, &mut out, limit)?;
        Ok(out)
    }

    pub fn wchar_sequence_to_buffer<A: HostAllocator>(
        &self,
        ledger: &mut AllocationLedger<A>,
        items: &[char],
    ) -> Result<RawBuffer> {
        let width = self.config.wide_char_width;
        wchar_sequence_to_buffer_bounded(ledger, items, width, self.config.max_sequence_len)
    }

    /// # Safety
    ///
    /// `ptr` must be null or a count-prefixed wide-character sequence of the
    /// configured width.
    pub unsafe fn buffer_to_wchar_sequence(&self, ptr: *const u8) -> Result<Vec<char>> {
        let width = self.config.wide_char_width;
        let mut out = Vec::with_capacity(self.config.capacity_hint);
        let limit = self.config.max_sequence_len;
        decode_sequence_with(ptr, width.bytes(), limit, &mut out, |slot| {
            decode_wide_char(slot, width)
        })?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WideCharWidth;
    use crate::error::MarshalError;

    fn utf16_transcoder() -> Transcoder {
        Transcoder::new(
            MarshalConfig::default()
                .wide_char_width(WideCharWidth::Utf16)
                .capacity_hint(4)
                .max_sequence_len(8),
        )
        .expect("valid config")
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = MarshalConfig::default().max_sequence_len(2).capacity_hint(3);
        let err = Transcoder::new(config).unwrap_err();
        assert!(matches!(err, MarshalError::Config(_)));
    }

    #[test]
    fn test_wide_string_uses_configured_width() {
        let transcoder = utf16_transcoder();
        let mut ledger = AllocationLedger::new();
        let buf = transcoder.string_to_buffer(&mut ledger, "dds", true).expect("encode");
        assert_eq!(buf.len(), 8);
        // SAFETY: buf is a live UTF-16 string.
        assert_eq!(unsafe { transcoder.buffer_to_string(buf.as_ptr(), true) }, "dds");

        let narrow = transcoder.string_to_buffer(&mut ledger, "dds", false).expect("encode");
        assert_eq!(narrow.len(), 4);
    }

    #[test]
    fn test_sequence_respects_limit_and_hint() {
        let transcoder = utf16_transcoder();
        let mut ledger = AllocationLedger::new();
        let err = transcoder.sequence_to_buffer(&mut ledger, &[0_u8; 9]).unwrap_err();
        assert!(matches!(err, MarshalError::LengthOverflow { len: 9, limit: 8 }));

        let buf = transcoder.sequence_to_buffer(&mut ledger, &[1_u32, 2]).expect("encode");
        // SAFETY: buf is a live u32 sequence.
        let back: Vec<u32> =
            unsafe { transcoder.buffer_to_sequence(buf.as_ptr()) }.expect("decode");
        assert_eq!(back, vec![1, 2]);
        assert!(back.capacity() >= 4);
    }

    #[test]
    fn test_string_and_wchar_sequences() {
        let transcoder = utf16_transcoder();
        let mut ledger = AllocationLedger::new();
        let buf = transcoder
            .string_sequence_to_buffer(&mut ledger, &["topic", "type"], true)
            .expect("encode");
        // SAFETY: buf is a live UTF-16 string table.
        let back =
            unsafe { transcoder.buffer_to_string_sequence(buf.as_ptr(), true) }.expect("decode");
        assert_eq!(back, vec!["topic".to_string(), "type".to_string()]);

        let chars = transcoder
            .wchar_sequence_to_buffer(&mut ledger, &['x', 'y'])
            .expect("encode");
        assert_eq!(chars.len(), 4 + 2 * 2);
        // SAFETY: buf is a live UTF-16 char sequence.
        let back = unsafe { transcoder.buffer_to_wchar_sequence(chars.as_ptr()) }.expect("decode");
        assert_eq!(back, vec!['x', 'y']);
    }
}
