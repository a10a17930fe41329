// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Transcoder configuration.
//!
//! Supports both programmatic and file-based (TOML) configuration:
//!
//! ```toml
//! wide_char_width = 2
//! capacity_hint = 64
//! max_sequence_len = 1048576
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Width of one wide-character code unit on the native side.
///
/// Resolved once per target and passed explicitly to every string and
/// wide-character operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum WideCharWidth {
    /// 2-byte UTF-16 code units (Windows family).
    Utf16,
    /// 4-byte UTF-32 code points (everything else).
    Utf32,
}

impl WideCharWidth {
    /// Width used by the native `wchar_t` of the build target.
    pub const fn native() -> Self {
        if cfg!(windows) {
            WideCharWidth::Utf16
        } else {
            WideCharWidth::Utf32
        }
    }

    /// Size of one code unit in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            WideCharWidth::Utf16 => 2,
            WideCharWidth::Utf32 => 4,
        }
    }
}

impl Default for WideCharWidth {
    fn default() -> Self {
        Self::native()
    }
}

impl TryFrom<u8> for WideCharWidth {
    type Error = ConfigError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            2 => Ok(WideCharWidth::Utf16),
            4 => Ok(WideCharWidth::Utf32),
            other => Err(ConfigError::Invalid(format!(
                "wide_char_width must be 2 or 4, got {}",
                other
            ))),
        }
    }
}

impl From<WideCharWidth> for u8 {
    fn from(width: WideCharWidth) -> Self {
        width.bytes() as u8
    }
}

impl fmt::Display for WideCharWidth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-byte", self.bytes())
    }
}

/// Largest count representable in the `int32` sequence prefix.
pub const MAX_SEQUENCE_LEN: usize = i32::MAX as usize;

/// Transcoder configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MarshalConfig {
    /// Wide-character unit width (2 or 4 bytes).
    #[serde(default)]
    pub wide_char_width: WideCharWidth,

    /// Initial capacity of freshly created decode targets.
    #[serde(default)]
    pub capacity_hint: usize,

    /// Upper bound on element counts accepted while encoding or decoding.
    #[serde(default = "default_max_sequence_len")]
    pub max_sequence_len: usize,
}

fn default_max_sequence_len() -> usize {
    MAX_SEQUENCE_LEN
}

impl Default for MarshalConfig {
    fn default() -> Self {
        Self {
            wide_char_width: WideCharWidth::native(),
            capacity_hint: 0,
            max_sequence_len: MAX_SEQUENCE_LEN,
        }
    }
}

impl MarshalConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        log::debug!(
            "[config] loaded {} (wide={}, capacity_hint={}, max_len={})",
            path.display(),
            config.wide_char_width,
            config.capacity_hint,
            config.max_sequence_len
        );
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_sequence_len > MAX_SEQUENCE_LEN {
            return Err(ConfigError::Invalid(format!(
                "max_sequence_len {} exceeds the int32 count prefix ({})",
                self.max_sequence_len, MAX_SEQUENCE_LEN
            )));
        }
        if self.capacity_hint > self.max_sequence_len {
            return Err(ConfigError::Invalid(format!(
                "capacity_hint {} exceeds max_sequence_len {}",
                self.capacity_hint, self.max_sequence_len
            )));
        }
        Ok(())
    }

    /// Set the wide-character width.
    pub fn wide_char_width(mut self, width: WideCharWidth) -> Self {
        self.wide_char_width = width;
        self
    }

    /// Set the decode capacity hint.
    pub fn capacity_hint(mut self, hint: usize) -> Self {
        self.capacity_hint = hint;
        self
    }

    /// Set the element count bound.
    pub fn max_sequence_len(mut self, limit: usize) -> Self {
        self.max_sequence_len = limit;
        self
    }
}
