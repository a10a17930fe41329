// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Logging initialization for the marshal C FFI
//!
//! A plain level applies to the marshal crates only (`hdds_marshal*`
//! targets). Everything else linked into the host process stays at `warn`
//! or quieter, so raising marshal tracing does not flood the log with
//! unrelated crates.

use std::ffi::CStr;
use std::os::raw::c_char;

use log::LevelFilter;

use super::HddsMarshalError;

/// Target prefix shared by `hdds_marshal` and `hdds_marshal_c` records.
const MARSHAL_TARGET: &str = "hdds_marshal";

/// Log level for marshal logging
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HddsMarshalLogLevel {
    HddsMarshalLogOff = 0,
    HddsMarshalLogError = 1,
    HddsMarshalLogWarn = 2,
    HddsMarshalLogInfo = 3,
    HddsMarshalLogDebug = 4,
    HddsMarshalLogTrace = 5,
}

impl From<HddsMarshalLogLevel> for LevelFilter {
    fn from(level: HddsMarshalLogLevel) -> Self {
        match level {
            HddsMarshalLogLevel::HddsMarshalLogOff => LevelFilter::Off,
            HddsMarshalLogLevel::HddsMarshalLogError => LevelFilter::Error,
            HddsMarshalLogLevel::HddsMarshalLogWarn => LevelFilter::Warn,
            HddsMarshalLogLevel::HddsMarshalLogInfo => LevelFilter::Info,
            HddsMarshalLogLevel::HddsMarshalLogDebug => LevelFilter::Debug,
            HddsMarshalLogLevel::HddsMarshalLogTrace => LevelFilter::Trace,
        }
    }
}

/// Filter directives enabling `level` for marshal targets and at most
/// `warn` for the rest.
fn marshal_filters(level: LevelFilter) -> String {
    let others = level.min(LevelFilter::Warn);
    format!(
        "{},{}={}",
        others.as_str().to_ascii_lowercase(),
        MARSHAL_TARGET,
        level.as_str().to_ascii_lowercase()
    )
}

/// Expand a bare level ("debug") into marshal-scoped directives; full
/// directive strings pass through untouched.
fn expand_filter(spec: &str) -> String {
    match spec.trim().parse::<LevelFilter>() {
        Ok(level) => marshal_filters(level),
        Err(_) => spec.to_string(),
    }
}

fn builder(filters: &str) -> env_logger::Builder {
    let mut builder = env_logger::Builder::new();
    builder.parse_filters(filters).format_timestamp_millis();
    builder
}

fn init_result(result: Result<(), log::SetLoggerError>) -> HddsMarshalError {
    match result {
        Ok(()) => HddsMarshalError::HddsMarshalOk,
        // Already initialized
        Err(_) => HddsMarshalError::HddsMarshalOperationFailed,
    }
}

/// Initialize console logging for the marshal crates at `level`
///
/// # Safety
/// Must be called from a single thread during initialization.
///
/// # Returns
/// `HddsMarshalOk` on success, `HddsMarshalOperationFailed` if a logger is
/// already installed
///
/// # Example (C)
/// ```c
/// hdds_marshal_logging_init(HDDS_MARSHAL_LOG_DEBUG);
/// ```
#[no_mangle]
pub unsafe extern "C" fn hdds_marshal_logging_init(
    level: HddsMarshalLogLevel,
) -> HddsMarshalError {
    init_result(builder(&marshal_filters(level.into())).try_init())
}

/// Initialize logging from `RUST_LOG`, falling back to marshal-scoped
/// `default_level` when it is unset
///
/// # Safety
/// Must be called from a single thread during initialization.
#[no_mangle]
pub unsafe extern "C" fn hdds_marshal_logging_init_env(
    default_level: HddsMarshalLogLevel,
) -> HddsMarshalError {
    let fallback = marshal_filters(default_level.into());
    init_result(
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(fallback))
            .format_timestamp_millis()
            .try_init(),
    )
}

/// Initialize logging with a filter string such as
/// `"hdds_marshal::ledger=trace,warn"`, or a bare level that applies to the
/// marshal crates only
///
/// # Safety
/// - `filter` must be a valid null-terminated C string or NULL.
#[no_mangle]
pub unsafe extern "C" fn hdds_marshal_logging_init_with_filter(
    filter: *const c_char,
) -> HddsMarshalError {
    if filter.is_null() {
        return HddsMarshalError::HddsMarshalInvalidArgument;
    }

    let Ok(filter_str) = CStr::from_ptr(filter).to_str() else {
        return HddsMarshalError::HddsMarshalInvalidArgument;
    };

    init_result(builder(&expand_filter(filter_str)).try_init())
}
