// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Huang Rui <vowstar@gmail.com>

//! Bracket-tag logging helpers.
//!
//! The reader's `[LOAD]`/`[PASS]`/`[WARN]`/`[FAIL]` convention carries over
//! here as a small set of macros over the `log` crate, so pipeline stages
//! read the same way the DEF/LEF readers do.

/// Initialize the global logger. Call once from `main`.
pub fn init() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

macro_rules! log_tag {
    ($level:ident, $tag:literal, $($arg:tt)*) => {
        log::$level!(concat!("[", $tag, "] {}"), format_args!($($arg)*));
    };
}

macro_rules! log_load {
    ($($arg:tt)*) => { $crate::logging::log_tag!(info, "LOAD", $($arg)*) };
}
macro_rules! log_pass {
    ($($arg:tt)*) => { $crate::logging::log_tag!(info, "PASS", $($arg)*) };
}
macro_rules! log_info {
    ($($arg:tt)*) => { $crate::logging::log_tag!(info, "INFO", $($arg)*) };
}
macro_rules! log_warn {
    ($($arg:tt)*) => { $crate::logging::log_tag!(warn, "WARN", $($arg)*) };
}
macro_rules! log_fail {
    ($($arg:tt)*) => { $crate::logging::log_tag!(error, "FAIL", $($arg)*) };
}

pub(crate) use log_tag;
pub(crate) use {log_fail, log_info, log_load, log_pass, log_warn};
