//! The two environment variables this crate reads itself, at debug device
//! construction (§6.1), mirroring `anari-core::config`'s centralization of
//! `std::env::var` access for the variables that belong to this crate.

use std::env;
use std::path::PathBuf;

pub fn trace_dir() -> Option<PathBuf> {
    env::var_os("ANARI_DEBUG_TRACE_DIR").map(PathBuf::from)
}

pub fn print_backtrace() -> bool {
    env::var("ANARI_DEBUG_PRINT_BACKTRACE")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .map(|v| v != 0)
        .unwrap_or(false)
}
