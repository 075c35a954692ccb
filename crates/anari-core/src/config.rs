//! Centralized environment variable access (§6.1).
//!
//! Three variables are read from points scattered across the loader and
//! the debug layer, so they're centralized here instead of scattering
//! `std::env::var` calls through the rest of the crate.

use std::env;
use std::path::PathBuf;

/// Resolves the literal library name `"environment"` to the value of
/// `ANARI_LIBRARY` (§4.2's name resolution rule).
pub fn library_name_from_environment() -> Option<String> {
    env::var("ANARI_LIBRARY").ok()
}

/// Directory prefix for the debug layer's trace output (§6.1, §6.4).
/// `None` disables tracing.
pub fn debug_trace_dir() -> Option<PathBuf> {
    env::var_os("ANARI_DEBUG_TRACE_DIR").map(PathBuf::from)
}

/// Whether per-call backtraces should be captured in the debug trace
/// (§6.1, SPEC_FULL's backtrace supplement). Non-zero enables it.
pub fn debug_print_backtrace() -> bool {
    env::var("ANARI_DEBUG_PRINT_BACKTRACE")
        .ok()
        .and_then(|v| v.parse::<i64>().ok())
        .map(|v| v != 0)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variable tests must not run concurrently with each other
    // (std::env is process-global), hence the shared lock.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn backtrace_flag_defaults_to_false() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::remove_var("ANARI_DEBUG_PRINT_BACKTRACE");
        assert!(!debug_print_backtrace());
    }

    #[test]
    fn backtrace_flag_is_nonzero_sensitive() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("ANARI_DEBUG_PRINT_BACKTRACE", "1");
        assert!(debug_print_backtrace());
        env::set_var("ANARI_DEBUG_PRINT_BACKTRACE", "0");
        assert!(!debug_print_backtrace());
        env::remove_var("ANARI_DEBUG_PRINT_BACKTRACE");
    }

    #[test]
    fn library_name_reads_anari_library() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("ANARI_LIBRARY", "helide");
        assert_eq!(library_name_from_environment().as_deref(), Some("helide"));
        env::remove_var("ANARI_LIBRARY");
    }
}
