//! Error codes and status severities (§7).

pub use anari_sys::AnariStatusSeverity as StatusSeverity;
use log::Level;
use thiserror::Error;

/// The closed set of error kinds the runtime reports through the status
/// callback (§7). None of these are Rust `panic!`s or process aborts; they
/// are data delivered to whatever the caller registered.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Error)]
pub enum ErrorCode {
    #[error("library file missing, a required entry point is absent, or the ABI version is unsupported")]
    LoadError,
    #[error("a required handle argument was null")]
    NullHandle,
    #[error("a required string argument was null")]
    NullString,
    #[error("handle used where a different object kind was required, or across devices")]
    KindMismatch,
    #[error("value type supplied to setParameter disagrees with the declared parameter type")]
    TypeMismatch,
    #[error("use of a handle whose reference count has already reached zero")]
    DeadHandle,
    #[error("destroy/map of a resource that is mapped or in use by an in-flight frame")]
    BusyResource,
    #[error("operation not permitted in the object's or frame's current state")]
    StateViolation,
    #[error("the backend reported a fatal condition during commit or render")]
    BackendFailure,
    #[error("allocation failure")]
    OutOfMemory,
}

/// Maps a [`StatusSeverity`] to the `log` level the runtime mirrors status
/// callback invocations to (see SPEC_FULL's Logging module).
pub fn severity_to_log_level(severity: StatusSeverity) -> Level {
    match severity {
        StatusSeverity::Info => Level::Info,
        StatusSeverity::Warning | StatusSeverity::PerformanceWarning => Level::Warn,
        StatusSeverity::Error | StatusSeverity::FatalError => Level::Error,
    }
}

/// One status callback invocation, decoupled from the raw C-ABI argument
/// list so that in-process code (the debug layer, tests) can construct and
/// inspect these without going through `extern "C"` marshalling.
#[derive(Debug, Clone)]
pub struct StatusReport {
    pub severity: StatusSeverity,
    pub code: ErrorCode,
    pub message: String,
}

impl StatusReport {
    pub fn new(severity: StatusSeverity, code: ErrorCode, message: impl Into<String>) -> Self {
        StatusReport {
            severity,
            code,
            message: message.into(),
        }
    }
}
