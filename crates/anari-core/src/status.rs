//! Status callback plumbing (§7). Every fallible runtime operation that
//! isn't `Library::load` itself reports through here rather than
//! returning a `Result` to the caller, per §7's "object constructors never
//! propagate exceptions to the client."

use anari_types::{severity_to_log_level, ErrorCode, StatusReport, StatusSeverity};
use log::log;
use std::sync::Arc;

pub type StatusCallback = Arc<dyn Fn(StatusReport) + Send + Sync>;

/// Installed when a device is constructed without an explicit callback
/// (§9's original-source supplement: `anariNewDevice` installs a default
/// "print to stderr" callback when none is supplied).
pub fn default_status_callback() -> StatusCallback {
    Arc::new(|report: StatusReport| {
        eprintln!("[{:?}] {:?}: {}", report.severity, report.code, report.message);
    })
}

/// Delivers `report` to `callback` and mirrors it to the `log` facade at a
/// level derived from its severity, so a consumer gets useful output even
/// before wiring up a concrete logger (SPEC_FULL's Logging module).
pub fn report(callback: &StatusCallback, report: StatusReport) {
    let level = severity_to_log_level(report.severity);
    log!(level, "{:?}: {}", report.code, report.message);
    callback(report);
}

pub fn report_error(callback: &StatusCallback, code: ErrorCode, message: impl Into<String>) {
    report(callback, StatusReport::new(StatusSeverity::Error, code, message));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[test]
    fn callback_is_invoked_with_the_report() {
        static CALLED: AtomicBool = AtomicBool::new(false);
        let cb: StatusCallback = Arc::new(|r: StatusReport| {
            assert_eq!(r.code, ErrorCode::NullHandle);
            CALLED.store(true, Ordering::SeqCst);
        });
        report_error(&cb, ErrorCode::NullHandle, "handle was null");
        assert!(CALLED.load(Ordering::SeqCst));
    }
}
