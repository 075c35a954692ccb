//! The debug/validation passthrough layer (§4.8): a `BackendDevice` that
//! wraps another `BackendDevice` and forwards every operation, adding
//! stable handle naming, a replayable trace, leak detection, commit
//! diffing, and `[VALIDATION]`-prefixed status mirroring. Since it obeys
//! the same `Backend`/`BackendDevice` contract it wraps, it stacks.
//!
//! Plug it in at `Library` construction time: wrap the loaded backend's
//! `Arc<dyn Backend>` with [`DebugBackend::wrap`] before devices are
//! created from it.

mod config;
mod device;
mod names;
mod trace;

pub use device::{DebugBackend, DebugDevice};

use anari_types::StatusSeverity;
use log::Level;

fn validation_log_level(severity: StatusSeverity) -> Level {
    anari_types::severity_to_log_level(severity)
}
