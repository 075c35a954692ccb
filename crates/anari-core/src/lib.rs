//! The runtime: dynamic backend loading, the handle manager, parameter
//! staging, the array subsystem, and the frame pipeline (§4).
//!
//! A client goes through [`Library::load`] to find a backend, then
//! [`Device::new`] to get a handle to the operation surface in [`device`].
//! Everything below that is plumbing [`Device`] composes rather than
//! exposes directly.

pub mod array;
pub mod config;
#[cfg(feature = "dlopen2")]
pub mod dynamic;
pub mod error;
pub mod frame;
pub mod handle_table;
pub mod library;
pub mod status;

pub mod device;

pub use device::Device;
pub use error::LoadError;
pub use frame::FrameState;
pub use library::Library;
pub use status::{default_status_callback, StatusCallback};
