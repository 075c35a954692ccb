//! The contract a backend implements (§4.5, §4.6, §4.7, §6.3).
//!
//! [`Backend`] is the library-level façade — the thing a loaded shared
//! object (or an in-process [`crate::linked`] registration) hands back:
//! introspection plus a device factory. [`BackendDevice`] is the
//! per-device operation table, the "device façade"; the
//! front-end runtime (`anari-core`) owns object identity, reference
//! counting, and parameter staging, and only calls into a `BackendDevice`
//! for the handful of operations that are genuinely backend-specific:
//! construction/destruction side effects, commit-time work, introspection,
//! and frame rendering.

use anari_types::{DataType, ExtensionSet, ObjectKind, ParamMap, ParamValue, RawHandle, StatusReport};
use std::sync::Arc;
use thiserror::Error;

/// Delivered to a status callback registered on a device. Shared,
/// `Send + Sync` so a backend can stash it and report asynchronously (e.g.
/// from a render thread).
pub type StatusSink = Arc<dyn Fn(StatusReport) + Send + Sync>;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("device subtype {0:?} is not implemented by this backend")]
    UnknownDeviceSubtype(String),
    #[error("object subtype {0:?} is not implemented for this kind")]
    UnknownObjectSubtype(String),
    #[error("backend reported a fatal condition: {0}")]
    Fatal(String),
}

/// Static metadata for one named parameter of an (object kind, subtype)
/// pair (§4.6): the full six-field set `parameterInfo` can report for a
/// parameter, not just name/type/description/required.
#[derive(Debug, Clone)]
pub struct ParameterDescriptor {
    pub name: &'static str,
    pub data_type: DataType,
    pub description: &'static str,
    pub required: bool,
    /// The value the object behaves as though it had if the parameter is
    /// never set.
    pub default_value: Option<ParamValue>,
    /// The closed set of values the backend accepts, if it enforces one
    /// (e.g. a `"filter"` sampler's wrap mode).
    pub allowed_values: Vec<ParamValue>,
    /// Inclusive bounds for a numeric parameter.
    pub min: Option<ParamValue>,
    pub max: Option<ParamValue>,
    /// A unit string for a numeric parameter (e.g. `"degrees"`), if the
    /// backend reports one.
    pub units: Option<&'static str>,
}

/// A property query result (§6.2's `getProperty`). `bounds` on worlds and
/// groups, returning six `f32`s, is the canonical example.
#[derive(Debug, Clone)]
pub struct PropertyValue {
    pub data_type: DataType,
    pub bytes: Vec<u8>,
}

/// One mapped frame channel (§4.7's `mapFrame`).
pub struct FrameChannel {
    pub ptr: *const u8,
    pub width: u32,
    pub height: u32,
    pub pixel_type: DataType,
}

// SAFETY: the pointer is owned by the backend for the duration described
// in §4.7 (valid until the matching unmapFrame) and is never written
// through by the runtime.
unsafe impl Send for FrameChannel {}

/// The library-level façade a backend hands back from its constructor
/// entry point (§6.3).
pub trait Backend: Send + Sync {
    /// Device subtypes this backend can instantiate (§4.2's
    /// `deviceSubtypes`).
    fn device_subtypes(&self) -> Vec<&'static str>;

    /// Object subtypes of `kind` available under `device_subtype` (§4.2's
    /// `objectSubtypes`).
    fn object_subtypes(&self, device_subtype: &str, kind: ObjectKind) -> Vec<&'static str>;

    /// Parameter descriptors for one (device subtype, object subtype, kind)
    /// triple (§4.2's `parameterInfo`, §4.6).
    fn parameter_descriptors(
        &self,
        device_subtype: &str,
        object_subtype: &str,
        kind: ObjectKind,
    ) -> Vec<ParameterDescriptor>;

    /// Per-device extension list, by subtype (§4.6).
    fn device_extensions(&self, device_subtype: &str) -> ExtensionSet;

    /// Instantiates a device of `subtype`, wiring up `status` for
    /// asynchronous reporting (§4.2's `newDevice`).
    fn new_device(
        &self,
        subtype: &str,
        status: StatusSink,
    ) -> Result<Box<dyn BackendDevice>, BackendError>;
}

/// The per-device operation table (§4.5). All handles passed in are
/// already validated (live, correct kind, correct device) by the front-end
/// before the call reaches here.
pub trait BackendDevice: Send + Sync {
    /// Allocates whatever backend-side state a newly created object of
    /// `kind`/`subtype` needs. Called once, at creation, before any
    /// parameter is staged.
    fn create_object(
        &self,
        handle: RawHandle,
        kind: ObjectKind,
        subtype: &str,
    ) -> Result<(), BackendError>;

    /// `newObject(kind, subtype)` (§4.5): creates an object of a
    /// backend-defined kind outside the core enumeration. Backends with no
    /// extension kinds can leave this at its default.
    fn create_extension_object(
        &self,
        _handle: RawHandle,
        kind_name: &str,
        _subtype: &str,
    ) -> Result<(), BackendError> {
        Err(BackendError::UnknownObjectSubtype(kind_name.to_string()))
    }

    /// Releases backend-side state. Called once the front-end's refcount
    /// for `handle` reaches zero.
    fn destroy_object(&self, handle: RawHandle);

    /// Publishes a committed parameter snapshot (§4.5's commit barrier).
    /// This, not `setParameter`, is where uploading to accelerators or
    /// compiling pipelines happens.
    fn commit_object(
        &self,
        handle: RawHandle,
        kind: ObjectKind,
        committed: &ParamMap,
    ) -> Result<(), BackendError>;

    /// Per-instance extension list for an instantiated object (§4.6).
    fn object_extensions(&self, handle: RawHandle) -> ExtensionSet;

    /// `getProperty` (§6.2). `None` means the property is unknown to the
    /// backend; a `TypeMismatch`-worthy wrong-type request is also `None`
    /// here and diagnosed by the caller against `parameter_descriptors`.
    fn get_property(&self, handle: RawHandle, name: &str, wait: bool) -> Option<PropertyValue>;

    /// Submits a frame for asynchronous rendering (§4.7). Returns promptly.
    fn render_frame(&self, frame: RawHandle);

    /// Polls or blocks on frame readiness (§4.7). `wait = true` blocks
    /// until ready; `wait = false` returns the current state immediately.
    fn frame_ready(&self, frame: RawHandle, wait: bool) -> bool;

    /// Cancels an in-flight frame (§4.7). The backend may finish anyway;
    /// either way the frame is Ready-observable afterward.
    fn discard_frame(&self, frame: RawHandle);

    /// Maps one named channel of a Ready frame for readback (§4.7).
    fn map_frame(&self, frame: RawHandle, channel: &str) -> Option<FrameChannel>;

    /// Releases a channel mapped by `map_frame`.
    fn unmap_frame(&self, frame: RawHandle, channel: &str);

    /// Resolves a backend-extension function pointer by name (§4.5's
    /// `getProcAddress`). Returned as an address; callers must know the
    /// correct signature to transmute it back to a function pointer.
    fn get_proc_address(&self, name: &str) -> Option<usize>;
}
