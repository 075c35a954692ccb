#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
//! Hand-maintained, C-ABI-compatible types for the rendering abstraction
//! runtime described by the core spec.
//!
//! Unlike a bindgen-generated `*-sys` crate this one has no vendored C
//! headers to bind against -- the backend ABI is small and fixed, so it is
//! maintained by hand in the shape a bindgen pass over `anari.h` would
//! produce: opaque pointer typedefs,
//! `repr(C)` structs with the exact field layout the wire format needs, and
//! a flat `repr(i32)` enum for data types.
//!
//! You should not need this crate directly unless you are writing a backend
//! plugin (see `anari-backend`) or the runtime itself (`anari-core`).
use std::os::raw::{c_char, c_int, c_void};

/// Opaque handle to a loaded backend module, as seen across the C ABI.
///
/// Layout-compatible with a `void*`. The Rust-side wrapper with reference
/// counting and type safety lives in `anari-core::Library`.
pub type AnariLibrary = *mut c_void;

/// Opaque handle to a device, as seen across the C ABI.
pub type AnariDevice = *mut c_void;

/// Opaque handle to any non-library, non-device object, as seen across the
/// C ABI. The runtime never dereferences this directly; it is an index into
/// the handle manager's table (see `anari-core::handle`).
pub type AnariObject = u64;

/// The null object handle. `anari-core` treats this as never refcounted,
/// per §3's lifecycle invariants.
pub const ANARI_NULL: AnariObject = 0;

/// Severity of a status callback invocation (§7).
#[repr(i32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum AnariStatusSeverity {
    FatalError = 0,
    Error = 1,
    Warning = 2,
    PerformanceWarning = 3,
    Info = 4,
}

/// Status callback signature a device accepts at construction time (§4.2,
/// §7). `source` is the object the message concerns (or the null handle),
/// `source_type` identifies what kind of object that is, `code` is a
/// backend-defined integer, and `message` is a NUL-terminated string valid
/// only for the duration of the call.
pub type AnariStatusCallback = Option<
    extern "C" fn(
        user_data: *mut c_void,
        device: AnariDevice,
        source: AnariObject,
        source_type: c_int,
        severity: AnariStatusSeverity,
        code: c_int,
        message: *const c_char,
    ),
>;

/// The full, closed enumeration of transportable value kinds (§3's Data
/// Type). Numeric values are stable, wire-visible metadata: code outside
/// `anari-types::registry` must never hard-code one of these as a bare
/// integer literal.
#[repr(i32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnariDataType {
    Unknown = 0,

    Int8 = 100,
    Uint8 = 101,
    Int16 = 102,
    Uint16 = 103,
    Int32 = 104,
    Uint32 = 105,
    Int64 = 106,
    Uint64 = 107,

    Int8Vec2 = 110,
    Uint8Vec2 = 111,
    Int16Vec2 = 112,
    Uint16Vec2 = 113,
    Int32Vec2 = 114,
    Uint32Vec2 = 115,
    Int64Vec2 = 116,
    Uint64Vec2 = 117,

    Int8Vec3 = 120,
    Uint8Vec3 = 121,
    Int16Vec3 = 122,
    Uint16Vec3 = 123,
    Int32Vec3 = 124,
    Uint32Vec3 = 125,
    Int64Vec3 = 126,
    Uint64Vec3 = 127,

    Int8Vec4 = 130,
    Uint8Vec4 = 131,
    Int16Vec4 = 132,
    Uint16Vec4 = 133,
    Int32Vec4 = 134,
    Uint32Vec4 = 135,
    Int64Vec4 = 136,
    Uint64Vec4 = 137,

    Float32 = 200,
    Float32Vec2 = 201,
    Float32Vec3 = 202,
    Float32Vec4 = 203,
    Float64 = 210,
    Float64Vec2 = 211,
    Float64Vec3 = 212,
    Float64Vec4 = 213,

    Float32Mat2 = 220,
    Float32Mat3 = 221,
    Float32Mat2x3 = 222,
    Float32Mat3x4 = 223,
    Float32Mat4 = 224,

    Int32Box1 = 300,
    Int32Box2 = 301,
    Int32Box3 = 302,
    Int32Box4 = 303,
    Float32Box1 = 310,
    Float32Box2 = 311,
    Float32Box3 = 312,
    Float32Box4 = 313,

    String = 400,
    Voidptr = 410,
    Bool32 = 420,

    Object = 500,
    Array = 501,
    Array1d = 502,
    Array2d = 503,
    Array3d = 504,
    Camera = 505,
    Frame = 506,
    Geometry = 507,
    Group = 508,
    Instance = 509,
    Light = 510,
    Material = 511,
    Renderer = 512,
    Sampler = 513,
    SpatialField = 514,
    Surface = 515,
    Volume = 516,
    World = 517,
}

/// A single `(name, type, value)` parameter on the C-ABI wire, analogous to
/// `NSIParam_t`. `data` points at `size_of(type) * count` bytes (or, for
/// `String`, a NUL-terminated string; for object handle types, a packed
/// `AnariObject` array).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct AnariParam {
    pub name: *const c_char,
    pub data: *const c_void,
    pub type_: AnariDataType,
    pub count: usize,
}

// SAFETY: AnariParam is a POD struct of raw pointers dereferenced only by
// the backend on the thread that issued the call carrying it.
unsafe impl Send for AnariParam {}
unsafe impl Sync for AnariParam {}

bitflags::bitflags! {
    /// `waitMask` argument to `frameReady`/`getProperty` (§4.7, §6.2).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct AnariWaitMask: c_int {
        const NO_WAIT = 0;
        const WAIT = 1;
    }
}

/// Deleter invoked exactly once when an array with app-supplied memory is
/// destroyed (§3, §4.4). `app_memory` and `user_data` are passed back
/// unchanged from the call to `newArray*D` that registered the deleter.
pub type AnariMemoryDeleter =
    Option<extern "C" fn(user_data: *mut c_void, app_memory: *const c_void)>;

/// Frame completion callback (§4.7's `newFrame` optional argument).
pub type AnariFrameCompletionCallback =
    Option<extern "C" fn(user_data: *mut c_void, device: AnariDevice, frame: AnariObject)>;

/// Builds the mangled entry point name `anari_library_<name>_<verb>` the
/// dynamic loader resolves from a backend shared object (§4.2).
pub fn mangled_entry_point(library_name: &str, verb: &str) -> String {
    format!("anari_library_{library_name}_{verb}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mangled_name_matches_spec_shape() {
        assert_eq!(
            mangled_entry_point("helide", "create"),
            "anari_library_helide_create"
        );
    }

    #[test]
    fn null_object_is_zero() {
        assert_eq!(ANARI_NULL, 0);
    }

    #[test]
    fn wait_mask_bits_are_distinct() {
        assert_ne!(
            AnariWaitMask::NO_WAIT.bits(),
            AnariWaitMask::WAIT.bits()
        );
    }

    #[test]
    fn data_type_discriminants_are_stable() {
        // Pin a handful of discriminants: the enum is stable wire metadata
        // and accidental reordering here would be a breaking change.
        assert_eq!(AnariDataType::Float32 as i32, 200);
        assert_eq!(AnariDataType::Float32Mat4 as i32, 224);
        assert_eq!(AnariDataType::World as i32, 517);
    }
}
