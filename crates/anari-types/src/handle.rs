//! The opaque, type-tagged handle family (§3, §4.3).
//!
//! A [`Handle<K>`] is a thin, `Copy` wrapper around the raw wire handle
//! (`anari_sys::AnariObject`) plus a zero-sized phantom marker fixing its
//! [`ObjectKind`] at the Rust type level. The handle manager in `anari-core`
//! stores the untyped [`RawHandle`] in its table; the typed wrapper exists
//! so that, for example, a function expecting a `Handle<Camera>` cannot be
//! called with the handle of a `Material` without an explicit (and
//! KindMismatch-checked) conversion.

use crate::kind::ObjectKind;
use anari_sys::{AnariObject, ANARI_NULL};
use std::fmt;
use std::marker::PhantomData;

/// The untyped wire handle, as passed across the C ABI.
pub type RawHandle = AnariObject;

/// A marker type fixing which [`ObjectKind`] a [`Handle`] refers to.
pub trait HandleKind {
    const KIND: ObjectKind;
}

macro_rules! handle_kinds {
    ($($marker:ident => $kind:ident),* $(,)?) => {
        $(
            #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
            pub struct $marker;
            impl HandleKind for $marker {
                const KIND: ObjectKind = ObjectKind::$kind;
            }
        )*
    };
}

handle_kinds! {
    Array1D => Array1D,
    Array2D => Array2D,
    Array3D => Array3D,
    Camera => Camera,
    Frame => Frame,
    Geometry => Geometry,
    Group => Group,
    Instance => Instance,
    Light => Light,
    Material => Material,
    Renderer => Renderer,
    Sampler => Sampler,
    SpatialField => SpatialField,
    Surface => Surface,
    Volume => Volume,
    World => World,
}

/// Marker for a handle of backend-extension kind, created via `newObject`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Extension;
impl HandleKind for Extension {
    const KIND: ObjectKind = ObjectKind::Extension;
}

/// An opaque, comparable, nullable, type-tagged reference to an object of
/// kind `K` (§3's "Object"). The null handle (`Handle::null()`) is never
/// refcounted; retaining or releasing it is always a no-op.
pub struct Handle<K> {
    raw: RawHandle,
    _kind: PhantomData<K>,
}

impl<K> Handle<K> {
    /// Wraps a raw wire handle. Does not check that `raw` actually refers
    /// to an object of kind `K`; that check happens in the handle manager,
    /// which is the only component with the table to check against.
    pub fn from_raw(raw: RawHandle) -> Self {
        Handle {
            raw,
            _kind: PhantomData,
        }
    }

    pub fn raw(self) -> RawHandle {
        self.raw
    }

    pub const fn null() -> Self {
        Handle {
            raw: ANARI_NULL,
            _kind: PhantomData,
        }
    }

    pub fn is_null(self) -> bool {
        self.raw == ANARI_NULL
    }
}

impl<K: HandleKind> Handle<K> {
    pub fn kind(self) -> ObjectKind {
        K::KIND
    }
}

// Manual impls: `#[derive]` would otherwise require `K: Copy`/`K: Eq` etc,
// which the zero-sized marker types happen to satisfy but shouldn't need to
// for a handle to be copyable.
impl<K> Copy for Handle<K> {}
impl<K> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}
impl<K> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}
impl<K> Eq for Handle<K> {}
impl<K> std::hash::Hash for Handle<K> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}
impl<K> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({:#x})", self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handle_is_zero() {
        let h: Handle<Camera> = Handle::null();
        assert!(h.is_null());
        assert_eq!(h.raw(), 0);
    }

    #[test]
    fn kind_marker_fixes_object_kind() {
        let h: Handle<World> = Handle::from_raw(42);
        assert_eq!(h.kind(), ObjectKind::World);
    }

    #[test]
    fn equality_is_by_raw_value() {
        let a: Handle<Geometry> = Handle::from_raw(7);
        let b: Handle<Geometry> = Handle::from_raw(7);
        let c: Handle<Geometry> = Handle::from_raw(8);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
