//! The tagged union backing staged and committed parameter maps (§3, §9's
//! "Dynamic typing of parameters" design note): small-buffer optimization
//! for values up to 48 bytes (the size of a 3×4 float matrix), heap
//! allocation above that, and a dedicated, refcount-participating slot for
//! handle-typed values.

use crate::handle::RawHandle;
use crate::registry::{self, DataType};
use anari_sys::ANARI_NULL;
use std::collections::HashMap;
use std::ffi::CString;
use ustr::Ustr;

/// Values this size or smaller are stored inline rather than heap-allocated.
/// Matches the largest non-object fixed-size type, `Float32Mat3x4` (48
/// bytes); `Float32Mat4` (64 bytes) is one size class above and spills to
/// the heap.
pub const INLINE_CAPACITY: usize = 48;

/// One staged or committed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    /// A small, trivially copyable value (scalars, vectors, small matrices,
    /// boxes) stored without allocation.
    Inline {
        ty: DataType,
        len: u8,
        bytes: [u8; INLINE_CAPACITY],
    },
    /// A larger trivially copyable value (`Float32Mat4` and similar).
    Heap { ty: DataType, bytes: Box<[u8]> },
    /// A reference to another object. Retained while staged or committed;
    /// released when unset, overwritten, or the owner is destroyed (§3).
    Handle { ty: DataType, handle: RawHandle },
    /// An owned, NUL-terminated string (`ANARI_STRING`).
    Str(CString),
}

impl ParamValue {
    /// Builds an inline-or-heap value from a raw byte slice of a
    /// non-object, non-string `ty`. Panics if `ty` denotes an object handle
    /// or string; use [`ParamValue::handle`] / [`ParamValue::string`] for
    /// those.
    pub fn from_bytes(ty: DataType, bytes: &[u8]) -> Self {
        assert!(
            !registry::is_object(ty) && ty != DataType::String,
            "ParamValue::from_bytes called with an object or string type"
        );
        if bytes.len() <= INLINE_CAPACITY {
            let mut buf = [0u8; INLINE_CAPACITY];
            buf[..bytes.len()].copy_from_slice(bytes);
            ParamValue::Inline {
                ty,
                len: bytes.len() as u8,
                bytes: buf,
            }
        } else {
            ParamValue::Heap {
                ty,
                bytes: bytes.to_vec().into_boxed_slice(),
            }
        }
    }

    pub fn handle(ty: DataType, handle: RawHandle) -> Self {
        debug_assert!(registry::is_object(ty));
        ParamValue::Handle { ty, handle }
    }

    pub fn string(value: CString) -> Self {
        ParamValue::Str(value)
    }

    pub fn data_type(&self) -> DataType {
        match self {
            ParamValue::Inline { ty, .. } => *ty,
            ParamValue::Heap { ty, .. } => *ty,
            ParamValue::Handle { ty, .. } => *ty,
            ParamValue::Str(_) => DataType::String,
        }
    }

    /// The raw bytes of a non-handle, non-string value. Empty for
    /// [`ParamValue::Handle`] and [`ParamValue::Str`].
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            ParamValue::Inline { len, bytes, .. } => &bytes[..*len as usize],
            ParamValue::Heap { bytes, .. } => bytes,
            ParamValue::Handle { .. } | ParamValue::Str(_) => &[],
        }
    }

    /// The referenced object, if this value is a non-null handle.
    pub fn referenced_handle(&self) -> Option<RawHandle> {
        match self {
            ParamValue::Handle { handle, .. } if *handle != ANARI_NULL => Some(*handle),
            _ => None,
        }
    }
}

/// A staged or committed parameter map, keyed by interned parameter name.
pub type ParamMap = HashMap<Ustr, ParamValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_value_is_inline() {
        let v = ParamValue::from_bytes(DataType::Float32Vec3, &[0u8; 12]);
        assert!(matches!(v, ParamValue::Inline { .. }));
        assert_eq!(v.as_bytes().len(), 12);
    }

    #[test]
    fn mat4_spills_to_heap() {
        let v = ParamValue::from_bytes(DataType::Float32Mat4, &[0u8; 64]);
        assert!(matches!(v, ParamValue::Heap { .. }));
        assert_eq!(v.as_bytes().len(), 64);
    }

    #[test]
    fn mat3x4_is_exactly_at_the_inline_boundary() {
        let v = ParamValue::from_bytes(DataType::Float32Mat3x4, &[0u8; 48]);
        assert!(matches!(v, ParamValue::Inline { .. }));
    }

    #[test]
    fn null_handle_is_not_a_reference() {
        let v = ParamValue::handle(DataType::Camera, ANARI_NULL);
        assert_eq!(v.referenced_handle(), None);
    }

    #[test]
    fn non_null_handle_is_a_reference() {
        let v = ParamValue::handle(DataType::Camera, 7);
        assert_eq!(v.referenced_handle(), Some(7));
    }
}
