//! Canonical metadata for every transportable value kind (§4.1 of the
//! runtime contract this crate implements). This module is the single
//! source of truth: no other crate may hard-code a size, component count,
//! or name for a [`DataType`].

use anari_sys::AnariDataType;

pub use anari_sys::AnariDataType as DataType;

/// The scalar kind a [`DataType`] is built from.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BaseScalar {
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float32,
    Float64,
    String,
    Voidptr,
    Bool32,
    /// An object handle (any kind). See [`crate::kind::ObjectKind`] for which.
    Object,
    Unknown,
}

/// One row of the type registry: everything the runtime or a backend needs
/// to know about a [`DataType`] without special-casing it.
#[derive(Copy, Clone, Debug)]
pub struct TypeInfo {
    pub base: BaseScalar,
    pub components: u32,
    pub size_bytes: usize,
    pub is_object: bool,
    pub name: &'static str,
}

/// Declares the exhaustive type table and, from the same list, an
/// exhaustive dispatch entry point. Adding a variant to [`DataType`]
/// without adding a row here fails to compile: the `match` in
/// [`visit`] has no wildcard arm.
macro_rules! data_types {
    ($( $variant:ident => { base: $base:ident, components: $comp:expr, size: $size:expr, object: $obj:expr, name: $name:expr } ),* $(,)?) => {
        /// Returns the full metadata row for `ty`.
        pub fn info(ty: DataType) -> TypeInfo {
            match ty {
                $( AnariDataType::$variant => TypeInfo {
                    base: BaseScalar::$base,
                    components: $comp,
                    size_bytes: $size,
                    is_object: $obj,
                    name: $name,
                }, )*
            }
        }

        /// Forwards to exactly one method of `visitor`, selected by `ty`.
        /// Exhaustive over [`DataType`] for the same reason [`info`] is.
        pub fn visit<R>(ty: DataType, visitor: &mut dyn DataTypeVisitor<R>) -> R {
            match ty {
                $( AnariDataType::$variant => visitor.$variant(), )*
            }
        }

        /// One method per [`DataType`] variant, each named identically to
        /// the variant. Implement this to get a compile error whenever a
        /// new data type is added and your visitor hasn't been updated.
        pub trait DataTypeVisitor<R> {
            $( #[allow(non_snake_case)] fn $variant(&mut self) -> R; )*
        }
    };
}

data_types! {
    Unknown      => { base: Unknown, components: 0, size: 0, object: false, name: "ANARI_UNKNOWN" },

    Int8         => { base: Int8,   components: 1, size: 1, object: false, name: "ANARI_INT8" },
    Uint8        => { base: Uint8,  components: 1, size: 1, object: false, name: "ANARI_UINT8" },
    Int16        => { base: Int16,  components: 1, size: 2, object: false, name: "ANARI_INT16" },
    Uint16       => { base: Uint16, components: 1, size: 2, object: false, name: "ANARI_UINT16" },
    Int32        => { base: Int32,  components: 1, size: 4, object: false, name: "ANARI_INT32" },
    Uint32       => { base: Uint32, components: 1, size: 4, object: false, name: "ANARI_UINT32" },
    Int64        => { base: Int64,  components: 1, size: 8, object: false, name: "ANARI_INT64" },
    Uint64       => { base: Uint64, components: 1, size: 8, object: false, name: "ANARI_UINT64" },

    Int8Vec2     => { base: Int8,   components: 2, size: 2,  object: false, name: "ANARI_INT8_VEC2" },
    Uint8Vec2    => { base: Uint8,  components: 2, size: 2,  object: false, name: "ANARI_UINT8_VEC2" },
    Int16Vec2    => { base: Int16,  components: 2, size: 4,  object: false, name: "ANARI_INT16_VEC2" },
    Uint16Vec2   => { base: Uint16, components: 2, size: 4,  object: false, name: "ANARI_UINT16_VEC2" },
    Int32Vec2    => { base: Int32,  components: 2, size: 8,  object: false, name: "ANARI_INT32_VEC2" },
    Uint32Vec2   => { base: Uint32, components: 2, size: 8,  object: false, name: "ANARI_UINT32_VEC2" },
    Int64Vec2    => { base: Int64,  components: 2, size: 16, object: false, name: "ANARI_INT64_VEC2" },
    Uint64Vec2   => { base: Uint64, components: 2, size: 16, object: false, name: "ANARI_UINT64_VEC2" },

    Int8Vec3     => { base: Int8,   components: 3, size: 3,  object: false, name: "ANARI_INT8_VEC3" },
    Uint8Vec3    => { base: Uint8,  components: 3, size: 3,  object: false, name: "ANARI_UINT8_VEC3" },
    Int16Vec3    => { base: Int16,  components: 3, size: 6,  object: false, name: "ANARI_INT16_VEC3" },
    Uint16Vec3   => { base: Uint16, components: 3, size: 6,  object: false, name: "ANARI_UINT16_VEC3" },
    Int32Vec3    => { base: Int32,  components: 3, size: 12, object: false, name: "ANARI_INT32_VEC3" },
    Uint32Vec3   => { base: Uint32, components: 3, size: 12, object: false, name: "ANARI_UINT32_VEC3" },
    Int64Vec3    => { base: Int64,  components: 3, size: 24, object: false, name: "ANARI_INT64_VEC3" },
    Uint64Vec3   => { base: Uint64, components: 3, size: 24, object: false, name: "ANARI_UINT64_VEC3" },

    Int8Vec4     => { base: Int8,   components: 4, size: 4,  object: false, name: "ANARI_INT8_VEC4" },
    Uint8Vec4    => { base: Uint8,  components: 4, size: 4,  object: false, name: "ANARI_UINT8_VEC4" },
    Int16Vec4    => { base: Int16,  components: 4, size: 8,  object: false, name: "ANARI_INT16_VEC4" },
    Uint16Vec4   => { base: Uint16, components: 4, size: 8,  object: false, name: "ANARI_UINT16_VEC4" },
    Int32Vec4    => { base: Int32,  components: 4, size: 16, object: false, name: "ANARI_INT32_VEC4" },
    Uint32Vec4   => { base: Uint32, components: 4, size: 16, object: false, name: "ANARI_UINT32_VEC4" },
    Int64Vec4    => { base: Int64,  components: 4, size: 32, object: false, name: "ANARI_INT64_VEC4" },
    Uint64Vec4   => { base: Uint64, components: 4, size: 32, object: false, name: "ANARI_UINT64_VEC4" },

    Float32      => { base: Float32, components: 1, size: 4,  object: false, name: "ANARI_FLOAT32" },
    Float32Vec2  => { base: Float32, components: 2, size: 8,  object: false, name: "ANARI_FLOAT32_VEC2" },
    Float32Vec3  => { base: Float32, components: 3, size: 12, object: false, name: "ANARI_FLOAT32_VEC3" },
    Float32Vec4  => { base: Float32, components: 4, size: 16, object: false, name: "ANARI_FLOAT32_VEC4" },
    Float64      => { base: Float64, components: 1, size: 8,  object: false, name: "ANARI_FLOAT64" },
    Float64Vec2  => { base: Float64, components: 2, size: 16, object: false, name: "ANARI_FLOAT64_VEC2" },
    Float64Vec3  => { base: Float64, components: 3, size: 24, object: false, name: "ANARI_FLOAT64_VEC3" },
    Float64Vec4  => { base: Float64, components: 4, size: 32, object: false, name: "ANARI_FLOAT64_VEC4" },

    Float32Mat2   => { base: Float32, components: 4,  size: 16, object: false, name: "ANARI_FLOAT32_MAT2" },
    Float32Mat3   => { base: Float32, components: 9,  size: 36, object: false, name: "ANARI_FLOAT32_MAT3" },
    Float32Mat2x3 => { base: Float32, components: 6,  size: 24, object: false, name: "ANARI_FLOAT32_MAT2X3" },
    Float32Mat3x4 => { base: Float32, components: 12, size: 48, object: false, name: "ANARI_FLOAT32_MAT3X4" },
    Float32Mat4   => { base: Float32, components: 16, size: 64, object: false, name: "ANARI_FLOAT32_MAT4" },

    Int32Box1    => { base: Int32,   components: 2, size: 8,  object: false, name: "ANARI_INT32_BOX1" },
    Int32Box2    => { base: Int32,   components: 4, size: 16, object: false, name: "ANARI_INT32_BOX2" },
    Int32Box3    => { base: Int32,   components: 6, size: 24, object: false, name: "ANARI_INT32_BOX3" },
    Int32Box4    => { base: Int32,   components: 8, size: 32, object: false, name: "ANARI_INT32_BOX4" },
    Float32Box1  => { base: Float32, components: 2, size: 8,  object: false, name: "ANARI_FLOAT32_BOX1" },
    Float32Box2  => { base: Float32, components: 4, size: 16, object: false, name: "ANARI_FLOAT32_BOX2" },
    Float32Box3  => { base: Float32, components: 6, size: 24, object: false, name: "ANARI_FLOAT32_BOX3" },
    Float32Box4  => { base: Float32, components: 8, size: 32, object: false, name: "ANARI_FLOAT32_BOX4" },

    String       => { base: String,  components: 1, size: 0, object: false, name: "ANARI_STRING" },
    Voidptr      => { base: Voidptr, components: 1, size: 8, object: false, name: "ANARI_VOID_POINTER" },
    Bool32       => { base: Bool32,  components: 1, size: 4, object: false, name: "ANARI_BOOL" },

    Object       => { base: Object, components: 1, size: 8, object: true, name: "ANARI_OBJECT" },
    Array        => { base: Object, components: 1, size: 8, object: true, name: "ANARI_ARRAY" },
    Array1d      => { base: Object, components: 1, size: 8, object: true, name: "ANARI_ARRAY1D" },
    Array2d      => { base: Object, components: 1, size: 8, object: true, name: "ANARI_ARRAY2D" },
    Array3d      => { base: Object, components: 1, size: 8, object: true, name: "ANARI_ARRAY3D" },
    Camera       => { base: Object, components: 1, size: 8, object: true, name: "ANARI_CAMERA" },
    Frame        => { base: Object, components: 1, size: 8, object: true, name: "ANARI_FRAME" },
    Geometry     => { base: Object, components: 1, size: 8, object: true, name: "ANARI_GEOMETRY" },
    Group        => { base: Object, components: 1, size: 8, object: true, name: "ANARI_GROUP" },
    Instance     => { base: Object, components: 1, size: 8, object: true, name: "ANARI_INSTANCE" },
    Light        => { base: Object, components: 1, size: 8, object: true, name: "ANARI_LIGHT" },
    Material     => { base: Object, components: 1, size: 8, object: true, name: "ANARI_MATERIAL" },
    Renderer     => { base: Object, components: 1, size: 8, object: true, name: "ANARI_RENDERER" },
    Sampler      => { base: Object, components: 1, size: 8, object: true, name: "ANARI_SAMPLER" },
    SpatialField => { base: Object, components: 1, size: 8, object: true, name: "ANARI_SPATIAL_FIELD" },
    Surface      => { base: Object, components: 1, size: 8, object: true, name: "ANARI_SURFACE" },
    Volume       => { base: Object, components: 1, size: 8, object: true, name: "ANARI_VOLUME" },
    World        => { base: Object, components: 1, size: 8, object: true, name: "ANARI_WORLD" },
}

/// Element size in bytes. `0` for `String` and `Unknown`, whose storage is
/// not a fixed-width blob.
pub fn size_of(ty: DataType) -> usize {
    info(ty).size_bytes
}

/// Component count (e.g. `3` for `Float32Vec3`, `9` for `Float32Mat3`).
pub fn components_of(ty: DataType) -> u32 {
    info(ty).components
}

/// Whether `ty` denotes an object handle (any kind, including the generic
/// `Object`/`Array` entries).
pub fn is_object(ty: DataType) -> bool {
    info(ty).is_object
}

pub fn base_scalar_of(ty: DataType) -> BaseScalar {
    info(ty).base
}

/// The stable wire name, e.g. `"ANARI_FLOAT32_VEC3"`.
pub fn name_of(ty: DataType) -> &'static str {
    info(ty).name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float32_vec3_is_twelve_bytes() {
        let i = info(DataType::Float32Vec3);
        assert_eq!(i.size_bytes, 12);
        assert_eq!(i.components, 3);
        assert!(!i.is_object);
    }

    #[test]
    fn object_kinds_are_objects() {
        for ty in [DataType::World, DataType::Geometry, DataType::Array1d] {
            assert!(is_object(ty));
            assert_eq!(size_of(ty), 8);
        }
    }

    #[test]
    fn matrix_component_counts_match_dimensions() {
        assert_eq!(components_of(DataType::Float32Mat2), 4);
        assert_eq!(components_of(DataType::Float32Mat3), 9);
        assert_eq!(components_of(DataType::Float32Mat2x3), 6);
        assert_eq!(components_of(DataType::Float32Mat3x4), 12);
        assert_eq!(components_of(DataType::Float32Mat4), 16);
    }

    struct CountingVisitor(u32);
    impl DataTypeVisitor<u32> for CountingVisitor {
        fn Unknown(&mut self) -> u32 { self.0 += 1; self.0 }
        fn Int8(&mut self) -> u32 { self.0 += 1; self.0 }
        fn Uint8(&mut self) -> u32 { self.0 }
        fn Int16(&mut self) -> u32 { self.0 }
        fn Uint16(&mut self) -> u32 { self.0 }
        fn Int32(&mut self) -> u32 { self.0 }
        fn Uint32(&mut self) -> u32 { self.0 }
        fn Int64(&mut self) -> u32 { self.0 }
        fn Uint64(&mut self) -> u32 { self.0 }
        fn Int8Vec2(&mut self) -> u32 { self.0 }
        fn Uint8Vec2(&mut self) -> u32 { self.0 }
        fn Int16Vec2(&mut self) -> u32 { self.0 }
        fn Uint16Vec2(&mut self) -> u32 { self.0 }
        fn Int32Vec2(&mut self) -> u32 { self.0 }
        fn Uint32Vec2(&mut self) -> u32 { self.0 }
        fn Int64Vec2(&mut self) -> u32 { self.0 }
        fn Uint64Vec2(&mut self) -> u32 { self.0 }
        fn Int8Vec3(&mut self) -> u32 { self.0 }
        fn Uint8Vec3(&mut self) -> u32 { self.0 }
        fn Int16Vec3(&mut self) -> u32 { self.0 }
        fn Uint16Vec3(&mut self) -> u32 { self.0 }
        fn Int32Vec3(&mut self) -> u32 { self.0 }
        fn Uint32Vec3(&mut self) -> u32 { self.0 }
        fn Int64Vec3(&mut self) -> u32 { self.0 }
        fn Uint64Vec3(&mut self) -> u32 { self.0 }
        fn Int8Vec4(&mut self) -> u32 { self.0 }
        fn Uint8Vec4(&mut self) -> u32 { self.0 }
        fn Int16Vec4(&mut self) -> u32 { self.0 }
        fn Uint16Vec4(&mut self) -> u32 { self.0 }
        fn Int32Vec4(&mut self) -> u32 { self.0 }
        fn Uint32Vec4(&mut self) -> u32 { self.0 }
        fn Int64Vec4(&mut self) -> u32 { self.0 }
        fn Uint64Vec4(&mut self) -> u32 { self.0 }
        fn Float32(&mut self) -> u32 { self.0 }
        fn Float32Vec2(&mut self) -> u32 { self.0 }
        fn Float32Vec3(&mut self) -> u32 { self.0 }
        fn Float32Vec4(&mut self) -> u32 { self.0 }
        fn Float64(&mut self) -> u32 { self.0 }
        fn Float64Vec2(&mut self) -> u32 { self.0 }
        fn Float64Vec3(&mut self) -> u32 { self.0 }
        fn Float64Vec4(&mut self) -> u32 { self.0 }
        fn Float32Mat2(&mut self) -> u32 { self.0 }
        fn Float32Mat3(&mut self) -> u32 { self.0 }
        fn Float32Mat2x3(&mut self) -> u32 { self.0 }
        fn Float32Mat3x4(&mut self) -> u32 { self.0 }
        fn Float32Mat4(&mut self) -> u32 { self.0 }
        fn Int32Box1(&mut self) -> u32 { self.0 }
        fn Int32Box2(&mut self) -> u32 { self.0 }
        fn Int32Box3(&mut self) -> u32 { self.0 }
        fn Int32Box4(&mut self) -> u32 { self.0 }
        fn Float32Box1(&mut self) -> u32 { self.0 }
        fn Float32Box2(&mut self) -> u32 { self.0 }
        fn Float32Box3(&mut self) -> u32 { self.0 }
        fn Float32Box4(&mut self) -> u32 { self.0 }
        fn String(&mut self) -> u32 { self.0 }
        fn Voidptr(&mut self) -> u32 { self.0 }
        fn Bool32(&mut self) -> u32 { self.0 }
        fn Object(&mut self) -> u32 { self.0 }
        fn Array(&mut self) -> u32 { self.0 }
        fn Array1d(&mut self) -> u32 { self.0 }
        fn Array2d(&mut self) -> u32 { self.0 }
        fn Array3d(&mut self) -> u32 { self.0 }
        fn Camera(&mut self) -> u32 { self.0 }
        fn Frame(&mut self) -> u32 { self.0 }
        fn Geometry(&mut self) -> u32 { self.0 }
        fn Group(&mut self) -> u32 { self.0 }
        fn Instance(&mut self) -> u32 { self.0 }
        fn Light(&mut self) -> u32 { self.0 }
        fn Material(&mut self) -> u32 { self.0 }
        fn Renderer(&mut self) -> u32 { self.0 }
        fn Sampler(&mut self) -> u32 { self.0 }
        fn SpatialField(&mut self) -> u32 { self.0 }
        fn Surface(&mut self) -> u32 { self.0 }
        fn Volume(&mut self) -> u32 { self.0 }
        fn World(&mut self) -> u32 { self.0 }
    }

    #[test]
    fn visit_dispatches_to_matching_arm() {
        let mut v = CountingVisitor(0);
        assert_eq!(visit(DataType::Unknown, &mut v), 1);
        assert_eq!(visit(DataType::Int8, &mut v), 2);
    }
}
