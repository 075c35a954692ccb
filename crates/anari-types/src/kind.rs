//! The semantic category of a non-library, non-device object (§3).

use std::fmt;

/// One of the core object kinds, or a backend-defined extension kind
/// created through `newObject(kind, subtype)` (§4.5).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Array1D,
    Array2D,
    Array3D,
    Camera,
    Frame,
    Geometry,
    Group,
    Instance,
    Light,
    Material,
    Renderer,
    Sampler,
    SpatialField,
    Surface,
    Volume,
    World,
    /// A kind not in the core enumeration, created via `newObject`.
    Extension,
}

impl ObjectKind {
    pub fn name(self) -> &'static str {
        match self {
            ObjectKind::Array1D => "Array1D",
            ObjectKind::Array2D => "Array2D",
            ObjectKind::Array3D => "Array3D",
            ObjectKind::Camera => "Camera",
            ObjectKind::Frame => "Frame",
            ObjectKind::Geometry => "Geometry",
            ObjectKind::Group => "Group",
            ObjectKind::Instance => "Instance",
            ObjectKind::Light => "Light",
            ObjectKind::Material => "Material",
            ObjectKind::Renderer => "Renderer",
            ObjectKind::Sampler => "Sampler",
            ObjectKind::SpatialField => "SpatialField",
            ObjectKind::Surface => "Surface",
            ObjectKind::Volume => "Volume",
            ObjectKind::World => "World",
            ObjectKind::Extension => "Extension",
        }
    }

    /// Whether this kind denotes one of the three array dimensionalities.
    pub fn is_array(self) -> bool {
        matches!(
            self,
            ObjectKind::Array1D | ObjectKind::Array2D | ObjectKind::Array3D
        )
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
