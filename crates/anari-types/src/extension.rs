//! The perfect-hash extension-name bundle (§4.6): a convenience for callers
//! who want `if extensions.khr_geometry_triangle { ... }` instead of
//! scanning a string list themselves. Extension names are matched by exact
//! byte sequence, never fuzzily.

/// Declares both [`ExtensionSet`]'s fields and the perfect-hash table that
/// populates them from a backend-reported name list.
macro_rules! known_extensions {
    ($($field:ident => $name:expr),* $(,)?) => {
        /// A struct of flags, one per well-known extension name. Unknown
        /// names (vendor extensions this bundle doesn't list) are silently
        /// ignored by [`ExtensionSet::from_names`]; callers who need those
        /// must still scan the raw name list themselves.
        #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
        pub struct ExtensionSet {
            $(pub $field: bool,)*
        }

        static EXTENSION_SETTERS: phf::Map<&'static str, fn(&mut ExtensionSet)> = phf::phf_map! {
            $($name => (|set: &mut ExtensionSet| set.$field = true) as fn(&mut ExtensionSet),)*
        };
    };
}

known_extensions! {
    khr_camera_perspective => "ANARI_KHR_CAMERA_PERSPECTIVE",
    khr_camera_orthographic => "ANARI_KHR_CAMERA_ORTHOGRAPHIC",
    khr_geometry_triangle => "ANARI_KHR_GEOMETRY_TRIANGLE",
    khr_geometry_sphere => "ANARI_KHR_GEOMETRY_SPHERE",
    khr_material_matte => "ANARI_KHR_MATERIAL_MATTE",
    khr_material_physically_based => "ANARI_KHR_MATERIAL_PHYSICALLY_BASED",
    khr_light_directional => "ANARI_KHR_LIGHT_DIRECTIONAL",
    khr_light_point => "ANARI_KHR_LIGHT_POINT",
    khr_frame_completion_callback => "ANARI_KHR_FRAME_COMPLETION_CALLBACK",
    khr_frame_channel_depth => "ANARI_KHR_FRAME_CHANNEL_DEPTH",
    khr_device_synchronization => "ANARI_KHR_DEVICE_SYNCHRONIZATION",
    khr_auxiliary_buffers => "ANARI_KHR_AUXILIARY_BUFFERS",
}

impl ExtensionSet {
    /// Builds a flag set from a backend-reported extension name list
    /// (§4.6). Names not in the bundle are ignored, matching exactly by
    /// byte sequence.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut set = ExtensionSet::default();
        for name in names {
            if let Some(setter) = EXTENSION_SETTERS.get(name) {
                setter(&mut set);
            }
        }
        set
    }
}
