//! The dynamic loader's front door and the `Library` object (§4.2).
//!
//! `Library::load` checks `anari_backend::linked`'s in-process registry
//! first, then falls back to `dlopen2` so the same binary can mix a
//! registered test backend with a real installed shared object.

use crate::config;
use crate::error::LoadError;
use crate::status::StatusCallback;
#[cfg(feature = "dlopen2")]
use crate::dynamic::DynamicModule;
use anari_backend::Backend;
#[cfg(feature = "dlopen2")]
use anari_sys::AnariLibrary;
use anari_types::{ExtensionSet, ObjectKind};
use log::debug;
use std::sync::Arc;

pub struct Library {
    name: String,
    backend: Arc<dyn Backend>,
    #[cfg(feature = "dlopen2")]
    dynamic: Option<DynamicHandle>,
}

#[cfg(feature = "dlopen2")]
struct DynamicHandle {
    module: DynamicModule,
    raw: AnariLibrary,
}

// SAFETY: `raw` is an opaque handle whose only use is being passed back to
// `module.destroy`; it carries no aliasing the rest of the type doesn't
// already account for.
#[cfg(feature = "dlopen2")]
unsafe impl Send for DynamicHandle {}
#[cfg(feature = "dlopen2")]
unsafe impl Sync for DynamicHandle {}

impl Library {
    /// Resolves `name` (redirecting the literal `"environment"` through
    /// `ANARI_LIBRARY`, per §4.2) and loads the backend it names.
    pub fn load(name: &str, _status: StatusCallback) -> Result<Arc<Library>, LoadError> {
        let resolved = if name == "environment" {
            config::library_name_from_environment()
                .ok_or_else(|| LoadError::NotFound("environment".into()))?
        } else {
            name.to_string()
        };

        if let Some(backend) = anari_backend::linked::resolve(&resolved) {
            debug!("resolved backend {resolved:?} from the in-process registry");
            return Ok(Arc::new(Library {
                name: resolved,
                backend,
                #[cfg(feature = "dlopen2")]
                dynamic: None,
            }));
        }

        #[cfg(feature = "dlopen2")]
        {
            debug!("opening backend {resolved:?} as a shared object");
            let module = DynamicModule::open(&resolved)?;
            let raw = module.create();
            let backend = unsafe { anari_backend::abi::library_arc(raw) };
            return Ok(Arc::new(Library {
                name: resolved,
                backend,
                dynamic: Some(DynamicHandle { module, raw }),
            }));
        }

        #[cfg(not(feature = "dlopen2"))]
        Err(LoadError::NotFound(resolved))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device_subtypes(&self) -> Vec<&'static str> {
        self.backend.device_subtypes()
    }

    pub fn object_subtypes(&self, device_subtype: &str, kind: ObjectKind) -> Vec<&'static str> {
        self.backend.object_subtypes(device_subtype, kind)
    }

    pub fn parameter_descriptors(
        &self,
        device_subtype: &str,
        object_subtype: &str,
        kind: ObjectKind,
    ) -> Vec<anari_backend::ParameterDescriptor> {
        self.backend
            .parameter_descriptors(device_subtype, object_subtype, kind)
    }

    pub fn device_extensions(&self, device_subtype: &str) -> ExtensionSet {
        self.backend.device_extensions(device_subtype)
    }

    pub(crate) fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// §4.2's `loadModule`: dlopen's an auxiliary shared object exporting
    /// additional subtypes into an already-loaded library. A missing
    /// module file is the documented optional-entry-point case: a
    /// graceful no-op with a status report, not a hard error.
    pub fn load_module(&self, module_name: &str, status: &StatusCallback) {
        #[cfg(feature = "dlopen2")]
        {
            let file = format!("anari_library_{}_module_{}", self.name, module_name);
            match DynamicModule::open(&file) {
                Ok(_) => debug!("loaded module {module_name:?} into library {:?}", self.name),
                Err(_) => crate::status::report(
                    status,
                    anari_types::StatusReport::new(
                        anari_types::StatusSeverity::Warning,
                        anari_types::ErrorCode::LoadError,
                        format!("module {module_name:?} not available; continuing without it"),
                    ),
                ),
            }
        }
        #[cfg(not(feature = "dlopen2"))]
        {
            let _ = (module_name, status);
        }
    }
}

#[cfg(feature = "dlopen2")]
impl Drop for Library {
    fn drop(&mut self) {
        if let Some(dynamic) = &self.dynamic {
            dynamic.module.destroy(dynamic.raw);
        }
    }
}
