//! Resolves a named backend from a platform shared object (§4.2).
//!
//! `dlopen2`'s `WrapperApi` derive binds a *fixed* set of entry points known
//! at compile time. This loader can't use that derive as-is: the one symbol
//! it needs is mangled with the library name (`anari_library_<name>_create`),
//! which is only known at runtime. It uses `dlopen2::raw::Library`'s
//! dynamic symbol lookup instead, doing the same job the derive macro does
//! when the symbol name isn't static.

use crate::error::LoadError;
use anari_sys::{mangled_entry_point, AnariLibrary};
use dlopen2::raw::Library;
use log::{debug, warn};

type CreateFn = extern "C" fn() -> AnariLibrary;
type DestroyFn = extern "C" fn(AnariLibrary);

extern "C" fn noop_destroy(_: AnariLibrary) {}

/// A successfully opened backend shared object, with its two required
/// entry points resolved once at open time and never re-resolved (§4.2's
/// "entry points are resolved once at load" invariant).
pub struct DynamicModule {
    // Keeps the OS module mapped for as long as `create`/`destroy` may be
    // called; never read directly once the symbols are resolved.
    _library: Library,
    create: CreateFn,
    destroy: DestroyFn,
}

impl DynamicModule {
    pub fn open(library_name: &str) -> Result<Self, LoadError> {
        let file_name = platform_file_name(library_name);
        debug!("opening backend module {file_name}");
        let library = Library::open(&file_name)?;

        let create_symbol = mangled_entry_point(library_name, "create");
        let create: CreateFn = unsafe { library.symbol(&create_symbol) }
            .map_err(|_| LoadError::MissingEntryPoint(create_symbol))?;

        let destroy_symbol = mangled_entry_point(library_name, "destroy");
        let destroy: DestroyFn = unsafe { library.symbol(&destroy_symbol) }.unwrap_or_else(|_| {
            warn!("optional entry point {destroy_symbol} absent; destroy will be a no-op");
            noop_destroy
        });

        Ok(DynamicModule {
            _library: library,
            create,
            destroy,
        })
    }

    pub fn create(&self) -> AnariLibrary {
        (self.create)()
    }

    pub fn destroy(&self, handle: AnariLibrary) {
        (self.destroy)(handle);
    }
}

fn platform_file_name(library_name: &str) -> String {
    #[cfg(target_os = "windows")]
    {
        format!("anari_library_{library_name}.dll")
    }
    #[cfg(target_os = "macos")]
    {
        format!("libanari_library_{library_name}.dylib")
    }
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        format!("libanari_library_{library_name}.so")
    }
}
