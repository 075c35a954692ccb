//! C-ABI export helpers for backend shared objects (§6.3).
//!
//! A backend crate calls [`define_anari_backend_abi!`] once with its
//! library name and a constructor expression. The macro exports exactly
//! the entry point §4.2's loader resolves by mangled name,
//! `anari_library_<name>_create`; everything past that (device creation,
//! introspection, frame ops) goes through the [`crate::Backend`] /
//! [`crate::BackendDevice`] trait objects the constructor hands back, not
//! through further mangled symbols.
//!
//! Grounded on the same boxed-opaque-pointer pattern `nsi-ffi-wrap`'s
//! `define_nsi_c_api!` and `FfiApiAdapter` use, generalized from a
//! concrete adapter type to an arbitrary `dyn Backend` via the standard
//! "thin pointer to a boxed fat pointer" trick a trait object needs to
//! cross an ABI boundary.

use crate::traits::Backend;
use anari_sys::AnariLibrary;
use std::os::raw::c_void;
use std::sync::Arc;

/// Boxes `backend` behind a thin, C-ABI-safe pointer. The inner `Arc` lets
/// [`library_arc`] hand out cheap clones to device objects that outlive a
/// single call.
pub fn create_library<B: Backend + 'static>(backend: B) -> AnariLibrary {
    let arc: Arc<dyn Backend> = Arc::new(backend);
    Box::into_raw(Box::new(arc)) as *mut c_void
}

/// Borrows the [`Backend`] behind a library handle produced by
/// [`create_library`]. The handle must still be live (not yet passed to
/// [`destroy_library`]).
///
/// # Safety
/// `handle` must have been returned by [`create_library`] and not yet
/// destroyed.
pub unsafe fn library_arc(handle: AnariLibrary) -> Arc<dyn Backend> {
    let boxed = &*(handle as *const Arc<dyn Backend>);
    Arc::clone(boxed)
}

/// Frees a library handle produced by [`create_library`]. Must only be
/// called once, after every device derived from it has been released
/// (§4.2's unload contract).
///
/// # Safety
/// `handle` must have been returned by [`create_library`] and not yet
/// destroyed.
pub unsafe fn destroy_library(handle: AnariLibrary) {
    if !handle.is_null() {
        drop(Box::from_raw(handle as *mut Arc<dyn Backend>));
    }
}

/// Exports the mangled entry point a backend shared object must provide
/// (§4.2, §6.3). Usage:
///
/// ```ignore
/// anari_backend::define_anari_backend_abi!(helide, HelideBackend::new());
/// ```
///
/// expands to a `#[no_mangle]` function whose *exported symbol name* is
/// `anari_library_helide_create`, returning an opaque [`AnariLibrary`] the
/// dynamic loader stores and later passes back to [`library_arc`] /
/// [`destroy_library`].
#[macro_export]
macro_rules! define_anari_backend_abi {
    ($library_name:ident, $ctor:expr) => {
        #[export_name = concat!("anari_library_", stringify!($library_name), "_create")]
        pub extern "C" fn __anari_backend_create() -> ::anari_sys::AnariLibrary {
            $crate::abi::create_library($ctor)
        }

        #[export_name = concat!("anari_library_", stringify!($library_name), "_destroy")]
        pub extern "C" fn __anari_backend_destroy(handle: ::anari_sys::AnariLibrary) {
            unsafe { $crate::abi::destroy_library(handle) }
        }
    };
}
