//! An in-process backend registry.
//!
//! Lets the same `Backend`/`BackendDevice` trait pair be satisfied by a
//! statically linked implementation instead of one resolved through
//! `dlopen`. A [`Backend`] is registered under a library name and handed
//! back by [`resolve`] without touching the filesystem or `dlopen2` at
//! all — this is the seam every test in the workspace uses in place of a
//! real backend shared object.

use crate::traits::Backend;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

fn registry() -> &'static Mutex<HashMap<String, Arc<dyn Backend>>> {
    static REGISTRY: OnceLock<Mutex<HashMap<String, Arc<dyn Backend>>>> = OnceLock::new();
    REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Registers `backend` under `library_name`, replacing any previous
/// registration of that name. `anari_core::Library::load` consults this
/// registry before falling back to `dlopen2`.
pub fn register(library_name: impl Into<String>, backend: Arc<dyn Backend>) {
    registry()
        .lock()
        .expect("linked backend registry poisoned")
        .insert(library_name.into(), backend);
}

/// Looks up a backend registered under `library_name`.
pub fn resolve(library_name: &str) -> Option<Arc<dyn Backend>> {
    registry()
        .lock()
        .expect("linked backend registry poisoned")
        .get(library_name)
        .cloned()
}

/// Removes a registration. Mainly useful for test teardown; production
/// code has no reason to unregister a linked backend.
pub fn unregister(library_name: &str) {
    registry()
        .lock()
        .expect("linked backend registry poisoned")
        .remove(library_name);
}
