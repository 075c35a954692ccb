//! Stable handle naming (§4.8, §9's supplement from `DebugDevice.h`'s
//! `ObjectInfo` bookkeeping): `<kindName><serial>`, assigned once at
//! creation and never reused or pruned, so a use-after-release trace line
//! still prints a recognizable name instead of a bare integer.

use anari_types::{ObjectKind, RawHandle};
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct NameTable {
    names: Mutex<HashMap<RawHandle, String>>,
    next_serial: Mutex<HashMap<&'static str, u64>>,
}

impl NameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns and records the stable name for a freshly created handle.
    pub fn assign(&self, handle: RawHandle, kind: ObjectKind) -> String {
        let kind_name = kind.name();
        let serial = {
            let mut next = self.next_serial.lock().unwrap();
            let counter = next.entry(kind_name).or_insert(0);
            let serial = *counter;
            *counter += 1;
            serial
        };
        let name = format!("{kind_name}{serial}");
        self.names.lock().unwrap().insert(handle, name.clone());
        name
    }

    /// The stable name for `handle`, even after it has been destroyed.
    /// Falls back to the raw integer for a handle this table never saw
    /// (e.g. `ANARI_NULL` or one belonging to another device).
    pub fn name_of(&self, handle: RawHandle) -> String {
        self.names
            .lock()
            .unwrap()
            .get(&handle)
            .cloned()
            .unwrap_or_else(|| handle.to_string())
    }
}
