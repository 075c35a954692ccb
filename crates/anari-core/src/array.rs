//! The array subsystem (§4.4): 1D/2D/3D typed buffers, either adopted from
//! client memory (with an optional deleter) or owned by the runtime,
//! plus directly-mapped parameter array storage.

use anari_sys::{AnariMemoryDeleter, ANARI_NULL};
use anari_types::{ErrorCode, RawHandle};
use anari_types::registry::{is_object, size_of};
use anari_types::DataType;
use std::collections::HashMap;
use std::os::raw::c_void;
use std::sync::Mutex;
use ustr::Ustr;

/// Backing storage for one array object, in addition to the bookkeeping
/// every object gets in the [`crate::handle_table::HandleTable`].
struct ArrayRecord {
    element_type: DataType,
    dims: [usize; 3],
    storage: Storage,
    mapped: bool,
    /// The handles this array is currently retaining on behalf of its
    /// object-typed elements (§4.4's element-type invariant). Empty for any
    /// array whose `element_type` isn't an object type.
    retained: Vec<RawHandle>,
}

enum Storage {
    /// Adopted from the client. Freed only via `deleter`, never by us.
    AppMemory {
        ptr: *mut c_void,
        deleter: AnariMemoryDeleter,
        user_data: *mut c_void,
    },
    /// Allocated and owned by the runtime.
    Owned(Box<[u8]>),
}

// SAFETY: the raw pointers in `Storage::AppMemory` are opaque to us; we
// never dereference them except to hand the address back to the caller
// that already owns the memory, and the deleter is invoked on the thread
// that destroys the array, matching §5's stated deleter contract.
unsafe impl Send for ArrayRecord {}

impl ArrayRecord {
    fn len_bytes(&self) -> usize {
        size_of(self.element_type) * self.dims.iter().product::<usize>()
    }

    fn data_ptr(&self) -> *mut u8 {
        match &self.storage {
            Storage::AppMemory { ptr, .. } => *ptr as *mut u8,
            Storage::Owned(buf) => buf.as_ptr() as *mut u8,
        }
    }
}

/// One in-progress `mapParameterArray*D` write, keyed by `(object, name)`.
struct PendingParamArray {
    element_type: DataType,
    dims: [usize; 3],
    buffer: Box<[u8]>,
}

/// Per-device array bookkeeping (§4.4). Owned by [`crate::device::Device`]
/// alongside its [`crate::handle_table::HandleTable`]; array *objects* live
/// in the handle table like any other object, this holds the extra fields
/// an `ObjectRecord` doesn't have room for.
#[derive(Default)]
pub struct ArrayManager {
    arrays: Mutex<HashMap<RawHandle, ArrayRecord>>,
    pending: Mutex<HashMap<(RawHandle, Ustr), PendingParamArray>>,
}

impl ArrayManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a newly created array object's backing storage (§4.4's
    /// "Construction"). `app_memory` non-null adopts client memory;
    /// null allocates an owned, zeroed buffer.
    pub fn register(
        &self,
        handle: RawHandle,
        element_type: DataType,
        dims: [usize; 3],
        app_memory: *mut c_void,
        deleter: AnariMemoryDeleter,
        user_data: *mut c_void,
    ) {
        let storage = if app_memory.is_null() {
            let len = size_of(element_type) * dims.iter().product::<usize>();
            Storage::Owned(vec![0u8; len].into_boxed_slice())
        } else {
            Storage::AppMemory {
                ptr: app_memory,
                deleter,
                user_data,
            }
        };
        self.arrays.lock().unwrap().insert(
            handle,
            ArrayRecord {
                element_type,
                dims,
                storage,
                mapped: false,
                retained: Vec::new(),
            },
        );
    }

    /// Registers an array object directly from a finished owned buffer
    /// (§4.4's "Directly mapped parameter arrays": the buffer
    /// `unmap_parameter_array` hands back becomes a real array object
    /// without the zeroed-then-copied roundtrip `register` would do).
    pub fn register_owned(
        &self,
        handle: RawHandle,
        element_type: DataType,
        dims: [usize; 3],
        bytes: Box<[u8]>,
    ) {
        self.arrays.lock().unwrap().insert(
            handle,
            ArrayRecord {
                element_type,
                dims,
                storage: Storage::Owned(bytes),
                mapped: false,
                retained: Vec::new(),
            },
        );
    }

    /// Reads an object-typed array's current contents and diffs them
    /// against the handles it last retained, updating the stored snapshot
    /// to match. Returns `(handles to release, handles to retain)`, mirroring
    /// `HandleTable::commit_parameters`'s diff pattern so the caller (which
    /// owns the `HandleTable` needed to actually retain/release) performs
    /// the side effects. Returns `None` if `handle` is unknown or its
    /// element type isn't an object type — there is nothing to retain.
    pub fn diff_handle_elements(&self, handle: RawHandle) -> Option<(Vec<RawHandle>, Vec<RawHandle>)> {
        let mut arrays = self.arrays.lock().unwrap();
        let record = arrays.get_mut(&handle)?;
        if !is_object(record.element_type) {
            return None;
        }
        let count = record.dims.iter().product::<usize>();
        let ptr = record.data_ptr();
        let mut current = Vec::with_capacity(count);
        for i in 0..count {
            // SAFETY: an object-typed element is an 8-byte `RawHandle`, and
            // `ptr` points to at least `count * 8` readable bytes for this
            // array (`len_bytes` is `size_of(element_type) * count`).
            let bytes = unsafe { std::slice::from_raw_parts(ptr.add(i * 8), 8) };
            let raw = RawHandle::from_ne_bytes(bytes.try_into().unwrap());
            if raw != ANARI_NULL {
                current.push(raw);
            }
        }
        let mut to_release = std::mem::take(&mut record.retained);
        let mut to_retain = Vec::new();
        for h in &current {
            if let Some(pos) = to_release.iter().position(|r| r == h) {
                to_release.remove(pos);
            } else {
                to_retain.push(*h);
            }
        }
        record.retained = current;
        Some((to_release, to_retain))
    }

    /// Maps the array for client writes (§4.4's "Mapping"). Errors with
    /// `BusyResource` if it is already mapped.
    pub fn map(&self, handle: RawHandle) -> Result<*mut u8, ErrorCode> {
        let mut arrays = self.arrays.lock().unwrap();
        let record = arrays.get_mut(&handle).ok_or(ErrorCode::DeadHandle)?;
        if record.mapped {
            return Err(ErrorCode::BusyResource);
        }
        record.mapped = true;
        Ok(record.data_ptr())
    }

    /// Returns the array to the unmapped state. Errors with
    /// `StateViolation` if it was not mapped.
    pub fn unmap(&self, handle: RawHandle) -> Result<(), ErrorCode> {
        let mut arrays = self.arrays.lock().unwrap();
        let record = arrays.get_mut(&handle).ok_or(ErrorCode::DeadHandle)?;
        if !record.mapped {
            return Err(ErrorCode::StateViolation);
        }
        record.mapped = false;
        Ok(())
    }

    pub fn is_mapped(&self, handle: RawHandle) -> bool {
        self.arrays
            .lock()
            .unwrap()
            .get(&handle)
            .map(|r| r.mapped)
            .unwrap_or(false)
    }

    pub fn len_bytes(&self, handle: RawHandle) -> Option<usize> {
        self.arrays.lock().unwrap().get(&handle).map(|r| r.len_bytes())
    }

    /// Removes the array's bookkeeping and invokes its deleter exactly
    /// once, if it has app-supplied memory with one registered (§3, §4.4,
    /// invariant 4). Called by `Device::release` once an array's refcount
    /// reaches zero. Returns the handles the array was retaining on behalf
    /// of its object-typed elements, if any, so the caller can release them
    /// through its `HandleTable`.
    pub fn destroy(&self, handle: RawHandle) -> Vec<RawHandle> {
        let Some(record) = self.arrays.lock().unwrap().remove(&handle) else {
            return Vec::new();
        };
        if let Storage::AppMemory {
            ptr,
            deleter: Some(deleter),
            user_data,
        } = record.storage
        {
            deleter(user_data, ptr);
        }
        record.retained
    }

    /// Reserves scratch storage for a directly-mapped parameter array
    /// (§4.4's "Directly mapped parameter arrays"). The reported stride is
    /// always the unpadded element size: there is no backend here to
    /// request padding from.
    pub fn map_parameter_array(
        &self,
        object: RawHandle,
        name: Ustr,
        element_type: DataType,
        dims: [usize; 3],
    ) -> (*mut u8, usize) {
        let stride = size_of(element_type);
        let len = stride * dims.iter().product::<usize>();
        let mut buffer = vec![0u8; len].into_boxed_slice();
        let ptr = buffer.as_mut_ptr();
        self.pending.lock().unwrap().insert(
            (object, name),
            PendingParamArray {
                element_type,
                dims,
                buffer,
            },
        );
        (ptr, stride)
    }

    /// Finalizes a directly-mapped parameter array write, handing back the
    /// finished bytes and element type so the caller can register it as a
    /// committed array object and reference it from the owning parameter.
    pub fn unmap_parameter_array(
        &self,
        object: RawHandle,
        name: &str,
    ) -> Option<(DataType, [usize; 3], Box<[u8]>)> {
        self.pending
            .lock()
            .unwrap()
            .remove(&(object, Ustr::from(name)))
            .map(|p| (p.element_type, p.dims, p.buffer))
    }
}

pub const NO_DIM: usize = 0;

/// Normalizes a 1/2/3-dimensional extent into the fixed-size `[usize; 3]`
/// the manager stores, with unused trailing dimensions set to 1 (so the
/// product over all three still yields the element count).
pub fn dims3(dim1: usize, dim2: Option<usize>, dim3: Option<usize>) -> [usize; 3] {
    [dim1, dim2.unwrap_or(1), dim3.unwrap_or(1)]
}

/// The null app-memory sentinel, for call sites that want to name it.
pub const NO_APP_MEMORY: *mut c_void = std::ptr::null_mut();
/// The null object handle, re-exported here for array call sites.
pub const NULL_HANDLE: RawHandle = ANARI_NULL;
