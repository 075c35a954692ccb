//! The handle manager and parameter store (§4.3): one instance per device.
//!
//! Handles are allocated from a single process-wide counter, and a
//! process-wide liveness set tracks which handles currently exist on *some*
//! device. That's what lets a lookup miss in *this* table be classified:
//! if the handle isn't live anywhere, it never existed or has already been
//! fully released (`DeadHandle`); if it's live but just not in this table,
//! it was created on a different device (`KindMismatch`, per §3's
//! "cross-device mixing fails with KindMismatch"). The table itself only
//! ever returns `DeadHandle` for a local miss — distinguishing the two
//! requires seeing across devices, so that classification is done by the
//! caller (`Device`), using [`HandleTable::is_live_anywhere`].

use anari_sys::ANARI_NULL;
use anari_types::{ErrorCode, ObjectKind, ParamMap, ParamValue, RawHandle};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use ustr::Ustr;

/// The process-wide handle allocator, shared by every [`HandleTable`]
/// instance so handles never collide across devices.
fn next_global_id() -> &'static AtomicU64 {
    static NEXT: OnceLock<AtomicU64> = OnceLock::new();
    // Handle 0 is the null handle (anari_sys::ANARI_NULL); real objects
    // start at 1.
    NEXT.get_or_init(|| AtomicU64::new(1))
}

/// The process-wide set of handles currently live on some device.
fn live_handles() -> &'static Mutex<HashSet<RawHandle>> {
    static LIVE: OnceLock<Mutex<HashSet<RawHandle>>> = OnceLock::new();
    LIVE.get_or_init(|| Mutex::new(HashSet::new()))
}

/// Everything the table tracks about one live object (§3's "Object").
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectRecord {
    pub kind: ObjectKind,
    pub subtype: Ustr,
    pub refcount: i64,
    pub staged: ParamMap,
    pub committed: ParamMap,
    pub dirty: bool,
}

pub struct HandleTable {
    objects: Mutex<HashMap<RawHandle, ObjectRecord>>,
}

impl HandleTable {
    pub fn new() -> Self {
        HandleTable {
            objects: Mutex::new(HashMap::new()),
        }
    }

    /// Creates a new object of `kind`/`subtype` with refcount 1 and
    /// dirty = true (§3's lifecycle invariants).
    pub fn create(&self, kind: ObjectKind, subtype: Ustr) -> RawHandle {
        let handle = next_global_id().fetch_add(1, Ordering::Relaxed);
        let record = ObjectRecord {
            kind,
            subtype,
            refcount: 1,
            staged: ParamMap::new(),
            committed: ParamMap::new(),
            dirty: true,
        };
        self.objects.lock().unwrap().insert(handle, record);
        live_handles().lock().unwrap().insert(handle);
        handle
    }

    /// True if `handle` currently exists on *some* device, not necessarily
    /// this one. Used by `Device` to tell a dead handle from one that's
    /// simply foreign.
    pub fn is_live_anywhere(handle: RawHandle) -> bool {
        handle != ANARI_NULL && live_handles().lock().unwrap().contains(&handle)
    }

    pub fn kind_of(&self, handle: RawHandle) -> Option<ObjectKind> {
        self.objects.lock().unwrap().get(&handle).map(|r| r.kind)
    }

    pub fn is_live(&self, handle: RawHandle) -> bool {
        handle != ANARI_NULL && self.objects.lock().unwrap().contains_key(&handle)
    }

    pub fn retain(&self, handle: RawHandle) -> Result<(), ErrorCode> {
        if handle == ANARI_NULL {
            return Ok(());
        }
        let mut objects = self.objects.lock().unwrap();
        match objects.get_mut(&handle) {
            Some(record) => {
                record.refcount += 1;
                Ok(())
            }
            None => Err(ErrorCode::DeadHandle),
        }
    }

    /// Decrements the refcount. Returns the record (removed from the
    /// table) if this drove it to zero, so the caller can invoke the
    /// backend destructor and recursively release the handles the record's
    /// staged/committed maps were holding.
    pub fn release(&self, handle: RawHandle) -> Result<Option<ObjectRecord>, ErrorCode> {
        if handle == ANARI_NULL {
            return Ok(None);
        }
        let mut objects = self.objects.lock().unwrap();
        let refcount = match objects.get_mut(&handle) {
            Some(record) => {
                if record.refcount <= 0 {
                    return Err(ErrorCode::DeadHandle);
                }
                record.refcount -= 1;
                record.refcount
            }
            None => return Err(ErrorCode::DeadHandle),
        };
        if refcount == 0 {
            let removed = objects.remove(&handle);
            drop(objects);
            live_handles().lock().unwrap().remove(&handle);
            Ok(removed)
        } else {
            Ok(None)
        }
    }

    /// Stages `value` under `name`, replacing any previous staged entry.
    /// Returns the previously staged handle (if the overwritten entry held
    /// one), which the caller must release.
    pub fn set_parameter(
        &self,
        handle: RawHandle,
        name: Ustr,
        value: ParamValue,
    ) -> Result<Option<RawHandle>, ErrorCode> {
        let mut objects = self.objects.lock().unwrap();
        let record = objects.get_mut(&handle).ok_or(ErrorCode::DeadHandle)?;
        record.dirty = true;
        let previous = record.staged.insert(name, value);
        Ok(previous.and_then(|p| p.referenced_handle()))
    }

    /// Removes the staged entry `name`. Returns its handle, if any, for
    /// release.
    pub fn unset_parameter(
        &self,
        handle: RawHandle,
        name: &str,
    ) -> Result<Option<RawHandle>, ErrorCode> {
        let mut objects = self.objects.lock().unwrap();
        let record = objects.get_mut(&handle).ok_or(ErrorCode::DeadHandle)?;
        record.dirty = true;
        let name = Ustr::from(name);
        Ok(record
            .staged
            .remove(&name)
            .and_then(|p| p.referenced_handle()))
    }

    /// Removes every staged entry. Returns the handles held by them, for
    /// release.
    pub fn unset_all_parameters(&self, handle: RawHandle) -> Result<Vec<RawHandle>, ErrorCode> {
        let mut objects = self.objects.lock().unwrap();
        let record = objects.get_mut(&handle).ok_or(ErrorCode::DeadHandle)?;
        record.dirty = true;
        let released = record
            .staged
            .drain()
            .filter_map(|(_, v)| v.referenced_handle())
            .collect();
        Ok(released)
    }

    /// Publishes the staged map as the committed snapshot (§4.5's commit
    /// barrier). Returns `(handles to release from the old committed
    /// snapshot, handles to retain for the new one)`; the caller performs
    /// the retain/release so this table never calls back into itself.
    pub fn commit_parameters(
        &self,
        handle: RawHandle,
    ) -> Result<(Vec<RawHandle>, Vec<RawHandle>), ErrorCode> {
        let mut objects = self.objects.lock().unwrap();
        let record = objects.get_mut(&handle).ok_or(ErrorCode::DeadHandle)?;
        let to_release = record
            .committed
            .values()
            .filter_map(|v| v.referenced_handle())
            .collect();
        let new_committed = record.staged.clone();
        let to_retain = new_committed
            .values()
            .filter_map(|v| v.referenced_handle())
            .collect();
        record.committed = new_committed;
        record.dirty = false;
        Ok((to_release, to_retain))
    }

    pub fn is_dirty(&self, handle: RawHandle) -> Result<bool, ErrorCode> {
        self.objects
            .lock()
            .unwrap()
            .get(&handle)
            .map(|r| r.dirty)
            .ok_or(ErrorCode::DeadHandle)
    }

    pub fn committed_snapshot(&self, handle: RawHandle) -> Result<ParamMap, ErrorCode> {
        self.objects
            .lock()
            .unwrap()
            .get(&handle)
            .map(|r| r.committed.clone())
            .ok_or(ErrorCode::DeadHandle)
    }

    pub fn staged_snapshot(&self, handle: RawHandle) -> Result<ParamMap, ErrorCode> {
        self.objects
            .lock()
            .unwrap()
            .get(&handle)
            .map(|r| r.staged.clone())
            .ok_or(ErrorCode::DeadHandle)
    }

    pub fn refcount(&self, handle: RawHandle) -> Result<i64, ErrorCode> {
        self.objects
            .lock()
            .unwrap()
            .get(&handle)
            .map(|r| r.refcount)
            .ok_or(ErrorCode::DeadHandle)
    }
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}
