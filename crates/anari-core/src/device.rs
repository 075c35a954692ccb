//! The device façade (§4.5, §6.2): the top-level object a client actually
//! calls operations against. `Device` owns object identity and reference
//! counting (via [`HandleTable`]), array storage (via [`ArrayManager`]) and
//! frame state (via [`FrameStateMachine`]), and calls into a
//! `Box<dyn BackendDevice>` for the handful of things that are genuinely
//! backend-specific. Per `HandleTable`'s own module doc: "Device then wraps
//! retain/release adding backend calls."

use crate::array::{self, ArrayManager};
use crate::frame::FrameStateMachine;
use crate::handle_table::HandleTable;
use crate::library::Library;
use crate::status::{self, StatusCallback};
use anari_backend::{BackendDevice, FrameChannel};
use anari_sys::{AnariMemoryDeleter, ANARI_NULL};
use anari_types::{DataType, ErrorCode, ExtensionSet, ObjectKind, ParamValue, RawHandle};
use std::collections::HashMap;
use std::os::raw::c_void;
use std::sync::{Arc, Mutex};
use ustr::Ustr;

/// A live ANARI device (§4.5). Constructed through [`Library`], never
/// directly.
pub struct Device {
    library: Arc<Library>,
    backend: Box<dyn BackendDevice>,
    handles: HandleTable,
    arrays: ArrayManager,
    frames: Mutex<HashMap<RawHandle, Arc<FrameStateMachine>>>,
    status: StatusCallback,
    subtype: String,
    /// Device-level parameters (§4.3's device-as-object note): committing
    /// the device itself (e.g. its own extension list) routes here instead
    /// of through `handles`, since the device has no entry of its own in
    /// its own handle table.
    own_parameters: HandleTable,
    own_handle: RawHandle,
}

impl Device {
    /// `newDevice(library, subtype, status)` (§4.2). Returns `None` if the
    /// backend rejects `subtype`; the failure is reported through `status`
    /// rather than propagated, per §7's "object constructors never
    /// propagate exceptions to the client."
    pub fn new(library: Arc<Library>, subtype: &str, status: StatusCallback) -> Option<Device> {
        let sink = {
            let status = status.clone();
            Arc::new(move |report| status::report(&status, report)) as anari_backend::StatusSink
        };
        let backend = match library.backend().new_device(subtype, sink) {
            Ok(backend) => backend,
            Err(e) => {
                status::report_error(&status, ErrorCode::BackendFailure, e.to_string());
                return None;
            }
        };
        let own_parameters = HandleTable::new();
        let own_handle = own_parameters.create(ObjectKind::Extension, Ustr::from("device"));
        Some(Device {
            library,
            backend,
            handles: HandleTable::new(),
            arrays: ArrayManager::new(),
            frames: Mutex::new(HashMap::new()),
            status,
            subtype: subtype.to_string(),
            own_parameters,
            own_handle,
        })
    }

    pub fn library(&self) -> &Arc<Library> {
        &self.library
    }

    fn fail(&self, code: ErrorCode, message: impl Into<String>) {
        status::report_error(&self.status, code, message);
    }

    /// True when `handle` is the device's own pseudo-handle (§4.3).
    fn targets_device(&self, handle: RawHandle) -> bool {
        handle == self.own_handle
    }

    /// Turns a `HandleTable` lookup miss into the right error code: a
    /// handle this device has never heard of is either dead (never
    /// existed, or already fully released) or foreign — alive on another
    /// device, which is a `KindMismatch` (§3's "cross-device mixing fails
    /// with KindMismatch"), not a `DeadHandle`. Errors other than
    /// `DeadHandle` pass through unchanged.
    fn classify_handle_error(&self, handle: RawHandle, err: ErrorCode) -> ErrorCode {
        if err == ErrorCode::DeadHandle && HandleTable::is_live_anywhere(handle) {
            ErrorCode::KindMismatch
        } else {
            err
        }
    }

    /// Retains/releases the handles held by an object-typed array's current
    /// contents against what was last retained for it (§4.4's element-type
    /// invariant: "arrays of handle type retain each non-null handle on
    /// construction ... and release on destruction or rewrite"). A no-op
    /// for arrays whose element type isn't an object type.
    fn sync_array_handle_elements(&self, handle: RawHandle) {
        if let Some((to_release, to_retain)) = self.arrays.diff_handle_elements(handle) {
            for h in to_retain {
                let _ = self.handles.retain(h);
            }
            for h in to_release {
                let _ = self.release(h);
            }
        }
    }

    /// Whether `handle` is reachable from any currently in-flight frame's
    /// committed parameter graph, by following referenced handles
    /// transitively (§5's "must refuse" for resources an in-flight frame is
    /// using).
    fn is_referenced_by_in_flight_frame(&self, handle: RawHandle) -> bool {
        let frame_handles: Vec<RawHandle> = {
            let frames = self.frames.lock().unwrap();
            frames
                .iter()
                .filter(|(_, fsm)| fsm.state() == crate::frame::FrameState::InFlight)
                .map(|(h, _)| *h)
                .collect()
        };
        frame_handles
            .into_iter()
            .any(|root| self.is_reachable_from(root, handle))
    }

    fn is_reachable_from(&self, root: RawHandle, target: RawHandle) -> bool {
        let mut visited = std::collections::HashSet::new();
        let mut stack = vec![root];
        while let Some(h) = stack.pop() {
            if h == target {
                return true;
            }
            if !visited.insert(h) {
                continue;
            }
            if let Ok(snapshot) = self.handles.committed_snapshot(h) {
                for v in snapshot.values() {
                    if let Some(child) = v.referenced_handle() {
                        stack.push(child);
                    }
                }
            }
        }
        false
    }

    // ---- object construction (§4.5, §6.2) ----------------------------

    fn new_object(&self, kind: ObjectKind, subtype: &str) -> RawHandle {
        let handle = self.handles.create(kind, Ustr::from(subtype));
        if let Err(e) = self.backend.create_object(handle, kind, subtype) {
            self.fail(ErrorCode::BackendFailure, e.to_string());
        }
        if kind == ObjectKind::Frame {
            self.frames
                .lock()
                .unwrap()
                .insert(handle, Arc::new(FrameStateMachine::new()));
        }
        handle
    }

    pub fn new_camera(&self, subtype: &str) -> RawHandle {
        self.new_object(ObjectKind::Camera, subtype)
    }
    pub fn new_light(&self, subtype: &str) -> RawHandle {
        self.new_object(ObjectKind::Light, subtype)
    }
    pub fn new_geometry(&self, subtype: &str) -> RawHandle {
        self.new_object(ObjectKind::Geometry, subtype)
    }
    pub fn new_spatial_field(&self, subtype: &str) -> RawHandle {
        self.new_object(ObjectKind::SpatialField, subtype)
    }
    pub fn new_volume(&self, subtype: &str) -> RawHandle {
        self.new_object(ObjectKind::Volume, subtype)
    }
    pub fn new_material(&self, subtype: &str) -> RawHandle {
        self.new_object(ObjectKind::Material, subtype)
    }
    pub fn new_sampler(&self, subtype: &str) -> RawHandle {
        self.new_object(ObjectKind::Sampler, subtype)
    }
    pub fn new_renderer(&self, subtype: &str) -> RawHandle {
        self.new_object(ObjectKind::Renderer, subtype)
    }
    pub fn new_instance(&self, subtype: &str) -> RawHandle {
        self.new_object(ObjectKind::Instance, subtype)
    }
    pub fn new_surface(&self) -> RawHandle {
        self.new_object(ObjectKind::Surface, "")
    }
    pub fn new_group(&self) -> RawHandle {
        self.new_object(ObjectKind::Group, "")
    }
    pub fn new_world(&self) -> RawHandle {
        self.new_object(ObjectKind::World, "")
    }
    pub fn new_frame(&self) -> RawHandle {
        self.new_object(ObjectKind::Frame, "")
    }

    /// `newObject(kindName, subtype)` (§4.5): a backend-defined kind
    /// outside the core enumeration.
    pub fn new_object_extension(&self, kind_name: &str, subtype: &str) -> RawHandle {
        let handle = self
            .handles
            .create(ObjectKind::Extension, Ustr::from(subtype));
        if let Err(e) = self
            .backend
            .create_extension_object(handle, kind_name, subtype)
        {
            self.fail(ErrorCode::BackendFailure, e.to_string());
        }
        handle
    }

    // ---- arrays (§4.4, §6.2) ------------------------------------------

    pub fn new_array1d(
        &self,
        app_memory: *mut c_void,
        deleter: AnariMemoryDeleter,
        user_data: *mut c_void,
        element_type: DataType,
        num_items1: usize,
    ) -> RawHandle {
        let handle = self.handles.create(ObjectKind::Array1D, Ustr::from(""));
        self.arrays.register(
            handle,
            element_type,
            array::dims3(num_items1, None, None),
            app_memory,
            deleter,
            user_data,
        );
        self.sync_array_handle_elements(handle);
        handle
    }

    pub fn new_array2d(
        &self,
        app_memory: *mut c_void,
        deleter: AnariMemoryDeleter,
        user_data: *mut c_void,
        element_type: DataType,
        num_items1: usize,
        num_items2: usize,
    ) -> RawHandle {
        let handle = self.handles.create(ObjectKind::Array2D, Ustr::from(""));
        self.arrays.register(
            handle,
            element_type,
            array::dims3(num_items1, Some(num_items2), None),
            app_memory,
            deleter,
            user_data,
        );
        self.sync_array_handle_elements(handle);
        handle
    }

    pub fn new_array3d(
        &self,
        app_memory: *mut c_void,
        deleter: AnariMemoryDeleter,
        user_data: *mut c_void,
        element_type: DataType,
        num_items1: usize,
        num_items2: usize,
        num_items3: usize,
    ) -> RawHandle {
        let handle = self.handles.create(ObjectKind::Array3D, Ustr::from(""));
        self.arrays.register(
            handle,
            element_type,
            array::dims3(num_items1, Some(num_items2), Some(num_items3)),
            app_memory,
            deleter,
            user_data,
        );
        self.sync_array_handle_elements(handle);
        handle
    }

    pub fn map_array(&self, handle: RawHandle) -> Result<*mut u8, ErrorCode> {
        self.arrays.map(handle).inspect_err(|e| self.fail(*e, format!("mapArray({handle})")))
    }

    /// `unmapArray` (§4.4): besides returning the array to the unmapped
    /// state, a rewrite through the mapped pointer may have changed which
    /// handles an object-typed array holds, so the retain/release diff
    /// runs again here too.
    pub fn unmap_array(&self, handle: RawHandle) -> Result<(), ErrorCode> {
        self.arrays.unmap(handle).inspect_err(|e| self.fail(*e, format!("unmapArray({handle})")))?;
        self.sync_array_handle_elements(handle);
        Ok(())
    }

    pub fn map_parameter_array1d(
        &self,
        object: RawHandle,
        name: &str,
        element_type: DataType,
        num_items1: usize,
    ) -> (*mut u8, usize) {
        self.arrays.map_parameter_array(
            object,
            Ustr::from(name),
            element_type,
            array::dims3(num_items1, None, None),
        )
    }

    pub fn map_parameter_array2d(
        &self,
        object: RawHandle,
        name: &str,
        element_type: DataType,
        num_items1: usize,
        num_items2: usize,
    ) -> (*mut u8, usize) {
        self.arrays.map_parameter_array(
            object,
            Ustr::from(name),
            element_type,
            array::dims3(num_items1, Some(num_items2), None),
        )
    }

    pub fn map_parameter_array3d(
        &self,
        object: RawHandle,
        name: &str,
        element_type: DataType,
        num_items1: usize,
        num_items2: usize,
        num_items3: usize,
    ) -> (*mut u8, usize) {
        self.arrays.map_parameter_array(
            object,
            Ustr::from(name),
            element_type,
            array::dims3(num_items1, Some(num_items2), Some(num_items3)),
        )
    }

    /// Finalizes a directly-mapped parameter array: the scratch buffer
    /// becomes an owned array object, referenced from `object`'s `name`
    /// parameter exactly as if the client had called `newArray` + `setParameter`.
    pub fn unmap_parameter_array(&self, object: RawHandle, name: &str) -> Result<(), ErrorCode> {
        let Some((element_type, dims, bytes)) = self.arrays.unmap_parameter_array(object, name)
        else {
            return Ok(());
        };
        let kind = match dims {
            [_, 1, 1] => ObjectKind::Array1D,
            [_, _, 1] => ObjectKind::Array2D,
            _ => ObjectKind::Array3D,
        };
        let array_handle = self.handles.create(kind, Ustr::from(""));
        self.arrays.register_owned(array_handle, element_type, dims, bytes);
        self.sync_array_handle_elements(array_handle);
        self.set_parameter(
            object,
            name,
            ParamValue::handle(array_type_for(kind), array_handle),
        )
    }

    // ---- parameters (§4.3, §6.2) ---------------------------------------

    fn table_for(&self, handle: RawHandle) -> &HandleTable {
        if self.targets_device(handle) {
            &self.own_parameters
        } else {
            &self.handles
        }
    }

    pub fn set_parameter(
        &self,
        handle: RawHandle,
        name: &str,
        value: ParamValue,
    ) -> Result<(), ErrorCode> {
        if handle == ANARI_NULL {
            self.fail(ErrorCode::NullHandle, "setParameter on a null handle");
            return Err(ErrorCode::NullHandle);
        }
        if let Some(referenced) = value.referenced_handle() {
            if let Err(e) = self.handles.retain(referenced) {
                let e = self.classify_handle_error(referenced, e);
                self.fail(e, format!("setParameter {name:?} references handle {referenced}"));
                return Err(e);
            }
        }
        let table = self.table_for(handle);
        match table.set_parameter(handle, Ustr::from(name), value) {
            Ok(previous) => {
                if let Some(prev_handle) = previous {
                    let _ = self.release(prev_handle);
                }
                Ok(())
            }
            Err(e) => {
                let e = self.classify_handle_error(handle, e);
                self.fail(e, format!("setParameter({handle}, {name:?})"));
                Err(e)
            }
        }
    }

    pub fn unset_parameter(&self, handle: RawHandle, name: &str) -> Result<(), ErrorCode> {
        match self.table_for(handle).unset_parameter(handle, name) {
            Ok(previous) => {
                if let Some(h) = previous {
                    let _ = self.release(h);
                }
                Ok(())
            }
            Err(e) => {
                let e = self.classify_handle_error(handle, e);
                self.fail(e, format!("unsetParameter({handle}, {name:?})"));
                Err(e)
            }
        }
    }

    pub fn unset_all_parameters(&self, handle: RawHandle) -> Result<(), ErrorCode> {
        match self.table_for(handle).unset_all_parameters(handle) {
            Ok(previous) => {
                for h in previous {
                    let _ = self.release(h);
                }
                Ok(())
            }
            Err(e) => {
                let e = self.classify_handle_error(handle, e);
                self.fail(e, format!("unsetAllParameters({handle})"));
                Err(e)
            }
        }
    }

    pub fn commit_parameters(&self, handle: RawHandle) -> Result<(), ErrorCode> {
        if self.targets_device(handle) {
            // Device-level commits have no backend object to forward to;
            // only the bookkeeping (and reference accounting) applies.
            let (to_release, to_retain) = self.own_parameters.commit_parameters(handle)?;
            for h in to_retain {
                let _ = self.handles.retain(h);
            }
            for h in to_release {
                let _ = self.release(h);
            }
            return Ok(());
        }
        let kind = match self.handles.kind_of(handle) {
            Some(k) => k,
            None => {
                let e = self.classify_handle_error(handle, ErrorCode::DeadHandle);
                self.fail(e, format!("commitParameters({handle})"));
                return Err(e);
            }
        };
        let (to_release, to_retain) = self.handles.commit_parameters(handle)?;
        for h in to_retain {
            let _ = self.handles.retain(h);
        }
        for h in to_release {
            let _ = self.release(h);
        }
        let committed = self.handles.committed_snapshot(handle)?;
        if let Err(e) = self.backend.commit_object(handle, kind, &committed) {
            self.fail(ErrorCode::BackendFailure, e.to_string());
        }
        if kind == ObjectKind::Frame {
            if let Some(fsm) = self.frames.lock().unwrap().get(&handle) {
                fsm.mark_configured();
            }
        }
        Ok(())
    }

    pub fn retain(&self, handle: RawHandle) -> Result<(), ErrorCode> {
        self.handles
            .retain(handle)
            .map_err(|e| self.classify_handle_error(handle, e))
    }

    /// `release` (§4.3, §6.2): drops one reference, and if it was the
    /// last, destroys the object — invoking the backend destructor,
    /// releasing any handles the object's own parameters held, and (for
    /// arrays) the registered deleter. Refuses with `BusyResource` instead
    /// of destroying a mapped array, or anything still reachable from an
    /// in-flight frame (§5).
    pub fn release(&self, handle: RawHandle) -> Result<(), ErrorCode> {
        if handle == ANARI_NULL {
            return Ok(());
        }
        if self.handles.refcount(handle) == Ok(1) {
            if let Some(kind) = self.handles.kind_of(handle) {
                if kind.is_array() && self.arrays.is_mapped(handle) {
                    self.fail(ErrorCode::BusyResource, format!("release of mapped array {handle}"));
                    return Err(ErrorCode::BusyResource);
                }
                if self.is_referenced_by_in_flight_frame(handle) {
                    self.fail(
                        ErrorCode::BusyResource,
                        format!("release of {handle}, referenced by an in-flight frame"),
                    );
                    return Err(ErrorCode::BusyResource);
                }
            }
        }
        match self.handles.release(handle) {
            Ok(Some(record)) => {
                self.backend.destroy_object(handle);
                if record.kind.is_array() {
                    for h in self.arrays.destroy(handle) {
                        let _ = self.release(h);
                    }
                }
                if record.kind == ObjectKind::Frame {
                    self.frames.lock().unwrap().remove(&handle);
                }
                let referenced: Vec<RawHandle> = record
                    .staged
                    .values()
                    .chain(record.committed.values())
                    .filter_map(|v| v.referenced_handle())
                    .collect();
                for h in referenced {
                    let _ = self.release(h);
                }
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => {
                let e = self.classify_handle_error(handle, e);
                self.fail(e, format!("release of dead handle {handle}"));
                Err(e)
            }
        }
    }

    // ---- properties and extensions (§4.6, §6.2) -------------------------

    /// `getProperty` (§6.2, §9's Open Question resolution): if the
    /// property exists but doesn't fit in `out_size` bytes, returns
    /// `Ok(None)` and writes nothing — it is not reported as an error.
    pub fn get_property(
        &self,
        handle: RawHandle,
        name: &str,
        out_size: usize,
        wait: bool,
    ) -> Result<Option<Vec<u8>>, ErrorCode> {
        if !self.handles.is_live(handle) {
            return Err(self.classify_handle_error(handle, ErrorCode::DeadHandle));
        }
        match self.backend.get_property(handle, name, wait) {
            Some(prop) if prop.bytes.len() <= out_size => Ok(Some(prop.bytes)),
            _ => Ok(None),
        }
    }

    pub fn device_extensions(&self) -> ExtensionSet {
        self.library.device_extensions(&self.subtype)
    }

    pub fn object_extensions(&self, handle: RawHandle) -> ExtensionSet {
        self.backend.object_extensions(handle)
    }

    pub fn get_proc_address(&self, name: &str) -> Option<usize> {
        self.backend.get_proc_address(name)
    }

    // ---- frames (§4.7, §6.2) --------------------------------------------

    fn frame(&self, frame: RawHandle) -> Result<Arc<FrameStateMachine>, ErrorCode> {
        self.frames
            .lock()
            .unwrap()
            .get(&frame)
            .cloned()
            .ok_or(ErrorCode::DeadHandle)
    }

    pub fn render_frame(&self, frame: RawHandle) -> Result<(), ErrorCode> {
        let fsm = self.frame(frame)?;
        fsm.render().inspect_err(|e| self.fail(*e, format!("renderFrame({frame})")))?;
        self.backend.render_frame(frame);
        Ok(())
    }

    pub fn frame_ready(&self, frame: RawHandle, wait: bool) -> Result<bool, ErrorCode> {
        let fsm = self.frame(frame)?;
        let ready = self.backend.frame_ready(frame, wait);
        if ready {
            fsm.mark_ready();
        }
        Ok(ready)
    }

    pub fn discard_frame(&self, frame: RawHandle) -> Result<(), ErrorCode> {
        let fsm = self.frame(frame)?;
        fsm.discard().inspect_err(|e| self.fail(*e, format!("discardFrame({frame})")))?;
        self.backend.discard_frame(frame);
        Ok(())
    }

    pub fn map_frame(&self, frame: RawHandle, channel: &str) -> Result<Option<FrameChannel>, ErrorCode> {
        let fsm = self.frame(frame)?;
        fsm.map_channel(channel)
            .inspect_err(|e| self.fail(*e, format!("mapFrame({frame}, {channel:?})")))?;
        Ok(self.backend.map_frame(frame, channel))
    }

    pub fn unmap_frame(&self, frame: RawHandle, channel: &str) -> Result<(), ErrorCode> {
        let fsm = self.frame(frame)?;
        fsm.unmap_channel(channel)
            .inspect_err(|e| self.fail(*e, format!("unmapFrame({frame}, {channel:?})")))?;
        self.backend.unmap_frame(frame, channel);
        Ok(())
    }
}

/// The array `DataType` a committed array-kind object is referenced by.
fn array_type_for(kind: ObjectKind) -> DataType {
    match kind {
        ObjectKind::Array1D => DataType::Array1d,
        ObjectKind::Array2D => DataType::Array2d,
        _ => DataType::Array3d,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::default_status_callback;
    use anari_backend::{Backend, BackendError, ParameterDescriptor, PropertyValue, StatusSink};
    use anari_types::ParamMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingBackend {
        commits: AtomicUsize,
    }
    struct CountingDevice {
        commits: AtomicUsize,
    }

    impl Backend for CountingBackend {
        fn device_subtypes(&self) -> Vec<&'static str> {
            vec!["default"]
        }
        fn object_subtypes(&self, _d: &str, _k: ObjectKind) -> Vec<&'static str> {
            vec![]
        }
        fn parameter_descriptors(&self, _d: &str, _o: &str, _k: ObjectKind) -> Vec<ParameterDescriptor> {
            vec![]
        }
        fn device_extensions(&self, _d: &str) -> ExtensionSet {
            ExtensionSet::default()
        }
        fn new_device(&self, _s: &str, _status: StatusSink) -> Result<Box<dyn BackendDevice>, BackendError> {
            Ok(Box::new(CountingDevice {
                commits: AtomicUsize::new(0),
            }))
        }
    }

    impl BackendDevice for CountingDevice {
        fn create_object(&self, _h: RawHandle, _k: ObjectKind, _s: &str) -> Result<(), BackendError> {
            Ok(())
        }
        fn destroy_object(&self, _h: RawHandle) {}
        fn commit_object(&self, _h: RawHandle, _k: ObjectKind, _p: &ParamMap) -> Result<(), BackendError> {
            self.commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn object_extensions(&self, _h: RawHandle) -> ExtensionSet {
            ExtensionSet::default()
        }
        fn get_property(&self, _h: RawHandle, name: &str, _w: bool) -> Option<PropertyValue> {
            if name == "bounds" {
                Some(PropertyValue {
                    data_type: DataType::Float32,
                    bytes: vec![0u8; 24],
                })
            } else {
                None
            }
        }
        fn render_frame(&self, _f: RawHandle) {}
        fn frame_ready(&self, _f: RawHandle, _w: bool) -> bool {
            true
        }
        fn discard_frame(&self, _f: RawHandle) {}
        fn map_frame(&self, _f: RawHandle, _c: &str) -> Option<FrameChannel> {
            None
        }
        fn unmap_frame(&self, _f: RawHandle, _c: &str) {}
        fn get_proc_address(&self, _n: &str) -> Option<usize> {
            None
        }
    }

    fn test_device() -> Device {
        anari_backend::linked::register(
            "device-test-backend",
            Arc::new(CountingBackend {
                commits: AtomicUsize::new(0),
            }),
        );
        let library = Library::load("device-test-backend", default_status_callback()).unwrap();
        Device::new(library, "default", default_status_callback()).unwrap()
    }

    #[test]
    fn create_commit_release_round_trip() {
        let d = test_device();
        let material = d.new_material("matte");
        d.set_parameter(
            material,
            "color",
            ParamValue::from_bytes(DataType::Float32Vec3, &[0u8; 12]),
        )
        .unwrap();
        d.commit_parameters(material).unwrap();
        d.release(material).unwrap();
    }

    #[test]
    fn releasing_an_owner_releases_its_referenced_children() {
        let d = test_device();
        let surface = d.new_surface();
        let material = d.new_material("matte");
        d.set_parameter(
            surface,
            "material",
            ParamValue::handle(DataType::Material, material),
        )
        .unwrap();
        d.commit_parameters(surface).unwrap();
        assert_eq!(d.handles.refcount(material).unwrap(), 2);
        d.release(material).unwrap();
        assert_eq!(d.handles.refcount(material).unwrap(), 1);
        d.release(surface).unwrap();
        assert!(!d.handles.is_live(material));
    }

    #[test]
    fn get_property_too_small_reports_none_without_error() {
        let d = test_device();
        let world = d.new_world();
        let got = d.get_property(world, "bounds", 4, false).unwrap();
        assert!(got.is_none());
        let got = d.get_property(world, "bounds", 24, false).unwrap();
        assert!(got.is_some());
    }

    #[test]
    fn frame_pipeline_runs_end_to_end() {
        let d = test_device();
        let frame = d.new_frame();
        d.commit_parameters(frame).unwrap();
        d.render_frame(frame).unwrap();
        assert!(d.frame_ready(frame, true).unwrap());
        d.map_frame(frame, "channel.color").unwrap();
        d.unmap_frame(frame, "channel.color").unwrap();
    }

    #[test]
    fn release_of_mapped_array_is_busy_resource() {
        let d = test_device();
        let array = d.new_array1d(std::ptr::null_mut(), None, std::ptr::null_mut(), DataType::Float32, 4);
        d.map_array(array).unwrap();
        assert_eq!(d.release(array), Err(ErrorCode::BusyResource));
        assert_eq!(d.handles.refcount(array).unwrap(), 1);
        d.unmap_array(array).unwrap();
        d.release(array).unwrap();
    }

    #[test]
    fn release_of_handle_referenced_by_in_flight_frame_is_busy_resource() {
        let d = test_device();
        let world = d.new_world();
        let frame = d.new_frame();
        d.set_parameter(frame, "world", ParamValue::handle(DataType::World, world))
            .unwrap();
        d.commit_parameters(frame).unwrap();
        d.release(world).unwrap();

        d.render_frame(frame).unwrap();
        assert_eq!(d.release(world), Err(ErrorCode::BusyResource));

        assert!(d.frame_ready(frame, true).unwrap());
        d.release(world).unwrap();
        assert!(!d.handles.is_live(world));
    }

    #[test]
    fn cross_device_handle_is_kind_mismatch_not_dead_handle() {
        let a = test_device();
        let b = test_device();
        let handle_from_a = a.new_surface();
        assert_eq!(
            b.set_parameter(handle_from_a, "x", ParamValue::from_bytes(DataType::Float32, &[0u8; 4])),
            Err(ErrorCode::KindMismatch)
        );
        a.release(handle_from_a).unwrap();
        assert_eq!(
            b.set_parameter(handle_from_a, "x", ParamValue::from_bytes(DataType::Float32, &[0u8; 4])),
            Err(ErrorCode::DeadHandle)
        );
    }
}
