//! The passthrough device itself (§4.8): wraps a `BackendDevice` and
//! forwards every operation, adding naming, tracing, leak detection,
//! commit diffing, and handle-kind validation on top.

use crate::names::NameTable;
use crate::trace::TraceWriter;
use crate::{config, validation_log_level};
use anari_backend::{
    Backend, BackendDevice, BackendError, FrameChannel, ParameterDescriptor, PropertyValue,
    StatusSink,
};
use anari_types::{ExtensionSet, ObjectKind, ParamMap, RawHandle, StatusReport, StatusSeverity};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

static INSTANCE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A `Backend` that hands back [`DebugDevice`]-wrapped devices instead of
/// the wrapped backend's own. §4.8's "itself a device implementation...
/// can be stacked" applies at this seam too: `DebugBackend::wrap` accepts
/// any `Arc<dyn Backend>`, including another `DebugBackend`.
pub struct DebugBackend {
    inner: Arc<dyn Backend>,
}

impl DebugBackend {
    pub fn wrap(inner: Arc<dyn Backend>) -> Arc<dyn Backend> {
        Arc::new(DebugBackend { inner })
    }
}

impl Backend for DebugBackend {
    fn device_subtypes(&self) -> Vec<&'static str> {
        self.inner.device_subtypes()
    }

    fn object_subtypes(&self, device_subtype: &str, kind: ObjectKind) -> Vec<&'static str> {
        self.inner.object_subtypes(device_subtype, kind)
    }

    fn parameter_descriptors(
        &self,
        device_subtype: &str,
        object_subtype: &str,
        kind: ObjectKind,
    ) -> Vec<ParameterDescriptor> {
        self.inner
            .parameter_descriptors(device_subtype, object_subtype, kind)
    }

    fn device_extensions(&self, device_subtype: &str) -> ExtensionSet {
        self.inner.device_extensions(device_subtype)
    }

    fn new_device(
        &self,
        subtype: &str,
        status: StatusSink,
    ) -> Result<Box<dyn BackendDevice>, BackendError> {
        let instance = INSTANCE_COUNTER.fetch_add(1, Ordering::SeqCst);
        let wrapped_status: StatusSink = {
            let status = status.clone();
            Arc::new(move |report: StatusReport| {
                log::log!(
                    validation_log_level(report.severity),
                    "[VALIDATION] {:?}: {}",
                    report.code,
                    report.message
                );
                status(report);
            })
        };
        let inner = self.inner.new_device(subtype, wrapped_status.clone())?;
        let trace = config::trace_dir().and_then(|dir| {
            TraceWriter::open(&dir, &format!("{instance}")).ok()
        });
        Ok(Box::new(DebugDevice {
            inner,
            names: NameTable::new(),
            trace,
            backtrace: config::print_backtrace(),
            live: Mutex::new(HashMap::new()),
            committed: Mutex::new(HashMap::new()),
            status: wrapped_status,
        }))
    }
}

pub struct DebugDevice {
    inner: Box<dyn BackendDevice>,
    names: NameTable,
    trace: Option<TraceWriter>,
    backtrace: bool,
    live: Mutex<HashMap<RawHandle, ObjectKind>>,
    committed: Mutex<HashMap<RawHandle, ParamMap>>,
    status: StatusSink,
}

impl DebugDevice {
    fn trace_call(&self, rendered: &str) {
        if let Some(t) = &self.trace {
            t.call(rendered);
            if self.backtrace {
                t.status(&format!("at:\n{:?}", backtrace::Backtrace::new()));
            }
        }
    }

    fn warn(&self, code: anari_types::ErrorCode, message: String) {
        log::warn!("[VALIDATION] {code:?}: {message}");
        (self.status)(StatusReport::new(StatusSeverity::Warning, code, message));
    }
}

impl BackendDevice for DebugDevice {
    fn create_object(
        &self,
        handle: RawHandle,
        kind: ObjectKind,
        subtype: &str,
    ) -> Result<(), BackendError> {
        let name = self.names.assign(handle, kind);
        self.trace_call(&format!("{name} = new{}(\"{subtype}\")", kind.name()));
        self.live.lock().unwrap().insert(handle, kind);
        self.inner.create_object(handle, kind, subtype)
    }

    fn create_extension_object(
        &self,
        handle: RawHandle,
        kind_name: &str,
        subtype: &str,
    ) -> Result<(), BackendError> {
        let name = self.names.assign(handle, ObjectKind::Extension);
        self.trace_call(&format!("{name} = newObject(\"{kind_name}\", \"{subtype}\")"));
        self.live.lock().unwrap().insert(handle, ObjectKind::Extension);
        self.inner.create_extension_object(handle, kind_name, subtype)
    }

    fn destroy_object(&self, handle: RawHandle) {
        let name = self.names.name_of(handle);
        self.trace_call(&format!("destroy({name})"));
        self.live.lock().unwrap().remove(&handle);
        self.committed.lock().unwrap().remove(&handle);
        self.inner.destroy_object(handle);
    }

    fn commit_object(
        &self,
        handle: RawHandle,
        kind: ObjectKind,
        committed: &ParamMap,
    ) -> Result<(), BackendError> {
        let name = self.names.name_of(handle);
        let live = self.live.lock().unwrap();
        for value in committed.values() {
            if let Some(referenced) = value.referenced_handle() {
                if !live.contains_key(&referenced) {
                    self.warn(
                        anari_types::ErrorCode::KindMismatch,
                        format!(
                            "{name}: committed parameter references {}, which is not live on this device",
                            self.names.name_of(referenced)
                        ),
                    );
                }
            }
        }
        drop(live);

        let mut snapshots = self.committed.lock().unwrap();
        let previous = snapshots.get(&handle);
        if previous.map(|p| p == committed).unwrap_or(false) {
            if let Some(t) = &self.trace {
                t.status(&format!("Info: redundant commit({name}), snapshot unchanged"));
            }
            log::info!("[VALIDATION] redundant commit on {name}");
        } else {
            let mut changed: Vec<&str> = Vec::new();
            for (k, v) in committed {
                let differs = previous.and_then(|p| p.get(k)).map(|pv| pv != v).unwrap_or(true);
                if differs {
                    changed.push(k.as_str());
                }
            }
            self.trace_call(&format!("commit({name}) // changed: {}", changed.join(", ")));
        }
        snapshots.insert(handle, committed.clone());
        drop(snapshots);

        self.inner.commit_object(handle, kind, committed)
    }

    fn object_extensions(&self, handle: RawHandle) -> ExtensionSet {
        self.inner.object_extensions(handle)
    }

    fn get_property(&self, handle: RawHandle, name: &str, wait: bool) -> Option<PropertyValue> {
        self.trace_call(&format!("getProperty({}, \"{name}\")", self.names.name_of(handle)));
        self.inner.get_property(handle, name, wait)
    }

    fn render_frame(&self, frame: RawHandle) {
        self.trace_call(&format!("renderFrame({})", self.names.name_of(frame)));
        self.inner.render_frame(frame);
    }

    fn frame_ready(&self, frame: RawHandle, wait: bool) -> bool {
        self.inner.frame_ready(frame, wait)
    }

    fn discard_frame(&self, frame: RawHandle) {
        self.trace_call(&format!("discardFrame({})", self.names.name_of(frame)));
        self.inner.discard_frame(frame);
    }

    fn map_frame(&self, frame: RawHandle, channel: &str) -> Option<FrameChannel> {
        self.trace_call(&format!(
            "mapFrame({}, \"{channel}\")",
            self.names.name_of(frame)
        ));
        self.inner.map_frame(frame, channel)
    }

    fn unmap_frame(&self, frame: RawHandle, channel: &str) {
        self.trace_call(&format!(
            "unmapFrame({}, \"{channel}\")",
            self.names.name_of(frame)
        ));
        self.inner.unmap_frame(frame, channel);
    }

    fn get_proc_address(&self, name: &str) -> Option<usize> {
        self.inner.get_proc_address(name)
    }
}

impl Drop for DebugDevice {
    /// Leak detection (§4.8): any handle created but never destroyed by
    /// the time the device itself goes away is reported, matching the
    /// spec's "reports leaks at device destruction."
    fn drop(&mut self) {
        let live = self.live.lock().unwrap();
        for (handle, kind) in live.iter() {
            self.warn(
                anari_types::ErrorCode::StateViolation,
                format!(
                    "leaked {} object {} at device destruction",
                    kind.name(),
                    self.names.name_of(*handle)
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anari_types::{DataType, ParamValue};
    use std::sync::atomic::{AtomicUsize, Ordering as Ord};
    use ustr::Ustr;

    struct NoopBackend;
    struct NoopDevice;

    impl Backend for NoopBackend {
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
            Ok(Box::new(NoopDevice))
        }
    }

    impl BackendDevice for NoopDevice {
        fn create_object(&self, _h: RawHandle, _k: ObjectKind, _s: &str) -> Result<(), BackendError> {
            Ok(())
        }
        fn destroy_object(&self, _h: RawHandle) {}
        fn commit_object(&self, _h: RawHandle, _k: ObjectKind, _p: &ParamMap) -> Result<(), BackendError> {
            Ok(())
        }
        fn object_extensions(&self, _h: RawHandle) -> ExtensionSet {
            ExtensionSet::default()
        }
        fn get_property(&self, _h: RawHandle, _n: &str, _w: bool) -> Option<PropertyValue> {
            None
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

    fn debug_device() -> Box<dyn BackendDevice> {
        let backend = DebugBackend::wrap(Arc::new(NoopBackend));
        backend
            .new_device("default", Arc::new(|_: StatusReport| {}))
            .unwrap()
    }

    #[test]
    fn leaked_object_is_reported_at_drop() {
        static LEAKS: AtomicUsize = AtomicUsize::new(0);
        let backend = DebugBackend::wrap(Arc::new(NoopBackend));
        let status: StatusSink = Arc::new(|r: StatusReport| {
            if r.message.contains("leaked") {
                LEAKS.fetch_add(1, Ord::SeqCst);
            }
        });
        {
            let device = backend.new_device("default", status).unwrap();
            device.create_object(1, ObjectKind::Material, "matte").unwrap();
        }
        assert_eq!(LEAKS.load(Ord::SeqCst), 1);
    }

    #[test]
    fn redundant_commit_does_not_panic_and_is_idempotent() {
        let device = debug_device();
        device.create_object(1, ObjectKind::Material, "matte").unwrap();
        let mut params = ParamMap::new();
        params.insert(
            Ustr::from("color"),
            ParamValue::from_bytes(DataType::Float32Vec3, &[0u8; 12]),
        );
        device.commit_object(1, ObjectKind::Material, &params).unwrap();
        device.commit_object(1, ObjectKind::Material, &params).unwrap();
    }

    #[test]
    fn dangling_handle_reference_is_flagged() {
        let device = debug_device();
        device.create_object(1, ObjectKind::Surface, "").unwrap();
        let mut params = ParamMap::new();
        params.insert(
            Ustr::from("material"),
            ParamValue::handle(DataType::Material, 999),
        );
        // Must not panic; the validation warning path is exercised even
        // though there is no assertion harness for log output here.
        device.commit_object(1, ObjectKind::Surface, &params).unwrap();
    }
}
