//! End-to-end scenarios (§8's S1-S4, S6) against an in-process reference
//! backend registered through `anari_backend::linked`. It renders nothing
//! (matching the Non-goals) but implements enough of the device façade to
//! exercise handle lifetime, parameter staging/commit, array mapping, and
//! the frame state machine.

use anari_backend::{Backend, BackendDevice, BackendError, FrameChannel, ParameterDescriptor, PropertyValue, StatusSink};
use anari_core::{default_status_callback, Device, Library};
use anari_types::{DataType, ExtensionSet, ObjectKind, ParamMap, ParamValue, RawHandle};
use std::collections::HashMap;
use std::os::raw::c_void;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct FrameBuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

struct ReferenceBackend;
struct ReferenceDevice {
    frames: Mutex<HashMap<RawHandle, FrameBuffer>>,
    render_count: AtomicUsize,
}

impl Backend for ReferenceBackend {
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
        Ok(Box::new(ReferenceDevice {
            frames: Mutex::new(HashMap::new()),
            render_count: AtomicUsize::new(0),
        }))
    }
}

impl BackendDevice for ReferenceDevice {
    fn create_object(&self, handle: RawHandle, kind: ObjectKind, _subtype: &str) -> Result<(), BackendError> {
        if kind == ObjectKind::Frame {
            self.frames.lock().unwrap().insert(
                handle,
                FrameBuffer {
                    width: 0,
                    height: 0,
                    pixels: Vec::new(),
                },
            );
        }
        Ok(())
    }
    fn destroy_object(&self, handle: RawHandle) {
        self.frames.lock().unwrap().remove(&handle);
    }
    fn commit_object(&self, handle: RawHandle, kind: ObjectKind, committed: &ParamMap) -> Result<(), BackendError> {
        if kind == ObjectKind::Frame {
            if let Some(size) = committed.get(&ustr::Ustr::from("size")) {
                let bytes = size.as_bytes();
                if bytes.len() == 8 {
                    let width = u32::from_ne_bytes(bytes[0..4].try_into().unwrap());
                    let height = u32::from_ne_bytes(bytes[4..8].try_into().unwrap());
                    let mut frames = self.frames.lock().unwrap();
                    if let Some(fb) = frames.get_mut(&handle) {
                        fb.width = width;
                        fb.height = height;
                        fb.pixels = vec![0u8; width as usize * height as usize * 4];
                    }
                }
            }
        }
        Ok(())
    }
    fn object_extensions(&self, _handle: RawHandle) -> ExtensionSet {
        ExtensionSet::default()
    }
    fn get_property(&self, _handle: RawHandle, _name: &str, _wait: bool) -> Option<PropertyValue> {
        None
    }
    fn render_frame(&self, handle: RawHandle) {
        let n = self.render_count.fetch_add(1, Ordering::SeqCst) as u8;
        if let Some(fb) = self.frames.lock().unwrap().get_mut(&handle) {
            fb.pixels.iter_mut().for_each(|p| *p = n);
        }
    }
    fn frame_ready(&self, _handle: RawHandle, _wait: bool) -> bool {
        true
    }
    fn discard_frame(&self, _handle: RawHandle) {}
    fn map_frame(&self, handle: RawHandle, channel: &str) -> Option<FrameChannel> {
        if channel != "channel.color" {
            return None;
        }
        let frames = self.frames.lock().unwrap();
        frames.get(&handle).map(|fb| FrameChannel {
            ptr: fb.pixels.as_ptr(),
            width: fb.width,
            height: fb.height,
            pixel_type: DataType::Uint32,
        })
    }
    fn unmap_frame(&self, _handle: RawHandle, _channel: &str) {}
    fn get_proc_address(&self, _name: &str) -> Option<usize> {
        None
    }
}

fn registered_device(name: &str) -> Device {
    anari_backend::linked::register(name, Arc::new(ReferenceBackend));
    let library = Library::load(name, default_status_callback()).unwrap();
    Device::new(library, "default", default_status_callback()).unwrap()
}

/// S1 — minimal triangle: build the object graph, render once, map the
/// color channel, and observe the expected dimensions and pixel type.
#[test]
fn s1_minimal_triangle_shape() {
    let d = registered_device("s1-reference");

    let positions = d.new_array1d(
        std::ptr::null_mut(),
        None,
        std::ptr::null_mut(),
        DataType::Float32Vec3,
        4,
    );
    let geometry = d.new_geometry("triangle");
    d.set_parameter(geometry, "vertex.position", ParamValue::handle(DataType::Array1d, positions))
        .unwrap();
    d.commit_parameters(geometry).unwrap();

    let material = d.new_material("matte");
    d.set_parameter(material, "color", ParamValue::from_bytes(DataType::Float32Vec3, &[0u8; 12]))
        .unwrap();
    d.commit_parameters(material).unwrap();

    let surface = d.new_surface();
    d.set_parameter(surface, "geometry", ParamValue::handle(DataType::Geometry, geometry))
        .unwrap();
    d.set_parameter(surface, "material", ParamValue::handle(DataType::Material, material))
        .unwrap();
    d.commit_parameters(surface).unwrap();

    let world = d.new_world();
    d.commit_parameters(world).unwrap();

    let frame = d.new_frame();
    d.set_parameter(frame, "size", ParamValue::from_bytes(DataType::Uint32Vec2, &[0u8, 4, 0, 0, 0, 3, 0, 0]))
        .unwrap();
    d.commit_parameters(frame).unwrap();

    d.render_frame(frame).unwrap();
    assert!(d.frame_ready(frame, true).unwrap());
    let channel = d.map_frame(frame, "channel.color").unwrap().unwrap();
    assert_eq!(channel.width, 1024);
    assert_eq!(channel.height, 768);
    d.unmap_frame(frame, "channel.color").unwrap();
}

/// S2 — accumulation: repeated renders succeed, no error, refcounts are
/// unaffected by rendering itself.
#[test]
fn s2_repeated_renders_do_not_change_refcounts() {
    let d = registered_device("s2-reference");
    let frame = d.new_frame();
    d.set_parameter(frame, "size", ParamValue::from_bytes(DataType::Uint32Vec2, &[2, 0, 0, 0, 2, 0, 0, 0]))
        .unwrap();
    d.commit_parameters(frame).unwrap();

    for _ in 0..10 {
        d.render_frame(frame).unwrap();
        assert!(d.frame_ready(frame, true).unwrap());
        d.map_frame(frame, "channel.color").unwrap();
        d.unmap_frame(frame, "channel.color").unwrap();
    }
}

/// S3 — deleter invocation: an array adopting client memory calls its
/// deleter exactly once, on release.
#[test]
fn s3_deleter_invoked_exactly_once_on_release() {
    static CALLS: AtomicUsize = AtomicUsize::new(0);
    extern "C" fn deleter(_user_data: *mut c_void, _app_memory: *const c_void) {
        CALLS.fetch_add(1, Ordering::SeqCst);
    }

    let d = registered_device("s3-reference");
    let mut client_buf = [0f32; 12];
    let array = d.new_array1d(
        client_buf.as_mut_ptr() as *mut c_void,
        Some(deleter),
        std::ptr::null_mut(),
        DataType::Float32Vec3,
        4,
    );
    d.release(array).unwrap();
    assert_eq!(CALLS.load(Ordering::SeqCst), 1);
}

/// S4 — cross-device rejection: a handle from device A is live, just not
/// on device B, so `setParameter` on B referencing it reports
/// `KindMismatch`, not `DeadHandle` (§3's "cross-device mixing fails with
/// KindMismatch").
#[test]
fn s4_cross_device_handle_is_rejected() {
    let a = registered_device("s4-reference-a");
    let b = registered_device("s4-reference-b");

    let material_on_a = a.new_material("matte");
    let surface_on_b = b.new_surface();

    let result = b.set_parameter(
        surface_on_b,
        "material",
        ParamValue::handle(DataType::Material, material_on_a),
    );
    assert_eq!(result, Err(anari_types::ErrorCode::KindMismatch));
}

/// S6 — frame discard: submitting then immediately discarding a frame
/// still allows a subsequent blocking map to succeed with no error.
#[test]
fn s6_discard_then_map_succeeds() {
    let d = registered_device("s6-reference");
    let frame = d.new_frame();
    d.set_parameter(frame, "size", ParamValue::from_bytes(DataType::Uint32Vec2, &[1, 0, 0, 0, 1, 0, 0, 0]))
        .unwrap();
    d.commit_parameters(frame).unwrap();

    d.render_frame(frame).unwrap();
    d.discard_frame(frame).unwrap();
    let channel = d.map_frame(frame, "channel.color").unwrap();
    assert!(channel.is_some());
    d.unmap_frame(frame, "channel.color").unwrap();
}
