//! The backend plugin SDK for the rendering abstraction runtime (§6.3).
//!
//! A backend implements [`Backend`] and [`BackendDevice`], then either:
//! - exports them across a C ABI with [`define_anari_backend_abi!`] so
//!   `anari_core`'s dynamic loader can `dlopen` it, or
//! - registers them in-process with [`linked::register`], which is what
//!   every test in this workspace does instead of building a real shared
//!   object.

pub mod abi;
pub mod linked;
pub mod traits;

pub use traits::{
    Backend, BackendDevice, BackendError, FrameChannel, ParameterDescriptor, PropertyValue,
    StatusSink,
};
