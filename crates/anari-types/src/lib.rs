//! Shared type vocabulary for the rendering abstraction runtime: the data
//! type registry, object kinds, typed handles, error codes, and the
//! extension-name convenience bundle. None of this crate is backend- or
//! transport-specific; it is the common language `anari-core` and
//! `anari-backend` both speak.

pub mod error;
pub mod extension;
pub mod handle;
pub mod kind;
pub mod registry;
pub mod value;

pub use error::{severity_to_log_level, ErrorCode, StatusReport, StatusSeverity};
pub use extension::ExtensionSet;
pub use handle::{Handle, HandleKind, RawHandle};
pub use kind::ObjectKind;
pub use registry::{DataType, DataTypeVisitor};
pub use value::{ParamMap, ParamValue, INLINE_CAPACITY};
