//! The one error type this crate surfaces directly to its caller, rather
//! than through the status callback (§7: `loadLibrary` is allowed to
//! return a `Result` because no status callback exists to report through
//! before a library is loaded).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no backend is registered or installed under the name {0:?}")]
    NotFound(String),
    #[error("backend module {0:?} is missing a required entry point")]
    MissingEntryPoint(String),
    #[cfg(feature = "dlopen2")]
    #[error("failed to open backend shared object: {0}")]
    Dlopen(#[from] dlopen2::Error),
}
