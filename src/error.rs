//! The caller-facing error type: an `anvil_core::Error` plus the `kernel` /
//! `op_name` / parameter context a message should carry.
//!
//! `anvil-core` stays context-free on purpose (see its `error` module); this
//! wrapper is where that context gets attached, the same way `ocl::Error`
//! wraps `ocl_core::Error` without duplicating its variants.

pub type Result<T> = std::result::Result<T, Error>;

/// A core error annotated with the kernel and operation it happened under.
#[derive(Debug, thiserror::Error)]
#[error("kernel '{kernel}', op '{op_name}': {source}")]
pub struct Error {
    pub kernel: String,
    pub op_name: String,
    #[source]
    pub source: anvil_core::Error,
}

impl Error {
    pub fn new(kernel: impl Into<String>, op_name: impl Into<String>, source: anvil_core::Error) -> Error {
        Error { kernel: kernel.into(), op_name: op_name.into(), source }
    }

    /// Unwraps to the underlying back-end-neutral error, discarding context.
    /// Used to compare against `anvil_core::Error` variants in tests.
    pub fn core(&self) -> &anvil_core::Error {
        &self.source
    }
}

/// Extension trait letting call sites attach context with `.context(kernel, op)?`
/// instead of a verbose `map_err`.
pub trait ResultExt<T> {
    fn context(self, kernel: &str, op_name: &str) -> Result<T>;
}

impl<T> ResultExt<T> for anvil_core::Result<T> {
    fn context(self, kernel: &str, op_name: &str) -> Result<T> {
        self.map_err(|e| Error::new(kernel, op_name, e))
    }
}
