//! The error taxonomy shared by every layer of the runtime.
//!
//! Everything here is back-end neutral: these variants describe what went
//! wrong with the *data model* (a shape expression, a capability mismatch,
//! a name collision) rather than anything a particular back-end did. The
//! `anvil` crate wraps these in `anvil::Error` to attach the `kernel` and
//! `op_name` context a caller-facing message should carry.

use crate::argument::ArgKind;
use std::fmt;

/// Result alias used throughout `anvil-core`.
pub type Result<T> = std::result::Result<T, Error>;

/// The full error taxonomy.
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    #[error("expected {expected} argument(s), got {got}")]
    ArityMismatch { expected: usize, got: usize },

    #[error("parameter [{param_index}] '{param_name}': expected type '{expected_type}', got '{got_type}'")]
    TypeMismatch {
        param_index: usize,
        param_name: String,
        expected_type: String,
        got_type: String,
    },

    #[error("parameter [{param_index}]: needed {needed:?} capability, handler only offers {available:?}")]
    CapabilityMissing {
        param_index: usize,
        needed: ArgKind,
        available: ArgKind,
    },

    #[error("parameter [{param_index}]: byte length {byte_len} is not a multiple of element size {element_size}")]
    SizeNotAligned {
        param_index: usize,
        element_size: usize,
        byte_len: usize,
    },

    #[error("duplicate {scope} name '{name}'")]
    DuplicateName { scope: &'static str, name: String },

    #[error("unknown identifier '{name}' in {context}")]
    UnknownIdentifier { context: &'static str, name: String },

    #[error("axis {axis}: global work size {global} is not a multiple of local work size {local}")]
    GridMisalignment { axis: usize, global: u32, local: u32 },

    #[error("back-end mismatch: expected '{expected}', got '{got}'")]
    BackendMismatch { expected: String, got: String },

    #[error("kernel '{name}' is already registered for back-end '{backend}'")]
    AlreadyRegistered { backend: String, name: String },

    #[error("kernel '{name}' has no compute function set")]
    MissingEntry { name: String },

    #[error("a prerequisite event failed: {0}")]
    PrereqFailed(Box<Error>),

    /// A constraint promoted to an assertion needs an observable failure
    /// mode when violated.
    #[error("constraint violated: {rationale}")]
    ConstraintViolated { rationale: String },

    #[error("the operation was cancelled")]
    Cancelled,

    #[error("the operation timed out")]
    TimedOut,
}

impl Error {
    /// Shorthand used by `ArgumentHandler` default methods: the handler was
    /// asked for a capability it doesn't advertise. `param_index` is filled
    /// in by the binder, which is the only caller that knows the formal
    /// parameter's position.
    pub fn capability_missing(needed: ArgKind, available: ArgKind) -> Error {
        Error::CapabilityMissing { param_index: usize::MAX, needed, available }
    }

    /// True for the sentinel `param_index` produced by
    /// `Error::capability_missing` before the binder annotates it.
    pub fn needs_param_index(&self) -> bool {
        matches!(self, Error::CapabilityMissing { param_index, .. } if *param_index == usize::MAX)
    }

    /// Fills in a deferred `param_index`, used by the binder right after
    /// catching a `CapabilityMissing` produced via `capability_missing`.
    pub fn with_param_index(mut self, index: usize) -> Error {
        if let Error::CapabilityMissing { param_index, .. } = &mut self {
            *param_index = index;
        }
        self
    }
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ArgKind::Primitive => "primitive",
            ArgKind::ConstRange => "const range",
            ArgKind::MutRange => "mut range",
            ArgKind::DeviceHandle => "device handle",
        };
        f.write_str(s)
    }
}
