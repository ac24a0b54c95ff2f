//! Opaque value-layout identity, supplied by the host application.
//!
//! The runtime never needs to know what a `u32` or a user struct actually
//! *is* — only that two mentions of it refer to the same layout, and that a
//! serialized blob can be copied into a typed destination. That's the whole
//! contract, mirroring how `ocl_core::OclPrm` keeps the kernel-dispatch
//! layer ignorant of anything beyond size and bit-pattern.

use std::borrow::Cow;
use std::fmt;

use crate::error::{Error, Result};

/// An opaque, equality-comparable token identifying a concrete value type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TypeId(Cow<'static, str>);

impl TypeId {
    /// Builds a `TypeId` from a name. Two `TypeId`s are equal iff their
    /// names are equal; the name itself carries no other meaning to the
    /// runtime (it's only ever shown to humans in error messages).
    pub fn new(name: impl Into<Cow<'static, str>>) -> TypeId {
        TypeId(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for TypeId {
    fn from(name: &'static str) -> TypeId {
        TypeId::new(name)
    }
}

/// A handle to a value layout: identity plus a byte-level copy function.
///
/// `copy_into` is the sole bridge from a serialized blob to a typed value.
/// Implementations are supplied by the host application — the core only
/// requires an opaque type description; `anvil-extras` provides ready-made
/// descriptors for the handful of primitives exercised by tests.
pub trait TypeDescriptor: fmt::Debug {
    /// This descriptor's type identity.
    fn id(&self) -> TypeId;

    /// The size, in bytes, of one value of this type.
    fn size(&self) -> usize;

    /// Copies `src`, a blob the caller claims is of type `dst_id`, into
    /// `dst` — a buffer of this descriptor's own type.
    ///
    /// Fails with `TypeMismatch` if `dst_id` doesn't match this
    /// descriptor's own `id()`, or if `src`/`dst` aren't sized for exactly
    /// one value.
    fn copy_into(&self, src: &[u8], dst: &mut [u8], dst_id: &TypeId) -> Result<()>;
}

/// Shorthand for building a `TypeMismatch` error, used by the binder and by
/// `TypeDescriptor::copy_into` implementations alike.
pub fn mismatch(param_index: usize, param_name: impl Into<String>, expected: &TypeId, got: &TypeId) -> Error {
    Error::TypeMismatch {
        param_index,
        param_name: param_name.into(),
        expected_type: expected.to_string(),
        got_type: got.to_string(),
    }
}

/// How a kernel's formal parameter may be touched by the kernel body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    /// Parses the compact `"r"` / `"w"` / `"rw"` spelling used by
    /// `add_parameter`.
    pub fn parse(s: &str) -> Result<AccessMode> {
        match s {
            "r" => Ok(AccessMode::ReadOnly),
            "w" => Ok(AccessMode::WriteOnly),
            "rw" => Ok(AccessMode::ReadWrite),
            other => Err(Error::UnknownIdentifier {
                context: "access mode (expected \"r\", \"w\", or \"rw\")",
                name: other.to_string(),
            }),
        }
    }

    pub fn is_readable(&self) -> bool {
        matches!(self, AccessMode::ReadOnly | AccessMode::ReadWrite)
    }

    pub fn is_writable(&self) -> bool {
        matches!(self, AccessMode::WriteOnly | AccessMode::ReadWrite)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccessMode::ReadOnly => "r",
            AccessMode::WriteOnly => "w",
            AccessMode::ReadWrite => "rw",
        };
        f.write_str(s)
    }
}
