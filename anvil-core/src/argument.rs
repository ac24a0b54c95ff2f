//! `ArgumentHandler`: a capability-bearing wrapper around a caller-supplied
//! argument.
//!
//! Without compile-time overload resolution to dispatch a marshaller per
//! caller-argument static type, the decision is instead driven by a runtime
//! capability tag: every handler advertises, via `kind()`, which single one
//! of four things it can yield, and the binder asks for exactly that one
//! thing.

use std::fmt;

use crate::error::{Error, Result};
use crate::memory::{MemoryHandle, Pin};
use crate::types::TypeId;

/// The one capability a given `ArgumentHandler` advertises.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArgKind {
    Primitive,
    ConstRange,
    MutRange,
    DeviceHandle,
}

/// A read-only view into host-addressable memory, valid as long as its
/// accompanying `Pin` is held.
#[derive(Clone, Copy)]
pub struct ConstRange {
    ptr: *const u8,
    len: usize,
}

impl ConstRange {
    pub fn new(ptr: *const u8, len: usize) -> ConstRange {
        ConstRange { ptr, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// # Safety
    ///
    /// The caller must ensure the `Pin` this range was extracted alongside
    /// is still held, and that no `MutRange` alias of the same bytes is
    /// live for the duration of the returned borrow.
    pub unsafe fn as_slice(&self) -> &[u8] {
        std::slice::from_raw_parts(self.ptr, self.len)
    }
}

impl fmt::Debug for ConstRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConstRange").field("len", &self.len).finish()
    }
}

/// A read-write view into host-addressable memory, valid as long as its
/// accompanying `Pin` is held.
pub struct MutRange {
    ptr: *mut u8,
    len: usize,
}

impl MutRange {
    pub fn new(ptr: *mut u8, len: usize) -> MutRange {
        MutRange { ptr, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// # Safety
    ///
    /// See `ConstRange::as_slice`; additionally the caller must ensure no
    /// other live borrow (mutable or shared) of the same bytes exists.
    pub unsafe fn as_mut_slice(&mut self) -> &mut [u8] {
        std::slice::from_raw_parts_mut(self.ptr, self.len)
    }
}

impl fmt::Debug for MutRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutRange").field("len", &self.len).finish()
    }
}

// SAFETY: a `MutRange`/`ConstRange` is only ever dereferenced while its
// companion `Pin` is held by the same thread that produced it (the host
// back-end's dispatcher runs kernel bodies synchronously on the calling
// thread); the pointer itself carries no thread affinity.
unsafe impl Send for MutRange {}
unsafe impl Send for ConstRange {}

/// A caller-supplied argument, presented through exactly one of four
/// capability kinds.
///
/// Implementations are expected to be thin: an `ArgumentHandler` wraps
/// something the caller already owns (a local variable, a slice, a
/// `MemoryHandle`) and exists only to answer these five questions during
/// one `bind` call.
pub trait ArgumentHandler: fmt::Debug {
    /// Stable for the handler's lifetime.
    fn kind(&self) -> ArgKind;

    /// The `TypeId` of the value(s) this handler wraps.
    fn type_id(&self) -> TypeId;

    /// Returns the serialized bytes of a single primitive value.
    fn get_primitive(&self, op_name: &str) -> Result<Vec<u8>> {
        let _ = op_name;
        Err(Error::capability_missing(ArgKind::Primitive, self.kind()))
    }

    /// Returns a read-only view plus the pin keeping it valid.
    fn get_const_range(&self, op_name: &str) -> Result<(ConstRange, Pin)> {
        let _ = op_name;
        Err(Error::capability_missing(ArgKind::ConstRange, self.kind()))
    }

    /// Returns a read-write view plus the pin keeping it valid.
    fn get_range(&self, op_name: &str) -> Result<(MutRange, Pin)> {
        let _ = op_name;
        Err(Error::capability_missing(ArgKind::MutRange, self.kind()))
    }

    /// Returns a `MemoryHandle` directly; no pin is produced because the
    /// handle already owns a reference count on the buffer.
    fn get_handle(&self, op_name: &str) -> Result<MemoryHandle> {
        let _ = op_name;
        Err(Error::capability_missing(ArgKind::DeviceHandle, self.kind()))
    }
}
