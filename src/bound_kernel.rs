//! `BoundKernel`: a `KernelSpec` paired with validated arguments, pins, and
//! ready-to-launch bindings.

use std::sync::Arc;

use anvil_core::{ConstRange, Error, MemoryHandle, MutRange, Pin, Result, TypeId};

use crate::kernel_spec::KernelSpec;

/// The typed value a single formal parameter was bound to.
pub enum BoundValue {
    Primitive { bytes: Vec<u8>, type_id: TypeId },
    ConstSpan { range: ConstRange, type_id: TypeId, len: usize },
    MutSpan { range: MutRange, type_id: TypeId, len: usize },
    Handle(MemoryHandle),
}

impl BoundValue {
    pub fn type_id(&self) -> &TypeId {
        match self {
            BoundValue::Primitive { type_id, .. }
            | BoundValue::ConstSpan { type_id, .. }
            | BoundValue::MutSpan { type_id, .. } => type_id,
            BoundValue::Handle(h) => h.element_type(),
        }
    }
}

/// Reinterprets a primitive's raw bytes as `i64`, widening unsigned values.
/// Grid/shape expressions are integer arithmetic, so this is only meaningful
/// for integer-typed parameters; anything else yields an unusable value, but
/// such a parameter would never legally appear in an expression anyway
/// (`KernelSpecBuilder::build` only allows identifiers that make sense
/// there).
fn bytes_to_i64(bytes: &[u8]) -> i64 {
    match bytes.len() {
        1 => bytes[0] as i64,
        2 => u16::from_ne_bytes(bytes.try_into().unwrap()) as i64,
        4 => u32::from_ne_bytes(bytes.try_into().unwrap()) as i64,
        8 => i64::from_ne_bytes(bytes.try_into().unwrap()),
        _ => 0,
    }
}

/// A `KernelSpec` plus one validated binding per formal parameter, and the
/// pins keeping any `ConstRange`/`MutRange` bindings valid for the call.
///
/// Invariant: every formal parameter has exactly one bound argument, in
/// declaration order; dropping a `BoundKernel` drops its pins, which is
/// only safe once the launch's Event has reached a terminal state.
pub struct BoundKernel {
    pub(crate) spec: Arc<KernelSpec>,
    pub(crate) values: Vec<BoundValue>,
    pub(crate) pins: Vec<Pin>,
}

impl BoundKernel {
    pub fn spec(&self) -> &KernelSpec {
        &self.spec
    }

    pub fn pins(&self) -> &[Pin] {
        &self.pins
    }

    fn index_of(&self, name: &str) -> Option<usize> {
        self.spec.parameters().iter().position(|p| p.name == name)
    }

    pub fn get(&self, name: &str) -> Option<&BoundValue> {
        self.index_of(name).map(|i| &self.values[i])
    }

    fn require(&self, name: &str) -> Result<&BoundValue> {
        self.get(name).ok_or_else(|| Error::UnknownIdentifier { context: "bound parameter", name: name.to_string() })
    }

    /// Reads a scalar primitive parameter by reinterpreting its stored bytes
    /// as `T`.
    ///
    /// # Safety
    ///
    /// The caller must know `T` matches the parameter's declared element
    /// type in both size and layout; this is exactly as unsafe as the
    /// `TypeDescriptor::copy_into` call that produced the stored bytes.
    pub unsafe fn primitive<T: Copy>(&self, name: &str) -> Result<T> {
        match self.require(name)? {
            BoundValue::Primitive { bytes, .. } => {
                debug_assert_eq!(bytes.len(), std::mem::size_of::<T>());
                Ok(std::ptr::read_unaligned(bytes.as_ptr() as *const T))
            }
            other => Err(Error::UnknownIdentifier {
                context: "bound parameter is not a primitive",
                name: format!("{name} ({:?})", other.type_id()),
            }),
        }
    }

    /// Borrows a const span parameter as `&[T]`.
    ///
    /// # Safety
    ///
    /// See `ConstRange::as_slice`; `T` must match the parameter's declared
    /// element type.
    pub unsafe fn span<T>(&self, name: &str) -> Result<&[T]> {
        match self.require(name)? {
            BoundValue::ConstSpan { range, .. } => {
                let bytes = range.as_slice();
                Ok(std::slice::from_raw_parts(bytes.as_ptr() as *const T, bytes.len() / std::mem::size_of::<T>()))
            }
            other => Err(Error::UnknownIdentifier {
                context: "bound parameter is not a const span",
                name: format!("{name} ({:?})", other.type_id()),
            }),
        }
    }

    /// Borrows a mutable span parameter as `&mut [T]`. Takes `&mut self` so
    /// the borrow checker, not just convention, rules out two kernel-body
    /// callbacks aliasing the same span.
    ///
    /// # Safety
    ///
    /// See `MutRange::as_mut_slice`; `T` must match the parameter's declared
    /// element type.
    pub unsafe fn span_mut<T>(&mut self, name: &str) -> Result<&mut [T]> {
        let idx = self
            .index_of(name)
            .ok_or_else(|| Error::UnknownIdentifier { context: "bound parameter", name: name.to_string() })?;
        match &mut self.values[idx] {
            BoundValue::MutSpan { range, .. } => {
                let len = range.len() / std::mem::size_of::<T>();
                let bytes = range.as_mut_slice();
                Ok(std::slice::from_raw_parts_mut(bytes.as_mut_ptr() as *mut T, len))
            }
            other => Err(Error::UnknownIdentifier {
                context: "bound parameter is not a mutable span",
                name: format!("{name} ({:?})", other.type_id()),
            }),
        }
    }

    /// Reinterprets a bound primitive parameter's value as `i64`, for
    /// grid/shape expressions that reference a primitive parameter by name.
    /// `None` if `name` isn't bound to a primitive.
    pub(crate) fn primitive_i64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            BoundValue::Primitive { bytes, .. } => Some(bytes_to_i64(bytes)),
            _ => None,
        }
    }

    /// Returns the `MemoryHandle` a device-handle-bound parameter resolved
    /// to.
    pub fn handle(&self, name: &str) -> Result<&MemoryHandle> {
        match self.require(name)? {
            BoundValue::Handle(h) => Ok(h),
            other => Err(Error::UnknownIdentifier {
                context: "bound parameter is not a device handle",
                name: format!("{name} ({:?})", other.type_id()),
            }),
        }
    }
}
