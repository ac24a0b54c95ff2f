//! Concrete `ArgumentHandler`s a host application wraps its values in
//! before calling `bind`, one per capability kind.

use anvil_core::{ArgKind, ArgumentHandler, ConstRange, MemoryHandle, MutRange, Pin, Result, TypeId};

/// Wraps a single scalar value, presented as `Primitive`.
#[derive(Debug)]
pub struct PrimitiveArg {
    type_id: TypeId,
    bytes: Vec<u8>,
}

impl PrimitiveArg {
    /// # Safety
    ///
    /// `T`'s byte representation must be exactly what `type_id`'s
    /// `TypeDescriptor` expects to read back.
    pub unsafe fn new<T: Copy>(value: T, type_id: TypeId) -> PrimitiveArg {
        let bytes =
            std::slice::from_raw_parts(&value as *const T as *const u8, std::mem::size_of::<T>()).to_vec();
        PrimitiveArg { type_id, bytes }
    }
}

impl ArgumentHandler for PrimitiveArg {
    fn kind(&self) -> ArgKind {
        ArgKind::Primitive
    }

    fn type_id(&self) -> TypeId {
        self.type_id.clone()
    }

    fn get_primitive(&self, _op_name: &str) -> Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}

/// Wraps a read-only byte slice, presented as `ConstRange`.
#[derive(Debug)]
pub struct ConstSliceArg<'a> {
    type_id: TypeId,
    slice: &'a [u8],
}

impl<'a> ConstSliceArg<'a> {
    pub fn new(slice: &'a [u8], type_id: TypeId) -> ConstSliceArg<'a> {
        ConstSliceArg { type_id, slice }
    }
}

impl<'a> ArgumentHandler for ConstSliceArg<'a> {
    fn kind(&self) -> ArgKind {
        ArgKind::ConstRange
    }

    fn type_id(&self) -> TypeId {
        self.type_id.clone()
    }

    fn get_const_range(&self, _op_name: &str) -> Result<(ConstRange, Pin)> {
        Ok((ConstRange::new(self.slice.as_ptr(), self.slice.len()), Pin::noop()))
    }
}

/// Wraps a read-write byte slice, presented as `MutRange`.
pub struct MutSliceArg {
    type_id: TypeId,
    ptr: *mut u8,
    len: usize,
}

impl MutSliceArg {
    pub fn new(slice: &mut [u8], type_id: TypeId) -> MutSliceArg {
        MutSliceArg { type_id, ptr: slice.as_mut_ptr(), len: slice.len() }
    }
}

impl std::fmt::Debug for MutSliceArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutSliceArg").field("type_id", &self.type_id).field("len", &self.len).finish()
    }
}

// SAFETY: the host back-end dispatches kernel bodies synchronously on the
// thread that called `submit`, which is the same thread `bind` ran on; the
// pointer never crosses a real concurrency boundary.
unsafe impl Send for MutSliceArg {}
unsafe impl Sync for MutSliceArg {}

impl ArgumentHandler for MutSliceArg {
    fn kind(&self) -> ArgKind {
        ArgKind::MutRange
    }

    fn type_id(&self) -> TypeId {
        self.type_id.clone()
    }

    fn get_range(&self, _op_name: &str) -> Result<(MutRange, Pin)> {
        Ok((MutRange::new(self.ptr, self.len), Pin::noop()))
    }
}

/// Wraps a `MemoryHandle` directly, presented as `DeviceHandle`.
#[derive(Debug)]
pub struct HandleArg {
    handle: MemoryHandle,
}

impl HandleArg {
    pub fn new(handle: MemoryHandle) -> HandleArg {
        HandleArg { handle }
    }
}

impl ArgumentHandler for HandleArg {
    fn kind(&self) -> ArgKind {
        ArgKind::DeviceHandle
    }

    fn type_id(&self) -> TypeId {
        self.handle.element_type().clone()
    }

    fn get_handle(&self, _op_name: &str) -> Result<MemoryHandle> {
        Ok(self.handle.clone())
    }
}
