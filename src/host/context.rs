//! The host back-end's device context: allocates `HostBuffer`s and hands out
//! the fresh `MemoryHandle`s and `Queue`s apps bind kernels against.

use std::sync::atomic::{AtomicU64, Ordering};

use anvil_core::TypeId;

use crate::host::buffer::HostBuffer;
use crate::queue::Queue;

/// There is exactly one meaningful host context — unlike a GPU back-end,
/// the host process has no device selection to make. Kept as a type anyway
/// so call sites read the same way regardless of back-end.
pub struct HostContext {
    next_buffer_id: AtomicU64,
}

impl HostContext {
    pub fn new() -> HostContext {
        HostContext { next_buffer_id: AtomicU64::new(0) }
    }

    /// Allocates a zeroed buffer of `len_bytes`.
    pub fn alloc_zeroed(&self, len_bytes: usize) -> HostBuffer {
        let id = self.next_buffer_id.fetch_add(1, Ordering::Relaxed);
        HostBuffer::new(id, vec![0u8; len_bytes])
    }

    /// Allocates a buffer initialised from `bytes`.
    pub fn alloc_from(&self, bytes: Vec<u8>) -> HostBuffer {
        let id = self.next_buffer_id.fetch_add(1, Ordering::Relaxed);
        HostBuffer::new(id, bytes)
    }

    /// Allocates a buffer of `count` copies of `T`, copying `values` in.
    ///
    /// # Safety
    ///
    /// `T` must have no padding bytes that matter to the kernel reading it
    /// back (the host back-end copies its raw representation byte-for-byte).
    pub unsafe fn alloc_typed<T: Copy>(&self, values: &[T]) -> HostBuffer {
        let byte_len = values.len() * std::mem::size_of::<T>();
        let bytes = std::slice::from_raw_parts(values.as_ptr() as *const u8, byte_len).to_vec();
        self.alloc_from(bytes)
    }

    /// A fresh `Queue` for this context.
    pub fn queue(&self) -> Queue {
        Queue::new("host")
    }
}

impl Default for HostContext {
    fn default() -> HostContext {
        HostContext::new()
    }
}

pub const BACKEND_NAME: &str = "host";

/// Convenience re-export so `add_parameter`'s `type_spec` strings and test
/// code can name primitive element types without a dedicated import.
pub fn type_id(name: &'static str) -> TypeId {
    TypeId::new(name)
}
