//! The host back-end's buffer representation: a reference-counted,
//! mutex-guarded byte vector anchored under a `MemoryHandle`.

use std::sync::{Arc, Mutex};

use anvil_core::{MemoryHandle, TypeId};

/// A device-owned buffer for the host back-end — "device-owned" here means
/// owned by the host process itself, the same sense in which the host
/// back-end is a "device" alongside OpenCL/Metal ones.
pub struct HostBuffer {
    id: u64,
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl HostBuffer {
    pub fn new(id: u64, bytes: Vec<u8>) -> HostBuffer {
        HostBuffer { id, bytes: Arc::new(Mutex::new(bytes)) }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn len(&self) -> usize {
        self.bytes.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A snapshot of the current bytes. Used by tests and by `fill_array`'s
    /// boundary case of filling zero-length ranges.
    pub fn to_vec(&self) -> Vec<u8> {
        self.bytes.lock().unwrap().clone()
    }

    /// Builds a `MemoryHandle` viewing this buffer as `element_type`. The
    /// handle's anchor is this buffer's own `Arc`, so the buffer outlives
    /// every handle/pin derived from it for as long as any one of them is
    /// held.
    pub fn handle(&self, element_type: TypeId) -> MemoryHandle {
        MemoryHandle::new("host", self.id, 0, self.len(), element_type, self.bytes.clone())
    }

    /// Writes `src` into `self[offset..offset + src.len()]`.
    pub fn write_at(&self, offset: usize, src: &[u8]) {
        let mut guard = self.bytes.lock().unwrap();
        guard[offset..offset + src.len()].copy_from_slice(src);
    }

    /// Repeats `pattern` across `self[offset..offset + len]`. `pattern.len()`
    /// must divide `len`; used by `Queue::fill_array`.
    pub fn fill_pattern(&self, offset: usize, len: usize, pattern: &[u8]) {
        let mut guard = self.bytes.lock().unwrap();
        let mut pos = offset;
        while pos < offset + len {
            guard[pos..pos + pattern.len()].copy_from_slice(pattern);
            pos += pattern.len();
        }
    }
}

/// Downcasts a `MemoryHandle`'s anchor back to the `Mutex<Vec<u8>>` the host
/// back-end anchored it with. Only the host back-end calls this.
///
/// `MemoryHandle::anchor` downcasts against the type the anchor `Arc` points
/// at, not the `Arc` itself — `HostBuffer::handle` hands over `self.bytes`
/// (an `Arc<Mutex<Vec<u8>>>`) unsized-coerced into `Arc<dyn Any + Send +
/// Sync>`, so the erased payload is `Mutex<Vec<u8>>`.
pub fn anchor_of(handle: &MemoryHandle) -> Option<&Mutex<Vec<u8>>> {
    handle.anchor::<Mutex<Vec<u8>>>()
}
