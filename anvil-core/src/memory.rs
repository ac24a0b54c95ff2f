//! Opaque references to device-owned buffers, and the scoped lifetime
//! tokens that keep them valid while pinned into host-addressable memory.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::types::TypeId;

/// An opaque reference to a buffer owned by a device.
///
/// Shared by reference count: cloning a `MemoryHandle` bumps the same
/// `Arc` every holder (an `ArgumentHandler`, a back-end's buffer table, a
/// `BoundKernel`'s argument tuple) keeps alive. The underlying buffer is
/// released once the last `MemoryHandle` pointing at it is dropped.
///
/// `anchor` is back-end-specific and opaque to the runtime: the host
/// back-end anchors a `MemoryHandle` to its `Arc<Mutex<Vec<u8>>>`; a real
/// GPU back-end would anchor it to whatever keeps its device allocation
/// alive. The runtime never downcasts it — it only ever clones the `Arc`.
#[derive(Clone)]
pub struct MemoryHandle {
    backend: &'static str,
    buffer_id: u64,
    offset: usize,
    length_bytes: usize,
    element_type: TypeId,
    anchor: Arc<dyn Any + Send + Sync>,
}

impl MemoryHandle {
    pub fn new(
        backend: &'static str,
        buffer_id: u64,
        offset: usize,
        length_bytes: usize,
        element_type: TypeId,
        anchor: Arc<dyn Any + Send + Sync>,
    ) -> MemoryHandle {
        MemoryHandle { backend, buffer_id, offset, length_bytes, element_type, anchor }
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }

    pub fn buffer_id(&self) -> u64 {
        self.buffer_id
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn length_bytes(&self) -> usize {
        self.length_bytes
    }

    pub fn element_type(&self) -> &TypeId {
        &self.element_type
    }

    /// The number of live holders of the underlying buffer, including this
    /// one. Useful for tests asserting that pins/handles don't leak.
    pub fn strong_count(&self) -> usize {
        Arc::strong_count(&self.anchor)
    }

    /// Returns a new handle re-typed as `element_type`, used when a formal
    /// parameter views a buffer through a different (but size-compatible)
    /// element type than it was allocated with — e.g. a `u32[n]` buffer
    /// bound to a `const T[n]` parameter of the same element type.
    pub fn reinterpret(&self, element_type: TypeId) -> MemoryHandle {
        MemoryHandle { element_type, ..self.clone() }
    }

    /// Downcasts the anchor to a concrete back-end buffer type. Only the
    /// owning back-end should call this; it is how the host back-end gets
    /// from a `MemoryHandle` argument back to the `Vec<u8>` it wraps.
    pub fn anchor<T: Any>(&self) -> Option<&T> {
        self.anchor.downcast_ref::<T>()
    }
}

impl fmt::Debug for MemoryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryHandle")
            .field("backend", &self.backend)
            .field("buffer_id", &self.buffer_id)
            .field("offset", &self.offset)
            .field("length_bytes", &self.length_bytes)
            .field("element_type", &self.element_type)
            .field("strong_count", &self.strong_count())
            .finish()
    }
}

/// An opaque, scoped lifetime token.
///
/// Holding a `Pin` guarantees the memory it was produced from stays valid
/// (and, for `ConstRange`/`MutRange` extractions, mapped into
/// host-addressable space). Dropping all pins derived from a region allows
/// the back-end to reclaim or unmap it. An RAII guard wrapping whatever the
/// producing back-end needs kept alive, made generic via
/// `Arc<dyn Any + Send + Sync>` so `anvil-core` never needs to know the
/// concrete guard type.
#[derive(Clone)]
pub struct Pin(Arc<dyn Any + Send + Sync>);

impl Pin {
    pub fn new<T: Any + Send + Sync>(guard: T) -> Pin {
        Pin(Arc::new(guard))
    }

    /// A pin over nothing — used where extraction needs no mapping step at
    /// all (the host back-end's ranges are already host memory).
    pub fn noop() -> Pin {
        Pin(Arc::new(()))
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Pin(strong_count={})", Arc::strong_count(&self.0))
    }
}
