//! The reference host back-end: executes kernel bodies synchronously on the
//! calling thread. Its marshalling machinery defines the semantics every
//! other back-end must preserve, which is why it ships alongside the
//! back-end-neutral runtime rather than as a separate crate.

pub mod argument;
pub mod buffer;
pub mod context;

pub use argument::{ConstSliceArg, HandleArg, MutSliceArg, PrimitiveArg};
pub use buffer::HostBuffer;
pub use context::{type_id, HostContext, BACKEND_NAME};
