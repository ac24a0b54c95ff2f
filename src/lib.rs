//! A device-agnostic kernel dispatch runtime: describe a kernel once
//! (`KernelSpec`), bind caller arguments against it (`binder`), and launch it
//! over an N-dimensional work grid on whichever back-end registered it
//! (`Queue`/`Event`). A reference `host` back-end executes kernel bodies
//! synchronously on the calling thread; its marshalling rules are the
//! contract any future back-end (OpenCL, Metal) would have to honor.
//!
//! Back-end-neutral vocabulary — type identity, the shape/grid
//! mini-language, the capability-tagged argument wrapper, opaque memory
//! handles, the error taxonomy — lives in [`anvil_core`], re-exported here
//! for convenience.

pub extern crate anvil_core as core;

pub mod binder;
pub mod bound_kernel;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod host;
pub mod kernel_spec;
pub mod queue;
pub mod registry;

#[cfg(test)]
mod tests;

pub use crate::binder::bind;
pub use crate::bound_kernel::{BoundKernel, BoundValue};
pub use crate::dispatcher::{AxisArg, GridRange};
pub use crate::error::{Error, Result};
pub use crate::event::{Event, EventList, ProfilingInfo, Status};
pub use crate::kernel_spec::{Constraint, ConstraintOp, DimensionDecl, FormalParameter, HostEntry, KernelSpec, KernelSpecBuilder, TypeRegistry};
pub use crate::queue::Queue;
pub use crate::registry::{Factory, Registry};
