//! Back-end-neutral data model for the `anvil` kernel dispatch runtime.
//!
//! This crate holds the vocabulary every back-end — host, or otherwise —
//! shares: type identity (`types`), the shape/grid mini-language (`shape`,
//! `parser`), the capability-tagged argument wrapper (`argument`), opaque
//! buffer references (`memory`), and the full error taxonomy (`error`). It
//! contains no back-end-specific code and no kernel-dispatch logic; those
//! live in the `anvil` crate, the way `ocl` builds its ergonomic surface on
//! top of the back-end-neutral `ocl-core`.

pub mod argument;
pub mod error;
pub mod memory;
pub mod parser;
pub mod shape;
pub mod types;

pub use crate::argument::{ArgKind, ArgumentHandler, ConstRange, MutRange};
pub use crate::error::{Error, Result};
pub use crate::memory::{MemoryHandle, Pin};
pub use crate::shape::{ceil_div, Env, Expr, Shape};
pub use crate::types::{mismatch, AccessMode, TypeDescriptor, TypeId};
