//! Process-wide `backend → (kernel_name → factory)` table.
//!
//! Populated once at process start, read-mostly thereafter; grounded on the
//! `GLOBAL_KERNEL_CACHE: RwLock<HashMap<...>>` pattern other kernel-dispatch
//! runtimes in this space use for exactly this purpose.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use anvil_core::{Error, Result};
use lazy_static::lazy_static;

use crate::kernel_spec::KernelSpec;

/// Given a device context handle, produces a fresh `KernelSpec` bound to
/// that context's compiled entry point. The host back-end's factories
/// ignore the context argument (there's only ever one host context); a
/// real device back-end would use it to select the right compiled program.
pub type Factory = Arc<dyn Fn(&str) -> Result<KernelSpec> + Send + Sync>;

#[derive(Default)]
struct Table {
    backends: HashMap<String, HashMap<String, Factory>>,
}

/// The process-wide registry. Clients reach it through `Registry::global()`
/// rather than constructing one, mirroring the single static table the
/// source initialises at process start.
pub struct Registry {
    table: RwLock<Table>,
}

lazy_static! {
    static ref GLOBAL: Registry = Registry { table: RwLock::new(Table::default()) };
}

impl Registry {
    /// A fresh, empty registry — for tests that want isolation from the
    /// process-wide table and from each other.
    pub fn new() -> Registry {
        Registry { table: RwLock::new(Table::default()) }
    }

    /// The single process-wide instance.
    pub fn global() -> &'static Registry {
        &GLOBAL
    }

    /// Inserts a factory for `(backend, name)`. Fails with
    /// `AlreadyRegistered` if that pair is already taken, leaving the
    /// existing mapping untouched.
    pub fn register(&self, backend: &str, name: &str, factory: Factory) -> Result<()> {
        let mut table = self.table.write().unwrap();
        let kernels = table.backends.entry(backend.to_string()).or_default();
        if kernels.contains_key(name) {
            return Err(Error::AlreadyRegistered { backend: backend.to_string(), name: name.to_string() });
        }
        kernels.insert(name.to_string(), factory);
        Ok(())
    }

    /// Looks up the factory registered for `(backend, name)`.
    pub fn lookup(&self, backend: &str, name: &str) -> Result<Factory> {
        let table = self.table.read().unwrap();
        table
            .backends
            .get(backend)
            .and_then(|kernels| kernels.get(name))
            .cloned()
            .ok_or_else(|| Error::UnknownIdentifier {
                context: "kernel registry",
                name: format!("{backend}/{name}"),
            })
    }

}

impl Default for Registry {
    fn default() -> Registry {
        Registry::new()
    }
}
