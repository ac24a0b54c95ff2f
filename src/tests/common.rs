//! Shared kernel specs and a type registry used across the scenario and
//! invariant tests.

use std::sync::Arc;

use anvil_core::{Error, Result};

use crate::host;
use crate::kernel_spec::{HostEntry, KernelSpec, KernelSpecBuilder, TypeRegistry};

pub fn registry() -> Arc<TypeRegistry> {
    let registry = Arc::new(TypeRegistry::new());
    registry.register("u32", Arc::new(anvil_extras::U32Descriptor));
    registry.register("f32", Arc::new(anvil_extras::F32Descriptor));
    registry
}

/// `add(a: u32 r, b: u32 r, c: u32[1] w)`, 0D grid.
pub fn add2_spec() -> Result<Arc<KernelSpec>> {
    let entry: HostEntry = Arc::new(|bound, _axes| {
        let a: u32 = unsafe { bound.primitive("a")? };
        let b: u32 = unsafe { bound.primitive("b")? };
        let c = unsafe { bound.span_mut::<u32>("c")? };
        c[0] = a + b;
        Ok(())
    });
    let spec = KernelSpecBuilder::new("add", registry())
        .add_parameter("a", "r", "u32")?
        .add_parameter("b", "r", "u32")?
        .add_parameter("c", "w", "u32[1]")?
        .set_grid_expression("[]", "[]")?
        .set_compute_function(entry, 0)
        .build()?;
    Ok(Arc::new(spec))
}

/// `scale(n: u32 r, k: f32 r, src: f32[n] r, dst: f32[n] w)`, 1D grid.
pub fn scale_spec() -> Result<Arc<KernelSpec>> {
    let entry: HostEntry = Arc::new(|bound, axes| {
        let idx = axes[0].index().expect("scale dispatches by index");
        let k: f32 = unsafe { bound.primitive("k")? };
        let src_val = unsafe { bound.span::<f32>("src")?[idx] };
        let dst = unsafe { bound.span_mut::<f32>("dst")? };
        dst[idx] = src_val * k;
        Ok(())
    });
    let spec = KernelSpecBuilder::new("scale", registry())
        .add_parameter("n", "r", "u32")?
        .add_parameter("k", "r", "f32")?
        .add_parameter("src", "r", "f32[n]")?
        .add_parameter("dst", "w", "f32[n]")?
        .add_dimension("idx", "n", None)?
        .set_grid_expression("[n]", "[n]")?
        .set_compute_function(entry, 1)
        .build()?;
    Ok(Arc::new(spec))
}

/// `zero(n: u32 r, buf: u32[n] w)`, 1D grid padded to a block of 64,
/// requesting the outer axis as a `GridRange`.
pub fn zero_spec() -> Result<Arc<KernelSpec>> {
    let entry: HostEntry = Arc::new(|bound, axes| {
        let range = axes[0].range().expect("zero requests the outer axis as a range");
        let buf = unsafe { bound.span_mut::<u32>("buf")? };
        for idx in range.iter() {
            if range.in_range(idx) {
                buf[idx] = 0;
            }
        }
        Ok(())
    });
    let spec = KernelSpecBuilder::new("zero", registry())
        .add_parameter("n", "r", "u32")?
        .add_parameter("buf", "w", "u32[n]")?
        .add_dimension("idx", "n", Some(64))?
        .set_grid_expression("[ceilDiv(n,64)*64]", "[64]")?
        .allow_grid_padding()
        .request_outer_axis_as_range()
        .set_compute_function(entry, 1)
        .build()?;
    Ok(Arc::new(spec))
}

/// `double_handle(buf: u32[1] rw)`, 0D grid, bound through a `MemoryHandle`
/// rather than a raw slice — exercises the `DeviceHandle` capability and the
/// host back-end's anchor downcast.
pub fn double_handle_spec() -> Result<Arc<KernelSpec>> {
    let entry: HostEntry = Arc::new(|bound, _axes| {
        let handle = bound.handle("buf")?.clone();
        let anchor = host::buffer::anchor_of(&handle)
            .ok_or_else(|| Error::BackendMismatch { expected: "host".into(), got: "non-host anchor".into() })?;
        let mut guard = anchor.lock().unwrap();
        let val = u32::from_ne_bytes(guard[0..4].try_into().unwrap());
        guard[0..4].copy_from_slice(&(val * 2).to_ne_bytes());
        Ok(())
    });
    let spec = KernelSpecBuilder::new("double_handle", registry())
        .add_parameter("buf", "rw", "u32[1]")?
        .set_grid_expression("[]", "[]")?
        .set_compute_function(entry, 0)
        .build()?;
    Ok(Arc::new(spec))
}

/// `always_fails(trigger: u32 r)`, 0D grid, whose body unconditionally
/// returns an error — used to manufacture a genuinely `Failed` event for the
/// prerequisite-propagation test without relying on a races-with-reality
/// timing trick.
pub fn always_fails_spec() -> Result<Arc<KernelSpec>> {
    let entry: HostEntry = Arc::new(|_bound, _axes| {
        Err(Error::ConstraintViolated { rationale: "deliberate test failure".to_string() })
    });
    let spec = KernelSpecBuilder::new("always_fails", registry())
        .add_parameter("trigger", "r", "u32")?
        .set_grid_expression("[]", "[]")?
        .set_compute_function(entry, 0)
        .build()?;
    Ok(Arc::new(spec))
}
