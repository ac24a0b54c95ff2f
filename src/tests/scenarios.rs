//! Six end-to-end scenarios: a scalar add over a 0D grid, a 1D map, padded
//! dispatch, and the three synchronous failure modes (arity, type,
//! prerequisite propagation).

use anvil_core::{ArgumentHandler, Error, TypeId};

use crate::bind;
use crate::event::{EventList, Status};
use crate::host::{ConstSliceArg, HostContext, MutSliceArg, PrimitiveArg};

use super::common;

/// `add(a, b, c)` over a 0D grid computes `c = a + b`.
#[test]
fn scalar_add_zero_dim_grid() {
    let spec = common::add2_spec().unwrap();
    let queue = HostContext::new().queue();

    let a = unsafe { PrimitiveArg::new(3u32, TypeId::new("u32")) };
    let b = unsafe { PrimitiveArg::new(4u32, TypeId::new("u32")) };
    let mut c_bytes = vec![0u8; 4];
    let c = MutSliceArg::new(&mut c_bytes, TypeId::new("u32"));

    let args: [&dyn ArgumentHandler; 3] = [&a, &b, &c];
    let bound = bind(spec, &args).unwrap();
    let event = queue.submit("add", bound, vec![], EventList::new()).unwrap();
    event.r#await().unwrap();

    let result = unsafe { anvil_extras::view_as::<u32>(&c_bytes) };
    assert_eq!(result[0], 7);
}

/// `scale(n, k, src, dst)` over a 1D grid computes `dst[i] = src[i] * k`
/// for every `i < n`.
#[test]
fn map_1d_scale() {
    let spec = common::scale_spec().unwrap();
    let queue = HostContext::new().queue();

    let n: u32 = 8;
    let k: f32 = 2.5;
    let src_values: Vec<f32> = (0..n).map(|i| i as f32).collect();
    let src_bytes =
        unsafe { std::slice::from_raw_parts(src_values.as_ptr() as *const u8, src_values.len() * 4).to_vec() };
    let mut dst_bytes = vec![0u8; n as usize * 4];

    let n_arg = unsafe { PrimitiveArg::new(n, TypeId::new("u32")) };
    let k_arg = unsafe { PrimitiveArg::new(k, TypeId::new("f32")) };
    let src_arg = ConstSliceArg::new(&src_bytes, TypeId::new("f32"));
    let dst_arg = MutSliceArg::new(&mut dst_bytes, TypeId::new("f32"));

    let args: [&dyn ArgumentHandler; 4] = [&n_arg, &k_arg, &src_arg, &dst_arg];
    let bound = bind(spec, &args).unwrap();
    let event = queue.submit("scale", bound, vec![n as i64], EventList::new()).unwrap();
    event.r#await().unwrap();

    let result = unsafe { anvil_extras::view_as::<f32>(&dst_bytes) };
    for i in 0..n as usize {
        assert_eq!(result[i], src_values[i] * k);
    }
}

/// `zero(n, buf)`, declared `allow_grid_padding` with a block of 64,
/// launches 128 work items for `n = 100` but only the first 100 touch `buf`.
#[test]
fn grid_padding_allowed() {
    let spec = common::zero_spec().unwrap();
    let queue = HostContext::new().queue();

    let n: u32 = 100;
    let mut buf_bytes = vec![0xABu8; n as usize * 4];

    let n_arg = unsafe { PrimitiveArg::new(n, TypeId::new("u32")) };
    let buf_arg = MutSliceArg::new(&mut buf_bytes, TypeId::new("u32"));

    let args: [&dyn ArgumentHandler; 2] = [&n_arg, &buf_arg];
    let bound = bind(spec, &args).unwrap();
    let event = queue.submit("zero", bound, vec![n as i64], EventList::new()).unwrap();
    event.r#await().unwrap();

    let result = unsafe { anvil_extras::view_as::<u32>(&buf_bytes) };
    assert_eq!(result.len(), 100);
    assert!(result.iter().all(|&v| v == 0));
}

/// Binding fewer arguments than `add` declares parameters fails
/// `ArityMismatch` before any kernel body runs.
#[test]
fn arity_mismatch_on_bind() {
    let spec = common::add2_spec().unwrap();
    let a = unsafe { PrimitiveArg::new(3u32, TypeId::new("u32")) };
    let b = unsafe { PrimitiveArg::new(4u32, TypeId::new("u32")) };
    let args: [&dyn ArgumentHandler; 2] = [&a, &b];

    match bind(spec, &args) {
        Err(Error::ArityMismatch { expected, got }) => {
            assert_eq!(expected, 3);
            assert_eq!(got, 2);
        }
        Err(e) => panic!("expected ArityMismatch, got {e:?}"),
        Ok(_) => panic!("expected bind to fail with ArityMismatch"),
    }
}

/// Binding `a` (declared `u32`) with an `f32` value fails `TypeMismatch`
/// naming parameter index 0.
#[test]
fn type_mismatch_on_bind() {
    let spec = common::add2_spec().unwrap();
    let a = unsafe { PrimitiveArg::new(3.0f32, TypeId::new("f32")) };
    let b = unsafe { PrimitiveArg::new(4u32, TypeId::new("u32")) };
    let mut c_bytes = vec![0u8; 4];
    let c = MutSliceArg::new(&mut c_bytes, TypeId::new("u32"));
    let args: [&dyn ArgumentHandler; 3] = [&a, &b, &c];

    match bind(spec, &args) {
        Err(Error::TypeMismatch { param_index, .. }) => assert_eq!(param_index, 0),
        Err(e) => panic!("expected TypeMismatch, got {e:?}"),
        Ok(_) => panic!("expected bind to fail with TypeMismatch"),
    }
}

/// A submission whose prerequisite already failed resolves to
/// `Failed(PrereqFailed(..))` without invoking its own kernel body.
#[test]
fn prereq_failure_propagates() {
    let queue = HostContext::new().queue();

    let fail_spec = common::always_fails_spec().unwrap();
    let trigger = unsafe { PrimitiveArg::new(1u32, TypeId::new("u32")) };
    let fail_args: [&dyn ArgumentHandler; 1] = [&trigger];
    let fail_bound = bind(fail_spec, &fail_args).unwrap();
    let failed_event = queue.submit("always_fails", fail_bound, vec![], EventList::new()).unwrap();
    assert!(matches!(failed_event.status(), Status::Failed(_)));

    let add_spec = common::add2_spec().unwrap();
    let a = unsafe { PrimitiveArg::new(1u32, TypeId::new("u32")) };
    let b = unsafe { PrimitiveArg::new(2u32, TypeId::new("u32")) };
    let mut c_bytes = vec![0xFFu8; 4];
    let c = MutSliceArg::new(&mut c_bytes, TypeId::new("u32"));
    let add_args: [&dyn ArgumentHandler; 3] = [&a, &b, &c];
    let add_bound = bind(add_spec, &add_args).unwrap();

    let mut prereqs = EventList::new();
    prereqs.push(failed_event);
    let event = queue.submit("add", add_bound, vec![], prereqs).unwrap();

    match event.status() {
        Status::Failed(e) => assert!(matches!(*e, Error::PrereqFailed(_))),
        other => panic!("expected Failed(PrereqFailed), got {other:?}"),
    }

    // The entry body never ran: `c` is untouched.
    let result = unsafe { anvil_extras::view_as::<u32>(&c_bytes) };
    assert_eq!(result[0], 0xFFFF_FFFF);
}
