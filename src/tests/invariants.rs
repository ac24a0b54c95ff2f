//! Quantified invariants that aren't tied to one named scenario: padding
//! arithmetic, registry idempotency, handle lifetime, and queue
//! state-machine idempotence.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anvil_core::{ceil_div, ArgumentHandler, Error, TypeId};

use crate::host::{HandleArg, HostContext, MutSliceArg, PrimitiveArg};
use crate::kernel_spec::{HostEntry, KernelSpecBuilder};
use crate::{bind, EventList, Factory, Registry, Status};

use super::common;

/// Padding always rounds up to a whole number of blocks, and the entry runs
/// once per padded slot — including the slots past `n` that the kernel body
/// itself has to guard against.
#[test]
fn grid_padding_invokes_entry_ceil_div_many_times() {
    let counter = Arc::new(AtomicUsize::new(0));
    let counter_handle = counter.clone();
    let entry: HostEntry = Arc::new(move |bound, axes| {
        let idx = axes[0].index().expect("not requested as a range here");
        counter_handle.fetch_add(1, Ordering::SeqCst);
        let n: u32 = unsafe { bound.primitive("n")? };
        if idx < n as usize {
            let buf = unsafe { bound.span_mut::<u32>("buf")? };
            buf[idx] = 1;
        }
        Ok(())
    });
    let spec = Arc::new(
        KernelSpecBuilder::new("count_calls", common::registry())
            .add_parameter("n", "r", "u32")
            .unwrap()
            .add_parameter("buf", "w", "u32[n]")
            .unwrap()
            .add_dimension("idx", "n", Some(64))
            .unwrap()
            .set_grid_expression("[ceilDiv(n,64)*64]", "[64]")
            .unwrap()
            .allow_grid_padding()
            .set_compute_function(entry, 1)
            .build()
            .unwrap(),
    );

    let queue = HostContext::new().queue();
    let n: u32 = 100;
    let mut buf_bytes = vec![0u8; n as usize * 4];
    let n_arg = unsafe { PrimitiveArg::new(n, TypeId::new("u32")) };
    let buf_arg = MutSliceArg::new(&mut buf_bytes, TypeId::new("u32"));
    let args: [&dyn ArgumentHandler; 2] = [&n_arg, &buf_arg];
    let bound = bind(spec, &args).unwrap();
    let event = queue.submit("count_calls", bound, vec![n as i64], EventList::new()).unwrap();
    event.r#await().unwrap();

    let expected = ceil_div(n as i64, 64) * 64;
    assert!(expected >= n as i64);
    assert_eq!(counter.load(Ordering::SeqCst) as i64, expected);
}

/// Without `allow_grid_padding`, a global extent that isn't a multiple of the
/// local block size fails `GridMisalignment` at submission time — the entry
/// never runs.
#[test]
fn grid_misalignment_rejected_without_padding() {
    let entry: HostEntry = Arc::new(|_bound, _axes| panic!("body must not run on misaligned submit"));
    let spec = Arc::new(
        KernelSpecBuilder::new("misaligned", common::registry())
            .add_parameter("n", "r", "u32")
            .unwrap()
            .add_dimension("idx", "n", Some(64))
            .unwrap()
            .set_grid_expression("[n]", "[64]")
            .unwrap()
            .set_compute_function(entry, 1)
            .build()
            .unwrap(),
    );

    let queue = HostContext::new().queue();
    let n: u32 = 100; // not a multiple of 64
    let n_arg = unsafe { PrimitiveArg::new(n, TypeId::new("u32")) };
    let args: [&dyn ArgumentHandler; 1] = [&n_arg];
    let bound = bind(spec, &args).unwrap();

    match queue.submit("misaligned", bound, vec![n as i64], EventList::new()) {
        Err(Error::GridMisalignment { axis, global, local }) => {
            assert_eq!(axis, 0);
            assert_eq!(global, 100);
            assert_eq!(local, 64);
        }
        other => panic!("expected GridMisalignment, got {other:?}"),
    }
}

/// Looking a kernel up right after registering it returns a factory whose
/// spec carries the name it was registered under.
#[test]
fn register_then_lookup_yields_matching_spec_name() {
    let registry = Registry::new();
    let type_registry = common::registry();
    let entry: HostEntry = Arc::new(|_bound, _axes| Ok(()));
    let factory: Factory = Arc::new(move |_ctx| {
        KernelSpecBuilder::new("my_kernel", type_registry.clone())
            .set_grid_expression("[]", "[]")?
            .set_compute_function(entry.clone(), 0)
            .build()
    });
    registry.register("host", "my_kernel", factory).unwrap();

    let looked_up = registry.lookup("host", "my_kernel").unwrap();
    let spec = looked_up("ctx").unwrap();
    assert_eq!(spec.name(), "my_kernel");
}

/// Registering a second factory under a name already taken fails
/// `AlreadyRegistered` and leaves the first mapping in place.
#[test]
fn re_registration_leaves_first_mapping_intact() {
    let registry = Registry::new();
    let type_registry = common::registry();

    let make_factory = |name: &'static str| -> Factory {
        let tr = type_registry.clone();
        let entry: HostEntry = Arc::new(|_bound, _axes| Ok(()));
        Arc::new(move |_ctx| {
            KernelSpecBuilder::new(name, tr.clone())
                .set_grid_expression("[]", "[]")?
                .set_compute_function(entry.clone(), 0)
                .build()
        })
    };

    registry.register("host", "k", make_factory("first")).unwrap();
    let second = registry.register("host", "k", make_factory("second"));
    assert!(matches!(second, Err(Error::AlreadyRegistered { .. })));

    let looked_up = registry.lookup("host", "k").unwrap();
    let spec = looked_up("ctx").unwrap();
    assert_eq!(spec.name(), "first");
}

/// `finish()` on a queue that's already idle — no submission happened since
/// the last one — is a no-op, not a hang or a panic.
#[test]
fn finish_twice_without_submission_is_a_no_op() {
    let queue = HostContext::new().queue();
    queue.finish();
    queue.finish();
}

/// Every event returned from `submit` on the host back-end is already
/// terminal by the time the call returns (it resolves synchronously), and
/// the pin/handle clones `bind`/`submit` made along the way don't outlive
/// the call: once the test's own `HandleArg` is dropped, the handle's strong
/// count is back to what it was before binding.
#[test]
fn handles_do_not_outlive_a_synchronous_submission() {
    let ctx = HostContext::new();
    let queue = ctx.queue();
    let buffer = ctx.alloc_from(8u32.to_ne_bytes().to_vec());
    let handle = buffer.handle(TypeId::new("u32"));
    let baseline = handle.strong_count();

    let spec = common::double_handle_spec().unwrap();
    {
        let handle_arg = HandleArg::new(handle.clone());
        let args: [&dyn ArgumentHandler; 1] = [&handle_arg];
        let bound = bind(spec, &args).unwrap();
        let event = queue.submit("double_handle", bound, vec![], EventList::new()).unwrap();

        assert!(event.status().is_terminal());
        event.r#await().unwrap();
    }

    assert_eq!(handle.strong_count(), baseline);

    let bytes = buffer.to_vec();
    assert_eq!(u32::from_ne_bytes(bytes[0..4].try_into().unwrap()), 16);
}

/// A marker over an empty prereq list resolves immediately; a marker over a
/// list containing a failure carries that failure instead of resolving.
#[test]
fn marker_joins_prereqs_into_one_event() {
    let queue = HostContext::new().queue();

    let empty = queue.marker(EventList::new()).unwrap();
    assert!(matches!(empty.status(), Status::Resolved));

    let entry: HostEntry = Arc::new(|_bound, _axes| Err(Error::Cancelled));
    let spec = Arc::new(
        KernelSpecBuilder::new("always_fails", common::registry())
            .set_grid_expression("[]", "[]")
            .unwrap()
            .set_compute_function(entry, 0)
            .build()
            .unwrap(),
    );
    let args: [&dyn ArgumentHandler; 0] = [];
    let bound = bind(spec, &args).unwrap();
    let failed = queue.submit("always_fails", bound, vec![], EventList::new()).unwrap();
    assert!(matches!(failed.status(), Status::Failed(_)));

    let mut prereqs = EventList::new();
    prereqs.push(failed);
    let joined = queue.marker(prereqs).unwrap();
    assert!(matches!(joined.status(), Status::Failed(_)));
}
