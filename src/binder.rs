//! The Binder/Marshaller: reconciles caller arguments against a kernel's
//! formal parameters.

use std::sync::Arc;

use anvil_core::{ArgKind, ArgumentHandler, Error, Pin, Result, Shape};

use crate::bound_kernel::{BoundKernel, BoundValue};
use crate::kernel_spec::KernelSpec;

/// Binds `args` against `spec`'s formal parameters, in order.
///
/// On any failure the pins accumulated so far are dropped before returning,
/// so a failed bind never leaks a pin or a buffer reference count.
pub fn bind(spec: Arc<KernelSpec>, args: &[&dyn ArgumentHandler]) -> Result<BoundKernel> {
    if args.len() != spec.parameters().len() {
        return Err(Error::ArityMismatch { expected: spec.parameters().len(), got: args.len() });
    }

    let mut values = Vec::with_capacity(args.len());
    let mut pins = Vec::new();

    for (index, (param, handler)) in spec.parameters().iter().zip(args.iter()).enumerate() {
        let value = match bind_one(index, param, *handler) {
            Ok((value, pin)) => {
                if let Some(pin) = pin {
                    pins.push(pin);
                }
                value
            }
            Err(e) => {
                // Pins collected before this parameter are dropped here.
                return Err(e);
            }
        };
        values.push(value);
    }

    Ok(BoundKernel { spec, values, pins })
}

fn bind_one(
    index: usize,
    param: &crate::kernel_spec::FormalParameter,
    handler: &dyn ArgumentHandler,
) -> Result<(BoundValue, Option<Pin>)> {
    match &param.shape {
        Shape::Scalar => bind_scalar(index, param, handler),
        Shape::Array(_) => bind_array(index, param, handler),
    }
    .map_err(|e| annotate(e, index))
}

fn annotate(e: Error, index: usize) -> Error {
    if e.needs_param_index() {
        e.with_param_index(index)
    } else {
        e
    }
}

fn bind_scalar(
    index: usize,
    param: &crate::kernel_spec::FormalParameter,
    handler: &dyn ArgumentHandler,
) -> Result<(BoundValue, Option<Pin>)> {
    if handler.kind() != ArgKind::Primitive {
        return Err(Error::capability_missing(ArgKind::Primitive, handler.kind()).with_param_index(index));
    }
    let src = handler.get_primitive(&param.name)?;
    let expected = param.element_type.id();
    let mut dst = vec![0u8; param.element_type.size()];
    param.element_type.copy_into(&src, &mut dst, &handler.type_id()).map_err(|_| {
        anvil_core::mismatch(index, param.name.clone(), &expected, &handler.type_id())
    })?;
    Ok((BoundValue::Primitive { bytes: dst, type_id: expected }, None))
}

fn bind_array(
    index: usize,
    param: &crate::kernel_spec::FormalParameter,
    handler: &dyn ArgumentHandler,
) -> Result<(BoundValue, Option<Pin>)> {
    let expected = param.element_type.id();
    let element_size = param.element_type.size();

    match handler.kind() {
        ArgKind::DeviceHandle => {
            if handler.type_id() != expected {
                return Err(anvil_core::mismatch(index, param.name.clone(), &expected, &handler.type_id()));
            }
            let handle = handler.get_handle(&param.name)?;
            Ok((BoundValue::Handle(handle), None))
        }
        ArgKind::MutRange => {
            if handler.type_id() != expected {
                return Err(anvil_core::mismatch(index, param.name.clone(), &expected, &handler.type_id()));
            }
            let (range, pin) = handler.get_range(&param.name)?;
            let byte_len = range.len();
            if byte_len % element_size != 0 {
                return Err(Error::SizeNotAligned { param_index: index, element_size, byte_len });
            }
            let len = byte_len / element_size;
            Ok((BoundValue::MutSpan { range, type_id: expected, len }, Some(pin)))
        }
        ArgKind::ConstRange => {
            if param.access.is_writable() {
                return Err(Error::CapabilityMissing {
                    param_index: index,
                    needed: ArgKind::MutRange,
                    available: ArgKind::ConstRange,
                });
            }
            if handler.type_id() != expected {
                return Err(anvil_core::mismatch(index, param.name.clone(), &expected, &handler.type_id()));
            }
            let (range, pin) = handler.get_const_range(&param.name)?;
            let byte_len = range.len();
            if byte_len % element_size != 0 {
                return Err(Error::SizeNotAligned { param_index: index, element_size, byte_len });
            }
            let len = byte_len / element_size;
            Ok((BoundValue::ConstSpan { range, type_id: expected, len }, Some(pin)))
        }
        ArgKind::Primitive => {
            Err(Error::CapabilityMissing { param_index: index, needed: ArgKind::DeviceHandle, available: ArgKind::Primitive })
        }
    }
}
