//! Development/test helpers for `anvil`: ready-made `TypeDescriptor`s for a
//! handful of primitives, and small buffer-filling utilities built on
//! `rand` — the role `ocl-extras` plays for `ocl`'s own test suite.

use anvil::core::{mismatch, Result, TypeDescriptor, TypeId};
use rand::distributions::{Distribution, Standard};
use rand::Rng;

macro_rules! primitive_descriptor {
    ($struct_name:ident, $ty:ty, $name:literal) => {
        #[derive(Debug, Default, Clone, Copy)]
        pub struct $struct_name;

        impl TypeDescriptor for $struct_name {
            fn id(&self) -> TypeId {
                TypeId::new($name)
            }

            fn size(&self) -> usize {
                std::mem::size_of::<$ty>()
            }

            fn copy_into(&self, src: &[u8], dst: &mut [u8], dst_id: &TypeId) -> Result<()> {
                if *dst_id != self.id() {
                    return Err(mismatch(usize::MAX, $name, &self.id(), dst_id));
                }
                if src.len() != self.size() || dst.len() != self.size() {
                    return Err(mismatch(usize::MAX, $name, &self.id(), dst_id));
                }
                dst.copy_from_slice(src);
                Ok(())
            }
        }
    };
}

primitive_descriptor!(U32Descriptor, u32, "u32");
primitive_descriptor!(F32Descriptor, f32, "f32");
primitive_descriptor!(I32Descriptor, i32, "i32");
primitive_descriptor!(U64Descriptor, u64, "u64");

/// Fills `buf` (interpreted as `[T]`) with random values, returning them so
/// the caller can assert on expected results without re-deriving the RNG
/// state.
pub fn random_fill<T>(buf: &mut [u8]) -> Vec<T>
where
    T: Copy,
    Standard: Distribution<T>,
{
    let count = buf.len() / std::mem::size_of::<T>();
    let mut rng = rand::thread_rng();
    let values: Vec<T> = (0..count).map(|_| rng.gen()).collect();
    let bytes =
        unsafe { std::slice::from_raw_parts(values.as_ptr() as *const u8, buf.len()) };
    buf.copy_from_slice(bytes);
    values
}

/// Reinterprets a byte slice as `&[T]`, for asserting on a host buffer's
/// contents after a kernel runs.
///
/// # Safety
///
/// `bytes.len()` must be a multiple of `size_of::<T>()`, and `T`'s bit
/// pattern must be what was actually written.
pub unsafe fn view_as<T>(bytes: &[u8]) -> &[T] {
    std::slice::from_raw_parts(bytes.as_ptr() as *const T, bytes.len() / std::mem::size_of::<T>())
}
