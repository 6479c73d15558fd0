use half::{bf16, f16};
use loomx_core::dtype::DType;

/// Plain element types a buffer can be filled from.
pub trait TensorElem: Copy + Default + 'static {
    fn dtype() -> DType;
}

macro_rules! impl_tensor_elem {
    ($($ty:ty => $dtype:ident),* $(,)?) => {
        $(
            impl TensorElem for $ty {
                fn dtype() -> DType {
                    DType::$dtype
                }
            }
        )*
    };
}

impl_tensor_elem! {
    bf16 => BF16,
    f16 => F16,
    f32 => F32,
    f64 => F64,
    bool => BOOL,
    u8 => U8,
    u32 => U32,
    i8 => I8,
    i32 => I32,
    i64 => I64,
}

pub trait TensorAdapter {
    fn to_shape(&self) -> Vec<usize>;
    fn to_flat_bytes(&self) -> Vec<u8>;
    fn dtype(&self) -> DType;
}

pub(crate) fn elems_as_bytes<T: TensorElem>(data: &[T]) -> Vec<u8> {
    let elem_size = std::mem::size_of::<T>();
    let mut bytes = vec![0u8; data.len() * elem_size];
    unsafe {
        std::ptr::copy_nonoverlapping(data.as_ptr() as *const u8, bytes.as_mut_ptr(), bytes.len());
    }
    bytes
}

impl<T: TensorElem> TensorAdapter for Vec<T> {
    fn to_shape(&self) -> Vec<usize> {
        vec![self.len()]
    }

    fn to_flat_bytes(&self) -> Vec<u8> {
        elems_as_bytes(self)
    }

    fn dtype(&self) -> DType {
        T::dtype()
    }
}

impl<T: TensorElem> TensorAdapter for &[T] {
    fn to_shape(&self) -> Vec<usize> {
        vec![self.len()]
    }

    fn to_flat_bytes(&self) -> Vec<u8> {
        elems_as_bytes(self)
    }

    fn dtype(&self) -> DType {
        T::dtype()
    }
}
