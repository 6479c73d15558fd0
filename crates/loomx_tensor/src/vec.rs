use crate::{adapter::TensorElem, Tensor};
use loomx_core::{
    device::Device,
    error::{Error, Result},
};

impl Tensor {
    pub fn to_flatten_vec<T>(&self) -> Result<Vec<T>>
    where
        T: TensorElem,
    {
        if T::dtype() != self.dtype() {
            return Err(Error::DTypeMismatch {
                expected: self.dtype(),
                got: T::dtype(),
            });
        }

        let bytes = self.to_contiguous_bytes()?;
        let mut result = vec![T::default(); self.size()];
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), result.as_mut_ptr() as *mut u8, bytes.len());
        }

        Ok(result)
    }

    /// Reads the tensor out in logical order, one contiguous byte run.
    pub(crate) fn to_contiguous_bytes(&self) -> Result<Vec<u8>> {
        let size = self.size();
        let elem_size = self.dtype().size_in_bytes();

        if size == 0 {
            return Ok(Vec::new());
        }

        let buffer = self.buffer();
        let mut raw_data = vec![0u8; buffer.len() * elem_size];
        unsafe {
            buffer.copy_to_host(raw_data.as_mut_ptr() as *mut std::ffi::c_void, raw_data.len(), 0, 0)?;
        }

        let shape = self.shape();
        let strides = self.strides();
        let offset = self.offset();

        let mut result = vec![0u8; size * elem_size];
        let mut indices = vec![0; shape.len()];
        let mut dst_idx = 0;

        loop {
            let src_offset: usize = offset + indices.iter().zip(strides.iter()).map(|(&idx, &stride)| idx * stride).sum::<usize>();

            unsafe {
                std::ptr::copy_nonoverlapping(
                    raw_data.as_ptr().add(src_offset * elem_size),
                    result.as_mut_ptr().add(dst_idx * elem_size),
                    elem_size,
                );
            }

            dst_idx += 1;
            if dst_idx == size {
                return Ok(result);
            }

            let mut dim = shape.len();
            while dim > 0 {
                dim -= 1;
                indices[dim] += 1;
                if indices[dim] < shape[dim] {
                    break;
                }
                indices[dim] = 0;
            }
        }
    }

    /// Returns a tensor with the same logical contents laid out densely
    /// from offset zero. Already-contiguous tensors are cloned cheaply.
    pub fn contiguous(&self) -> Result<Self> {
        if self.is_contiguous() {
            return Ok(self.clone());
        }

        if self.device() == Device::Meta {
            let mut out = Tensor::empty_with_spec(self.shape(), self.dtype(), self.device())?;
            out.set_flags(self.flags());
            return Ok(out);
        }

        let bytes = self.to_contiguous_bytes()?;
        let mut out = Tensor::empty_with_spec(self.shape(), self.dtype(), self.device())?;
        if !bytes.is_empty() {
            out.with_buffer_mut(|buf| unsafe {
                buf.copy_from_host(bytes.as_ptr() as *const std::ffi::c_void, bytes.len(), 0, 0)
            })?;
        }
        out.set_flags(self.flags());

        Ok(out)
    }
}
