use crate::Tensor;
use loomx_core::{
    device::Device,
    dtype::DType,
    error::{Error, Result},
    layout::Layout,
};

/// Flattens dense tensors of one dtype/device into a contiguous 1-D
/// buffer. Element-wise work on the result is equivalent to operating on
/// the inputs individually.
pub fn flatten_dense_tensors(tensors: &[Tensor]) -> Result<Tensor> {
    let first = tensors.first().ok_or_else(|| Error::InvalidArgument("no tensors to flatten".into()))?;
    let dtype = first.dtype();
    let device = first.device();

    let mut total = 0usize;
    for tensor in tensors {
        if tensor.dtype() != dtype {
            return Err(Error::DTypeMismatch {
                expected: dtype,
                got: tensor.dtype(),
            });
        }
        if tensor.device() != device {
            return Err(Error::DeviceMismatch {
                expected: device,
                got: tensor.device(),
            });
        }
        total += tensor.size();
    }

    let mut flat = Tensor::empty_with_spec(&[total], dtype, device)?;
    let mut elem_offset = 0usize;
    for tensor in tensors {
        let bytes = tensor.to_contiguous_bytes()?;
        if !bytes.is_empty() {
            flat.with_buffer_mut(|buf| unsafe {
                buf.copy_from_host(bytes.as_ptr() as *const std::ffi::c_void, bytes.len(), 0, elem_offset)
            })?;
        }
        elem_offset += tensor.size();
    }

    Ok(flat)
}

/// Splits a flat buffer back into views shaped like `tensors`.
///
/// Each output shares the flat tensor's storage; sizes must add up to the
/// flat tensor's length exactly.
pub fn unflatten_dense_tensors(flat: &Tensor, tensors: &[Tensor]) -> Result<Vec<Tensor>> {
    if flat.ndim() != 1 {
        return Err(Error::InvalidShape {
            message: format!("expected a 1-D flat tensor, got {}-D", flat.ndim()),
        });
    }

    let storage = flat.storage();
    let mut outputs = Vec::with_capacity(tensors.len());
    let mut elem_offset = flat.offset();

    for tensor in tensors {
        let mut view = Tensor::empty_with_spec(&[0], flat.dtype(), flat.device())?;
        view.bind(&storage, elem_offset, tensor.shape(), &Layout::compute_strides(tensor.shape()))?;
        elem_offset += tensor.size();
        outputs.push(view);
    }

    if elem_offset - flat.offset() != flat.size() {
        return Err(Error::IncompatibleShape(format!(
            "reference tensors hold {} elements but the flat tensor holds {}",
            elem_offset - flat.offset(),
            flat.size()
        )));
    }

    Ok(outputs)
}

/// Groups tensors into chunks of one dtype/device whose payload stays
/// under `size_limit` bytes. A single oversized tensor still forms its
/// own chunk. Within a group, input order is preserved.
pub fn take_tensors(tensors: &[Tensor], size_limit: usize) -> Vec<Vec<Tensor>> {
    let mut order: Vec<(DType, Device)> = Vec::new();
    let mut buffers: Vec<(Vec<Tensor>, usize)> = Vec::new();
    let mut chunks = Vec::new();

    for tensor in tensors {
        let key = (tensor.dtype(), tensor.device());
        let slot = match order.iter().position(|&k| k == key) {
            Some(i) => i,
            None => {
                order.push(key);
                buffers.push((Vec::new(), 0));
                order.len() - 1
            }
        };

        let bytes = tensor.size() * tensor.dtype().size_in_bytes();
        let (buf, buf_bytes) = &mut buffers[slot];
        if *buf_bytes + bytes > size_limit && *buf_bytes > 0 {
            chunks.push(std::mem::take(buf));
            *buf_bytes = 0;
        }
        let (buf, buf_bytes) = &mut buffers[slot];
        buf.push(tensor.clone());
        *buf_bytes += bytes;
    }

    for (buf, _) in buffers {
        if !buf.is_empty() {
            chunks.push(buf);
        }
    }

    chunks
}
