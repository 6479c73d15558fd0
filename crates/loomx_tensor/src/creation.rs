use crate::{
    adapter::{elems_as_bytes, TensorAdapter, TensorElem},
    LegacyHooks, Tensor, TensorData, TensorFlags, TensorMetadata,
};
use loomx_core::{
    buffer::BufferManager,
    device::{get_default_device, Device},
    dtype::DType,
    error::{Error, Result},
    layout::Layout,
};
use std::sync::Arc;

impl Tensor {
    pub fn new<T>(data: T) -> Result<Self>
    where
        T: TensorAdapter,
    {
        let device = get_default_device();

        Self::new_with_spec(data, device)
    }

    pub fn new_with_spec<T>(data: T, device: Device) -> Result<Self>
    where
        T: TensorAdapter,
    {
        let shape = data.to_shape();
        let dtype = data.dtype();
        let bytes = data.to_flat_bytes();

        Self::from_raw_parts(bytes, &shape, dtype, device)
    }

    /// Builds a tensor of the given shape from a flat element vector.
    pub fn from_vec<T>(data: Vec<T>, shape: &[usize]) -> Result<Self>
    where
        T: TensorElem,
    {
        Self::from_vec_with_spec(data, shape, get_default_device())
    }

    pub fn from_vec_with_spec<T>(data: Vec<T>, shape: &[usize], device: Device) -> Result<Self>
    where
        T: TensorElem,
    {
        if data.len() != Layout::compute_size(shape) {
            return Err(Error::IncompatibleShape(format!(
                "Cannot build tensor of shape {:?} from {} elements",
                shape,
                data.len()
            )));
        }

        Self::from_raw_parts(elems_as_bytes(&data), shape, T::dtype(), device)
    }

    pub fn empty(shape: &[usize], dtype: DType) -> Result<Self> {
        Self::empty_with_spec(shape, dtype, get_default_device())
    }

    pub fn empty_with_spec(shape: &[usize], dtype: DType, device: Device) -> Result<Self> {
        let layout = Layout::from_shape(shape);
        let buffer = BufferManager::create(layout.size(), device, dtype)?;

        Ok(Self {
            data: TensorData { buffer, grad: None },
            metadata: TensorMetadata {
                device,
                dtype,
                layout,
                requires_grad: false,
                flags: TensorFlags::default(),
                hooks: LegacyHooks::none(),
            },
        })
    }

    /// Allocates an uninitialized tensor with explicit strides. The buffer
    /// is sized to the layout's reachable extent, so overlapping or padded
    /// stride patterns round-trip unchanged.
    pub fn empty_strided(shape: &[usize], strides: &[usize], dtype: DType, device: Device) -> Result<Self> {
        if shape.len() != strides.len() {
            return Err(Error::InvalidShape {
                message: format!("shape rank {} != stride rank {}", shape.len(), strides.len()),
            });
        }

        let layout = Layout::new(shape, strides, 0);
        let buffer = BufferManager::create(layout.reachable_extent(), device, dtype)?;

        Ok(Self {
            data: TensorData { buffer, grad: None },
            metadata: TensorMetadata {
                device,
                dtype,
                layout,
                requires_grad: false,
                flags: TensorFlags::default(),
                hooks: LegacyHooks::none(),
            },
        })
    }

    pub fn zeros_like(target: &Tensor) -> Result<Self> {
        Self::empty_with_spec(target.shape(), target.dtype(), target.device())
    }

    // helper

    fn from_raw_parts(bytes: Vec<u8>, shape: &[usize], dtype: DType, device: Device) -> Result<Self> {
        let layout = Layout::from_shape(shape);
        let size = layout.size();

        let mut buffer = BufferManager::create(size, device, dtype)?;

        if size > 0 {
            let buffer_mut = Arc::get_mut(&mut buffer).ok_or(Error::BufferShared)?;
            unsafe {
                buffer_mut.copy_from_host(bytes.as_ptr() as *const std::ffi::c_void, size * dtype.size_in_bytes(), 0, 0)?;
            }
        }

        Ok(Self {
            data: TensorData { buffer, grad: None },
            metadata: TensorMetadata {
                device,
                dtype,
                layout,
                requires_grad: false,
                flags: TensorFlags::default(),
                hooks: LegacyHooks::none(),
            },
        })
    }
}
