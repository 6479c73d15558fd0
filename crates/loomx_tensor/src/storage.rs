use crate::{adapter::elems_as_bytes, adapter::TensorElem, Tensor};
use loomx_core::{
    buffer::{Buffer, BufferManager},
    device::Device,
    dtype::DType,
    error::{Error, Result},
    layout::Layout,
};
use std::sync::Arc;

/// Raw, dtype/device-tagged element buffer, shared by refcount.
///
/// A storage is distinct from the tensor views that reference it: several
/// tensors may bind different regions of one storage, and a storage may
/// outlive every view. Rebuild operations only ever read it.
#[derive(Clone)]
pub struct Storage {
    buffer: Arc<dyn Buffer>,
}

impl Storage {
    pub fn new(len: usize, dtype: DType, device: Device) -> Result<Self> {
        Ok(Self {
            buffer: BufferManager::create(len, device, dtype)?,
        })
    }

    pub fn from_vec<T>(data: Vec<T>, device: Device) -> Result<Self>
    where
        T: TensorElem,
    {
        let dtype = T::dtype();
        let mut buffer = BufferManager::create(data.len(), device, dtype)?;

        if !data.is_empty() {
            let bytes = elems_as_bytes(&data);
            let buffer_mut = Arc::get_mut(&mut buffer).ok_or(Error::BufferShared)?;
            unsafe {
                buffer_mut.copy_from_host(bytes.as_ptr() as *const std::ffi::c_void, bytes.len(), 0, 0)?;
            }
        }

        Ok(Self { buffer })
    }

    pub(crate) fn from_buffer(buffer: Arc<dyn Buffer>) -> Self {
        Self { buffer }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn dtype(&self) -> DType {
        self.buffer.dtype()
    }

    pub fn device(&self) -> Device {
        self.buffer.device()
    }

    pub fn buffer(&self) -> &dyn Buffer {
        Arc::as_ref(&self.buffer)
    }

    pub(crate) fn share(&self) -> Arc<dyn Buffer> {
        Arc::clone(&self.buffer)
    }
}

impl Tensor {
    /// Returns this tensor's backing storage, sharing the buffer.
    pub fn storage(&self) -> Storage {
        Storage::from_buffer(Arc::clone(&self.data.buffer))
    }

    /// Rebinds this tensor onto a region of `storage`.
    ///
    /// The tensor takes the storage's device and shares its buffer; shape
    /// and strides are taken as given. Fails when the dtype disagrees or
    /// when `offset` plus the layout's reachable extent does not fit in
    /// the storage.
    pub fn bind(&mut self, storage: &Storage, offset: usize, shape: &[usize], strides: &[usize]) -> Result<()> {
        if storage.dtype() != self.dtype() {
            return Err(Error::DTypeMismatch {
                expected: self.dtype(),
                got: storage.dtype(),
            });
        }
        if shape.len() != strides.len() {
            return Err(Error::InvalidShape {
                message: format!("shape rank {} != stride rank {}", shape.len(), strides.len()),
            });
        }

        let layout = Layout::new(shape, strides, offset);
        let required = offset + layout.reachable_extent();
        if required > storage.len() {
            return Err(Error::IncompatibleShape(format!(
                "Layout requires {} storage elements but storage holds {}",
                required,
                storage.len()
            )));
        }

        self.data.buffer = storage.share();
        self.metadata.device = storage.device();
        self.metadata.layout = layout;

        Ok(())
    }
}
