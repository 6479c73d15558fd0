pub mod adapter;
mod creation;
mod flatten;
mod parameter;
mod quantized;
pub mod rebuild;
#[cfg(feature = "serde")]
pub mod record;
mod sparse;
mod storage;
mod vec;

pub use flatten::{flatten_dense_tensors, take_tensors, unflatten_dense_tensors};
pub use parameter::{ParamExtras, Parameter, StateBlob, StateValue};
pub use quantized::{QScheme, QuantizedTensor, QuantizerParams};
pub use sparse::{SparseLayout, SparseTensor};
pub use storage::Storage;

use loomx_core::{
    buffer::Buffer,
    device::Device,
    dtype::DType,
    error::{Error, Result},
    layout::Layout,
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Opaque slot for hooks serialized by old releases.
///
/// The payload is carried through save/load untouched for structural
/// compatibility; nothing ever calls into it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LegacyHooks(Option<Vec<u8>>);

impl LegacyHooks {
    pub fn none() -> Self {
        Self(None)
    }

    pub fn opaque(payload: Vec<u8>) -> Self {
        Self(Some(payload))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }

    pub fn payload(&self) -> Option<&[u8]> {
        self.0.as_deref()
    }
}

/// Per-tensor bit flags restored from serialized metadata.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TensorFlags {
    pub conj: bool,
    pub neg: bool,
}

#[derive(Clone)]
pub struct TensorData {
    buffer: Arc<dyn Buffer>,
    grad: Option<Arc<Mutex<Tensor>>>,
}

#[derive(Clone)]
pub struct TensorMetadata {
    device: Device,
    dtype: DType,
    layout: Layout,
    requires_grad: bool,
    flags: TensorFlags,
    hooks: LegacyHooks,
}

#[derive(Clone)]
pub struct Tensor {
    data: TensorData,
    metadata: TensorMetadata,
}

impl Tensor {
    // data

    pub fn buffer(&self) -> &dyn Buffer {
        Arc::as_ref(&self.data.buffer)
    }

    pub fn with_buffer_mut<F, R>(&mut self, func: F) -> Result<R>
    where
        F: FnOnce(&mut dyn Buffer) -> Result<R>,
    {
        let buffer = Arc::get_mut(&mut self.data.buffer).ok_or(Error::BufferShared)?;
        func(buffer)
    }

    pub fn layout(&self) -> &Layout {
        &self.metadata.layout
    }

    pub fn shape(&self) -> &[usize] {
        self.metadata.layout.shape()
    }

    pub fn strides(&self) -> &[usize] {
        self.metadata.layout.strides()
    }

    pub fn offset(&self) -> usize {
        self.metadata.layout.offset()
    }

    pub fn size(&self) -> usize {
        self.metadata.layout.size()
    }

    pub fn ndim(&self) -> usize {
        self.metadata.layout.ndim()
    }

    pub fn dim_size(&self, dim: usize) -> Option<usize> {
        self.metadata.layout.dim_size(dim)
    }

    pub fn is_contiguous(&self) -> bool {
        self.metadata.layout.is_contiguous()
    }

    // data - grad

    pub fn grad(&self) -> Result<Option<Tensor>> {
        Ok(match &self.data.grad {
            Some(g) => Some((*g.lock().map_err(|_| Error::GradLocked)?).clone()),
            None => None,
        })
    }

    /// Toggles gradient tracking. Enabling allocates a zeroed grad slot;
    /// there is no graph here, only the flag and the storage a later
    /// training loop would accumulate into.
    pub fn set_requires_grad(&mut self, requires_grad: bool) -> Result<()> {
        self.metadata.requires_grad = requires_grad;
        if requires_grad {
            if self.data.grad.is_none() {
                let grad_storage = Tensor::zeros_like(self)?;
                self.data.grad = Some(Arc::new(Mutex::new(grad_storage)));
            }
        } else {
            self.data.grad = None;
        }
        Ok(())
    }

    // flags

    pub fn flags(&self) -> TensorFlags {
        self.metadata.flags
    }

    pub fn is_conj(&self) -> bool {
        self.metadata.flags.conj
    }

    pub fn is_neg(&self) -> bool {
        self.metadata.flags.neg
    }

    pub fn set_flags(&mut self, flags: TensorFlags) {
        self.metadata.flags = flags;
    }

    // hooks

    pub fn hooks(&self) -> &LegacyHooks {
        &self.metadata.hooks
    }

    pub fn set_hooks(&mut self, hooks: LegacyHooks) {
        self.metadata.hooks = hooks;
    }

    // etc

    pub fn device(&self) -> Device {
        self.metadata.device
    }

    pub fn dtype(&self) -> DType {
        self.metadata.dtype
    }

    pub fn requires_grad(&self) -> bool {
        self.metadata.requires_grad
    }
}
