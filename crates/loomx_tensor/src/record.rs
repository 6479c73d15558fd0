//! Serialized tensor records.
//!
//! A record is the primitive-field form of one saved tensor: raw storage
//! bytes plus the layout/metadata needed to rebuild it. Records are what
//! go over the wire (bincode) or into text state files (JSON); the
//! [`rebuild_record`] driver turns them back into live objects through
//! the rebuild module.

use crate::{
    rebuild::{self, LoadContext, WrapperTensor},
    LegacyHooks, Parameter, QuantizedTensor, QuantizerParams, SparseLayout, SparseTensor, StateBlob, StateValue, Storage,
    Tensor,
};
use loomx_core::{
    device::Device,
    dtype::DType,
    error::{Error, Result},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize)]
pub struct StorageRecord {
    data: Vec<u8>,
    len: usize,
    dtype: DType,
    device: Device,
}

impl StorageRecord {
    pub fn from_storage(storage: &Storage) -> Result<Self> {
        let len = storage.len();
        let dtype = storage.dtype();
        let mut data = vec![0u8; len * dtype.size_in_bytes()];

        if len > 0 {
            unsafe {
                storage
                    .buffer()
                    .copy_to_host(data.as_mut_ptr() as *mut std::ffi::c_void, data.len(), 0, 0)
                    .map_err(|e| Error::SerializationError(format!("Failed to read storage: {}", e)))?;
            }
        }

        Ok(Self {
            data,
            len,
            dtype,
            device: storage.device(),
        })
    }

    pub fn to_storage(&self) -> Result<Storage> {
        if self.device.is_meta() {
            return Err(Error::DeserializationError("meta storage carries no data to restore".into()));
        }

        let mut buffer = loomx_core::buffer::BufferManager::create(self.len, self.device, self.dtype)?;
        if self.len > 0 {
            let buffer_mut = std::sync::Arc::get_mut(&mut buffer).ok_or(Error::BufferShared)?;
            unsafe {
                buffer_mut
                    .copy_from_host(self.data.as_ptr() as *const std::ffi::c_void, self.data.len(), 0, 0)
                    .map_err(|e| Error::DeserializationError(format!("Failed to restore storage: {}", e)))?;
            }
        }
        Ok(Storage::from_buffer(buffer))
    }
}

#[derive(Serialize, Deserialize)]
pub struct DenseRecord {
    storage: StorageRecord,
    storage_offset: usize,
    size: Vec<usize>,
    stride: Vec<usize>,
    requires_grad: bool,
    hooks: LegacyHooks,
    metadata: Option<BTreeMap<String, bool>>,
}

impl DenseRecord {
    pub fn from_tensor(tensor: &Tensor) -> Result<Self> {
        let contiguous = tensor.contiguous()?;
        let metadata = rebuild::get_tensor_metadata(&contiguous);

        Ok(Self {
            storage: StorageRecord::from_storage(&contiguous.storage())?,
            storage_offset: contiguous.offset(),
            size: contiguous.shape().to_vec(),
            stride: contiguous.strides().to_vec(),
            requires_grad: tensor.requires_grad(),
            hooks: tensor.hooks().clone(),
            metadata: if metadata.is_empty() { None } else { Some(metadata) },
        })
    }

    pub fn rebuild(&self) -> Result<Tensor> {
        let storage = self.storage.to_storage()?;
        rebuild::rebuild_tensor_v2(
            &storage,
            self.storage_offset,
            &self.size,
            &self.stride,
            self.requires_grad,
            self.hooks.clone(),
            self.metadata.as_ref(),
        )
    }
}

#[derive(Serialize, Deserialize)]
pub enum TensorRecord {
    Dense(DenseRecord),
    SparseCoo {
        indices: DenseRecord,
        values: DenseRecord,
        size: Vec<usize>,
        is_coalesced: Option<bool>,
    },
    SparseCompressed {
        layout: SparseLayout,
        compressed_indices: DenseRecord,
        plain_indices: DenseRecord,
        values: DenseRecord,
        size: Vec<usize>,
    },
    Quantized {
        storage: StorageRecord,
        storage_offset: usize,
        size: Vec<usize>,
        stride: Vec<usize>,
        quantizer_params: QuantizerParams,
        requires_grad: bool,
        hooks: LegacyHooks,
    },
    Parameter {
        data: DenseRecord,
        requires_grad: bool,
        hooks: LegacyHooks,
        state: Option<StateBlob>,
    },
    Meta {
        dtype: DType,
        size: Vec<usize>,
        stride: Vec<usize>,
        requires_grad: bool,
    },
    Wrapper {
        class_name: String,
        dtype: DType,
        size: Vec<usize>,
        stride: Vec<usize>,
        storage_offset: usize,
        device: Device,
        requires_grad: bool,
    },
}

/// A record rebuilt back into its live form.
pub enum Rebuilt {
    Dense(Tensor),
    Sparse(SparseTensor),
    Quantized(QuantizedTensor),
    Parameter(Parameter),
    Wrapper(WrapperTensor),
}

impl TensorRecord {
    pub fn from_tensor(tensor: &Tensor) -> Result<Self> {
        if tensor.device().is_meta() {
            return Ok(Self::Meta {
                dtype: tensor.dtype(),
                size: tensor.shape().to_vec(),
                stride: tensor.strides().to_vec(),
                requires_grad: tensor.requires_grad(),
            });
        }
        Ok(Self::Dense(DenseRecord::from_tensor(tensor)?))
    }

    pub fn from_sparse(tensor: &SparseTensor) -> Result<Self> {
        match tensor.layout() {
            SparseLayout::Coo => Ok(Self::SparseCoo {
                indices: DenseRecord::from_tensor(tensor.indices()?)?,
                values: DenseRecord::from_tensor(tensor.values())?,
                size: tensor.shape().to_vec(),
                is_coalesced: tensor.is_coalesced()?,
            }),
            layout => Ok(Self::SparseCompressed {
                layout,
                compressed_indices: DenseRecord::from_tensor(tensor.compressed_indices()?)?,
                plain_indices: DenseRecord::from_tensor(tensor.plain_indices()?)?,
                values: DenseRecord::from_tensor(tensor.values())?,
                size: tensor.shape().to_vec(),
            }),
        }
    }

    pub fn from_quantized(tensor: &QuantizedTensor) -> Result<Self> {
        use crate::QScheme;

        let quantizer_params = match tensor.qscheme() {
            QScheme::PerTensorAffine => QuantizerParams::PerTensorAffine {
                scale: tensor.q_scale()?,
                zero_point: tensor.q_zero_point()?,
            },
            QScheme::PerChannelAffine => QuantizerParams::PerChannelAffine {
                scales: tensor.q_per_channel_scales()?.to_flatten_vec::<f64>()?,
                zero_points: tensor.q_per_channel_zero_points()?.to_flatten_vec::<i64>()?,
                axis: tensor.q_per_channel_axis()?,
            },
            QScheme::PerChannelAffineFloatQParams => QuantizerParams::PerChannelAffineFloatQParams {
                scales: tensor.q_per_channel_scales()?.to_flatten_vec::<f32>()?.iter().map(|&s| s as f64).collect(),
                zero_points: tensor
                    .q_per_channel_zero_points()?
                    .to_flatten_vec::<f32>()?
                    .iter()
                    .map(|&z| z as f64)
                    .collect(),
                axis: tensor.q_per_channel_axis()?,
            },
            other => {
                return Err(Error::SerializationError(format!(
                    "cannot serialize quantized tensor with scheme {}",
                    other.as_str()
                )));
            }
        };

        let inner = tensor.tensor().contiguous()?;

        Ok(Self::Quantized {
            storage: StorageRecord::from_storage(&inner.storage())?,
            storage_offset: inner.offset(),
            size: inner.shape().to_vec(),
            stride: inner.strides().to_vec(),
            quantizer_params,
            requires_grad: tensor.requires_grad(),
            hooks: tensor.hooks().clone(),
        })
    }

    pub fn from_parameter(param: &Parameter) -> Result<Self> {
        let extras = param.extras();
        let mut attrs = BTreeMap::new();
        if extras.frozen {
            attrs.insert("frozen".to_string(), StateValue::Bool(true));
        }
        if let Some(label) = &extras.label {
            attrs.insert("label".to_string(), StateValue::Str(label.clone()));
        }

        Ok(Self::Parameter {
            data: DenseRecord::from_tensor(param.data())?,
            requires_grad: param.requires_grad(),
            hooks: param.hooks().clone(),
            state: if attrs.is_empty() { None } else { Some(StateBlob::Attrs(attrs)) },
        })
    }

    pub fn from_wrapper(wrapper: &WrapperTensor) -> Self {
        let tensor = wrapper.tensor();
        Self::Wrapper {
            class_name: wrapper.class_name().to_string(),
            dtype: tensor.dtype(),
            size: tensor.shape().to_vec(),
            stride: tensor.strides().to_vec(),
            storage_offset: tensor.offset(),
            device: tensor.device(),
            requires_grad: tensor.requires_grad(),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let config = bincode::config::legacy();
        bincode::serde::encode_to_vec(self, config)
            .map_err(|e| Error::SerializationError(format!("Failed to serialize tensor record: {}", e)))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let config = bincode::config::legacy();
        bincode::serde::decode_from_slice(bytes, config)
            .map(|(value, _)| value)
            .map_err(|e| Error::DeserializationError(format!("Failed to deserialize tensor record: {}", e)))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| Error::SerializationError(format!("Failed to serialize tensor record to JSON: {}", e)))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::DeserializationError(format!("Failed to deserialize tensor record from JSON: {}", e)))
    }
}

/// Rebuilds one record into its live form, parking sparse results in the
/// load context for the deferred structural check.
pub fn rebuild_record(ctx: &mut LoadContext, record: &TensorRecord) -> Result<Rebuilt> {
    match record {
        TensorRecord::Dense(dense) => Ok(Rebuilt::Dense(dense.rebuild()?)),
        TensorRecord::SparseCoo {
            indices,
            values,
            size,
            is_coalesced,
        } => {
            let indices = indices.rebuild()?;
            let values = values.rebuild()?;
            Ok(Rebuilt::Sparse(rebuild::rebuild_sparse_coo(ctx, indices, values, size, *is_coalesced)?))
        }
        TensorRecord::SparseCompressed {
            layout,
            compressed_indices,
            plain_indices,
            values,
            size,
        } => {
            let compressed_indices = compressed_indices.rebuild()?;
            let plain_indices = plain_indices.rebuild()?;
            let values = values.rebuild()?;
            Ok(Rebuilt::Sparse(rebuild::rebuild_sparse_compressed(
                ctx,
                compressed_indices,
                plain_indices,
                values,
                size,
                *layout,
            )?))
        }
        TensorRecord::Quantized {
            storage,
            storage_offset,
            size,
            stride,
            quantizer_params,
            requires_grad,
            hooks,
        } => {
            let storage = storage.to_storage()?;
            Ok(Rebuilt::Quantized(rebuild::rebuild_qtensor(
                &storage,
                *storage_offset,
                size,
                stride,
                quantizer_params,
                *requires_grad,
                hooks.clone(),
            )?))
        }
        TensorRecord::Parameter {
            data,
            requires_grad,
            hooks,
            state,
        } => {
            let data = data.rebuild()?;
            let param = match state {
                Some(state) => rebuild::rebuild_parameter_with_state(data, *requires_grad, hooks.clone(), state)?,
                None => rebuild::rebuild_parameter(data, *requires_grad, hooks.clone())?,
            };
            Ok(Rebuilt::Parameter(param))
        }
        TensorRecord::Meta {
            dtype,
            size,
            stride,
            requires_grad,
        } => Ok(Rebuilt::Dense(rebuild::rebuild_meta_tensor_no_storage(*dtype, size, stride, *requires_grad)?)),
        TensorRecord::Wrapper {
            class_name,
            dtype,
            size,
            stride,
            storage_offset,
            device,
            requires_grad,
        } => Ok(Rebuilt::Wrapper(rebuild::rebuild_wrapper_subclass(
            class_name,
            *dtype,
            size,
            stride,
            *storage_offset,
            *device,
            *requires_grad,
        )?)),
    }
}
