//! Reconstruction of tensors from serialized state.
//!
//! Each `rebuild_*` function maps the primitive fields of one saved
//! layout back into a live object. None of them re-run the validation a
//! user-facing constructor would: saved data was valid when written, and
//! for sparse tensors the index/value sub-tensors may not even be
//! materialized yet when the sparse record is processed. Sparse results
//! are therefore parked in a [`LoadContext`] and checked in bulk by
//! [`validate_pending_sparse`] once the whole load pass is done.

use crate::{
    LegacyHooks, Parameter, QuantizedTensor, SparseLayout, SparseTensor, StateBlob, Storage, Tensor, TensorData,
    TensorFlags, TensorMetadata,
};
use loomx_core::{
    buffer::meta::MetaBuffer,
    device::Device,
    dtype::DType,
    error::{Error, Result},
    layout::Layout,
};
use std::{collections::BTreeMap, sync::Arc};

/// Per-load-session context.
///
/// Owns the pending-validation set: sparse tensors rebuilt during one
/// deserialization pass, waiting for the deferred structural check. The
/// set starts empty, grows only through the sparse rebuild calls, and is
/// emptied by every drain. One context belongs to one load pass; sharing
/// it across concurrent passes is the caller's problem to synchronize.
#[derive(Default)]
pub struct LoadContext {
    pending_sparse: Vec<SparseTensor>,
}

impl LoadContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending_len(&self) -> usize {
        self.pending_sparse.len()
    }
}

/// Rebuilds a dense tensor bound to `storage` at `storage_offset`.
///
/// Starts from a zero-size tensor with the storage's dtype and device,
/// then binds it onto the given region. Shape errors come from the bind.
pub fn rebuild_tensor(storage: &Storage, storage_offset: usize, size: &[usize], stride: &[usize]) -> Result<Tensor> {
    let mut tensor = Tensor::empty_with_spec(&[0], storage.dtype(), storage.device())?;
    tensor.bind(storage, storage_offset, size, stride)?;
    Ok(tensor)
}

/// Dense rebuild with the v2 trailer: gradient flag, legacy hooks, and
/// optional metadata bits.
pub fn rebuild_tensor_v2(
    storage: &Storage,
    storage_offset: usize,
    size: &[usize],
    stride: &[usize],
    requires_grad: bool,
    hooks: LegacyHooks,
    metadata: Option<&BTreeMap<String, bool>>,
) -> Result<Tensor> {
    let mut tensor = rebuild_tensor(storage, storage_offset, size, stride)?;
    tensor.set_requires_grad(requires_grad)?;
    if let Some(metadata) = metadata {
        set_tensor_metadata(&mut tensor, metadata)?;
    }

    // Carried verbatim for compatibility with state that still reads an
    // (expected-empty) hooks field; never invoked.
    tensor.set_hooks(hooks);
    Ok(tensor)
}

/// Applies serialized metadata bits to a tensor.
pub fn set_tensor_metadata(tensor: &mut Tensor, metadata: &BTreeMap<String, bool>) -> Result<()> {
    let mut flags = tensor.flags();
    for (key, &value) in metadata {
        match key.as_str() {
            "conj" => flags.conj = value,
            "neg" => flags.neg = value,
            _ => {
                return Err(Error::InvalidArgument(format!("unknown tensor metadata key `{}`", key)));
            }
        }
    }
    tensor.set_flags(flags);
    Ok(())
}

pub fn get_tensor_metadata(tensor: &Tensor) -> BTreeMap<String, bool> {
    let mut metadata = BTreeMap::new();
    let flags = tensor.flags();
    if flags.conj {
        metadata.insert("conj".to_string(), true);
    }
    if flags.neg {
        metadata.insert("neg".to_string(), true);
    }
    metadata
}

/// Rebuilds a COO sparse tensor, unvalidated, and parks it for the
/// deferred drain.
pub fn rebuild_sparse_coo(
    ctx: &mut LoadContext,
    indices: Tensor,
    values: Tensor,
    size: &[usize],
    is_coalesced: Option<bool>,
) -> Result<SparseTensor> {
    let result = SparseTensor::coo_unchecked(indices, values, size, is_coalesced);
    ctx.pending_sparse.push(result.clone());
    Ok(result)
}

/// Rebuilds a CSR/CSC/BSR/BSC sparse tensor, unvalidated, and parks it
/// for the deferred drain.
pub fn rebuild_sparse_compressed(
    ctx: &mut LoadContext,
    compressed_indices: Tensor,
    plain_indices: Tensor,
    values: Tensor,
    size: &[usize],
    layout: SparseLayout,
) -> Result<SparseTensor> {
    let result = SparseTensor::compressed_unchecked(compressed_indices, plain_indices, values, size, layout)?;
    ctx.pending_sparse.push(result.clone());
    Ok(result)
}

/// Drains the pending-validation set, running the full structural check
/// on every sparse tensor rebuilt since the last drain.
///
/// The set is taken out of the context before the first check runs, so it
/// is empty when this returns whether validation passed or raised; a
/// failed load never leaves stale entries behind for the next one.
pub fn validate_pending_sparse(ctx: &mut LoadContext) -> Result<()> {
    let pending = std::mem::take(&mut ctx.pending_sparse);
    for tensor in &pending {
        tensor.validate()?;
    }
    Ok(())
}

/// Rebuilds a quantized tensor, dispatching on the quantization scheme.
///
/// Per-channel schemes promote their list-typed parameters to typed
/// vectors on the storage's device: integral zero points for the plain
/// affine scheme, floating-point for the float-qparams scheme. Any other
/// scheme tag cannot be rebuilt.
pub fn rebuild_qtensor(
    storage: &Storage,
    storage_offset: usize,
    size: &[usize],
    stride: &[usize],
    quantizer_params: &crate::QuantizerParams,
    requires_grad: bool,
    hooks: LegacyHooks,
) -> Result<QuantizedTensor> {
    use crate::QuantizerParams;

    let mut tensor = match quantizer_params {
        QuantizerParams::PerTensorAffine { scale, zero_point } => {
            QuantizedTensor::empty_affine(size, *scale, *zero_point, storage.dtype(), storage.device())?
        }
        QuantizerParams::PerChannelAffine { scales, zero_points, axis } => {
            let scales = Tensor::from_vec_with_spec(scales.clone(), &[scales.len()], storage.device())?;
            let zero_points = Tensor::from_vec_with_spec(zero_points.clone(), &[zero_points.len()], storage.device())?;
            QuantizedTensor::empty_per_channel_affine(size, scales, zero_points, *axis, storage.dtype(), storage.device())?
        }
        QuantizerParams::PerChannelAffineFloatQParams { scales, zero_points, axis } => {
            let scales: Vec<f32> = scales.iter().map(|&s| s as f32).collect();
            let zero_points: Vec<f32> = zero_points.iter().map(|&z| z as f32).collect();
            let (n_scales, n_zero_points) = (scales.len(), zero_points.len());
            let scales = Tensor::from_vec_with_spec(scales, &[n_scales], storage.device())?;
            let zero_points = Tensor::from_vec_with_spec(zero_points, &[n_zero_points], storage.device())?;
            QuantizedTensor::empty_per_channel_affine(size, scales, zero_points, *axis, storage.dtype(), storage.device())?
        }
        other => {
            return Err(Error::UnsupportedScheme(format!(
                "cannot rebuild quantized tensor with scheme {}",
                other.scheme().as_str()
            )));
        }
    };

    tensor.bind(storage, storage_offset, size, stride)?;
    tensor.set_requires_grad(requires_grad)?;
    tensor.set_hooks(hooks);
    Ok(tensor)
}

/// Wraps a rebuilt data tensor as a trainable parameter.
pub fn rebuild_parameter(data: Tensor, requires_grad: bool, hooks: LegacyHooks) -> Result<Parameter> {
    let mut param = Parameter::new(data, requires_grad)?;
    param.set_hooks(hooks);
    Ok(param)
}

/// Parameter rebuild that additionally replays saved object state onto
/// the parameter's extra fields.
pub fn rebuild_parameter_with_state(
    data: Tensor,
    requires_grad: bool,
    hooks: LegacyHooks,
    state: &StateBlob,
) -> Result<Parameter> {
    let mut param = rebuild_parameter(data, requires_grad, hooks)?;
    param.apply_state(state)?;
    Ok(param)
}

/// Storage-less placeholder for a tensor subclass that manages its own
/// storage externally. Carries shape, strides, dtype, and device, plus
/// the subclass name; the buffer slot is a zero-length stand-in.
#[derive(Clone)]
pub struct WrapperTensor {
    class_name: String,
    tensor: Tensor,
}

impl WrapperTensor {
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }
}

pub fn rebuild_wrapper_subclass(
    class_name: &str,
    dtype: DType,
    size: &[usize],
    stride: &[usize],
    storage_offset: usize,
    device: Device,
    requires_grad: bool,
) -> Result<WrapperTensor> {
    if size.len() != stride.len() {
        return Err(Error::InvalidShape {
            message: format!("shape rank {} != stride rank {}", size.len(), stride.len()),
        });
    }

    let tensor = Tensor {
        data: TensorData {
            buffer: Arc::new(MetaBuffer::new(0, dtype)),
            grad: None,
        },
        metadata: TensorMetadata {
            device,
            dtype,
            layout: Layout::new(size, stride, storage_offset),
            requires_grad,
            flags: TensorFlags::default(),
            hooks: LegacyHooks::none(),
        },
    };

    Ok(WrapperTensor {
        class_name: class_name.to_string(),
        tensor,
    })
}

/// Rebuilds a shape/stride-only tensor on the storage-free meta device.
pub fn rebuild_meta_tensor_no_storage(dtype: DType, size: &[usize], stride: &[usize], requires_grad: bool) -> Result<Tensor> {
    let mut tensor = Tensor::empty_strided(size, stride, dtype, Device::Meta)?;
    tensor.set_requires_grad(requires_grad)?;
    Ok(tensor)
}
