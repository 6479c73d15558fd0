use crate::{LegacyHooks, Storage, Tensor};
use loomx_core::{
    device::Device,
    dtype::DType,
    error::{Error, Result},
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum QScheme {
    PerTensorAffine,
    PerTensorSymmetric,
    PerChannelAffine,
    PerChannelSymmetric,
    PerChannelAffineFloatQParams,
}

impl QScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PerTensorAffine => "per_tensor_affine",
            Self::PerTensorSymmetric => "per_tensor_symmetric",
            Self::PerChannelAffine => "per_channel_affine",
            Self::PerChannelSymmetric => "per_channel_symmetric",
            Self::PerChannelAffineFloatQParams => "per_channel_affine_float_qparams",
        }
    }
}

/// Quantizer parameters as they appear in serialized state.
///
/// Per-channel scales and zero points arrive as plain lists; rebuilding
/// promotes them to typed vectors on the storage's device.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum QuantizerParams {
    PerTensorAffine {
        scale: f64,
        zero_point: i64,
    },
    PerChannelAffine {
        scales: Vec<f64>,
        zero_points: Vec<i64>,
        axis: usize,
    },
    PerChannelAffineFloatQParams {
        scales: Vec<f64>,
        zero_points: Vec<f64>,
        axis: usize,
    },
    PerTensorSymmetric,
    PerChannelSymmetric {
        axis: usize,
    },
}

impl QuantizerParams {
    pub fn scheme(&self) -> QScheme {
        match self {
            Self::PerTensorAffine { .. } => QScheme::PerTensorAffine,
            Self::PerChannelAffine { .. } => QScheme::PerChannelAffine,
            Self::PerChannelAffineFloatQParams { .. } => QScheme::PerChannelAffineFloatQParams,
            Self::PerTensorSymmetric => QScheme::PerTensorSymmetric,
            Self::PerChannelSymmetric { .. } => QScheme::PerChannelSymmetric,
        }
    }
}

#[derive(Clone)]
enum QuantMeta {
    PerTensor {
        scale: f64,
        zero_point: i64,
    },
    PerChannel {
        scales: Tensor,
        zero_points: Tensor,
        axis: usize,
        float_qparams: bool,
    },
}

/// Dense tensor of low-precision integers with an affine mapping back to
/// real values.
#[derive(Clone)]
pub struct QuantizedTensor {
    inner: Tensor,
    quant: QuantMeta,
}

fn check_quantized_dtype(dtype: DType) -> Result<()> {
    match dtype {
        DType::U8 | DType::I8 | DType::I32 => Ok(()),
        _ => Err(Error::UnsupportedDType),
    }
}

impl QuantizedTensor {
    pub fn empty_affine(shape: &[usize], scale: f64, zero_point: i64, dtype: DType, device: Device) -> Result<Self> {
        check_quantized_dtype(dtype)?;

        Ok(Self {
            inner: Tensor::empty_with_spec(shape, dtype, device)?,
            quant: QuantMeta::PerTensor { scale, zero_point },
        })
    }

    pub fn empty_per_channel_affine(
        shape: &[usize],
        scales: Tensor,
        zero_points: Tensor,
        axis: usize,
        dtype: DType,
        device: Device,
    ) -> Result<Self> {
        check_quantized_dtype(dtype)?;

        let channels = shape.get(axis).copied().ok_or_else(|| {
            Error::InvalidArgument(format!("quantization axis {} out of range for shape {:?}", axis, shape))
        })?;
        if scales.size() != channels || zero_points.size() != channels {
            return Err(Error::InvalidArgument(format!(
                "expected {} per-channel qparams, got {} scales and {} zero points",
                channels,
                scales.size(),
                zero_points.size()
            )));
        }

        let float_qparams = zero_points.dtype().is_float();

        Ok(Self {
            inner: Tensor::empty_with_spec(shape, dtype, device)?,
            quant: QuantMeta::PerChannel {
                scales,
                zero_points,
                axis,
                float_qparams,
            },
        })
    }

    pub fn bind(&mut self, storage: &Storage, offset: usize, shape: &[usize], strides: &[usize]) -> Result<()> {
        self.inner.bind(storage, offset, shape, strides)
    }

    pub fn tensor(&self) -> &Tensor {
        &self.inner
    }

    pub fn qscheme(&self) -> QScheme {
        match &self.quant {
            QuantMeta::PerTensor { .. } => QScheme::PerTensorAffine,
            QuantMeta::PerChannel { float_qparams: false, .. } => QScheme::PerChannelAffine,
            QuantMeta::PerChannel { float_qparams: true, .. } => QScheme::PerChannelAffineFloatQParams,
        }
    }

    pub fn q_scale(&self) -> Result<f64> {
        match &self.quant {
            QuantMeta::PerTensor { scale, .. } => Ok(*scale),
            QuantMeta::PerChannel { .. } => Err(Error::InvalidArgument("q_scale() requires per-tensor quantization".into())),
        }
    }

    pub fn q_zero_point(&self) -> Result<i64> {
        match &self.quant {
            QuantMeta::PerTensor { zero_point, .. } => Ok(*zero_point),
            QuantMeta::PerChannel { .. } => Err(Error::InvalidArgument("q_zero_point() requires per-tensor quantization".into())),
        }
    }

    pub fn q_per_channel_scales(&self) -> Result<&Tensor> {
        match &self.quant {
            QuantMeta::PerChannel { scales, .. } => Ok(scales),
            QuantMeta::PerTensor { .. } => Err(Error::InvalidArgument("q_per_channel_scales() requires per-channel quantization".into())),
        }
    }

    pub fn q_per_channel_zero_points(&self) -> Result<&Tensor> {
        match &self.quant {
            QuantMeta::PerChannel { zero_points, .. } => Ok(zero_points),
            QuantMeta::PerTensor { .. } => {
                Err(Error::InvalidArgument("q_per_channel_zero_points() requires per-channel quantization".into()))
            }
        }
    }

    pub fn q_per_channel_axis(&self) -> Result<usize> {
        match &self.quant {
            QuantMeta::PerChannel { axis, .. } => Ok(*axis),
            QuantMeta::PerTensor { .. } => Err(Error::InvalidArgument("q_per_channel_axis() requires per-channel quantization".into())),
        }
    }

    // passthrough to the carrier tensor

    pub fn shape(&self) -> &[usize] {
        self.inner.shape()
    }

    pub fn strides(&self) -> &[usize] {
        self.inner.strides()
    }

    pub fn dtype(&self) -> DType {
        self.inner.dtype()
    }

    pub fn device(&self) -> Device {
        self.inner.device()
    }

    pub fn requires_grad(&self) -> bool {
        self.inner.requires_grad()
    }

    pub fn set_requires_grad(&mut self, requires_grad: bool) -> Result<()> {
        self.inner.set_requires_grad(requires_grad)
    }

    pub fn hooks(&self) -> &LegacyHooks {
        self.inner.hooks()
    }

    pub fn set_hooks(&mut self, hooks: LegacyHooks) {
        self.inner.set_hooks(hooks)
    }
}
