mod utils;

use loomx_core::{
    device::Device,
    dtype::DType,
    error::{Error, Result},
};
use loomx_tensor::{rebuild, LegacyHooks, QScheme, QuantizerParams, Storage};
use utils::setup_device;

#[test]
fn per_tensor_affine_rebuild() -> Result<()> {
    setup_device();

    let storage = Storage::from_vec(vec![10u8, 20, 30, 40], Device::CPU)?;
    let params = QuantizerParams::PerTensorAffine {
        scale: 0.05,
        zero_point: 3,
    };

    let qtensor = rebuild::rebuild_qtensor(&storage, 0, &[2, 2], &[2, 1], &params, false, LegacyHooks::none())?;

    assert_eq!(qtensor.qscheme(), QScheme::PerTensorAffine);
    assert_eq!(qtensor.q_scale()?, 0.05);
    assert_eq!(qtensor.q_zero_point()?, 3);
    assert_eq!(qtensor.dtype(), DType::U8);
    assert_eq!(qtensor.tensor().to_flatten_vec::<u8>()?, vec![10, 20, 30, 40]);

    Ok(())
}

#[test]
fn per_channel_zero_points_are_integral() -> Result<()> {
    setup_device();

    let storage = Storage::from_vec(vec![1i8, 2, 3, 4], Device::CPU)?;
    let params = QuantizerParams::PerChannelAffine {
        scales: vec![0.1, 0.2],
        zero_points: vec![1, 2],
        axis: 0,
    };

    let qtensor = rebuild::rebuild_qtensor(&storage, 0, &[2, 2], &[2, 1], &params, false, LegacyHooks::none())?;

    assert_eq!(qtensor.qscheme(), QScheme::PerChannelAffine);
    assert_eq!(qtensor.q_per_channel_axis()?, 0);
    assert_eq!(qtensor.q_per_channel_scales()?.dtype(), DType::F64);
    assert_eq!(qtensor.q_per_channel_scales()?.to_flatten_vec::<f64>()?, vec![0.1, 0.2]);
    assert_eq!(qtensor.q_per_channel_zero_points()?.dtype(), DType::I64);
    assert_eq!(qtensor.q_per_channel_zero_points()?.to_flatten_vec::<i64>()?, vec![1, 2]);

    Ok(())
}

#[test]
fn float_qparams_keep_float_zero_points() -> Result<()> {
    setup_device();

    let storage = Storage::from_vec(vec![1u8, 2, 3, 4], Device::CPU)?;
    let params = QuantizerParams::PerChannelAffineFloatQParams {
        scales: vec![0.5, 0.25],
        zero_points: vec![1.5, 2.5],
        axis: 1,
    };

    let qtensor = rebuild::rebuild_qtensor(&storage, 0, &[2, 2], &[2, 1], &params, false, LegacyHooks::none())?;

    assert_eq!(qtensor.qscheme(), QScheme::PerChannelAffineFloatQParams);
    assert_eq!(qtensor.q_per_channel_scales()?.dtype(), DType::F32);
    assert_eq!(qtensor.q_per_channel_zero_points()?.dtype(), DType::F32);
    assert_eq!(qtensor.q_per_channel_zero_points()?.to_flatten_vec::<f32>()?, vec![1.5, 2.5]);

    Ok(())
}

#[test]
fn symmetric_schemes_cannot_be_rebuilt() -> Result<()> {
    setup_device();

    let storage = Storage::from_vec(vec![1u8, 2], Device::CPU)?;

    for params in [QuantizerParams::PerTensorSymmetric, QuantizerParams::PerChannelSymmetric { axis: 0 }] {
        let result = rebuild::rebuild_qtensor(&storage, 0, &[2], &[1], &params, false, LegacyHooks::none());
        assert!(matches!(result, Err(Error::UnsupportedScheme(_))));
    }

    Ok(())
}

#[test]
fn quantized_storage_must_be_integral() -> Result<()> {
    setup_device();

    let storage = Storage::from_vec(vec![1.0f32, 2.0], Device::CPU)?;
    let params = QuantizerParams::PerTensorAffine { scale: 1.0, zero_point: 0 };

    let result = rebuild::rebuild_qtensor(&storage, 0, &[2], &[1], &params, false, LegacyHooks::none());
    assert!(matches!(result, Err(Error::UnsupportedDType)));

    Ok(())
}

#[test]
fn qparam_count_must_match_channels() -> Result<()> {
    setup_device();

    let storage = Storage::from_vec(vec![1i8, 2, 3, 4], Device::CPU)?;
    let params = QuantizerParams::PerChannelAffine {
        scales: vec![0.1, 0.2, 0.3],
        zero_points: vec![1, 2, 3],
        axis: 0,
    };

    let result = rebuild::rebuild_qtensor(&storage, 0, &[2, 2], &[2, 1], &params, false, LegacyHooks::none());
    assert!(matches!(result, Err(Error::InvalidArgument(_))));

    Ok(())
}

#[test]
fn per_tensor_accessors_reject_per_channel() -> Result<()> {
    setup_device();

    let storage = Storage::from_vec(vec![1i8, 2], Device::CPU)?;
    let params = QuantizerParams::PerChannelAffine {
        scales: vec![0.1, 0.2],
        zero_points: vec![0, 0],
        axis: 0,
    };

    let qtensor = rebuild::rebuild_qtensor(&storage, 0, &[2], &[1], &params, false, LegacyHooks::none())?;

    assert!(qtensor.q_scale().is_err());
    assert!(qtensor.q_zero_point().is_err());

    Ok(())
}
