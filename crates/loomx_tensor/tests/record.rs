#![cfg(feature = "serde")]

mod utils;

use loomx_core::{
    device::Device,
    dtype::DType,
    error::Result,
};
use loomx_tensor::{
    rebuild::{self, LoadContext},
    record::{rebuild_record, Rebuilt, TensorRecord},
    LegacyHooks, QScheme, QuantizerParams, SparseLayout, Storage, Tensor,
};
use utils::setup_device;

#[test]
fn dense_roundtrip_through_bytes() -> Result<()> {
    setup_device();

    let mut tensor = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], &[2, 2])?;
    tensor.set_hooks(LegacyHooks::opaque(vec![1, 2, 3]));

    let record = TensorRecord::from_tensor(&tensor)?;
    let bytes = record.to_bytes()?;
    let decoded = TensorRecord::from_bytes(&bytes)?;

    let mut ctx = LoadContext::new();
    let Rebuilt::Dense(rebuilt) = rebuild_record(&mut ctx, &decoded)? else {
        panic!("expected a dense tensor");
    };

    assert_eq!(rebuilt.shape(), &[2, 2]);
    assert_eq!(rebuilt.dtype(), DType::F32);
    assert_eq!(rebuilt.to_flatten_vec::<f32>()?, vec![1.0, 2.0, 3.0, 4.0]);
    assert_eq!(rebuilt.hooks().payload(), Some(&[1u8, 2, 3][..]));

    Ok(())
}

#[test]
fn dense_roundtrip_through_json() -> Result<()> {
    setup_device();

    let tensor = Tensor::from_vec(vec![5i64, 6, 7], &[3])?;

    let json = TensorRecord::from_tensor(&tensor)?.to_json()?;
    let decoded = TensorRecord::from_json(&json)?;

    let mut ctx = LoadContext::new();
    let Rebuilt::Dense(rebuilt) = rebuild_record(&mut ctx, &decoded)? else {
        panic!("expected a dense tensor");
    };

    assert_eq!(rebuilt.to_flatten_vec::<i64>()?, vec![5, 6, 7]);

    Ok(())
}

#[test]
fn strided_view_is_saved_contiguously() -> Result<()> {
    setup_device();

    // a transposed view; the record stores its contiguous reading
    let storage = Storage::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], Device::CPU)?;
    let view = rebuild::rebuild_tensor(&storage, 0, &[2, 2], &[1, 2])?;

    let record = TensorRecord::from_tensor(&view)?;
    let mut ctx = LoadContext::new();
    let Rebuilt::Dense(rebuilt) = rebuild_record(&mut ctx, &record)? else {
        panic!("expected a dense tensor");
    };

    assert_eq!(rebuilt.shape(), &[2, 2]);
    assert!(rebuilt.is_contiguous());
    assert_eq!(rebuilt.to_flatten_vec::<f32>()?, vec![1.0, 3.0, 2.0, 4.0]);

    Ok(())
}

#[test]
fn conj_flag_survives_serialization() -> Result<()> {
    setup_device();

    let storage = Storage::from_vec(vec![1.0f32, 2.0], Device::CPU)?;
    let mut metadata = std::collections::BTreeMap::new();
    metadata.insert("conj".to_string(), true);
    let tensor = rebuild::rebuild_tensor_v2(&storage, 0, &[2], &[1], false, LegacyHooks::none(), Some(&metadata))?;

    let bytes = TensorRecord::from_tensor(&tensor)?.to_bytes()?;
    let mut ctx = LoadContext::new();
    let Rebuilt::Dense(rebuilt) = rebuild_record(&mut ctx, &TensorRecord::from_bytes(&bytes)?)? else {
        panic!("expected a dense tensor");
    };

    assert!(rebuilt.is_conj());

    Ok(())
}

#[test]
fn sparse_record_rebuild_is_deferred() -> Result<()> {
    setup_device();

    let indices = Tensor::from_vec(vec![0i64, 1, 2, 0], &[2, 2])?;
    let values = Tensor::from_vec(vec![1.5f32, 2.5], &[2])?;
    let mut ctx = LoadContext::new();
    let sparse = rebuild::rebuild_sparse_coo(&mut ctx, indices, values, &[2, 3], Some(true))?;
    rebuild::validate_pending_sparse(&mut ctx)?;

    let bytes = TensorRecord::from_sparse(&sparse)?.to_bytes()?;

    let mut load = LoadContext::new();
    let Rebuilt::Sparse(rebuilt) = rebuild_record(&mut load, &TensorRecord::from_bytes(&bytes)?)? else {
        panic!("expected a sparse tensor");
    };

    assert_eq!(load.pending_len(), 1);
    assert_eq!(rebuilt.nnz(), 2);
    assert_eq!(rebuilt.is_coalesced()?, Some(true));
    assert_eq!(rebuilt.values().to_flatten_vec::<f32>()?, vec![1.5, 2.5]);

    rebuild::validate_pending_sparse(&mut load)?;

    Ok(())
}

#[test]
fn csr_record_roundtrip_through_bytes() -> Result<()> {
    setup_device();

    // [[0, 5], [7, 0]] as CSR
    let compressed = Tensor::from_vec(vec![0i64, 1, 2], &[3])?;
    let plain = Tensor::from_vec(vec![1i64, 0], &[2])?;
    let values = Tensor::from_vec(vec![5.0f32, 7.0], &[2])?;
    let mut ctx = LoadContext::new();
    let sparse = rebuild::rebuild_sparse_compressed(&mut ctx, compressed, plain, values, &[2, 2], SparseLayout::Csr)?;
    rebuild::validate_pending_sparse(&mut ctx)?;

    let bytes = TensorRecord::from_sparse(&sparse)?.to_bytes()?;

    let mut load = LoadContext::new();
    let Rebuilt::Sparse(rebuilt) = rebuild_record(&mut load, &TensorRecord::from_bytes(&bytes)?)? else {
        panic!("expected a sparse tensor");
    };

    assert_eq!(load.pending_len(), 1);
    assert_eq!(rebuilt.layout(), SparseLayout::Csr);
    assert_eq!(rebuilt.shape(), &[2, 2]);
    assert_eq!(rebuilt.compressed_indices()?.to_flatten_vec::<i64>()?, vec![0, 1, 2]);
    assert_eq!(rebuilt.plain_indices()?.to_flatten_vec::<i64>()?, vec![1, 0]);
    assert_eq!(rebuilt.values().to_flatten_vec::<f32>()?, vec![5.0, 7.0]);

    rebuild::validate_pending_sparse(&mut load)?;

    Ok(())
}

#[test]
fn bsr_record_roundtrip_through_bytes() -> Result<()> {
    setup_device();

    // one 2x2 block covering the top-left of a 4x4 matrix
    let compressed = Tensor::from_vec(vec![0i64, 1, 1], &[3])?;
    let plain = Tensor::from_vec(vec![0i64], &[1])?;
    let values = Tensor::from_vec(vec![1.0f32, 2.0, 3.0, 4.0], &[1, 2, 2])?;
    let mut ctx = LoadContext::new();
    let sparse = rebuild::rebuild_sparse_compressed(&mut ctx, compressed, plain, values, &[4, 4], SparseLayout::Bsr)?;
    rebuild::validate_pending_sparse(&mut ctx)?;

    let bytes = TensorRecord::from_sparse(&sparse)?.to_bytes()?;

    let mut load = LoadContext::new();
    let Rebuilt::Sparse(rebuilt) = rebuild_record(&mut load, &TensorRecord::from_bytes(&bytes)?)? else {
        panic!("expected a sparse tensor");
    };

    assert_eq!(rebuilt.layout(), SparseLayout::Bsr);
    assert_eq!(rebuilt.values().shape(), &[1, 2, 2]);
    assert_eq!(rebuilt.values().to_flatten_vec::<f32>()?, vec![1.0, 2.0, 3.0, 4.0]);

    rebuild::validate_pending_sparse(&mut load)?;

    Ok(())
}

#[test]
fn quantized_record_roundtrip() -> Result<()> {
    setup_device();

    let storage = Storage::from_vec(vec![1u8, 2, 3, 4], Device::CPU)?;
    let params = QuantizerParams::PerChannelAffine {
        scales: vec![0.5, 0.25],
        zero_points: vec![3, 4],
        axis: 0,
    };
    let qtensor = rebuild::rebuild_qtensor(&storage, 0, &[2, 2], &[2, 1], &params, false, LegacyHooks::none())?;

    let bytes = TensorRecord::from_quantized(&qtensor)?.to_bytes()?;
    let mut ctx = LoadContext::new();
    let Rebuilt::Quantized(rebuilt) = rebuild_record(&mut ctx, &TensorRecord::from_bytes(&bytes)?)? else {
        panic!("expected a quantized tensor");
    };

    assert_eq!(rebuilt.qscheme(), QScheme::PerChannelAffine);
    assert_eq!(rebuilt.q_per_channel_scales()?.to_flatten_vec::<f64>()?, vec![0.5, 0.25]);
    assert_eq!(rebuilt.q_per_channel_zero_points()?.to_flatten_vec::<i64>()?, vec![3, 4]);
    assert_eq!(rebuilt.tensor().to_flatten_vec::<u8>()?, vec![1, 2, 3, 4]);

    Ok(())
}

#[test]
fn parameter_record_keeps_state() -> Result<()> {
    setup_device();

    let data = Tensor::from_vec(vec![1.0f32, 2.0], &[2])?;
    let mut param = rebuild::rebuild_parameter(data, true, LegacyHooks::none())?;
    param.apply_state(&loomx_tensor::StateBlob::Attrs(
        [("frozen".to_string(), loomx_tensor::StateValue::Bool(true))].into_iter().collect(),
    ))?;

    let bytes = TensorRecord::from_parameter(&param)?.to_bytes()?;
    let mut ctx = LoadContext::new();
    let Rebuilt::Parameter(rebuilt) = rebuild_record(&mut ctx, &TensorRecord::from_bytes(&bytes)?)? else {
        panic!("expected a parameter");
    };

    assert!(rebuilt.is_frozen());
    assert!(rebuilt.requires_grad());
    assert_eq!(rebuilt.data().to_flatten_vec::<f32>()?, vec![1.0, 2.0]);

    Ok(())
}

#[test]
fn meta_record_needs_no_storage() -> Result<()> {
    let tensor = rebuild::rebuild_meta_tensor_no_storage(DType::F16, &[4, 4], &[4, 1], false)?;

    let bytes = TensorRecord::from_tensor(&tensor)?.to_bytes()?;
    let mut ctx = LoadContext::new();
    let Rebuilt::Dense(rebuilt) = rebuild_record(&mut ctx, &TensorRecord::from_bytes(&bytes)?)? else {
        panic!("expected a dense tensor");
    };

    assert!(rebuilt.device().is_meta());
    assert_eq!(rebuilt.shape(), &[4, 4]);

    Ok(())
}

#[test]
fn wrapper_record_keeps_class_name() -> Result<()> {
    let wrapper = rebuild::rebuild_wrapper_subclass("ShardedTensor", DType::F32, &[8], &[1], 0, Device::CPU, false)?;

    let json = TensorRecord::from_wrapper(&wrapper).to_json()?;
    let mut ctx = LoadContext::new();
    let Rebuilt::Wrapper(rebuilt) = rebuild_record(&mut ctx, &TensorRecord::from_json(&json)?)? else {
        panic!("expected a wrapper");
    };

    assert_eq!(rebuilt.class_name(), "ShardedTensor");
    assert_eq!(rebuilt.tensor().shape(), &[8]);

    Ok(())
}
