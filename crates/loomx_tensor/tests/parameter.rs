mod utils;

use loomx_core::error::{Error, Result};
use loomx_tensor::{rebuild, LegacyHooks, StateBlob, StateValue, Tensor};
use std::collections::BTreeMap;
use utils::setup_device;

fn attrs(entries: &[(&str, StateValue)]) -> BTreeMap<String, StateValue> {
    entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
}

#[test]
fn rebuild_marks_data_trainable() -> Result<()> {
    setup_device();

    let data = Tensor::new(vec![1.0f32, 2.0, 3.0])?;
    let param = rebuild::rebuild_parameter(data, true, LegacyHooks::none())?;

    assert!(param.requires_grad());
    assert!(!param.is_frozen());
    assert_eq!(param.label(), None);
    assert_eq!(param.data().to_flatten_vec::<f32>()?, vec![1.0, 2.0, 3.0]);

    Ok(())
}

#[test]
fn state_replays_onto_extra_fields() -> Result<()> {
    setup_device();

    let data = Tensor::new(vec![1.0f32])?;
    let state = StateBlob::Attrs(attrs(&[
        ("frozen", StateValue::Bool(true)),
        ("label", StateValue::Str("encoder.bias".to_string())),
    ]));

    let param = rebuild::rebuild_parameter_with_state(data, false, LegacyHooks::none(), &state)?;

    assert!(param.is_frozen());
    assert_eq!(param.label(), Some("encoder.bias"));
    assert!(!param.requires_grad());

    Ok(())
}

#[test]
fn paired_state_applies_both_maps() -> Result<()> {
    setup_device();

    let data = Tensor::new(vec![1.0f32])?;
    let state = StateBlob::Pair(vec![
        attrs(&[("frozen", StateValue::Bool(true))]),
        attrs(&[("label", StateValue::Str("head".to_string()))]),
    ]);

    let param = rebuild::rebuild_parameter_with_state(data, true, LegacyHooks::none(), &state)?;

    assert!(param.is_frozen());
    assert_eq!(param.label(), Some("head"));

    Ok(())
}

#[test]
fn paired_state_must_hold_exactly_two_maps() -> Result<()> {
    setup_device();

    let data = Tensor::new(vec![1.0f32])?;
    let state = StateBlob::Pair(vec![attrs(&[("frozen", StateValue::Bool(true))])]);

    let result = rebuild::rebuild_parameter_with_state(data, true, LegacyHooks::none(), &state);
    assert!(matches!(result, Err(Error::InvalidState { .. })));

    Ok(())
}

#[test]
fn unknown_state_key_is_malformed() -> Result<()> {
    setup_device();

    let data = Tensor::new(vec![1.0f32])?;
    let state = StateBlob::Attrs(attrs(&[("momentum", StateValue::Float(0.9))]));

    let result = rebuild::rebuild_parameter_with_state(data, true, LegacyHooks::none(), &state);
    assert!(matches!(result, Err(Error::InvalidState { .. })));

    Ok(())
}

#[test]
fn wrong_value_type_is_malformed() -> Result<()> {
    setup_device();

    let data = Tensor::new(vec![1.0f32])?;
    let state = StateBlob::Attrs(attrs(&[("frozen", StateValue::Int(1))]));

    let result = rebuild::rebuild_parameter_with_state(data, true, LegacyHooks::none(), &state);
    assert!(matches!(result, Err(Error::InvalidState { .. })));

    Ok(())
}

#[test]
fn hooks_survive_on_the_parameter() -> Result<()> {
    setup_device();

    let data = Tensor::new(vec![1.0f32])?;
    let param = rebuild::rebuild_parameter(data, false, LegacyHooks::opaque(vec![7]))?;

    assert_eq!(param.hooks().payload(), Some(&[7u8][..]));

    Ok(())
}
