use crate::{LegacyHooks, Tensor};
use loomx_core::error::{Error, Result};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StateValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

/// Extra object state a parameter subclass may have attached before
/// saving: either a plain attribute map, or an attribute map paired with
/// a slot map.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StateBlob {
    Attrs(BTreeMap<String, StateValue>),
    Pair(Vec<BTreeMap<String, StateValue>>),
}

/// The enumerated set of extra fields state replay may patch. Keys
/// outside this set are malformed state, not an invitation to grow new
/// fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamExtras {
    pub frozen: bool,
    pub label: Option<String>,
}

impl ParamExtras {
    fn apply(&mut self, attrs: &BTreeMap<String, StateValue>) -> Result<()> {
        for (key, value) in attrs {
            match (key.as_str(), value) {
                ("frozen", StateValue::Bool(v)) => self.frozen = *v,
                ("label", StateValue::Str(v)) => self.label = Some(v.clone()),
                ("frozen", _) | ("label", _) => {
                    return Err(Error::InvalidState {
                        message: format!("wrong value type for parameter field `{}`", key),
                    })
                }
                _ => {
                    return Err(Error::InvalidState {
                        message: format!("unknown parameter field `{}` in serialized state", key),
                    })
                }
            }
        }
        Ok(())
    }
}

/// Trainable-parameter wrapper around a dense tensor.
#[derive(Clone)]
pub struct Parameter {
    data: Tensor,
    extras: ParamExtras,
}

impl Parameter {
    pub fn new(mut data: Tensor, requires_grad: bool) -> Result<Self> {
        data.set_requires_grad(requires_grad)?;
        Ok(Self {
            data,
            extras: ParamExtras::default(),
        })
    }

    pub fn data(&self) -> &Tensor {
        &self.data
    }

    pub fn requires_grad(&self) -> bool {
        self.data.requires_grad()
    }

    pub fn is_frozen(&self) -> bool {
        self.extras.frozen
    }

    pub fn label(&self) -> Option<&str> {
        self.extras.label.as_deref()
    }

    pub fn extras(&self) -> &ParamExtras {
        &self.extras
    }

    pub fn hooks(&self) -> &LegacyHooks {
        self.data.hooks()
    }

    pub fn set_hooks(&mut self, hooks: LegacyHooks) {
        self.data.set_hooks(hooks)
    }

    /// Replays a serialized state blob onto this parameter's extra fields.
    ///
    /// The paired form must hold exactly an attribute map and a slot map;
    /// any other arity is malformed.
    pub fn apply_state(&mut self, state: &StateBlob) -> Result<()> {
        match state {
            StateBlob::Attrs(attrs) => self.extras.apply(attrs),
            StateBlob::Pair(maps) => {
                if maps.len() != 2 {
                    return Err(Error::InvalidState {
                        message: format!("expected an (attrs, slots) pair, got {} maps", maps.len()),
                    });
                }
                for map in maps {
                    self.extras.apply(map)?;
                }
                Ok(())
            }
        }
    }
}
