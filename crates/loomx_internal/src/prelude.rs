pub use crate::core::{
    capture::ErrorSnapshot,
    device::{get_default_device, set_default_device, Device},
    dtype::*,
    error::{Error, ErrorKind, Result},
};
pub use crate::tensor::{
    rebuild::{self, LoadContext},
    LegacyHooks, Parameter, QuantizedTensor, SparseTensor, Storage, Tensor,
};
pub use crate::{bf16, f16};
