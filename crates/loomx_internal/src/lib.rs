pub mod prelude;

pub use loomx_core as core;
pub use loomx_tensor as tensor;

pub use loomx_core::dtype::{bf16, bfloat16, bool, f16, float16, float32, float64, half, int32, int64, int8, uint32, uint8};
