pub use loomx_internal::*;
