use crate::Tensor;
use loomx_core::{
    dtype::DType,
    error::{Error, Result},
};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum SparseLayout {
    Coo,
    Csr,
    Csc,
    Bsr,
    Bsc,
}

impl SparseLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coo => "coo",
            Self::Csr => "csr",
            Self::Csc => "csc",
            Self::Bsr => "bsr",
            Self::Bsc => "bsc",
        }
    }

    pub fn is_compressed(&self) -> bool {
        !matches!(self, Self::Coo)
    }

    fn is_blocked(&self) -> bool {
        matches!(self, Self::Bsr | Self::Bsc)
    }

    /// Compressed-row layouts compress dim 0, compressed-column dim 1.
    fn compressed_dim(&self) -> usize {
        match self {
            Self::Csr | Self::Bsr => 0,
            Self::Csc | Self::Bsc => 1,
            Self::Coo => unreachable!("COO has no compressed dimension"),
        }
    }
}

#[derive(Clone)]
enum SparseRepr {
    Coo {
        indices: Tensor,
        values: Tensor,
        is_coalesced: Option<bool>,
    },
    Compressed {
        layout: SparseLayout,
        compressed_indices: Tensor,
        plain_indices: Tensor,
        values: Tensor,
    },
}

/// Sparse tensor in coordinate or compressed form.
///
/// Constructed unvalidated during a load pass; structural checks run from
/// the deferred drain (see [`crate::rebuild::validate_pending_sparse`]),
/// never at construction.
#[derive(Clone)]
pub struct SparseTensor {
    repr: SparseRepr,
    shape: Vec<usize>,
}

impl SparseTensor {
    /// Builds a COO tensor without checking any invariant.
    pub fn coo_unchecked(indices: Tensor, values: Tensor, shape: &[usize], is_coalesced: Option<bool>) -> Self {
        Self {
            repr: SparseRepr::Coo {
                indices,
                values,
                is_coalesced,
            },
            shape: shape.to_vec(),
        }
    }

    /// Builds a compressed (CSR/CSC/BSR/BSC) tensor without checking any
    /// invariant. `Coo` is not a compressed layout and is rejected.
    pub fn compressed_unchecked(
        compressed_indices: Tensor,
        plain_indices: Tensor,
        values: Tensor,
        shape: &[usize],
        layout: SparseLayout,
    ) -> Result<Self> {
        if !layout.is_compressed() {
            return Err(Error::UnsupportedScheme(format!(
                "layout {} is not a compressed sparse layout",
                layout.as_str()
            )));
        }

        Ok(Self {
            repr: SparseRepr::Compressed {
                layout,
                compressed_indices,
                plain_indices,
                values,
            },
            shape: shape.to_vec(),
        })
    }

    pub fn layout(&self) -> SparseLayout {
        match &self.repr {
            SparseRepr::Coo { .. } => SparseLayout::Coo,
            SparseRepr::Compressed { layout, .. } => *layout,
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn values(&self) -> &Tensor {
        match &self.repr {
            SparseRepr::Coo { values, .. } => values,
            SparseRepr::Compressed { values, .. } => values,
        }
    }

    pub fn nnz(&self) -> usize {
        self.values().dim_size(0).unwrap_or(0)
    }

    pub fn indices(&self) -> Result<&Tensor> {
        match &self.repr {
            SparseRepr::Coo { indices, .. } => Ok(indices),
            SparseRepr::Compressed { .. } => Err(Error::InvalidArgument("indices() requires a COO tensor".into())),
        }
    }

    pub fn is_coalesced(&self) -> Result<Option<bool>> {
        match &self.repr {
            SparseRepr::Coo { is_coalesced, .. } => Ok(*is_coalesced),
            SparseRepr::Compressed { .. } => Err(Error::InvalidArgument("is_coalesced() requires a COO tensor".into())),
        }
    }

    pub fn compressed_indices(&self) -> Result<&Tensor> {
        match &self.repr {
            SparseRepr::Compressed { compressed_indices, .. } => Ok(compressed_indices),
            SparseRepr::Coo { .. } => Err(Error::InvalidArgument("compressed_indices() requires a compressed tensor".into())),
        }
    }

    pub fn plain_indices(&self) -> Result<&Tensor> {
        match &self.repr {
            SparseRepr::Compressed { plain_indices, .. } => Ok(plain_indices),
            SparseRepr::Coo { .. } => Err(Error::InvalidArgument("plain_indices() requires a compressed tensor".into())),
        }
    }

    /// Re-derives this tensor's structural components and runs the full
    /// check that construction skipped.
    pub fn validate(&self) -> Result<()> {
        match &self.repr {
            SparseRepr::Coo {
                indices,
                values,
                is_coalesced,
            } => validate_sparse_coo_args(indices, values, &self.shape, *is_coalesced),
            SparseRepr::Compressed {
                layout,
                compressed_indices,
                plain_indices,
                values,
            } => validate_sparse_compressed_args(compressed_indices, plain_indices, values, &self.shape, *layout),
        }
    }
}

fn structural(message: String) -> Error {
    Error::InvalidStructure { message }
}

fn index_vec(tensor: &Tensor, what: &str) -> Result<Vec<i64>> {
    if tensor.dtype() != DType::I64 {
        return Err(structural(format!("{} must have dtype i64, got {}", what, tensor.dtype().as_str())));
    }
    tensor.to_flatten_vec::<i64>()
}

pub fn validate_sparse_coo_args(indices: &Tensor, values: &Tensor, shape: &[usize], is_coalesced: Option<bool>) -> Result<()> {
    if indices.ndim() != 2 {
        return Err(structural(format!("COO indices must be 2-D, got {}-D", indices.ndim())));
    }

    let sparse_dim = indices.dim_size(0).unwrap_or(0);
    let nnz = indices.dim_size(1).unwrap_or(0);

    if sparse_dim > shape.len() {
        return Err(structural(format!(
            "COO indices carry {} sparse dims but the tensor has only {} dims",
            sparse_dim,
            shape.len()
        )));
    }
    if values.ndim() == 0 {
        return Err(structural("COO values must have at least one dimension".into()));
    }
    if values.dim_size(0) != Some(nnz) {
        return Err(structural(format!(
            "COO values hold {:?} entries but indices hold {}",
            values.dim_size(0),
            nnz
        )));
    }

    // dense (hybrid) dims trail the sparse dims and live in the values
    let dense_shape = &values.shape()[1..];
    if sparse_dim + dense_shape.len() != shape.len() {
        return Err(structural(format!(
            "shape {:?} inconsistent with {} sparse dims and dense value shape {:?}",
            shape, sparse_dim, dense_shape
        )));
    }
    for (k, &d) in dense_shape.iter().enumerate() {
        if shape[sparse_dim + k] != d {
            return Err(structural(format!(
                "dense dim {} of values is {} but the tensor shape says {}",
                k,
                d,
                shape[sparse_dim + k]
            )));
        }
    }

    let flat = index_vec(indices, "COO indices")?;
    for d in 0..sparse_dim {
        let bound = shape[d] as i64;
        for n in 0..nnz {
            let v = flat[d * nnz + n];
            if v < 0 || v >= bound {
                return Err(structural(format!("index {} out of bounds for dim {} with size {}", v, d, bound)));
            }
        }
    }

    if is_coalesced == Some(true) {
        let mut prev: Option<i64> = None;
        for n in 0..nnz {
            let mut linear = 0i64;
            for d in 0..sparse_dim {
                linear = linear * shape[d] as i64 + flat[d * nnz + n];
            }
            if let Some(p) = prev {
                if linear <= p {
                    return Err(structural(format!("tensor marked coalesced but entry {} is not strictly ordered", n)));
                }
            }
            prev = Some(linear);
        }
    }

    Ok(())
}

pub fn validate_sparse_compressed_args(
    compressed_indices: &Tensor,
    plain_indices: &Tensor,
    values: &Tensor,
    shape: &[usize],
    layout: SparseLayout,
) -> Result<()> {
    if !layout.is_compressed() {
        return Err(Error::UnsupportedScheme(format!(
            "structural validation for layout `{}` is not a compressed-layout check",
            layout.as_str()
        )));
    }
    if shape.len() != 2 {
        return Err(structural(format!("{} tensors must be 2-D, got shape {:?}", layout.as_str(), shape)));
    }

    let (block_rows, block_cols) = if layout.is_blocked() {
        if values.ndim() != 3 {
            return Err(structural(format!(
                "{} values must be 3-D blocks, got {}-D",
                layout.as_str(),
                values.ndim()
            )));
        }
        (values.dim_size(1).unwrap_or(0), values.dim_size(2).unwrap_or(0))
    } else {
        if values.ndim() != 1 {
            return Err(structural(format!("{} values must be 1-D, got {}-D", layout.as_str(), values.ndim())));
        }
        (1, 1)
    };

    if block_rows == 0 || block_cols == 0 {
        return Err(structural("block dimensions must be non-zero".into()));
    }
    if shape[0] % block_rows != 0 || shape[1] % block_cols != 0 {
        return Err(structural(format!(
            "shape {:?} is not divisible by block size {}x{}",
            shape, block_rows, block_cols
        )));
    }

    let blocked_shape = [shape[0] / block_rows, shape[1] / block_cols];
    let cdim = layout.compressed_dim();
    let n_compressed = blocked_shape[cdim];
    let n_plain = blocked_shape[1 - cdim];
    let nnz = values.dim_size(0).unwrap_or(0);

    if compressed_indices.ndim() != 1 {
        return Err(structural("compressed indices must be 1-D".into()));
    }
    let comp = index_vec(compressed_indices, "compressed indices")?;
    if comp.len() != n_compressed + 1 {
        return Err(structural(format!(
            "compressed indices must hold {} entries, got {}",
            n_compressed + 1,
            comp.len()
        )));
    }
    if comp.first() != Some(&0) {
        return Err(structural("compressed indices must start at 0".into()));
    }
    if comp.windows(2).any(|w| w[1] < w[0]) {
        return Err(structural("compressed indices must be non-decreasing".into()));
    }
    let end = comp[comp.len() - 1];
    if end != nnz as i64 {
        return Err(structural(format!("compressed indices must end at nnz {} but end at {}", nnz, end)));
    }

    if plain_indices.ndim() != 1 || plain_indices.dim_size(0) != Some(nnz) {
        return Err(structural(format!("plain indices must be 1-D with {} entries", nnz)));
    }
    let plain = index_vec(plain_indices, "plain indices")?;
    for &p in &plain {
        if p < 0 || p >= n_plain as i64 {
            return Err(structural(format!("plain index {} out of bounds for {} positions", p, n_plain)));
        }
    }

    Ok(())
}
