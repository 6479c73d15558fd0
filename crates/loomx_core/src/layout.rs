#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Layout {
    shape: Vec<usize>,
    strides: Vec<usize>,
    offset: usize,
}

impl Layout {
    pub fn new(shape: &[usize], strides: &[usize], offset: usize) -> Self {
        Self {
            shape: shape.to_vec(),
            strides: strides.to_vec(),
            offset,
        }
    }

    pub fn from_shape(shape: &[usize]) -> Self {
        Self {
            shape: shape.to_vec(),
            strides: Self::compute_strides(shape),
            offset: 0,
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn dim_size(&self, dim: usize) -> Option<usize> {
        self.shape.get(dim).copied()
    }

    pub fn size(&self) -> usize {
        self.shape.iter().product()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_contiguous(&self) -> bool {
        self.offset == 0 && self.strides == Self::compute_strides(&self.shape)
    }

    // helper

    pub fn compute_strides(shape: &[usize]) -> Vec<usize> {
        // Scalar case (empty shape)
        if shape.is_empty() {
            return vec![];
        }

        let mut strides = vec![1; shape.len()];
        for i in (0..shape.len() - 1).rev() {
            strides[i] = strides[i + 1] * shape[i + 1];
        }
        strides
    }

    pub fn compute_size(shape: &[usize]) -> usize {
        shape.iter().product()
    }

    /// Number of storage elements a layout can reach past its offset.
    ///
    /// Zero when any dimension is empty; otherwise one past the largest
    /// reachable index.
    pub fn reachable_extent(&self) -> usize {
        if self.shape.contains(&0) {
            return 0;
        }
        let span: usize = self
            .shape
            .iter()
            .zip(self.strides.iter())
            .map(|(&s, &st)| (s - 1) * st)
            .sum();
        span + 1
    }
}
