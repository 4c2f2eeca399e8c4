// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Tensor dimensions with dynamic-axis support.

use crate::{DType, TensorError};
use std::fmt;

/// Marker value for a dynamic axis (resolved at execution time).
pub const DYNAMIC: i64 = -1;

/// Describes the dimensions of a tensor in the network or the plan.
///
/// Dimensions are signed so that a dynamic axis can be written as
/// [`DYNAMIC`] (`-1`), the same convention used by interchange formats.
/// Detection networks use NCHW layout, so axis 0 is the batch axis.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Dims {
    dims: Vec<i64>,
}

impl Dims {
    /// Creates dimensions from raw values.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::Dims;
    /// let d = Dims::new(vec![-1, 3, 512, 512]);
    /// assert_eq!(d.rank(), 4);
    /// assert!(d.is_dynamic());
    /// ```
    pub fn new(dims: Vec<i64>) -> Self {
        Self { dims }
    }

    /// Creates 4-D NCHW dimensions.
    pub fn nchw(n: i64, c: i64, h: i64, w: i64) -> Self {
        Self {
            dims: vec![n, c, h, w],
        }
    }

    /// Returns the number of dimensions (rank).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Returns the dimensions as a slice.
    pub fn as_slice(&self) -> &[i64] {
        &self.dims
    }

    /// Returns a specific dimension, or `None` if out of bounds.
    pub fn dim(&self, axis: usize) -> Option<i64> {
        self.dims.get(axis).copied()
    }

    /// Returns `true` if any axis is dynamic.
    pub fn is_dynamic(&self) -> bool {
        self.dims.iter().any(|&d| d == DYNAMIC)
    }

    /// Returns `true` if every axis except the batch axis is a positive,
    /// static value.
    pub fn is_static_after_batch(&self) -> bool {
        self.dims.iter().skip(1).all(|&d| d > 0)
    }

    /// Returns a copy with axis 0 replaced by `batch`.
    ///
    /// # Examples
    /// ```
    /// use tensor_core::Dims;
    /// let d = Dims::nchw(-1, 3, 64, 64).with_batch(8);
    /// assert_eq!(d.as_slice(), &[8, 3, 64, 64]);
    /// ```
    pub fn with_batch(&self, batch: i64) -> Self {
        let mut dims = self.dims.clone();
        if let Some(first) = dims.first_mut() {
            *first = batch;
        }
        Self { dims }
    }

    /// Returns a copy with the given axis replaced.
    pub fn with_dim(&self, axis: usize, value: i64) -> Result<Self, TensorError> {
        if axis >= self.rank() {
            return Err(TensorError::AxisOutOfRange {
                axis,
                rank: self.rank(),
            });
        }
        let mut dims = self.dims.clone();
        dims[axis] = value;
        Ok(Self { dims })
    }

    /// Returns the total number of elements.
    ///
    /// Fails if any axis is dynamic or non-positive. A rank-0 tensor has
    /// one element.
    pub fn num_elements(&self) -> Result<usize, TensorError> {
        let mut total = 1usize;
        for (axis, &d) in self.dims.iter().enumerate() {
            if d == DYNAMIC {
                return Err(TensorError::Unresolved { dims: self.clone() });
            }
            if d <= 0 {
                return Err(TensorError::InvalidDim { axis, value: d });
            }
            total = usize::try_from(d)
                .ok()
                .and_then(|d| total.checked_mul(d))
                .ok_or_else(|| TensorError::Overflow { dims: self.clone() })?;
        }
        Ok(total)
    }

    /// Computes the memory footprint in bytes for a given [`DType`].
    pub fn size_bytes(&self, dtype: DType) -> Result<usize, TensorError> {
        self.num_elements()?
            .checked_mul(dtype.size_bytes())
            .ok_or_else(|| TensorError::Overflow { dims: self.clone() })
    }

    /// Concatenates two dimension lists along `axis`.
    ///
    /// Every other axis must match exactly (dynamic axes match only
    /// dynamic axes).
    pub fn concat(&self, other: &Dims, axis: usize) -> Result<Self, TensorError> {
        if self.rank() != other.rank() {
            return Err(TensorError::Mismatch {
                op: "concat",
                lhs: self.clone(),
                rhs: other.clone(),
            });
        }
        if axis >= self.rank() {
            return Err(TensorError::AxisOutOfRange {
                axis,
                rank: self.rank(),
            });
        }
        let mut dims = Vec::with_capacity(self.rank());
        for (i, (&a, &b)) in self.dims.iter().zip(&other.dims).enumerate() {
            if i == axis {
                if a == DYNAMIC || b == DYNAMIC {
                    dims.push(DYNAMIC);
                } else {
                    dims.push(a + b);
                }
            } else if a == b {
                dims.push(a);
            } else {
                return Err(TensorError::Mismatch {
                    op: "concat",
                    lhs: self.clone(),
                    rhs: other.clone(),
                });
            }
        }
        Ok(Self { dims })
    }
}

impl fmt::Display for Dims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            if *d == DYNAMIC {
                write!(f, "?")?;
            } else {
                write!(f, "{d}")?;
            }
        }
        write!(f, "]")
    }
}

impl From<Vec<i64>> for Dims {
    fn from(dims: Vec<i64>) -> Self {
        Self::new(dims)
    }
}

impl From<&[i64]> for Dims {
    fn from(dims: &[i64]) -> Self {
        Self::new(dims.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nchw() {
        let d = Dims::nchw(2, 3, 4, 5);
        assert_eq!(d.rank(), 4);
        assert_eq!(d.num_elements().unwrap(), 120);
        assert_eq!(d.size_bytes(DType::F32).unwrap(), 480);
    }

    #[test]
    fn test_dynamic_batch() {
        let d = Dims::nchw(DYNAMIC, 3, 64, 64);
        assert!(d.is_dynamic());
        assert!(d.is_static_after_batch());
        assert!(matches!(d.num_elements(), Err(TensorError::Unresolved { .. })));

        let resolved = d.with_batch(4);
        assert!(!resolved.is_dynamic());
        assert_eq!(resolved.num_elements().unwrap(), 4 * 3 * 64 * 64);
    }

    #[test]
    fn test_zero_dim_rejected() {
        let d = Dims::new(vec![1, 0, 4]);
        assert!(matches!(
            d.num_elements(),
            Err(TensorError::InvalidDim { axis: 1, value: 0 })
        ));
    }

    #[test]
    fn test_element_count_overflow() {
        let huge = Dims::new(vec![i64::MAX, i64::MAX, 4]);
        assert!(matches!(huge.num_elements(), Err(TensorError::Overflow { .. })));

        let edge = Dims::new(vec![(usize::MAX / 2) as i64]);
        assert!(edge.num_elements().is_ok());
        assert!(matches!(edge.size_bytes(DType::F32), Err(TensorError::Overflow { .. })));
    }

    #[test]
    fn test_with_dim_out_of_range() {
        let d = Dims::new(vec![1, 2]);
        assert!(d.with_dim(1, 7).is_ok());
        assert!(d.with_dim(2, 7).is_err());
    }

    #[test]
    fn test_concat() {
        let a = Dims::new(vec![-1, 100, 4]);
        let b = Dims::new(vec![-1, 50, 4]);
        assert_eq!(a.concat(&b, 1).unwrap(), Dims::new(vec![-1, 150, 4]));

        let c = Dims::new(vec![-1, 50, 6]);
        assert!(a.concat(&c, 1).is_err());
        assert!(a.concat(&Dims::new(vec![-1, 50]), 1).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Dims::nchw(-1, 3, 8, 8)), "[?, 3, 8, 8]");
        assert_eq!(format!("{}", Dims::new(vec![])), "[]");
    }

    #[test]
    fn test_serde_transparent() {
        let d = Dims::new(vec![-1, 3]);
        assert_eq!(serde_json::to_string(&d).unwrap(), "[-1,3]");
    }
}
