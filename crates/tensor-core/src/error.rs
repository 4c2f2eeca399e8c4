// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for dimension arithmetic.

use crate::Dims;

/// Errors that can occur when resolving or combining tensor dimensions.
#[derive(Debug, thiserror::Error)]
pub enum TensorError {
    /// A size was requested for dimensions that still contain a dynamic axis.
    #[error("dimensions {dims} are not fully resolved")]
    Unresolved { dims: Dims },

    /// An axis index was outside the tensor's rank.
    #[error("axis {axis} out of range for rank-{rank} tensor")]
    AxisOutOfRange { axis: usize, rank: usize },

    /// Two dimension lists are incompatible for the requested operation.
    #[error("incompatible dimensions for {op}: {lhs} vs {rhs}")]
    Mismatch {
        op: &'static str,
        lhs: Dims,
        rhs: Dims,
    },

    /// A dimension value is not valid (zero or negative other than `-1`).
    #[error("invalid dimension {value} at axis {axis}")]
    InvalidDim { axis: usize, value: i64 },

    /// The element count or byte size does not fit in `usize`.
    #[error("size of {dims} overflows")]
    Overflow { dims: Dims },
}
