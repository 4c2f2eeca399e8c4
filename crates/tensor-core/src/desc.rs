// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Named tensor signatures.

use crate::{DType, Dims, TensorError};

/// A named, typed tensor signature: what a network input/output or a plan
/// binding looks like, without any data.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TensorDesc {
    /// Tensor name, unique within a network.
    pub name: String,
    /// Dimensions; axis 0 may be dynamic.
    pub dims: Dims,
    /// Element type.
    #[serde(default)]
    pub dtype: DType,
}

impl TensorDesc {
    /// Creates a new descriptor.
    pub fn new(name: impl Into<String>, dims: Dims, dtype: DType) -> Self {
        Self {
            name: name.into(),
            dims,
            dtype,
        }
    }

    /// Byte size of this tensor with the batch axis resolved to `batch`.
    pub fn size_bytes_at(&self, batch: usize) -> Result<usize, TensorError> {
        self.dims.with_batch(batch as i64).size_bytes(self.dtype)
    }
}

impl std::fmt::Display for TensorDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.name, self.dims, self.dtype)
    }
}
