// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for graph import and network construction.

use tensor_core::TensorError;

/// Errors raised while importing or editing a [`Network`](crate::Network).
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// The graph file could not be read.
    #[error("failed to read graph: {0}")]
    Read(#[from] std::io::Error),

    /// The interchange document is malformed.
    #[error("failed to parse graph: {0}")]
    Parse(#[from] serde_json::Error),

    /// A node refers to a tensor that has not been defined yet.
    #[error("unknown tensor '{name}'")]
    UnknownTensor { name: String },

    /// Two tensors share a name.
    #[error("duplicate tensor name '{name}'")]
    DuplicateTensor { name: String },

    /// A layer's inputs or parameters are inconsistent.
    #[error("invalid layer '{layer}': {detail}")]
    InvalidLayer { layer: String, detail: String },

    /// The network does not have the input/output shape the detection
    /// head expects.
    #[error("graph contract violated: {0}")]
    Contract(String),

    #[error(transparent)]
    Tensor(#[from] TensorError),
}
