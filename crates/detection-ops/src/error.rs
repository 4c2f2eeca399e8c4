// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for detection operators.

use network_ir::GraphError;

/// Errors raised while configuring or wiring a detection operator.
#[derive(Debug, thiserror::Error)]
pub enum OpError {
    /// A hyper-parameter is out of range.
    #[error("{op}: invalid parameter: {detail}")]
    InvalidParameter { op: &'static str, detail: String },

    /// The operator's inputs do not have the expected shapes.
    #[error("{op}: invalid inputs: {detail}")]
    InvalidInputs { op: &'static str, detail: String },

    /// A recorded plugin is missing a field.
    #[error("{op}: missing or mistyped field '{field}'")]
    MissingField { op: &'static str, field: &'static str },

    /// No operator is registered under this type name.
    #[error("unknown plugin type '{type_name}' (version {version})")]
    UnknownPlugin { type_name: String, version: String },
}

impl From<OpError> for GraphError {
    fn from(err: OpError) -> Self {
        let layer = match &err {
            OpError::InvalidParameter { op, .. }
            | OpError::InvalidInputs { op, .. }
            | OpError::MissingField { op, .. } => op.to_string(),
            OpError::UnknownPlugin { type_name, .. } => type_name.clone(),
        };
        GraphError::InvalidLayer {
            layer,
            detail: err.to_string(),
        }
    }
}
