// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for plan compilation.

use detection_ops::OpError;
use network_ir::GraphError;
use std::path::PathBuf;

/// Errors that can occur while compiling a plan.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// The graph could not be imported or does not have the detection
    /// backbone layout.
    #[error("graph import failed: {0}")]
    GraphImport(#[from] GraphError),

    /// The dynamic-batch optimization profile is inconsistent.
    #[error("invalid optimization profile: {0}")]
    Profile(String),

    /// The backend rejected the network, or the detection head could not
    /// be configured.
    #[error("compilation failed: {0}")]
    Compilation(String),

    /// A file could not be read or written.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Build options are malformed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<OpError> for CompileError {
    fn from(err: OpError) -> Self {
        Self::Compilation(err.to_string())
    }
}

impl CompileError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
