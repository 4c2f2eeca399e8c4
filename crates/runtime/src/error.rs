// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the engine runtime.

use std::path::PathBuf;

/// Errors that can occur while building, loading or running an engine.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Plan compilation failed.
    #[error(transparent)]
    Compile(#[from] plan_compiler::CompileError),

    /// A plan file could not be read or written.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The backend could not reconstruct an engine from plan bytes.
    #[error("plan deserialization failed: {0}")]
    Deserialization(String),

    /// A caller-supplied value does not fit the loaded engine.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The backend failed while executing.
    #[error("execution failed: {0}")]
    Execution(String),

    /// Device buffers could not be allocated.
    #[error("memory error: {0}")]
    Memory(#[from] device_memory::MemoryError),
}

impl RuntimeError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
