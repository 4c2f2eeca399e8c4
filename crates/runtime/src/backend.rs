// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The execution backend seams.
//!
//! ```text
//! Runtime ──deserialize──► CompiledEngine ──create_execution_context──► ExecutionContext
//!    │                                                                        │
//!    └──create_stream──► Stream ◄──────────────── enqueue ────────────────────┘
//! ```
//!
//! A [`Backend`] is both the plan [`Builder`] and the [`Runtime`] that loads
//! what it built.

use crate::RuntimeError;
use device_memory::DeviceBuffer;
use plan_compiler::{BatchRange, Builder};
use std::fmt;
use tensor_core::{DType, Dims};

/// Direction of an engine I/O tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TensorIoMode {
    Input,
    Output,
}

/// An engine input or output binding.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct IoTensor {
    pub name: String,
    /// Dimensions with a dynamic batch axis.
    pub dims: Dims,
    pub dtype: DType,
    pub mode: TensorIoMode,
}

impl IoTensor {
    pub fn is_input(&self) -> bool {
        self.mode == TensorIoMode::Input
    }

    /// Byte size at a concrete batch.
    pub fn size_bytes_at(&self, batch: usize) -> Result<usize, RuntimeError> {
        self.dims
            .with_batch(batch as i64)
            .size_bytes(self.dtype)
            .map_err(|e| RuntimeError::InvalidArgument(format!("tensor '{}': {e}", self.name)))
    }
}

impl fmt::Display for IoTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            TensorIoMode::Input => "input",
            TensorIoMode::Output => "output",
        };
        write!(f, "{mode:<6} {} {} {}", self.name, self.dims, self.dtype)
    }
}

/// Reconstructs engines from plan bytes.
pub trait Runtime {
    fn deserialize(&self, plan: &[u8]) -> Result<Box<dyn CompiledEngine>, RuntimeError>;

    fn create_stream(&self) -> Result<Box<dyn Stream>, RuntimeError>;
}

/// A loaded, immutable engine.
pub trait CompiledEngine {
    fn num_io_tensors(&self) -> usize;

    /// I/O tensor by index; inputs come first.
    fn io_tensor(&self, index: usize) -> Option<&IoTensor>;

    fn num_profiles(&self) -> usize;

    /// Batch sizes accepted under a profile.
    fn profile_batch_range(&self, profile: usize) -> Option<BatchRange>;

    fn create_execution_context(&self) -> Result<Box<dyn ExecutionContext>, RuntimeError>;
}

/// Per-invocation state bound to one engine.
pub trait ExecutionContext {
    fn set_optimization_profile(&mut self, index: usize) -> Result<(), RuntimeError>;

    /// Resolves the dynamic shape of an input for the next launch.
    fn set_input_shape(&mut self, name: &str, dims: &Dims) -> Result<(), RuntimeError>;

    /// Enqueues one forward pass. `bindings` follow the engine's I/O
    /// tensor order.
    fn enqueue(&mut self, bindings: &mut [DeviceBuffer], stream: &mut dyn Stream) -> Result<(), RuntimeError>;
}

/// An in-order command queue.
pub trait Stream {
    /// Records that a launch was queued.
    fn record_launch(&mut self);

    /// Launches queued and not yet synchronized.
    fn pending(&self) -> usize;

    /// Blocks until every queued launch has finished.
    fn synchronize(&mut self) -> Result<(), RuntimeError>;
}

/// A complete backend: builds plans and runs them.
pub trait Backend: Send + Sync {
    fn as_builder(&self) -> &dyn Builder;

    fn as_runtime(&self) -> &dyn Runtime;
}

impl<T: Builder + Runtime + Send + Sync> Backend for T {
    fn as_builder(&self) -> &dyn Builder {
        self
    }

    fn as_runtime(&self) -> &dyn Runtime {
        self
    }
}
