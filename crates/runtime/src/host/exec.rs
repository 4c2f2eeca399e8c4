// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use super::{HostBackend, PlanDocument};
use crate::{CompiledEngine, ExecutionContext, IoTensor, Runtime, RuntimeError, Stream};
use device_memory::DeviceBuffer;
use plan_compiler::BatchRange;
use std::sync::Arc;
use tensor_core::Dims;

impl Runtime for HostBackend {
    fn deserialize(&self, plan: &[u8]) -> Result<Box<dyn CompiledEngine>, RuntimeError> {
        let doc = PlanDocument::decode(plan)?;
        tracing::debug!(
            network = %doc.network,
            io_tensors = doc.io.len(),
            plugins = doc.plugins.len(),
            "deserialized host plan"
        );
        Ok(Box::new(HostEngine { doc: Arc::new(doc) }))
    }

    fn create_stream(&self) -> Result<Box<dyn Stream>, RuntimeError> {
        Ok(Box::new(HostStream::default()))
    }
}

// ── Engine ──────────────────────────────────────────────────────────

/// A deserialized host plan.
#[derive(Debug)]
pub struct HostEngine {
    doc: Arc<PlanDocument>,
}

impl HostEngine {
    pub fn document(&self) -> &PlanDocument {
        &self.doc
    }
}

impl CompiledEngine for HostEngine {
    fn num_io_tensors(&self) -> usize {
        self.doc.io.len()
    }

    fn io_tensor(&self, index: usize) -> Option<&IoTensor> {
        self.doc.io.get(index)
    }

    fn num_profiles(&self) -> usize {
        self.doc.profiles.len()
    }

    fn profile_batch_range(&self, profile: usize) -> Option<BatchRange> {
        self.doc.profiles.get(profile).map(|p| p.batch_range())
    }

    fn create_execution_context(&self) -> Result<Box<dyn ExecutionContext>, RuntimeError> {
        Ok(Box::new(HostContext {
            doc: Arc::clone(&self.doc),
            profile: None,
            batch: None,
        }))
    }
}

// ── Execution context ───────────────────────────────────────────────

/// Execution state for one host engine.
#[derive(Debug)]
pub struct HostContext {
    doc: Arc<PlanDocument>,
    profile: Option<usize>,
    batch: Option<usize>,
}

impl HostContext {
    fn batch_range(&self) -> Result<BatchRange, RuntimeError> {
        let index = self
            .profile
            .ok_or_else(|| RuntimeError::Execution("no optimization profile selected".into()))?;
        self.doc
            .profiles
            .get(index)
            .map(|p| p.batch_range())
            .ok_or_else(|| RuntimeError::Execution(format!("profile {index} vanished")))
    }
}

impl ExecutionContext for HostContext {
    fn set_optimization_profile(&mut self, index: usize) -> Result<(), RuntimeError> {
        if index >= self.doc.profiles.len() {
            return Err(RuntimeError::InvalidArgument(format!(
                "profile {index} out of range, plan has {}",
                self.doc.profiles.len()
            )));
        }
        self.profile = Some(index);
        self.batch = None;
        Ok(())
    }

    fn set_input_shape(&mut self, name: &str, dims: &Dims) -> Result<(), RuntimeError> {
        let tensor = self
            .doc
            .io
            .iter()
            .find(|t| t.is_input() && t.name == name)
            .ok_or_else(|| RuntimeError::InvalidArgument(format!("no input tensor named '{name}'")))?;
        if dims.rank() != tensor.dims.rank() || dims.as_slice()[1..] != tensor.dims.as_slice()[1..] {
            return Err(RuntimeError::InvalidArgument(format!(
                "shape {dims} does not match input '{name}' {}",
                tensor.dims
            )));
        }
        let batch = dims.dim(0).unwrap_or(0).max(0) as usize;
        let range = self.batch_range()?;
        if !range.contains(batch) {
            return Err(RuntimeError::InvalidArgument(format!(
                "batch {batch} outside profile range {range}"
            )));
        }
        self.batch = Some(batch);
        Ok(())
    }

    fn enqueue(&mut self, bindings: &mut [DeviceBuffer], stream: &mut dyn Stream) -> Result<(), RuntimeError> {
        let batch = self
            .batch
            .ok_or_else(|| RuntimeError::Execution("input shape not set before enqueue".into()))?;
        if bindings.len() != self.doc.io.len() {
            return Err(RuntimeError::Execution(format!(
                "{} bindings for {} I/O tensors",
                bindings.len(),
                self.doc.io.len()
            )));
        }
        for (tensor, buffer) in self.doc.io.iter().zip(bindings.iter_mut()) {
            let needed = tensor.size_bytes_at(batch)?;
            if buffer.size_bytes() < needed {
                return Err(RuntimeError::Execution(format!(
                    "binding '{}' holds {} bytes, needs {needed}",
                    tensor.name,
                    buffer.size_bytes()
                )));
            }
            // No candidate clears the host backend's thresholds: every
            // output slot reads as an empty detection.
            if !tensor.is_input() {
                buffer.as_bytes_mut()[..needed].fill(0);
            }
        }
        stream.record_launch();
        Ok(())
    }
}

// ── Stream ──────────────────────────────────────────────────────────

/// A host command queue; work completes at enqueue time.
#[derive(Debug, Default)]
pub struct HostStream {
    pending: usize,
    completed: u64,
}

impl HostStream {
    /// Launches drained by `synchronize` so far.
    pub fn completed(&self) -> u64 {
        self.completed
    }
}

impl Stream for HostStream {
    fn record_launch(&mut self) {
        self.pending += 1;
    }

    fn pending(&self) -> usize {
        self.pending
    }

    fn synchronize(&mut self) -> Result<(), RuntimeError> {
        self.completed += self.pending as u64;
        self.pending = 0;
        Ok(())
    }
}

impl Drop for HostStream {
    fn drop(&mut self) {
        tracing::debug!(completed = self.completed, pending = self.pending, "destroying stream");
    }
}
