// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The detection engine with a type-state build/load split.
//!
//! ```text
//!   graph bytes + CompileOptions
//!     │  Engine::build()
//!     ▼
//! Engine<Compiled> ──.save()──► plan file
//!     │  .into_ready()                │
//!     ▼                               │  Engine::load()
//! Engine<Ready> ◄─────────────────────┘
//!     │  .infer()
//!     ▼
//!   outputs written into the caller's buffers
//! ```
//!
//! A compiled engine cannot run and a loaded engine cannot be saved; the
//! compiler rejects both.

use crate::{Backend, CompiledEngine, ExecutionContext, IoTensor, RuntimeError, Stream};
use device_memory::{DeviceBuffer, DeviceMemory};
use plan_compiler::{BatchRange, BatchStream, CompileError, CompileOptions, PlanCompiler, SerializedPlan};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tensor_core::{Dims, Logger};

// ── Type-state markers ─────────────────────────────────────────

/// A plan built in memory and not yet loaded.
#[derive(Debug)]
pub struct Compiled {
    plan: SerializedPlan,
}

/// A deserialized engine with its execution context and stream.
///
/// Fields drop in declaration order: stream, then context, then engine.
pub struct Ready {
    stream: Box<dyn Stream>,
    context: Box<dyn ExecutionContext>,
    engine: Box<dyn CompiledEngine>,
    input: IoTensor,
    batch_range: BatchRange,
}

impl fmt::Debug for Ready {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ready")
            .field("input", &self.input.name)
            .field("io_tensors", &self.engine.num_io_tensors())
            .field("batch_range", &self.batch_range)
            .field("pending", &self.stream.pending())
            .finish_non_exhaustive()
    }
}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Compiled {}
    impl Sealed for super::Ready {}
}

/// Sealed trait for engine states.
pub trait EngineState: sealed::Sealed + fmt::Debug {}
impl EngineState for Compiled {}
impl EngineState for Ready {}

// ── Engine ─────────────────────────────────────────────────────

/// A detection engine bound to a backend.
///
/// # Example
/// ```no_run
/// use runtime::{Engine, HostBackend};
/// use plan_compiler::CompileOptions;
/// use std::sync::Arc;
///
/// # fn example(graph: &[u8]) -> Result<(), runtime::RuntimeError> {
/// let backend = Arc::new(HostBackend::new());
/// let options = CompileOptions::default();
/// Engine::build(backend.clone(), graph, &options)?.save("detector.plan".as_ref())?;
///
/// let mut engine = Engine::load(backend, "detector.plan".as_ref(), false)?;
/// let memory = device_memory::DeviceMemory::new(Default::default());
/// let mut buffers = engine.allocate_io_buffers(&memory, 1)?;
/// engine.infer(&mut buffers, 1)?;
/// # Ok(())
/// # }
/// ```
pub struct Engine<S: EngineState> {
    // Declared first so the state drops before the backend.
    state: S,
    backend: Arc<dyn Backend>,
    logger: Logger,
}

// ── Build path ─────────────────────────────────────────────────

impl Engine<Compiled> {
    /// Compiles `graph` with `options`, calibrating from
    /// `options.calibration` images when the precision is INT8.
    pub fn build(backend: Arc<dyn Backend>, graph: &[u8], options: &CompileOptions) -> Result<Self, RuntimeError> {
        let logger = Logger::new(options.verbose);
        let plan = PlanCompiler::new(backend.as_builder(), logger).compile(graph, options)?;
        Ok(Self::compiled(backend, plan, logger))
    }

    /// Like [`Engine::build`] with a caller-supplied calibration stream,
    /// created at the `opt` batch with the profile's `opt` input shape.
    pub fn build_with_stream<F>(
        backend: Arc<dyn Backend>,
        graph: &[u8],
        options: &CompileOptions,
        make_stream: F,
    ) -> Result<Self, RuntimeError>
    where
        F: FnOnce(usize, &Dims) -> Box<dyn BatchStream>,
    {
        let logger = Logger::new(options.verbose);
        let plan = PlanCompiler::new(backend.as_builder(), logger).compile_with(graph, options, make_stream)?;
        Ok(Self::compiled(backend, plan, logger))
    }

    /// Reads the graph from `path`, then builds.
    pub fn build_from_file(
        backend: Arc<dyn Backend>,
        path: &Path,
        options: &CompileOptions,
    ) -> Result<Self, RuntimeError> {
        let graph = std::fs::read(path).map_err(|e| RuntimeError::io(path, e))?;
        Self::build(backend, &graph, options)
    }

    fn compiled(backend: Arc<dyn Backend>, plan: SerializedPlan, logger: Logger) -> Self {
        tracing::info!(bytes = plan.len(), "plan compiled");
        Self {
            state: Compiled { plan },
            backend,
            logger,
        }
    }

    pub fn plan(&self) -> &SerializedPlan {
        &self.state.plan
    }

    pub fn into_plan(self) -> SerializedPlan {
        self.state.plan
    }

    /// Writes the plan bytes verbatim to `path`.
    pub fn save(&self, path: &Path) -> Result<(), RuntimeError> {
        self.logger.info(&format!("Writing to {}...", path.display()));
        self.state.plan.write_to(path).map_err(|e| match e {
            CompileError::Io { path, source } => RuntimeError::Io { path, source },
            other => other.into(),
        })
    }

    /// Deserializes the in-memory plan without a round trip through a file.
    pub fn into_ready(self) -> Result<Engine<Ready>, RuntimeError> {
        Engine::from_plan_bytes(self.backend, self.state.plan.as_bytes(), self.logger)
    }
}

// ── Load path ──────────────────────────────────────────────────

impl Engine<Ready> {
    /// Memory-maps a plan file and loads it.
    ///
    /// The plan is deserialized with profile 0 selected and one command
    /// stream created.
    pub fn load(backend: Arc<dyn Backend>, path: &Path, verbose: bool) -> Result<Self, RuntimeError> {
        let logger = Logger::new(verbose);
        logger.info(&format!("Loading plan from {}...", path.display()));

        let file = std::fs::File::open(path).map_err(|e| RuntimeError::io(path, e))?;
        let len = file.metadata().map_err(|e| RuntimeError::io(path, e))?.len();
        if len == 0 {
            return Err(RuntimeError::Deserialization(format!("{} is empty", path.display())));
        }
        // SAFETY: the map is read-only and dropped before this function
        // returns; the backend copies whatever it keeps.
        let mmap = unsafe { memmap2::Mmap::map(&file) }.map_err(|e| RuntimeError::io(path, e))?;
        Self::from_plan_bytes(backend, &mmap, logger)
    }

    /// Loads a plan held in memory.
    pub fn from_plan_bytes(backend: Arc<dyn Backend>, plan: &[u8], logger: Logger) -> Result<Self, RuntimeError> {
        let runtime = backend.as_runtime();
        let engine = runtime.deserialize(plan).map_err(|e| {
            logger.error(&e.to_string());
            e
        })?;
        let input = check_io_layout(engine.as_ref())?;
        let batch_range = engine
            .profile_batch_range(0)
            .ok_or_else(|| RuntimeError::Deserialization("plan has no optimization profile".into()))?;

        let mut context = engine.create_execution_context()?;
        context.set_optimization_profile(0)?;
        let stream = runtime.create_stream()?;

        logger.verbose(&format!(
            "engine ready: {} I/O tensors, batch {batch_range}",
            engine.num_io_tensors()
        ));
        Ok(Self {
            state: Ready {
                stream,
                context,
                engine,
                input,
                batch_range,
            },
            backend,
            logger,
        })
    }

    /// `(height, width)` of the network input.
    pub fn input_size(&self) -> (usize, usize) {
        let dims = &self.state.input.dims;
        (dim_at(dims, 2), dim_at(dims, 3))
    }

    pub fn max_batch_size(&self) -> usize {
        1
    }

    /// Detection slots per image.
    pub fn max_detections(&self) -> usize {
        self.state
            .engine
            .io_tensor(1)
            .map_or(0, |t| dim_at(&t.dims, 1))
    }

    pub fn stride(&self) -> usize {
        1
    }

    /// Batch sizes accepted by [`Engine::infer`].
    pub fn batch_range(&self) -> BatchRange {
        self.state.batch_range
    }

    /// I/O tensors in binding order.
    pub fn io_tensors(&self) -> impl Iterator<Item = &IoTensor> + '_ {
        let engine = &self.state.engine;
        (0..engine.num_io_tensors()).filter_map(move |i| engine.io_tensor(i))
    }

    /// Allocates one buffer per I/O tensor, sized for `batch`.
    pub fn allocate_io_buffers(&self, memory: &DeviceMemory, batch: usize) -> Result<Vec<DeviceBuffer>, RuntimeError> {
        self.check_batch(batch)?;
        self.io_tensors()
            .map(|t| -> Result<DeviceBuffer, RuntimeError> { Ok(memory.allocate(t.size_bytes_at(batch)?)?) })
            .collect()
    }

    /// Runs one forward pass and waits for it.
    ///
    /// `buffers` correspond position-for-position to [`Engine::io_tensors`].
    /// Inputs are read, outputs overwritten.
    pub fn infer(&mut self, buffers: &mut [DeviceBuffer], batch: usize) -> Result<(), RuntimeError> {
        let expected = self.state.engine.num_io_tensors();
        if buffers.len() != expected {
            return Err(RuntimeError::InvalidArgument(format!(
                "{} buffers given, engine has {expected} I/O tensors",
                buffers.len()
            )));
        }
        self.check_batch(batch)?;
        for (tensor, buffer) in self.io_tensors().zip(buffers.iter()) {
            let needed = tensor.size_bytes_at(batch)?;
            if buffer.size_bytes() < needed {
                return Err(RuntimeError::InvalidArgument(format!(
                    "buffer for '{}' holds {} bytes, batch {batch} needs {needed}",
                    tensor.name,
                    buffer.size_bytes()
                )));
            }
        }

        let Ready {
            stream, context, input, ..
        } = &mut self.state;
        context.set_input_shape(&input.name, &input.dims.with_batch(batch as i64))?;
        context.enqueue(buffers, stream.as_mut())?;
        stream.synchronize()?;
        tracing::trace!(batch, "inference complete");
        Ok(())
    }

    fn check_batch(&self, batch: usize) -> Result<(), RuntimeError> {
        let range = self.state.batch_range;
        if range.contains(batch) {
            Ok(())
        } else {
            Err(RuntimeError::InvalidArgument(format!(
                "batch {batch} outside the plan's profile {range}"
            )))
        }
    }
}

/// Returns I/O tensor 0 once the engine is known to expose an NCHW input
/// followed by at least one detection output.
fn check_io_layout(engine: &dyn CompiledEngine) -> Result<IoTensor, RuntimeError> {
    let output_ok = engine
        .io_tensor(1)
        .is_some_and(|t| !t.is_input() && t.dims.rank() >= 2);
    match engine.io_tensor(0) {
        Some(input) if input.is_input() && input.dims.rank() == 4 && output_ok => Ok(input.clone()),
        _ => Err(RuntimeError::Deserialization(
            "engine must expose an NCHW input followed by detection outputs".into(),
        )),
    }
}

fn dim_at(dims: &Dims, axis: usize) -> usize {
    dims.dim(axis).unwrap_or(0).max(0) as usize
}

impl<S: EngineState> fmt::Debug for Engine<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("state", &std::any::type_name::<S>())
            .field("detail", &self.state)
            .field("verbose", &self.logger.is_verbose())
            .finish()
    }
}
