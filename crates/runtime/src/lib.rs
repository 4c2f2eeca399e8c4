// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # runtime
//!
//! Loads serialized detection plans and runs them.
//!
//! The runtime sits on top of `plan-compiler`: an [`Engine<Compiled>`] wraps
//! the build pipeline, an [`Engine<Ready>`] owns the deserialized engine,
//! its execution context and its command stream.
//!
//! # Type-State Pipeline
//! ```text
//! Engine<Compiled> ──save/load or into_ready──► Engine<Ready>
//! ```
//! Only a ready engine can infer; only a compiled one can be saved.
//!
//! # Backends
//! Execution goes through the [`Backend`] seam: a [`plan_compiler::Builder`]
//! plus a [`Runtime`]. [`HostBackend`] is the reference implementation.
//!
//! # Threading
//! Inference is synchronous. [`Engine::infer`] takes `&mut self`, so one
//! engine serves one caller at a time.

mod backend;
mod engine;
mod error;
pub mod host;

pub use backend::{Backend, CompiledEngine, ExecutionContext, IoTensor, Runtime, Stream, TensorIoMode};
pub use engine::{Compiled, Engine, EngineState, Ready};
pub use error::RuntimeError;
pub use host::HostBackend;
