// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # plan-compiler
//!
//! Compiles an exported detection backbone into a serialized execution plan.
//!
//! # Pipeline
//!
//! 1. Import the graph through a [`network_ir::GraphParser`].
//! 2. Derive the dynamic-batch [`OptimizationProfile`] from the
//!    `[min, opt, max]` batch options.
//! 3. Set the [`Precision`] flags; for INT8, bind an [`EntropyCalibrator`]
//!    over an [`ImageStream`] at the `opt` batch size.
//! 4. Graft the detection head with [`attach_detection_head`].
//! 5. Hand the network to a [`Builder`] backend for a [`SerializedPlan`].
//!
//! # Backend Extensibility
//!
//! The tensor compiler is behind the [`Builder`] trait, so backends plug in
//! without touching the pipeline:
//!
//! ```ignore
//! struct MyBackend;
//! impl Builder for MyBackend {
//!     fn name(&self) -> &str { "mine" }
//!     fn build_serialized(&self, network: &Network, config: &BuilderConfig,
//!         calibrator: Option<&mut dyn Int8Calibrator>, logger: &Logger)
//!         -> Result<SerializedPlan, CompileError> { /* ... */ }
//! }
//! ```

mod builder;
pub mod calibration;
mod compiler;
mod config;
mod error;
mod head;
mod options;
mod plan;
mod precision;
mod profile;

pub use builder::Builder;
pub use calibration::{
    BatchStream, CalibrationTable, EntropyCalibrator, FixedStream, ImageStream, Int8Calibrator,
};
pub use compiler::PlanCompiler;
pub use config::BuilderConfig;
pub use error::CompileError;
pub use head::{attach_detection_head, HeadParams, OUTPUT_NAMES};
pub use options::{CalibrationOptions, CompileOptions};
pub use plan::SerializedPlan;
pub use precision::Precision;
pub use profile::{BatchRange, OptimizationProfile};
