// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # tensor-core
//!
//! Shared tensor primitives for the detection plan compiler and runtime.
//!
//! This crate provides:
//! - [`Dims`]: signed tensor dimensions where `-1` marks a dynamic axis
//!   (the batch axis of a dynamic-batch network input).
//! - [`DType`]: element data types that can cross the plan boundary.
//! - [`TensorDesc`]: a named, typed tensor signature.
//! - [`Logger`] / [`Severity`]: the severity-filtered diagnostics sink that
//!   the compiler and runtime receive explicitly instead of reading global
//!   state.
//!
//! # Design Goals
//! - No dependency on any backend: everything here is plain data.
//! - Clean error types via `thiserror`.

mod desc;
mod dims;
mod dtype;
mod error;
mod log;

pub use desc::TensorDesc;
pub use dims::{Dims, DYNAMIC};
pub use dtype::DType;
pub use error::TensorError;
pub use log::{Logger, Severity};
