// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # detection-ops
//!
//! Descriptors for the two fused operators grafted onto a detection
//! backbone:
//!
//! - [`DecodeOp`]: one per feature-map scale, turning class and box maps
//!   into the `top_n` best-scoring candidates.
//! - [`NmsOp`]: one per graph, suppressing overlaps across all scales down
//!   to `detections_per_im`.
//!
//! Each comes in the axis-aligned and the rotated [`BoxKind`]. Both
//! implement [`network_ir::PluginDescriptor`], so they validate their
//! parameters, infer output shapes when inserted, and record their fields
//! on the plugin layer. [`create_plugin`] rebuilds them from those records.
//!
//! Numeric kernels are supplied by the execution backend.

mod decode;
mod error;
pub mod kind;
mod nms;
mod registry;

pub use decode::DecodeOp;
pub use error::OpError;
pub use kind::BoxKind;
pub use nms::NmsOp;
pub use registry::{create_plugin, is_registered, REGISTERED_TYPES};
