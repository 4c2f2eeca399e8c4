// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # network-ir
//!
//! The network description the plan compiler works on.
//!
//! - [`Network`]: tensors, layers, and the marked input/output sets. The
//!   compiler adds concatenation and plugin layers to it.
//! - [`PluginDescriptor`]: the seam through which fused operators enter the
//!   graph. Each plugin layer records a [`PluginSpec`].
//! - [`GraphParser`] / [`JsonGraphParser`]: graph import from the JSON
//!   [`GraphDocument`] interchange format.
//! - [`HeadLayout`]: the checked `[class_0..class_k-1, box_0..box_k-1]`
//!   output contract of a detection backbone.
//!
//! # Example
//! ```
//! use network_ir::{GraphDocument, GraphParser, HeadLayout, JsonGraphParser};
//! use tensor_core::{DType, Dims, TensorDesc};
//!
//! let json = GraphDocument::new("toy")
//!     .input(TensorDesc::new("input", Dims::nchw(-1, 3, 128, 128), DType::F32))
//!     .node("head", "Conv", &["input"], vec![
//!         TensorDesc::new("cls_0", Dims::nchw(-1, 9, 16, 16), DType::F32),
//!         TensorDesc::new("box_0", Dims::nchw(-1, 36, 16, 16), DType::F32),
//!     ])
//!     .output("cls_0")
//!     .output("box_0")
//!     .to_json()
//!     .unwrap();
//!
//! let net = JsonGraphParser.parse(json.as_bytes()).unwrap();
//! let layout = HeadLayout::from_network(&net).unwrap();
//! assert_eq!(layout.num_scales(), 1);
//! ```

mod error;
mod layer;
mod layout;
pub mod network;
mod parser;

pub use error::GraphError;
pub use layer::{FieldValue, LayerKind, PluginDescriptor, PluginFields, PluginSpec};
pub use layout::{HeadLayout, ScaleOutputs};
pub use network::{Layer, LayerId, Network, TensorId, TensorInfo};
pub use parser::{GraphDocument, GraphParser, JsonGraphParser, NodeDoc};
