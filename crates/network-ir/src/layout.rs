// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Detection-head output contract.
//!
//! A detection backbone exposes one NCHW image input and `2k` outputs: the
//! `k` class maps followed by the `k` box maps, one of each per feature-map
//! scale, in the same scale order. [`HeadLayout::from_network`] checks that
//! contract and pairs the outputs so the rewrite never has to trust
//! positions blindly.

use crate::{GraphError, Network, TensorId};
use tensor_core::Dims;

/// Class and box maps for one feature-map scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScaleOutputs {
    pub class: TensorId,
    pub boxes: TensorId,
}

/// The checked input/output layout of a detection network.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadLayout {
    pub input: TensorId,
    pub input_dims: Dims,
    pub scales: Vec<ScaleOutputs>,
}

impl HeadLayout {
    /// Checks the network and pairs its outputs by scale.
    ///
    /// # Checks
    /// - Exactly one input, of rank 4.
    /// - A non-zero, even number of outputs, all rank 4.
    /// - Class map `i` and box map `i` have the same spatial dims.
    /// - No output in the class half is named like a box map, and no
    ///   output in the box half is named like a class map.
    pub fn from_network(net: &Network) -> Result<Self, GraphError> {
        let input = match net.inputs() {
            [single] => *single,
            inputs => {
                return Err(GraphError::Contract(format!(
                    "expected exactly one network input, found {}",
                    inputs.len()
                )))
            }
        };
        let input_dims = net.tensor(input).dims.clone();
        if input_dims.rank() != 4 {
            return Err(GraphError::Contract(format!(
                "input '{}' must be NCHW, got {}",
                net.tensor(input).name,
                input_dims
            )));
        }

        let outputs = net.outputs();
        if outputs.is_empty() || outputs.len() % 2 != 0 {
            return Err(GraphError::Contract(format!(
                "expected a non-zero even number of outputs (class maps then box maps), found {}",
                outputs.len()
            )));
        }

        let k = outputs.len() / 2;
        let mut scales = Vec::with_capacity(k);
        for (i, (&class, &boxes)) in outputs[..k].iter().zip(&outputs[k..]).enumerate() {
            let class_t = net.tensor(class);
            let box_t = net.tensor(boxes);
            for t in [class_t, box_t] {
                if t.dims.rank() != 4 {
                    return Err(GraphError::Contract(format!(
                        "output '{}' must be NCHW, got {}",
                        t.name, t.dims
                    )));
                }
            }
            if class_t.dims.as_slice()[2..] != box_t.dims.as_slice()[2..] {
                return Err(GraphError::Contract(format!(
                    "scale {i}: class map '{}' {} and box map '{}' {} differ spatially",
                    class_t.name, class_t.dims, box_t.name, box_t.dims
                )));
            }
            if looks_like_box(&class_t.name) {
                return Err(GraphError::Contract(format!(
                    "scale {i}: '{}' is in the class half of the outputs",
                    class_t.name
                )));
            }
            if looks_like_class(&box_t.name) {
                return Err(GraphError::Contract(format!(
                    "scale {i}: '{}' is in the box half of the outputs",
                    box_t.name
                )));
            }
            scales.push(ScaleOutputs { class, boxes });
        }

        Ok(Self {
            input,
            input_dims,
            scales,
        })
    }

    /// Number of feature-map scales (`k`).
    pub fn num_scales(&self) -> usize {
        self.scales.len()
    }

    /// Input height (`H` of NCHW).
    pub fn input_height(&self) -> i64 {
        self.input_dims.as_slice()[2]
    }

    pub fn input_width(&self) -> i64 {
        self.input_dims.as_slice()[3]
    }
}

/// Lower-cased name tokens, split on `_`, `.`, `/`, `-` and `:`.
fn tokens(name: &str) -> Vec<String> {
    name.split(['_', '.', '/', '-', ':'])
        .filter(|t| !t.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

fn is_box_token(t: &str) -> bool {
    matches!(t, "box" | "boxes" | "bbox" | "bboxes")
}

fn is_class_token(t: &str) -> bool {
    matches!(t, "cls" | "class" | "classes")
}

/// A box-named tensor with no class token.
fn looks_like_box(name: &str) -> bool {
    let tokens = tokens(name);
    tokens.iter().any(|t| is_box_token(t)) && !tokens.iter().any(|t| is_class_token(t))
}

/// A class-named tensor with no box token.
fn looks_like_class(name: &str) -> bool {
    let tokens = tokens(name);
    tokens.iter().any(|t| is_class_token(t)) && !tokens.iter().any(|t| is_box_token(t))
}
