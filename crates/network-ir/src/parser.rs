// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Graph import.
//!
//! [`GraphParser`] turns interchange bytes into a [`Network`]. The in-tree
//! format is a JSON [`GraphDocument`]:
//!
//! ```json
//! {
//!   "name": "retinanet",
//!   "inputs": [{ "name": "input", "dims": [-1, 3, 512, 512], "dtype": "f32" }],
//!   "nodes": [
//!     {
//!       "name": "head",
//!       "op_type": "RetinaHead",
//!       "inputs": ["input"],
//!       "outputs": [
//!         { "name": "cls_0", "dims": [-1, 9, 64, 64] },
//!         { "name": "box_0", "dims": [-1, 36, 64, 64] }
//!       ]
//!     }
//!   ],
//!   "outputs": ["cls_0", "box_0"]
//! }
//! ```
//!
//! Nodes must appear in topological order.

use crate::{GraphError, LayerKind, Network};
use std::path::Path;
use tensor_core::TensorDesc;

/// Imports a serialized graph.
pub trait GraphParser {
    /// Parses graph bytes into a network.
    fn parse(&self, bytes: &[u8]) -> Result<Network, GraphError>;

    /// Reads and parses a graph file.
    fn parse_file(&self, path: &Path) -> Result<Network, GraphError> {
        let bytes = std::fs::read(path)?;
        self.parse(&bytes)
    }
}

/// One node of a [`GraphDocument`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct NodeDoc {
    pub name: String,
    pub op_type: String,
    #[serde(default)]
    pub inputs: Vec<String>,
    pub outputs: Vec<TensorDesc>,
}

/// The JSON interchange document.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GraphDocument {
    pub name: String,
    pub inputs: Vec<TensorDesc>,
    #[serde(default)]
    pub nodes: Vec<NodeDoc>,
    pub outputs: Vec<String>,
}

impl GraphDocument {
    /// Starts an empty document.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            nodes: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Appends a network input.
    pub fn input(mut self, desc: TensorDesc) -> Self {
        self.inputs.push(desc);
        self
    }

    /// Appends a node.
    pub fn node(
        mut self,
        name: impl Into<String>,
        op_type: impl Into<String>,
        inputs: &[&str],
        outputs: Vec<TensorDesc>,
    ) -> Self {
        self.nodes.push(NodeDoc {
            name: name.into(),
            op_type: op_type.into(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs,
        });
        self
    }

    /// Appends a graph output by tensor name.
    pub fn output(mut self, name: impl Into<String>) -> Self {
        self.outputs.push(name.into());
        self
    }

    pub fn to_json(&self) -> Result<String, GraphError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Builds the network this document describes.
    pub fn into_network(self) -> Result<Network, GraphError> {
        let mut net = Network::new(self.name);
        for input in self.inputs {
            net.add_input(input.name, input.dims, input.dtype)?;
        }
        for node in self.nodes {
            let inputs = node
                .inputs
                .iter()
                .map(|n| {
                    net.tensor_by_name(n)
                        .ok_or_else(|| GraphError::UnknownTensor { name: n.clone() })
                })
                .collect::<Result<Vec<_>, _>>()?;
            net.add_layer(
                node.name,
                LayerKind::Imported {
                    op_type: node.op_type,
                },
                &inputs,
                node.outputs,
            )?;
        }
        for name in self.outputs {
            let id = net
                .tensor_by_name(&name)
                .ok_or_else(|| GraphError::UnknownTensor { name: name.clone() })?;
            net.mark_output(id);
        }
        Ok(net)
    }
}

/// Parser for the JSON [`GraphDocument`] format.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonGraphParser;

impl GraphParser for JsonGraphParser {
    fn parse(&self, bytes: &[u8]) -> Result<Network, GraphError> {
        let doc: GraphDocument = serde_json::from_slice(bytes)?;
        let net = doc.into_network()?;
        tracing::debug!("imported {}", net.summary());
        Ok(net)
    }
}
