// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Layer kinds and plugin descriptors.
//!
//! Imported layers are opaque to the compiler: only their name, operator
//! type and tensor wiring are kept. Concatenation and plugin layers are the
//! ones the detection-head rewrite adds. A plugin layer records its
//! operator's serialized fields so the plan can rebuild it at load time.

use crate::{GraphError, TensorInfo};
use std::collections::BTreeMap;
use tensor_core::TensorDesc;

/// A plugin field value.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    Float(f32),
    Floats(Vec<f32>),
}

impl FieldValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Integers widen to floats.
    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f32),
            Self::Floats(_) => None,
        }
    }

    pub fn as_floats(&self) -> Option<&[f32]> {
        match self {
            Self::Floats(v) => Some(v),
            _ => None,
        }
    }
}

/// Named plugin fields, ordered for stable serialization.
pub type PluginFields = BTreeMap<String, FieldValue>;

/// The recorded identity and configuration of a plugin layer.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PluginSpec {
    /// Registered operator type, e.g. `"RetinaNetDecode"`.
    pub type_name: String,
    pub version: String,
    pub fields: PluginFields,
}

/// A fused operator that can be inserted into a [`Network`](crate::Network).
///
/// Implementations validate their inputs and report output signatures; the
/// returned descriptors' names are suffixes appended to the layer name.
pub trait PluginDescriptor {
    /// Registered operator type name.
    fn type_name(&self) -> &'static str;

    /// Operator version.
    fn version(&self) -> &'static str {
        "1"
    }

    /// Serializable configuration of this operator instance.
    fn fields(&self) -> PluginFields;

    /// Infers output signatures from the input tensors.
    fn output_descs(&self, inputs: &[&TensorInfo]) -> Result<Vec<TensorDesc>, GraphError>;

    /// Builds the record stored on the plugin layer.
    fn spec(&self) -> PluginSpec {
        PluginSpec {
            type_name: self.type_name().to_string(),
            version: self.version().to_string(),
            fields: self.fields(),
        }
    }
}

/// The kind of computation a layer performs.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayerKind {
    /// A layer from the imported graph, identified by its operator type.
    Imported { op_type: String },
    /// Concatenation along `axis`.
    Concat { axis: usize },
    /// A fused plugin operator.
    Plugin(PluginSpec),
}

impl LayerKind {
    /// Short label for summaries.
    pub fn label(&self) -> &str {
        match self {
            Self::Imported { op_type } => op_type,
            Self::Concat { .. } => "Concat",
            Self::Plugin(spec) => &spec.type_name,
        }
    }
}
