// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The network graph: tensors, layers and the marked input/output sets.
//!
//! Tensors and layers live in arenas and are addressed by [`TensorId`] /
//! [`LayerId`]. Every tensor is either a network input or produced by
//! exactly one layer. Tensor names are unique.

use crate::{GraphError, LayerKind, PluginDescriptor};
use std::collections::HashMap;
use std::fmt;
use tensor_core::{DType, Dims, TensorDesc};

/// Index of a tensor in a [`Network`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TensorId(usize);

/// Index of a layer in a [`Network`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(usize);

/// A tensor in the network.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorInfo {
    pub name: String,
    pub dims: Dims,
    pub dtype: DType,
    /// `None` for network inputs.
    pub producer: Option<LayerId>,
}

impl TensorInfo {
    /// The tensor's signature without graph wiring.
    pub fn desc(&self) -> TensorDesc {
        TensorDesc::new(self.name.clone(), self.dims.clone(), self.dtype)
    }
}

/// A layer in the network.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    pub name: String,
    pub kind: LayerKind,
    pub inputs: Vec<TensorId>,
    pub outputs: Vec<TensorId>,
}

/// A network description: the compiler's working graph.
///
/// # Example
/// ```
/// use network_ir::Network;
/// use tensor_core::{DType, Dims};
///
/// let mut net = Network::new("toy");
/// let a = net.add_input("a", Dims::new(vec![-1, 10, 4]), DType::F32).unwrap();
/// let b = net.add_input("b", Dims::new(vec![-1, 5, 4]), DType::F32).unwrap();
/// let cat = net.add_concatenation("cat", &[a, b], 1).unwrap();
/// net.mark_output(cat);
/// assert_eq!(net.tensor(cat).dims.as_slice(), &[-1, 15, 4]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Network {
    name: String,
    tensors: Vec<TensorInfo>,
    layers: Vec<Layer>,
    inputs: Vec<TensorId>,
    outputs: Vec<TensorId>,
    by_name: HashMap<String, TensorId>,
}

impl Network {
    /// Creates an empty network.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ── Construction ───────────────────────────────────────────────

    /// Adds a network input tensor.
    pub fn add_input(
        &mut self,
        name: impl Into<String>,
        dims: Dims,
        dtype: DType,
    ) -> Result<TensorId, GraphError> {
        let id = self.push_tensor(name.into(), dims, dtype, None)?;
        self.inputs.push(id);
        Ok(id)
    }

    /// Adds a layer whose output signatures are already known.
    ///
    /// Used by graph parsers for imported layers.
    pub fn add_layer(
        &mut self,
        name: impl Into<String>,
        kind: LayerKind,
        inputs: &[TensorId],
        outputs: Vec<TensorDesc>,
    ) -> Result<LayerId, GraphError> {
        let name = name.into();
        for &input in inputs {
            self.check_id(input, &name)?;
        }
        let layer_id = LayerId(self.layers.len());
        let mut output_ids = Vec::with_capacity(outputs.len());
        for desc in outputs {
            output_ids.push(self.push_tensor(desc.name, desc.dims, desc.dtype, Some(layer_id))?);
        }
        self.layers.push(Layer {
            name,
            kind,
            inputs: inputs.to_vec(),
            outputs: output_ids,
        });
        Ok(layer_id)
    }

    /// Adds a concatenation along `axis` and returns its output tensor.
    pub fn add_concatenation(
        &mut self,
        name: impl Into<String>,
        inputs: &[TensorId],
        axis: usize,
    ) -> Result<TensorId, GraphError> {
        let name = name.into();
        let (first, rest) = inputs.split_first().ok_or_else(|| GraphError::InvalidLayer {
            layer: name.clone(),
            detail: "concatenation needs at least one input".into(),
        })?;
        self.check_id(*first, &name)?;
        let first_dtype = self.tensor(*first).dtype;
        let mut dims = self.tensor(*first).dims.clone();
        for &id in rest {
            self.check_id(id, &name)?;
            let other = self.tensor(id);
            if other.dtype != first_dtype {
                return Err(GraphError::InvalidLayer {
                    layer: name,
                    detail: format!("mixed dtypes {} and {}", first_dtype, other.dtype),
                });
            }
            dims = dims.concat(&other.dims, axis)?;
        }
        let out = TensorDesc::new(format!("{name}.out"), dims, first_dtype);
        let layer = self.add_layer(name, LayerKind::Concat { axis }, inputs, vec![out])?;
        Ok(self.layers[layer.0].outputs[0])
    }

    /// Inserts a plugin layer and returns its output tensors in the order
    /// reported by the descriptor.
    pub fn add_plugin(
        &mut self,
        name: impl Into<String>,
        inputs: &[TensorId],
        plugin: &dyn PluginDescriptor,
    ) -> Result<Vec<TensorId>, GraphError> {
        let name = name.into();
        for &id in inputs {
            self.check_id(id, &name)?;
        }
        let infos: Vec<&TensorInfo> = inputs.iter().map(|&id| self.tensor(id)).collect();
        let outputs = plugin
            .output_descs(&infos)?
            .into_iter()
            .map(|d| TensorDesc::new(format!("{name}.{}", d.name), d.dims, d.dtype))
            .collect();
        let layer = self.add_layer(name, LayerKind::Plugin(plugin.spec()), inputs, outputs)?;
        Ok(self.layers[layer.0].outputs.clone())
    }

    /// Marks a tensor as a network output. Marking twice is a no-op.
    pub fn mark_output(&mut self, id: TensorId) {
        if !self.outputs.contains(&id) {
            self.outputs.push(id);
        }
    }

    /// Removes a tensor from the output set. The tensor stays in the graph.
    pub fn unmark_output(&mut self, id: TensorId) {
        self.outputs.retain(|&o| o != id);
    }

    /// Renames a tensor. The new name must not be taken by another tensor.
    pub fn set_tensor_name(&mut self, id: TensorId, name: impl Into<String>) -> Result<(), GraphError> {
        let name = name.into();
        if let Some(&existing) = self.by_name.get(&name) {
            if existing == id {
                return Ok(());
            }
            return Err(GraphError::DuplicateTensor { name });
        }
        let old = std::mem::replace(&mut self.tensors[id.0].name, name.clone());
        self.by_name.remove(&old);
        self.by_name.insert(name, id);
        Ok(())
    }

    // ── Queries ────────────────────────────────────────────────────

    /// Returns a tensor. Ids are only handed out by this network.
    pub fn tensor(&self, id: TensorId) -> &TensorInfo {
        &self.tensors[id.0]
    }

    pub fn tensor_by_name(&self, name: &str) -> Option<TensorId> {
        self.by_name.get(name).copied()
    }

    pub fn layer(&self, id: LayerId) -> &Layer {
        &self.layers[id.0]
    }

    /// Layers in insertion (topological) order.
    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter()
    }

    pub fn num_layers(&self) -> usize {
        self.layers.len()
    }

    pub fn inputs(&self) -> &[TensorId] {
        &self.inputs
    }

    /// Marked outputs in marking order.
    pub fn outputs(&self) -> &[TensorId] {
        &self.outputs
    }

    pub fn num_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn num_outputs(&self) -> usize {
        self.outputs.len()
    }

    /// Signatures of the network inputs followed by the marked outputs.
    pub fn io_descs(&self) -> Vec<TensorDesc> {
        self.inputs
            .iter()
            .chain(&self.outputs)
            .map(|&id| self.tensor(id).desc())
            .collect()
    }

    /// Plugin layers, in insertion order.
    pub fn plugin_layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers
            .iter()
            .filter(|l| matches!(l.kind, LayerKind::Plugin(_)))
    }

    /// Returns a one-line summary.
    pub fn summary(&self) -> String {
        format!(
            "Network '{}': {} inputs, {} outputs, {} layers ({} plugins)",
            self.name,
            self.num_inputs(),
            self.num_outputs(),
            self.num_layers(),
            self.plugin_layers().count(),
        )
    }

    // ── Internals ──────────────────────────────────────────────────

    fn push_tensor(
        &mut self,
        name: String,
        dims: Dims,
        dtype: DType,
        producer: Option<LayerId>,
    ) -> Result<TensorId, GraphError> {
        if self.by_name.contains_key(&name) {
            return Err(GraphError::DuplicateTensor { name });
        }
        let id = TensorId(self.tensors.len());
        self.by_name.insert(name.clone(), id);
        self.tensors.push(TensorInfo {
            name,
            dims,
            dtype,
            producer,
        });
        Ok(id)
    }

    fn check_id(&self, id: TensorId, layer: &str) -> Result<(), GraphError> {
        if id.0 < self.tensors.len() {
            Ok(())
        } else {
            Err(GraphError::InvalidLayer {
                layer: layer.to_string(),
                detail: format!("tensor id {} does not belong to this network", id.0),
            })
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        for &id in &self.inputs {
            writeln!(f, "  input  {}", self.tensor(id).desc())?;
        }
        for layer in &self.layers {
            writeln!(f, "  layer  {} ({})", layer.name, layer.kind.label())?;
        }
        for &id in &self.outputs {
            writeln!(f, "  output {}", self.tensor(id).desc())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FieldValue, PluginFields};

    struct Passthrough;

    impl PluginDescriptor for Passthrough {
        fn type_name(&self) -> &'static str {
            "Passthrough"
        }

        fn fields(&self) -> PluginFields {
            let mut f = PluginFields::new();
            f.insert("gain".into(), FieldValue::Float(1.0));
            f
        }

        fn output_descs(&self, inputs: &[&TensorInfo]) -> Result<Vec<TensorDesc>, GraphError> {
            Ok(inputs
                .iter()
                .enumerate()
                .map(|(i, t)| TensorDesc::new(format!("out{i}"), t.dims.clone(), t.dtype))
                .collect())
        }
    }

    fn two_inputs() -> (Network, TensorId, TensorId) {
        let mut net = Network::new("t");
        let a = net
            .add_input("a", Dims::new(vec![-1, 10, 4]), DType::F32)
            .unwrap();
        let b = net
            .add_input("b", Dims::new(vec![-1, 6, 4]), DType::F32)
            .unwrap();
        (net, a, b)
    }

    #[test]
    fn test_duplicate_input_rejected() {
        let (mut net, _, _) = two_inputs();
        let err = net
            .add_input("a", Dims::new(vec![1]), DType::F32)
            .unwrap_err();
        assert!(matches!(err, GraphError::DuplicateTensor { .. }));
    }

    #[test]
    fn test_concatenation_shape() {
        let (mut net, a, b) = two_inputs();
        let cat = net.add_concatenation("cat", &[a, b], 1).unwrap();
        assert_eq!(net.tensor(cat).dims.as_slice(), &[-1, 16, 4]);
        assert_eq!(net.tensor(cat).name, "cat.out");
        assert_eq!(net.tensor(cat).producer, Some(LayerId(0)));
    }

    #[test]
    fn test_concatenation_mismatch() {
        let (mut net, a, _) = two_inputs();
        let c = net
            .add_input("c", Dims::new(vec![-1, 6, 6]), DType::F32)
            .unwrap();
        assert!(net.add_concatenation("cat", &[a, c], 1).is_err());
        assert!(net.add_concatenation("empty", &[], 1).is_err());
    }

    #[test]
    fn test_add_plugin_records_spec() {
        let (mut net, a, b) = two_inputs();
        let outs = net.add_plugin("pt", &[a, b], &Passthrough).unwrap();
        assert_eq!(outs.len(), 2);
        assert_eq!(net.tensor(outs[1]).name, "pt.out1");

        let layer = net.plugin_layers().next().unwrap();
        match &layer.kind {
            LayerKind::Plugin(spec) => {
                assert_eq!(spec.type_name, "Passthrough");
                assert_eq!(spec.version, "1");
                assert_eq!(spec.fields["gain"], FieldValue::Float(1.0));
            }
            other => panic!("unexpected kind {other:?}"),
        }
    }

    #[test]
    fn test_mark_and_unmark() {
        let (mut net, a, b) = two_inputs();
        net.mark_output(a);
        net.mark_output(b);
        net.mark_output(a);
        assert_eq!(net.outputs(), &[a, b]);

        net.unmark_output(a);
        assert_eq!(net.outputs(), &[b]);
        assert_eq!(net.tensor(a).name, "a");
    }

    #[test]
    fn test_rename() {
        let (mut net, a, b) = two_inputs();
        net.set_tensor_name(a, "scores").unwrap();
        assert_eq!(net.tensor_by_name("scores"), Some(a));
        assert_eq!(net.tensor_by_name("a"), None);
        assert!(net.set_tensor_name(b, "scores").is_err());
        assert!(net.set_tensor_name(a, "scores").is_ok());
    }

    #[test]
    fn test_io_descs_order() {
        let (mut net, a, b) = two_inputs();
        let cat = net.add_concatenation("cat", &[a, b], 1).unwrap();
        net.mark_output(cat);
        let names: Vec<_> = net.io_descs().into_iter().map(|d| d.name).collect();
        assert_eq!(names, ["a", "b", "cat.out"]);
    }

    #[test]
    fn test_summary_and_display() {
        let (mut net, a, _) = two_inputs();
        net.add_plugin("pt", &[a], &Passthrough).unwrap();
        assert!(net.summary().contains("1 plugins"));
        let text = net.to_string();
        assert!(text.contains("layer  pt (Passthrough)"));
    }
}
