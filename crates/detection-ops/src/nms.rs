// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Non-max-suppression operator.
//!
//! Consumes the concatenated per-scale candidates and keeps at most
//! `detections_per_im` boxes per image. Every output has
//! `detections_per_im` on axis 1, which is what the runtime reports as the
//! engine's maximum detection count.

use crate::{BoxKind, OpError};
use network_ir::{FieldValue, GraphError, PluginDescriptor, PluginFields, PluginSpec, TensorInfo};
use tensor_core::{DType, Dims, TensorDesc};

const OP: &str = "nms";

/// NMS descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct NmsOp {
    kind: BoxKind,
    nms_thresh: f32,
    detections_per_im: usize,
}

impl NmsOp {
    pub fn new(kind: BoxKind, nms_thresh: f32, detections_per_im: usize) -> Result<Self, OpError> {
        if !(0.0..=1.0).contains(&nms_thresh) {
            return Err(OpError::InvalidParameter {
                op: OP,
                detail: format!("nms_thresh {nms_thresh} is outside [0, 1]"),
            });
        }
        if detections_per_im == 0 {
            return Err(OpError::InvalidParameter {
                op: OP,
                detail: "detections_per_im must be positive".into(),
            });
        }
        Ok(Self {
            kind,
            nms_thresh,
            detections_per_im,
        })
    }

    /// Rebuilds a descriptor from a recorded plugin layer.
    pub fn from_spec(spec: &PluginSpec) -> Result<Self, OpError> {
        let kind = if spec.type_name == BoxKind::AxisAligned.nms_type_name() {
            BoxKind::AxisAligned
        } else if spec.type_name == BoxKind::Rotated.nms_type_name() {
            BoxKind::Rotated
        } else {
            return Err(OpError::UnknownPlugin {
                type_name: spec.type_name.clone(),
                version: spec.version.clone(),
            });
        };
        let nms_thresh = spec
            .fields
            .get("nms_thresh")
            .and_then(FieldValue::as_float)
            .ok_or(OpError::MissingField { op: OP, field: "nms_thresh" })?;
        let detections_per_im = spec
            .fields
            .get("detections_per_im")
            .and_then(FieldValue::as_int)
            .and_then(|v| usize::try_from(v).ok())
            .ok_or(OpError::MissingField {
                op: OP,
                field: "detections_per_im",
            })?;
        Self::new(kind, nms_thresh, detections_per_im)
    }

    pub fn kind(&self) -> BoxKind {
        self.kind
    }

    pub fn nms_thresh(&self) -> f32 {
        self.nms_thresh
    }

    pub fn detections_per_im(&self) -> usize {
        self.detections_per_im
    }
}

impl PluginDescriptor for NmsOp {
    fn type_name(&self) -> &'static str {
        self.kind.nms_type_name()
    }

    fn fields(&self) -> PluginFields {
        let mut fields = PluginFields::new();
        fields.insert("nms_thresh".into(), FieldValue::Float(self.nms_thresh));
        fields.insert(
            "detections_per_im".into(),
            FieldValue::Int(self.detections_per_im as i64),
        );
        fields
    }

    fn output_descs(&self, inputs: &[&TensorInfo]) -> Result<Vec<TensorDesc>, GraphError> {
        let bad = |detail: String| -> GraphError { OpError::InvalidInputs { op: OP, detail }.into() };
        let [scores, boxes, classes] = inputs else {
            return Err(bad(format!(
                "expected 3 inputs (scores, boxes, classes), got {}",
                inputs.len()
            )));
        };
        let (s, b, c) = (
            scores.dims.as_slice(),
            boxes.dims.as_slice(),
            classes.dims.as_slice(),
        );
        let p = self.kind.box_params() as i64;
        if s.len() != 2 || c.len() != 2 || b.len() != 3 {
            return Err(bad(format!(
                "expected [N, M], [N, M, {p}], [N, M]; got {}, {}, {}",
                scores.dims, boxes.dims, classes.dims
            )));
        }
        if s != c || s[..] != b[..2] {
            return Err(bad(format!(
                "candidate counts differ: {}, {}, {}",
                scores.dims, boxes.dims, classes.dims
            )));
        }
        if b[2] != p {
            return Err(bad(format!(
                "{} boxes need {p} parameters, got {}",
                self.kind, b[2]
            )));
        }

        let n = s[0];
        let d = self.detections_per_im as i64;
        Ok(vec![
            TensorDesc::new("scores", Dims::new(vec![n, d]), DType::F32),
            TensorDesc::new("boxes", Dims::new(vec![n, d, p]), DType::F32),
            TensorDesc::new("classes", Dims::new(vec![n, d]), DType::F32),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use network_ir::Network;

    fn candidates(net: &mut Network, m: i64, p: i64) -> Vec<network_ir::TensorId> {
        vec![
            net.add_input("s", Dims::new(vec![-1, m]), DType::F32).unwrap(),
            net.add_input("b", Dims::new(vec![-1, m, p]), DType::F32).unwrap(),
            net.add_input("c", Dims::new(vec![-1, m]), DType::F32).unwrap(),
        ]
    }

    #[test]
    fn test_parameter_validation() {
        assert!(NmsOp::new(BoxKind::AxisAligned, -0.1, 10).is_err());
        assert!(NmsOp::new(BoxKind::AxisAligned, 0.5, 0).is_err());
        assert!(NmsOp::new(BoxKind::Rotated, 0.5, 10).is_ok());
    }

    #[test]
    fn test_outputs_capped_at_detections_per_im() {
        let mut net = Network::new("t");
        let inputs = candidates(&mut net, 300, 4);
        let op = NmsOp::new(BoxKind::AxisAligned, 0.5, 50).unwrap();
        let outs = net.add_plugin("nms", &inputs, &op).unwrap();
        assert_eq!(net.tensor(outs[0]).dims.as_slice(), &[-1, 50]);
        assert_eq!(net.tensor(outs[1]).dims.as_slice(), &[-1, 50, 4]);
        assert_eq!(net.tensor(outs[2]).dims.as_slice(), &[-1, 50]);
        for &o in &outs {
            assert_eq!(net.tensor(o).dims.dim(1), Some(50));
        }
    }

    #[test]
    fn test_rotated_needs_six_params() {
        let mut net = Network::new("t");
        let inputs = candidates(&mut net, 100, 4);
        let op = NmsOp::new(BoxKind::Rotated, 0.5, 50).unwrap();
        let err = net.add_plugin("nms", &inputs, &op).unwrap_err();
        assert!(err.to_string().contains("6 parameters"));
    }

    #[test]
    fn test_candidate_count_mismatch() {
        let mut net = Network::new("t");
        let s = net.add_input("s", Dims::new(vec![-1, 10]), DType::F32).unwrap();
        let b = net.add_input("b", Dims::new(vec![-1, 12, 4]), DType::F32).unwrap();
        let c = net.add_input("c", Dims::new(vec![-1, 10]), DType::F32).unwrap();
        let op = NmsOp::new(BoxKind::AxisAligned, 0.5, 5).unwrap();
        assert!(net.add_plugin("nms", &[s, b, c], &op).is_err());
    }

    #[test]
    fn test_spec_roundtrip() {
        let op = NmsOp::new(BoxKind::Rotated, 0.4, 100).unwrap();
        let spec = op.spec();
        assert_eq!(spec.type_name, "RetinaNetNMSRotate");
        assert_eq!(NmsOp::from_spec(&spec).unwrap(), op);
    }
}
