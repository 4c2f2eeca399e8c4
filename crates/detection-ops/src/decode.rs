// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-scale decode operator.
//!
//! Consumes one scale's class map `[N, A*C, H, W]` and box regression map
//! `[N, A*P, H, W]`, applies the anchors, and keeps the `top_n` candidates
//! above `score_thresh`:
//!
//! ```text
//! class [N, A*C, H, W] ─┐
//!                       ├─► Decode ─► scores  [N, top_n]
//! box   [N, A*P, H, W] ─┘             boxes   [N, top_n, P]
//!                                     classes [N, top_n]
//! ```
//!
//! `A` is the anchor count of this scale, `C` the class count and `P` the
//! box parameter count of the [`BoxKind`].

use crate::{BoxKind, OpError};
use network_ir::{FieldValue, GraphError, PluginDescriptor, PluginFields, PluginSpec, TensorInfo};
use tensor_core::{DType, Dims, TensorDesc};

const OP: &str = "decode";

/// Decode descriptor for one feature-map scale.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeOp {
    kind: BoxKind,
    score_thresh: f32,
    top_n: usize,
    anchors: Vec<f32>,
    scale: i64,
}

impl DecodeOp {
    /// Creates a decode descriptor.
    ///
    /// `anchors` is this scale's anchor list, flattened, `P` values per
    /// anchor. `scale` is the input-to-feature-map stride.
    pub fn new(
        kind: BoxKind,
        score_thresh: f32,
        top_n: usize,
        anchors: Vec<f32>,
        scale: i64,
    ) -> Result<Self, OpError> {
        let invalid = |detail: String| OpError::InvalidParameter { op: OP, detail };
        if !(0.0..=1.0).contains(&score_thresh) {
            return Err(invalid(format!("score_thresh {score_thresh} is outside [0, 1]")));
        }
        if top_n == 0 {
            return Err(invalid("top_n must be positive".into()));
        }
        let p = kind.box_params();
        if anchors.is_empty() || anchors.len() % p != 0 {
            return Err(invalid(format!(
                "{} anchor values do not form whole {kind} anchors of {p} values",
                anchors.len()
            )));
        }
        if scale <= 0 {
            return Err(invalid(format!("scale {scale} must be positive")));
        }
        Ok(Self {
            kind,
            score_thresh,
            top_n,
            anchors,
            scale,
        })
    }

    /// Rebuilds a descriptor from a recorded plugin layer.
    pub fn from_spec(spec: &PluginSpec) -> Result<Self, OpError> {
        let kind = match spec.type_name.as_str() {
            t if t == BoxKind::AxisAligned.decode_type_name() => BoxKind::AxisAligned,
            t if t == BoxKind::Rotated.decode_type_name() => BoxKind::Rotated,
            _ => {
                return Err(OpError::UnknownPlugin {
                    type_name: spec.type_name.clone(),
                    version: spec.version.clone(),
                })
            }
        };
        let field = |name: &'static str| {
            spec.fields
                .get(name)
                .ok_or(OpError::MissingField { op: OP, field: name })
        };
        let missing = |name: &'static str| OpError::MissingField { op: OP, field: name };

        let score_thresh = field("score_thresh")?.as_float().ok_or(missing("score_thresh"))?;
        let top_n = field("top_n")?.as_int().ok_or(missing("top_n"))?;
        let anchors = field("anchors")?.as_floats().ok_or(missing("anchors"))?.to_vec();
        let scale = field("scale")?.as_int().ok_or(missing("scale"))?;
        let top_n = usize::try_from(top_n).map_err(|_| OpError::InvalidParameter {
            op: OP,
            detail: format!("top_n {top_n} is negative"),
        })?;
        Self::new(kind, score_thresh, top_n, anchors, scale)
    }

    pub fn kind(&self) -> BoxKind {
        self.kind
    }

    pub fn score_thresh(&self) -> f32 {
        self.score_thresh
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn anchors(&self) -> &[f32] {
        &self.anchors
    }

    /// Number of anchors at this scale.
    pub fn num_anchors(&self) -> usize {
        self.anchors.len() / self.kind.box_params()
    }

    pub fn scale(&self) -> i64 {
        self.scale
    }

    fn check_inputs(&self, class: &Dims, boxes: &Dims) -> Result<(), OpError> {
        let bad = |detail: String| OpError::InvalidInputs { op: OP, detail };
        if class.rank() != 4 || boxes.rank() != 4 {
            return Err(bad(format!("expected NCHW class and box maps, got {class} and {boxes}")));
        }
        let (c, b) = (class.as_slice(), boxes.as_slice());
        if c[0] != b[0] {
            return Err(bad(format!("batch axes differ: {class} vs {boxes}")));
        }
        if c[2..] != b[2..] {
            return Err(bad(format!("spatial dims differ: {class} vs {boxes}")));
        }

        let anchors = self.num_anchors() as i64;
        let expected_box = anchors * self.kind.box_params() as i64;
        if b[1] != expected_box {
            return Err(bad(format!(
                "box map has {} channels, expected {anchors} anchors x {} = {expected_box}",
                b[1],
                self.kind.box_params()
            )));
        }
        if c[1] <= 0 || c[1] % anchors != 0 {
            return Err(bad(format!(
                "class map channels {} are not a multiple of {anchors} anchors",
                c[1]
            )));
        }
        Ok(())
    }
}

impl PluginDescriptor for DecodeOp {
    fn type_name(&self) -> &'static str {
        self.kind.decode_type_name()
    }

    fn fields(&self) -> PluginFields {
        let mut fields = PluginFields::new();
        fields.insert("score_thresh".into(), FieldValue::Float(self.score_thresh));
        fields.insert("top_n".into(), FieldValue::Int(self.top_n as i64));
        fields.insert("anchors".into(), FieldValue::Floats(self.anchors.clone()));
        fields.insert("scale".into(), FieldValue::Int(self.scale));
        fields
    }

    fn output_descs(&self, inputs: &[&TensorInfo]) -> Result<Vec<TensorDesc>, GraphError> {
        let [class, boxes] = inputs else {
            return Err(OpError::InvalidInputs {
                op: OP,
                detail: format!("expected 2 inputs (class, box), got {}", inputs.len()),
            }
            .into());
        };
        self.check_inputs(&class.dims, &boxes.dims)?;

        let n = class.dims.as_slice()[0];
        let top_n = self.top_n as i64;
        let p = self.kind.box_params() as i64;
        Ok(vec![
            TensorDesc::new("scores", Dims::new(vec![n, top_n]), DType::F32),
            TensorDesc::new("boxes", Dims::new(vec![n, top_n, p]), DType::F32),
            TensorDesc::new("classes", Dims::new(vec![n, top_n]), DType::F32),
        ])
    }
}
