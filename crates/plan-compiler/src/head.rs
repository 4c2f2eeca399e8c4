// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Detection-head rewrite.
//!
//! Turns a backbone exposing per-scale class and box maps into a network
//! whose only outputs are the final detections:
//!
//! ```text
//! class_i, box_i ──► decode_i ──► scores_i, boxes_i, classes_i   (per scale)
//!
//! scores_0..k  ──► concat ─┐
//! boxes_0..k   ──► concat ─┼─► nms ──► "scores", "boxes", "classes"
//! classes_0..k ──► concat ─┘
//! ```

use crate::CompileError;
use detection_ops::{BoxKind, DecodeOp, NmsOp};
use network_ir::{GraphError, HeadLayout, Network, TensorId};

/// Names of the final outputs, in output order.
pub const OUTPUT_NAMES: [&str; 3] = ["scores", "boxes", "classes"];

/// Axis along which per-scale candidates are concatenated.
const CANDIDATE_AXIS: usize = 1;

/// Detection head hyper-parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadParams {
    pub kind: BoxKind,
    pub score_thresh: f32,
    pub top_n: usize,
    /// Flattened anchors per scale, in scale order.
    pub anchors: Vec<Vec<f32>>,
    pub nms_thresh: f32,
    pub detections_per_im: usize,
}

/// Grafts decode and NMS onto a detection backbone.
///
/// The input network must satisfy [`HeadLayout::from_network`]; a layout
/// violation is reported as [`CompileError::GraphImport`]. Operator
/// configuration problems, such as an anchor list count that differs from
/// the number of scales, are [`CompileError::Compilation`].
pub fn attach_detection_head(mut net: Network, params: &HeadParams) -> Result<Network, CompileError> {
    let layout = HeadLayout::from_network(&net)?;
    let k = layout.num_scales();
    if params.anchors.len() != k {
        return Err(CompileError::Compilation(format!(
            "graph has {k} feature-map scales but {} anchor lists were given",
            params.anchors.len()
        )));
    }

    let input_h = layout.input_height();
    if input_h <= 0 {
        return Err(CompileError::Compilation(format!(
            "input height must be static, got {}",
            layout.input_dims
        )));
    }

    let mut per_output: [Vec<TensorId>; 3] = Default::default();
    for (i, (scale_out, anchors)) in layout.scales.iter().zip(&params.anchors).enumerate() {
        let feature_h = net.tensor(scale_out.class).dims.dim(2).unwrap_or(0);
        if feature_h <= 0 {
            return Err(CompileError::Compilation(format!(
                "scale {i}: feature map height must be static, got {}",
                net.tensor(scale_out.class).dims
            )));
        }
        let scale = input_h / feature_h;
        let decode = DecodeOp::new(
            params.kind,
            params.score_thresh,
            params.top_n,
            anchors.clone(),
            scale,
        )?;
        tracing::debug!(scale_index = i, stride = scale, anchors = decode.num_anchors(), "adding decode");
        let outs = net
            .add_plugin(format!("decode_{i}"), &[scale_out.class, scale_out.boxes], &decode)
            .map_err(surgery)?;
        for (acc, out) in per_output.iter_mut().zip(outs) {
            acc.push(out);
        }
    }

    for scale_out in &layout.scales {
        net.unmark_output(scale_out.class);
        net.unmark_output(scale_out.boxes);
    }

    let mut concatenated = Vec::with_capacity(3);
    for (name, inputs) in OUTPUT_NAMES.iter().zip(&per_output) {
        let cat = net
            .add_concatenation(format!("concat_{name}"), inputs, CANDIDATE_AXIS)
            .map_err(surgery)?;
        concatenated.push(cat);
    }

    let nms = NmsOp::new(params.kind, params.nms_thresh, params.detections_per_im)?;
    let outs = net.add_plugin("nms", &concatenated, &nms).map_err(surgery)?;
    // Backbone tensors may already use the final names.
    for name in OUTPUT_NAMES {
        if let Some(holder) = net.tensor_by_name(name).filter(|id| !outs.contains(id)) {
            let renamed = unused_name(&net, &format!("{name}_raw"));
            tracing::debug!(from = name, to = %renamed, "renaming backbone tensor");
            net.set_tensor_name(holder, renamed).map_err(surgery)?;
        }
    }
    for (id, name) in outs.into_iter().zip(OUTPUT_NAMES) {
        net.set_tensor_name(id, name).map_err(surgery)?;
        net.mark_output(id);
    }
    Ok(net)
}

fn unused_name(net: &Network, base: &str) -> String {
    let mut name = base.to_string();
    let mut n = 1;
    while net.tensor_by_name(&name).is_some() {
        name = format!("{base}_{n}");
        n += 1;
    }
    name
}

fn surgery(err: GraphError) -> CompileError {
    CompileError::Compilation(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use network_ir::{GraphDocument, GraphParser, JsonGraphParser, LayerKind};
    use tensor_core::{DType, Dims, TensorDesc};

    /// A backbone with `k` scales, 2 anchors and 3 classes per scale.
    fn backbone(k: usize, box_params: i64) -> Network {
        let mut outputs = Vec::new();
        for i in 0..k {
            let hw = 64 >> i;
            outputs.push(TensorDesc::new(format!("cls_{i}"), Dims::nchw(-1, 6, hw, hw), DType::F32));
        }
        for i in 0..k {
            let hw = 64 >> i;
            outputs.push(TensorDesc::new(
                format!("box_{i}"),
                Dims::nchw(-1, 2 * box_params, hw, hw),
                DType::F32,
            ));
        }
        let names: Vec<String> = outputs.iter().map(|d| d.name.clone()).collect();
        let mut doc = GraphDocument::new("backbone")
            .input(TensorDesc::new("input", Dims::nchw(-1, 3, 512, 512), DType::F32))
            .node("body", "Backbone", &["input"], outputs);
        for n in names {
            doc = doc.output(n);
        }
        JsonGraphParser.parse(doc.to_json().unwrap().as_bytes()).unwrap()
    }

    fn params(k: usize, kind: BoxKind) -> HeadParams {
        HeadParams {
            kind,
            score_thresh: 0.3,
            top_n: 100,
            anchors: vec![vec![1.0; 2 * kind.box_params()]; k],
            nms_thresh: 0.5,
            detections_per_im: 50,
        }
    }

    #[test]
    fn test_three_outputs_named() {
        let net = attach_detection_head(backbone(3, 4), &params(3, BoxKind::AxisAligned)).unwrap();
        let names: Vec<_> = net.outputs().iter().map(|&o| net.tensor(o).name.as_str()).collect();
        assert_eq!(names, OUTPUT_NAMES);
        assert_eq!(net.tensor(net.outputs()[0]).dims.as_slice(), &[-1, 50]);
        assert_eq!(net.tensor(net.outputs()[1]).dims.as_slice(), &[-1, 50, 4]);
    }

    #[test]
    fn test_original_outputs_unmarked() {
        let net = attach_detection_head(backbone(2, 4), &params(2, BoxKind::AxisAligned)).unwrap();
        assert_eq!(net.num_outputs(), 3);
        assert!(net.tensor_by_name("cls_0").is_some());
        assert!(!net.outputs().contains(&net.tensor_by_name("cls_0").unwrap()));
    }

    #[test]
    fn test_decode_per_scale_with_stride() {
        let net = attach_detection_head(backbone(3, 4), &params(3, BoxKind::AxisAligned)).unwrap();
        let decodes: Vec<_> = net
            .plugin_layers()
            .filter_map(|l| match &l.kind {
                LayerKind::Plugin(spec) if spec.type_name == "RetinaNetDecode" => Some(spec),
                _ => None,
            })
            .collect();
        assert_eq!(decodes.len(), 3);
        // 512 / 64, 512 / 32, 512 / 16
        let strides: Vec<_> = decodes.iter().map(|s| s.fields["scale"].as_int().unwrap()).collect();
        assert_eq!(strides, [8, 16, 32]);
        assert_eq!(net.plugin_layers().count(), 4);
    }

    #[test]
    fn test_concat_preserves_scale_order() {
        let net = attach_detection_head(backbone(2, 4), &params(2, BoxKind::AxisAligned)).unwrap();
        let cat = net.layers().find(|l| l.name == "concat_scores").unwrap();
        let inputs: Vec<_> = cat.inputs.iter().map(|&t| net.tensor(t).name.as_str()).collect();
        assert_eq!(inputs, ["decode_0.scores", "decode_1.scores"]);
        assert_eq!(net.tensor(cat.outputs[0]).dims.as_slice(), &[-1, 200]);
    }

    #[test]
    fn test_rotated_family_only() {
        let net = attach_detection_head(backbone(1, 6), &params(1, BoxKind::Rotated)).unwrap();
        for layer in net.plugin_layers() {
            let LayerKind::Plugin(spec) = &layer.kind else { unreachable!() };
            assert!(spec.type_name.ends_with("Rotate"), "{}", spec.type_name);
        }
        assert_eq!(net.tensor(net.outputs()[1]).dims.as_slice(), &[-1, 50, 6]);
    }

    #[test]
    fn test_backbone_outputs_with_final_names() {
        let mut doc = GraphDocument::new("named")
            .input(TensorDesc::new("input", Dims::nchw(-1, 3, 64, 64), DType::F32))
            .node(
                "body",
                "Backbone",
                &["input"],
                vec![
                    TensorDesc::new("scores", Dims::nchw(-1, 6, 8, 8), DType::F32),
                    TensorDesc::new("boxes", Dims::nchw(-1, 8, 8, 8), DType::F32),
                    TensorDesc::new("scores_raw", Dims::nchw(-1, 1, 8, 8), DType::F32),
                ],
            );
        doc = doc.output("scores").output("boxes");
        let net = JsonGraphParser.parse(doc.to_json().unwrap().as_bytes()).unwrap();

        let net = attach_detection_head(net, &params(1, BoxKind::AxisAligned)).unwrap();
        let names: Vec<_> = net.outputs().iter().map(|&id| net.tensor(id).name.clone()).collect();
        assert_eq!(names, OUTPUT_NAMES);
        assert!(net.tensor_by_name("scores_raw_1").is_some());
        assert!(net.tensor_by_name("boxes_raw").is_some());
        assert_eq!(net.tensor(net.outputs()[0]).dims, Dims::new(vec![-1, 50]));
    }

    #[test]
    fn test_anchor_count_mismatch() {
        let err = attach_detection_head(backbone(2, 4), &params(1, BoxKind::AxisAligned)).unwrap_err();
        assert!(matches!(err, CompileError::Compilation(_)));
    }

    #[test]
    fn test_layout_violation_is_graph_import() {
        let mut net = backbone(1, 4);
        let extra = net.tensor_by_name("input").unwrap();
        net.mark_output(extra);
        let err = attach_detection_head(net, &params(1, BoxKind::AxisAligned)).unwrap_err();
        assert!(matches!(err, CompileError::GraphImport(_)));
    }

    #[test]
    fn test_bad_hyper_parameters() {
        let mut p = params(1, BoxKind::AxisAligned);
        p.detections_per_im = 0;
        assert!(matches!(
            attach_detection_head(backbone(1, 4), &p),
            Err(CompileError::Compilation(_))
        ));
    }
}
