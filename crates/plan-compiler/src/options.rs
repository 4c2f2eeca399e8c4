// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Build options, loadable from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! dynamic_batch_opts = [1, 8, 16]
//! precision = "INT8"
//! score_thresh = 0.05
//! top_n = 1000
//! anchors = [[-12.0, -12.0, 20.0, 20.0], [-24.0, -24.0, 40.0, 40.0]]
//! rotated = false
//! nms_thresh = 0.5
//! detections_per_im = 100
//! workspace_size = "1G"
//! verbose = false
//!
//! [calibration]
//! images = ["calib/0001.jpg", "calib/0002.jpg"]
//! model_name = "retinanet_rn50fpn"
//! table = "retinanet_rn50fpn.calib"
//! ```

use crate::{BatchRange, CompileError, HeadParams, Precision};
use detection_ops::BoxKind;
use device_memory::WorkspaceSize;
use std::path::{Path, PathBuf};

/// INT8 calibration inputs.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CalibrationOptions {
    /// Representative images, fed in batches of the `opt` batch size.
    pub images: Vec<PathBuf>,
    /// Key under which calibration scales are cached.
    pub model_name: String,
    /// Calibration table file. Read if present for the same model,
    /// written otherwise.
    pub table: PathBuf,
}

/// Everything the plan compiler needs besides the graph itself.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// `[min, opt, max]` batch sizes.
    pub dynamic_batch_opts: Vec<usize>,
    pub precision: Precision,
    /// Minimum class score kept by decode.
    pub score_thresh: f32,
    /// Candidates kept per scale by decode.
    pub top_n: usize,
    /// Flattened anchors, one list per feature-map scale, in scale order.
    pub anchors: Vec<Vec<f32>>,
    /// Build the rotated-box head.
    pub rotated: bool,
    /// IoU above which NMS suppresses a box.
    pub nms_thresh: f32,
    /// Detections kept per image after NMS.
    pub detections_per_im: usize,
    /// Backend diagnostics at `Info` and `Verbose` are shown.
    pub verbose: bool,
    /// Builder workspace cap (human-readable, e.g. `"1G"`).
    pub workspace_size: String,
    pub calibration: CalibrationOptions,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            dynamic_batch_opts: vec![1, 8, 16],
            precision: Precision::Fp32,
            score_thresh: 0.05,
            top_n: 1000,
            anchors: Vec::new(),
            rotated: false,
            nms_thresh: 0.5,
            detections_per_im: 100,
            verbose: false,
            workspace_size: "1G".to_string(),
            calibration: CalibrationOptions::default(),
        }
    }
}

impl CompileOptions {
    /// Loads options from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, CompileError> {
        let content = std::fs::read_to_string(path).map_err(|e| CompileError::io(path, e))?;
        Self::from_toml(&content)
    }

    /// Parses options from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, CompileError> {
        toml::from_str(toml_str)
            .map_err(|e| CompileError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises options to TOML.
    pub fn to_toml(&self) -> Result<String, CompileError> {
        toml::to_string_pretty(self)
            .map_err(|e| CompileError::Config(format!("TOML serialise error: {e}")))
    }

    /// Parses the workspace size string.
    pub fn workspace(&self) -> Result<WorkspaceSize, CompileError> {
        WorkspaceSize::parse(&self.workspace_size)
            .map_err(|e| CompileError::Config(format!("invalid workspace size: {e}")))
    }

    /// The `[min, opt, max]` batch range.
    pub fn batch_range(&self) -> Result<BatchRange, CompileError> {
        BatchRange::from_opts(&self.dynamic_batch_opts)
    }

    pub fn box_kind(&self) -> BoxKind {
        BoxKind::from_rotated(self.rotated)
    }

    /// Detection head hyper-parameters.
    pub fn head_params(&self) -> HeadParams {
        HeadParams {
            kind: self.box_kind(),
            score_thresh: self.score_thresh,
            top_n: self.top_n,
            anchors: self.anchors.clone(),
            nms_thresh: self.nms_thresh,
            detections_per_im: self.detections_per_im,
        }
    }
}
