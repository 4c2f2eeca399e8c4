// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Box family selection.

use std::fmt;

/// Decode type name for axis-aligned boxes.
pub const DECODE_TYPE: &str = "RetinaNetDecode";
/// Decode type name for rotated boxes.
pub const DECODE_ROTATE_TYPE: &str = "RetinaNetDecodeRotate";
/// NMS type name for axis-aligned boxes.
pub const NMS_TYPE: &str = "RetinaNetNMS";
/// NMS type name for rotated boxes.
pub const NMS_ROTATE_TYPE: &str = "RetinaNetNMSRotate";

/// The box family a compiled head works in.
///
/// Axis-aligned boxes carry four parameters `(x1, y1, x2, y2)`; rotated
/// boxes add an angle encoded as `(sin, cos)`, for six. Anchors and box
/// regressions use the same parameter count as the decoded boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxKind {
    #[default]
    AxisAligned,
    Rotated,
}

impl BoxKind {
    /// Selects the family from the `rotated` build flag.
    pub fn from_rotated(rotated: bool) -> Self {
        if rotated {
            Self::Rotated
        } else {
            Self::AxisAligned
        }
    }

    /// Parameters per box.
    pub fn box_params(self) -> usize {
        match self {
            Self::AxisAligned => 4,
            Self::Rotated => 6,
        }
    }

    pub fn decode_type_name(self) -> &'static str {
        match self {
            Self::AxisAligned => DECODE_TYPE,
            Self::Rotated => DECODE_ROTATE_TYPE,
        }
    }

    pub fn nms_type_name(self) -> &'static str {
        match self {
            Self::AxisAligned => NMS_TYPE,
            Self::Rotated => NMS_ROTATE_TYPE,
        }
    }
}

impl fmt::Display for BoxKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::AxisAligned => "axis-aligned",
            Self::Rotated => "rotated",
        })
    }
}
