// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Lookup of detection operators by recorded type name.

use crate::{BoxKind, DecodeOp, NmsOp, OpError};
use network_ir::{PluginDescriptor, PluginSpec};

/// Every operator type name this crate provides.
pub const REGISTERED_TYPES: [&str; 4] = [
    crate::kind::DECODE_TYPE,
    crate::kind::DECODE_ROTATE_TYPE,
    crate::kind::NMS_TYPE,
    crate::kind::NMS_ROTATE_TYPE,
];

/// Returns `true` if `type_name` names a detection operator.
pub fn is_registered(type_name: &str) -> bool {
    REGISTERED_TYPES.contains(&type_name)
}

/// Recreates an operator descriptor from a recorded plugin layer.
pub fn create_plugin(spec: &PluginSpec) -> Result<Box<dyn PluginDescriptor>, OpError> {
    let is_decode = [BoxKind::AxisAligned, BoxKind::Rotated]
        .iter()
        .any(|k| k.decode_type_name() == spec.type_name);
    if is_decode {
        Ok(Box::new(DecodeOp::from_spec(spec)?))
    } else {
        Ok(Box::new(NmsOp::from_spec(spec)?))
    }
}
