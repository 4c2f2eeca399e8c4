// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The backend builder seam.

use crate::{BuilderConfig, CompileError, Int8Calibrator, SerializedPlan};
use network_ir::Network;
use tensor_core::Logger;

/// A tensor compiler that turns a finished network into a serialized plan.
///
/// Implementations optimize the network under `config` and, when
/// `config.int8` is set, drive `calibrator` to obtain quantization scales.
/// Any rejection is a [`CompileError::Compilation`]; no plan is produced.
pub trait Builder {
    /// Backend name for diagnostics.
    fn name(&self) -> &str;

    fn build_serialized(
        &self,
        network: &Network,
        config: &BuilderConfig,
        calibrator: Option<&mut dyn Int8Calibrator>,
        logger: &Logger,
    ) -> Result<SerializedPlan, CompileError>;
}
