// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Flags and limits handed to the backend builder.

use crate::{OptimizationProfile, Precision};
use device_memory::WorkspaceSize;

/// Backend build configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct BuilderConfig {
    /// Reduced-float kernels allowed.
    pub fp16: bool,
    /// Int8 kernels allowed; requires a calibrator.
    pub int8: bool,
    /// Upper bound on builder scratch memory.
    pub workspace: WorkspaceSize,
    /// Optimization profiles, index 0 first.
    pub profiles: Vec<OptimizationProfile>,
    /// Profile used for calibration; its `opt` shape is the calibration
    /// batch shape.
    pub calibration_profile: Option<OptimizationProfile>,
}

impl BuilderConfig {
    pub fn new(workspace: WorkspaceSize) -> Self {
        Self {
            fp16: false,
            int8: false,
            workspace,
            profiles: Vec::new(),
            calibration_profile: None,
        }
    }

    /// Sets the kernel flags for a precision.
    pub fn with_precision(mut self, precision: Precision) -> Self {
        self.fp16 = precision.enables_fp16();
        self.int8 = precision.enables_int8();
        self
    }

    pub fn add_profile(&mut self, profile: OptimizationProfile) -> usize {
        self.profiles.push(profile);
        self.profiles.len() - 1
    }

    /// The precision these flags amount to.
    pub fn precision(&self) -> Precision {
        match (self.fp16, self.int8) {
            (_, true) => Precision::Int8,
            (true, false) => Precision::Fp16,
            (false, false) => Precision::Fp32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_flags() {
        let c = BuilderConfig::new(WorkspaceSize::from_mb(16)).with_precision(Precision::Int8);
        assert!(c.fp16 && c.int8);
        assert_eq!(c.precision(), Precision::Int8);

        let c = BuilderConfig::new(WorkspaceSize::from_mb(16)).with_precision(Precision::Fp16);
        assert!(c.fp16 && !c.int8);
        assert_eq!(c.precision(), Precision::Fp16);

        let c = BuilderConfig::new(WorkspaceSize::from_mb(16));
        assert_eq!(c.precision(), Precision::Fp32);
        assert!(c.calibration_profile.is_none());
    }
}
