// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Kernel precision selection.

use crate::CompileError;
use std::fmt;
use std::str::FromStr;

/// Arithmetic precision the plan is built for.
///
/// `Fp16` and `Int8` both enable reduced-float kernels; `Int8` additionally
/// enables int8 kernels and requires calibration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum Precision {
    #[default]
    #[serde(rename = "FP32")]
    Fp32,
    #[serde(rename = "FP16")]
    Fp16,
    #[serde(rename = "INT8")]
    Int8,
}

impl Precision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fp32 => "FP32",
            Self::Fp16 => "FP16",
            Self::Int8 => "INT8",
        }
    }

    /// Reduced-float kernels are allowed.
    pub fn enables_fp16(self) -> bool {
        matches!(self, Self::Fp16 | Self::Int8)
    }

    pub fn enables_int8(self) -> bool {
        self == Self::Int8
    }
}

impl FromStr for Precision {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FP32" => Ok(Self::Fp32),
            "FP16" => Ok(Self::Fp16),
            "INT8" => Ok(Self::Int8),
            other => Err(CompileError::Config(format!(
                "unknown precision '{other}'; expected FP32, FP16 or INT8"
            ))),
        }
    }
}

impl fmt::Display for Precision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags() {
        assert!(!Precision::Fp32.enables_fp16());
        assert!(Precision::Fp16.enables_fp16());
        assert!(!Precision::Fp16.enables_int8());
        assert!(Precision::Int8.enables_fp16());
        assert!(Precision::Int8.enables_int8());
    }

    #[test]
    fn test_parse() {
        assert_eq!("fp16".parse::<Precision>().unwrap(), Precision::Fp16);
        assert_eq!(" INT8 ".parse::<Precision>().unwrap(), Precision::Int8);
        assert!("fp64".parse::<Precision>().is_err());
    }

    #[test]
    fn test_default_is_fp32() {
        assert_eq!(Precision::default(), Precision::Fp32);
        assert_eq!(Precision::default().to_string(), "FP32");
    }
}
