// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Supported tensor element data types.

/// Element types a tensor may carry across the plan boundary.
///
/// Plan I/O tensors are always `F32`; the reduced types describe internal
/// tensors and the kernels the builder is allowed to select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    /// 32-bit IEEE 754 floating point.
    #[default]
    F32,
    /// 16-bit IEEE 754 floating point.
    F16,
    /// 8-bit signed integer (quantized tensors).
    I8,
    /// 32-bit signed integer.
    I32,
}

impl DType {
    /// Returns the size of a single element in bytes.
    pub fn size_bytes(self) -> usize {
        match self {
            DType::F32 | DType::I32 => 4,
            DType::F16 => 2,
            DType::I8 => 1,
        }
    }

    /// Returns a human-readable label for this data type.
    pub fn as_str(self) -> &'static str {
        match self {
            DType::F32 => "f32",
            DType::F16 => "f16",
            DType::I8 => "i8",
            DType::I32 => "i32",
        }
    }

    /// Parses a dtype from an interchange string.
    ///
    /// Accepts short names (`"f32"`) and the long spellings used by common
    /// exporters (`"float32"`, `"float"`, `"int8"`).
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "f32" | "float32" | "float" => Some(DType::F32),
            "f16" | "float16" | "half" => Some(DType::F16),
            "i8" | "int8" => Some(DType::I8),
            "i32" | "int32" => Some(DType::I32),
            _ => None,
        }
    }
}

impl std::fmt::Display for DType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_bytes() {
        assert_eq!(DType::F32.size_bytes(), 4);
        assert_eq!(DType::F16.size_bytes(), 2);
        assert_eq!(DType::I8.size_bytes(), 1);
        assert_eq!(DType::I32.size_bytes(), 4);
    }

    #[test]
    fn test_from_str_loose() {
        assert_eq!(DType::from_str_loose("float32"), Some(DType::F32));
        assert_eq!(DType::from_str_loose("HALF"), Some(DType::F16));
        assert_eq!(DType::from_str_loose("int8"), Some(DType::I8));
        assert_eq!(DType::from_str_loose("bool"), None);
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(serde_json::to_string(&DType::F16).unwrap(), "\"f16\"");
        let back: DType = serde_json::from_str("\"i32\"").unwrap();
        assert_eq!(back, DType::I32);
    }
}
