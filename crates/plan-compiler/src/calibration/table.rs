// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Persisted calibration scales.
//!
//! # File Format
//! ```text
//! retinanet_rn50fpn-EntropyCalibration2
//! input: 3c010a14
//! decode_0.scores: 3b808081
//! ```
//!
//! The header names the model the scales belong to; each following line is
//! a tensor name and its scale as the hex bit pattern of an `f32`.

use crate::CompileError;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::Path;

const HEADER_SUFFIX: &str = "-EntropyCalibration2";

/// Per-tensor int8 scales for one model.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CalibrationTable {
    pub model: String,
    pub scales: BTreeMap<String, f32>,
}

impl CalibrationTable {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            scales: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, tensor: impl Into<String>, scale: f32) {
        self.scales.insert(tensor.into(), scale);
    }

    pub fn scale(&self, tensor: &str) -> Option<f32> {
        self.scales.get(tensor).copied()
    }

    pub fn len(&self) -> usize {
        self.scales.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scales.is_empty()
    }

    /// Renders the table file contents.
    pub fn to_text(&self) -> String {
        let mut out = format!("{}{HEADER_SUFFIX}\n", self.model);
        for (tensor, scale) in &self.scales {
            let _ = writeln!(out, "{tensor}: {:08x}", scale.to_bits());
        }
        out
    }

    /// Parses table file contents.
    pub fn parse(text: &str) -> Result<Self, CompileError> {
        let mut lines = text.lines();
        let header = lines.next().unwrap_or_default().trim();
        let model = header.strip_suffix(HEADER_SUFFIX).ok_or_else(|| {
            CompileError::Config(format!("calibration table header '{header}' is not recognised"))
        })?;

        let mut table = Self::new(model);
        for (n, line) in lines.enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let bad = || CompileError::Config(format!("calibration table line {}: '{line}'", n + 2));
            let (tensor, bits) = line.rsplit_once(':').ok_or_else(bad)?;
            let bits = u32::from_str_radix(bits.trim(), 16).map_err(|_| bad())?;
            table.insert(tensor.trim(), f32::from_bits(bits));
        }
        Ok(table)
    }

    /// Reads a table file. A missing file is `Ok(None)`.
    pub fn read(path: &Path) -> Result<Option<Self>, CompileError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CompileError::io(path, e)),
        }
    }

    pub fn write(&self, path: &Path) -> Result<(), CompileError> {
        std::fs::write(path, self.to_text()).map_err(|e| CompileError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CalibrationTable {
        let mut t = CalibrationTable::new("toy");
        t.insert("input", 0.0078125);
        t.insert("decode_0.scores", 1.0 / 127.0);
        t
    }

    #[test]
    fn test_text_format() {
        let text = sample().to_text();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("toy-EntropyCalibration2"));
        assert_eq!(lines.next(), Some("decode_0.scores: 3c010204"));
        assert_eq!(lines.next(), Some("input: 3c000000"));
    }

    #[test]
    fn test_parse_back() {
        let t = sample();
        assert_eq!(CalibrationTable::parse(&t.to_text()).unwrap(), t);
    }

    #[test]
    fn test_parse_errors() {
        assert!(CalibrationTable::parse("").is_err());
        assert!(CalibrationTable::parse("toy-Other\n").is_err());
        assert!(CalibrationTable::parse("toy-EntropyCalibration2\ninput 3c000000\n").is_err());
        assert!(CalibrationTable::parse("toy-EntropyCalibration2\ninput: zz\n").is_err());
    }

    #[test]
    fn test_read_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(CalibrationTable::read(&dir.path().join("none.calib"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_write_and_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("toy.calib");
        sample().write(&path).unwrap();
        let back = CalibrationTable::read(&path).unwrap().unwrap();
        assert_eq!(back.model, "toy");
        assert_eq!(back.scale("input"), Some(0.0078125));
        assert_eq!(back.len(), 2);
    }
}
