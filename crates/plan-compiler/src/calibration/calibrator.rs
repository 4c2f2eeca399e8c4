// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The calibrator interface the backend builder drives.

use crate::{BatchStream, CalibrationTable, CompileError};
use std::path::{Path, PathBuf};
use tensor_core::{Dims, Logger};

/// Supplies calibration batches and caches the resulting scales.
///
/// The builder first asks for a cached table; only if there is none does it
/// pull batches until `next_batch` returns `None`, then hands the computed
/// table back for writing.
pub trait Int8Calibrator {
    /// Model the scales are keyed by.
    fn model_name(&self) -> &str;

    fn batch_size(&self) -> usize;

    /// Shape of one calibration batch.
    fn batch_dims(&self) -> &Dims;

    fn next_batch(&mut self) -> Option<&[f32]>;

    /// Returns a cached table for this model, if one exists.
    fn read_calibration_table(&mut self) -> Option<CalibrationTable>;

    /// Persists a computed table.
    fn write_calibration_table(&mut self, table: &CalibrationTable) -> Result<(), CompileError>;
}

/// Entropy calibrator bound to a batch stream, a model name and a table
/// file.
#[derive(Debug)]
pub struct EntropyCalibrator<S: BatchStream> {
    stream: S,
    model_name: String,
    table_path: PathBuf,
    logger: Logger,
}

impl<S: BatchStream> EntropyCalibrator<S> {
    pub fn new(stream: S, model_name: impl Into<String>, table_path: impl Into<PathBuf>, logger: Logger) -> Self {
        Self {
            stream,
            model_name: model_name.into(),
            table_path: table_path.into(),
            logger,
        }
    }

    pub fn stream(&self) -> &S {
        &self.stream
    }

    pub fn table_path(&self) -> &Path {
        &self.table_path
    }
}

impl<S: BatchStream> Int8Calibrator for EntropyCalibrator<S> {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn batch_size(&self) -> usize {
        self.stream.batch_size()
    }

    fn batch_dims(&self) -> &Dims {
        self.stream.dims()
    }

    fn next_batch(&mut self) -> Option<&[f32]> {
        self.stream.next_batch()
    }

    fn read_calibration_table(&mut self) -> Option<CalibrationTable> {
        if self.table_path.as_os_str().is_empty() {
            return None;
        }
        match CalibrationTable::read(&self.table_path) {
            Ok(Some(table)) if table.model == self.model_name => {
                self.logger.info(&format!(
                    "Using calibration table {} for model '{}'",
                    self.table_path.display(),
                    self.model_name
                ));
                Some(table)
            }
            Ok(Some(table)) => {
                self.logger.warning(&format!(
                    "Calibration table {} belongs to model '{}', not '{}'; recalibrating",
                    self.table_path.display(),
                    table.model,
                    self.model_name
                ));
                None
            }
            Ok(None) => None,
            Err(e) => {
                self.logger.warning(&format!("Ignoring calibration table: {e}"));
                None
            }
        }
    }

    fn write_calibration_table(&mut self, table: &CalibrationTable) -> Result<(), CompileError> {
        if self.table_path.as_os_str().is_empty() {
            return Ok(());
        }
        let mut stamped = table.clone();
        stamped.model = self.model_name.clone();
        stamped.write(&self.table_path)?;
        self.logger.info(&format!(
            "Wrote calibration table {}",
            self.table_path.display()
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FixedStream;

    fn stream() -> FixedStream {
        FixedStream::new(Dims::nchw(1, 1, 2, 2), vec![vec![0.5; 4]; 3])
    }

    #[test]
    fn test_reads_matching_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.calib");
        let mut t = CalibrationTable::new("m");
        t.insert("input", 0.25);
        t.write(&path).unwrap();

        let mut cal = EntropyCalibrator::new(stream(), "m", &path, Logger::default());
        assert_eq!(cal.read_calibration_table(), Some(t));
        assert_eq!(cal.stream().batches_served(), 0);
    }

    #[test]
    fn test_ignores_other_models_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.calib");
        CalibrationTable::new("other").write(&path).unwrap();

        let mut cal = EntropyCalibrator::new(stream(), "m", &path, Logger::default());
        assert!(cal.read_calibration_table().is_none());
    }

    #[test]
    fn test_ignores_corrupt_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.calib");
        std::fs::write(&path, "garbage").unwrap();
        let mut cal = EntropyCalibrator::new(stream(), "m", &path, Logger::default());
        assert!(cal.read_calibration_table().is_none());
    }

    #[test]
    fn test_write_stamps_model_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.calib");
        let mut cal = EntropyCalibrator::new(stream(), "m", &path, Logger::default());

        let mut t = CalibrationTable::new("unnamed");
        t.insert("input", 0.1);
        cal.write_calibration_table(&t).unwrap();

        let back = CalibrationTable::read(&path).unwrap().unwrap();
        assert_eq!(back.model, "m");
        assert_eq!(back.scale("input"), Some(0.1));
        assert_eq!(cal.read_calibration_table().map(|t| t.len()), Some(1));
    }

    #[test]
    fn test_pulls_stream() {
        let mut cal = EntropyCalibrator::new(stream(), "m", "", Logger::default());
        assert_eq!(cal.batch_size(), 1);
        let mut n = 0;
        while cal.next_batch().is_some() {
            n += 1;
        }
        assert_eq!(n, 3);
        assert!(cal.read_calibration_table().is_none());
        assert!(cal.write_calibration_table(&CalibrationTable::new("m")).is_ok());
    }
}
