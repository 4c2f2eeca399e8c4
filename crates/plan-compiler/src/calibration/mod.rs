// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! INT8 calibration.
//!
//! ```text
//! ImageStream ──► EntropyCalibrator ──► backend builder
//!  (batches)        │        ▲
//!                   ▼        │
//!            calibration table file
//! ```
//!
//! A [`BatchStream`] yields preprocessed input batches at the `opt` batch
//! size. The [`Int8Calibrator`] hands them to the backend and caches the
//! resulting per-tensor scales in a [`CalibrationTable`] keyed by model
//! name, so later builds of the same model skip the pass.

mod calibrator;
mod image_stream;
mod stream;
mod table;

pub use calibrator::{EntropyCalibrator, Int8Calibrator};
pub use image_stream::{preprocess, ImageStream};
pub use stream::{BatchStream, FixedStream};
pub use table::CalibrationTable;
