// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Dynamic-batch optimization profiles.
//!
//! The plan accepts any batch in `[min, max]` and is tuned for `opt`. The
//! profile substitutes the three batch sizes into axis 0 of the network
//! input and keeps `C`, `H`, `W` fixed.

use crate::CompileError;
use std::fmt;
use tensor_core::{Dims, TensorDesc};

/// The `[min, opt, max]` batch sizes requested for a build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BatchRange {
    pub min: usize,
    pub opt: usize,
    pub max: usize,
}

impl BatchRange {
    /// Builds a range from a `[min, opt, max]` list.
    ///
    /// # Examples
    /// ```
    /// use plan_compiler::BatchRange;
    ///
    /// let r = BatchRange::from_opts(&[1, 4, 8]).unwrap();
    /// assert_eq!(r.opt, 4);
    /// assert!(BatchRange::from_opts(&[4, 1, 8]).is_err());
    /// ```
    pub fn from_opts(opts: &[usize]) -> Result<Self, CompileError> {
        let [min, opt, max] = opts else {
            return Err(CompileError::Profile(format!(
                "expected three batch sizes [min, opt, max], got {opts:?}"
            )));
        };
        let range = Self {
            min: *min,
            opt: *opt,
            max: *max,
        };
        range.validate()?;
        Ok(range)
    }

    /// Checks `0 < min <= opt <= max`.
    pub fn validate(&self) -> Result<(), CompileError> {
        if self.min == 0 {
            return Err(CompileError::Profile("batch sizes must be positive".into()));
        }
        if !(self.min <= self.opt && self.opt <= self.max) {
            return Err(CompileError::Profile(format!(
                "batch sizes must satisfy min <= opt <= max, got {self}"
            )));
        }
        Ok(())
    }

    pub fn contains(&self, batch: usize) -> bool {
        (self.min..=self.max).contains(&batch)
    }
}

impl fmt::Display for BatchRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.min, self.opt, self.max)
    }
}

/// Input shapes the backend optimizes for.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OptimizationProfile {
    /// Name of the network input this profile covers.
    pub input: String,
    pub min: Dims,
    pub opt: Dims,
    pub max: Dims,
}

impl OptimizationProfile {
    /// Derives the profile for an NCHW input.
    ///
    /// Fails if the input is not rank 4 or if any of `C`, `H`, `W` is not a
    /// positive static value.
    pub fn for_input(input: &TensorDesc, batch: BatchRange) -> Result<Self, CompileError> {
        batch.validate()?;
        let dims = &input.dims;
        if dims.rank() != 4 {
            return Err(CompileError::Profile(format!(
                "input '{}' must be NCHW, got {}",
                input.name, dims
            )));
        }
        if !dims.is_static_after_batch() {
            return Err(CompileError::Profile(format!(
                "input '{}' must have static channel and spatial dims, got {}",
                input.name, dims
            )));
        }
        let at = |b: usize| dims.with_batch(b as i64);
        Ok(Self {
            input: input.name.clone(),
            min: at(batch.min),
            opt: at(batch.opt),
            max: at(batch.max),
        })
    }

    /// Element-wise `min <= opt <= max` with identical non-batch dims.
    pub fn is_valid(&self) -> bool {
        let (min, opt, max) = (self.min.as_slice(), self.opt.as_slice(), self.max.as_slice());
        if min.len() != opt.len() || opt.len() != max.len() || min.is_empty() {
            return false;
        }
        let ordered = min
            .iter()
            .zip(opt)
            .zip(max)
            .all(|((a, b), c)| 0 < *a && a <= b && b <= c);
        ordered && min[1..] == opt[1..] && opt[1..] == max[1..]
    }

    /// The batch sizes of this profile.
    pub fn batch_range(&self) -> BatchRange {
        let b = |d: &Dims| d.dim(0).unwrap_or(0).max(0) as usize;
        BatchRange {
            min: b(&self.min),
            opt: b(&self.opt),
            max: b(&self.max),
        }
    }
}
