// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Calibration batch sources.

use tensor_core::Dims;

/// A finite source of calibration batches.
///
/// Each batch is `dims().num_elements()` contiguous `f32` values in NCHW
/// order, with `dims()[0] == batch_size()`.
pub trait BatchStream {
    fn batch_size(&self) -> usize;

    /// Shape of one batch.
    fn dims(&self) -> &Dims;

    /// Produces the next batch, or `None` when exhausted.
    fn next_batch(&mut self) -> Option<&[f32]>;

    /// Rewinds to the first batch.
    fn reset(&mut self);

    /// Batches produced since construction or the last reset.
    fn batches_served(&self) -> usize;
}

impl<S: BatchStream + ?Sized> BatchStream for Box<S> {
    fn batch_size(&self) -> usize {
        (**self).batch_size()
    }

    fn dims(&self) -> &Dims {
        (**self).dims()
    }

    fn next_batch(&mut self) -> Option<&[f32]> {
        (**self).next_batch()
    }

    fn reset(&mut self) {
        (**self).reset()
    }

    fn batches_served(&self) -> usize {
        (**self).batches_served()
    }
}

/// A stream over batches already in memory.
#[derive(Debug, Clone)]
pub struct FixedStream {
    dims: Dims,
    batches: Vec<Vec<f32>>,
    cursor: usize,
}

impl FixedStream {
    /// Creates a stream. `dims` is the per-batch shape; batches whose
    /// length does not match it are dropped.
    pub fn new(dims: Dims, batches: Vec<Vec<f32>>) -> Self {
        let expected = dims.num_elements().unwrap_or(0);
        let total = batches.len();
        let batches: Vec<_> = batches.into_iter().filter(|b| b.len() == expected).collect();
        if batches.len() != total {
            tracing::warn!(
                "dropped {} calibration batches that do not match {}",
                total - batches.len(),
                dims
            );
        }
        Self {
            dims,
            batches,
            cursor: 0,
        }
    }

    /// A stream that yields nothing.
    pub fn empty(dims: Dims) -> Self {
        Self::new(dims, Vec::new())
    }
}

impl BatchStream for FixedStream {
    fn batch_size(&self) -> usize {
        self.dims.dim(0).unwrap_or(0).max(0) as usize
    }

    fn dims(&self) -> &Dims {
        &self.dims
    }

    fn next_batch(&mut self) -> Option<&[f32]> {
        let batch = self.batches.get(self.cursor)?;
        self.cursor += 1;
        Some(batch.as_slice())
    }

    fn reset(&mut self) {
        self.cursor = 0;
    }

    fn batches_served(&self) -> usize {
        self.cursor
    }
}
