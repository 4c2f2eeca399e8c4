// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for device memory.

/// Errors that can occur during device allocation or size parsing.
#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
    /// The requested allocation would exceed the arena limit.
    #[error("out of device memory: requested {requested_bytes} bytes, but only {available_bytes} available (limit: {limit_bytes})")]
    OutOfMemory {
        requested_bytes: usize,
        available_bytes: usize,
        limit_bytes: usize,
    },

    /// Attempted to allocate a zero-sized buffer.
    #[error("cannot allocate zero-sized buffer")]
    ZeroSizedAllocation,

    /// A size string could not be parsed.
    #[error("invalid size '{input}': {reason}")]
    InvalidSize { input: String, reason: String },
}
