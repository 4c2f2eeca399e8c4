// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Limit-enforcing device memory arena.
//!
//! [`DeviceMemory`] hands out [`DeviceBuffer`]s until its [`WorkspaceSize`]
//! limit is reached; further requests return `Err(OutOfMemory)`. It backs
//! both the builder's workspace reservation and the inference I/O bindings.
//!
//! # Thread Safety
//! `DeviceMemory` is `Send + Sync` and cheap to clone; clones share one
//! arena.

use crate::{AllocationStats, DeviceBuffer, MemoryError, WorkspaceSize};
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct ArenaState {
    allocated_bytes: usize,
    stats: AllocationStats,
}

/// Arena state shared between a [`DeviceMemory`] and its live buffers.
#[derive(Debug)]
pub(crate) struct ArenaInner {
    limit: WorkspaceSize,
    state: Mutex<ArenaState>,
}

impl ArenaInner {
    /// Called by `DeviceBuffer::drop`.
    pub(crate) fn release(&self, size_bytes: usize) {
        if let Ok(mut state) = self.state.lock() {
            state.allocated_bytes = state.allocated_bytes.saturating_sub(size_bytes);
            state.stats.record_release();
        }
    }
}

/// A device memory arena with a hard byte limit.
///
/// # Example
/// ```
/// use device_memory::{DeviceMemory, WorkspaceSize};
///
/// let mem = DeviceMemory::new(WorkspaceSize::from_bytes(1024));
/// let buf = mem.allocate(1000).unwrap();
/// assert!(mem.allocate(100).is_err());
/// drop(buf);
/// assert!(mem.allocate(100).is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct DeviceMemory {
    inner: Arc<ArenaInner>,
}

impl DeviceMemory {
    /// Creates an arena with the given limit.
    pub fn new(limit: WorkspaceSize) -> Self {
        Self {
            inner: Arc::new(ArenaInner {
                limit,
                state: Mutex::new(ArenaState::default()),
            }),
        }
    }

    /// Allocates a zero-filled buffer of `size_bytes`.
    pub fn allocate(&self, size_bytes: usize) -> Result<DeviceBuffer, MemoryError> {
        if size_bytes == 0 {
            return Err(MemoryError::ZeroSizedAllocation);
        }
        let limit = self.inner.limit.as_bytes();

        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let available = limit.saturating_sub(state.allocated_bytes);
        if size_bytes > available {
            state.stats.record_oom();
            tracing::debug!(
                requested = size_bytes,
                available,
                limit,
                "device allocation rejected"
            );
            return Err(MemoryError::OutOfMemory {
                requested_bytes: size_bytes,
                available_bytes: available,
                limit_bytes: limit,
            });
        }

        state.allocated_bytes += size_bytes;
        let live = state.allocated_bytes;
        state.stats.record_allocation(size_bytes, live);
        drop(state);

        Ok(DeviceBuffer::new(size_bytes, Arc::clone(&self.inner)))
    }

    /// Bytes currently held by live buffers.
    pub fn allocated_bytes(&self) -> usize {
        self.inner
            .state
            .lock()
            .map(|s| s.allocated_bytes)
            .unwrap_or_default()
    }

    /// Bytes remaining before the limit.
    pub fn available_bytes(&self) -> usize {
        self.inner
            .limit
            .as_bytes()
            .saturating_sub(self.allocated_bytes())
    }

    pub fn limit(&self) -> WorkspaceSize {
        self.inner.limit
    }

    /// Returns a snapshot of allocation statistics.
    pub fn stats(&self) -> AllocationStats {
        self.inner
            .state
            .lock()
            .map(|s| s.stats.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_and_drop() {
        let mem = DeviceMemory::new(WorkspaceSize::from_mb(1));
        let buf = mem.allocate(1024).unwrap();
        assert_eq!(buf.size_bytes(), 1024);
        assert_eq!(mem.allocated_bytes(), 1024);

        drop(buf);
        assert_eq!(mem.allocated_bytes(), 0);
        assert_eq!(mem.available_bytes(), 1024 * 1024);
    }

    #[test]
    fn test_zero_sized_rejected() {
        let mem = DeviceMemory::new(WorkspaceSize::from_mb(1));
        assert!(matches!(mem.allocate(0), Err(MemoryError::ZeroSizedAllocation)));
    }

    #[test]
    fn test_limit_enforced() {
        let mem = DeviceMemory::new(WorkspaceSize::from_bytes(4096));
        let _a = mem.allocate(3000).unwrap();
        match mem.allocate(2000) {
            Err(MemoryError::OutOfMemory {
                requested_bytes,
                available_bytes,
                limit_bytes,
            }) => {
                assert_eq!(requested_bytes, 2000);
                assert_eq!(available_bytes, 1096);
                assert_eq!(limit_bytes, 4096);
            }
            other => panic!("expected OutOfMemory, got {other:?}"),
        }
        assert_eq!(mem.stats().oom_count, 1);
    }

    #[test]
    fn test_clones_share_arena() {
        let mem = DeviceMemory::new(WorkspaceSize::from_bytes(100));
        let other = mem.clone();
        let _buf = other.allocate(60).unwrap();
        assert_eq!(mem.allocated_bytes(), 60);
        assert!(mem.allocate(60).is_err());
    }

    #[test]
    fn test_stats_track_peak() {
        let mem = DeviceMemory::new(WorkspaceSize::from_mb(1));
        let a = mem.allocate(400).unwrap();
        let b = mem.allocate(600).unwrap();
        drop(a);
        drop(b);
        let _c = mem.allocate(100).unwrap();

        let stats = mem.stats();
        assert_eq!(stats.allocations, 3);
        assert_eq!(stats.releases, 2);
        assert_eq!(stats.peak_allocated_bytes, 1000);
    }
}
