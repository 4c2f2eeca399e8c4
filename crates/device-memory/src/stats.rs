// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Allocation statistics for diagnostics.

/// Cumulative statistics about a [`DeviceMemory`](crate::DeviceMemory) arena.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct AllocationStats {
    /// Successful allocations.
    pub allocations: u64,
    /// Buffers released back to the arena.
    pub releases: u64,
    /// Allocation requests rejected because the limit was reached.
    pub oom_count: u64,
    /// High-water mark of live bytes.
    pub peak_allocated_bytes: usize,
    /// Total bytes ever handed out.
    pub cumulative_allocated_bytes: u64,
}

impl AllocationStats {
    pub(crate) fn record_allocation(&mut self, size: usize, live_bytes: usize) {
        self.allocations += 1;
        self.cumulative_allocated_bytes += size as u64;
        self.peak_allocated_bytes = self.peak_allocated_bytes.max(live_bytes);
    }

    pub(crate) fn record_release(&mut self) {
        self.releases += 1;
    }

    pub(crate) fn record_oom(&mut self) {
        self.oom_count += 1;
    }

    /// Number of allocations not yet released.
    pub fn live_allocations(&self) -> u64 {
        self.allocations.saturating_sub(self.releases)
    }

    /// Returns a one-line summary.
    pub fn summary(&self) -> String {
        format!(
            "{} allocations ({} live), {} OOMs, peak {:.2} MB",
            self.allocations,
            self.live_allocations(),
            self.oom_count,
            self.peak_allocated_bytes as f64 / (1024.0 * 1024.0),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peak_never_decreases() {
        let mut s = AllocationStats::default();
        s.record_allocation(100, 100);
        s.record_allocation(50, 150);
        s.record_release();
        s.record_allocation(10, 60);
        assert_eq!(s.peak_allocated_bytes, 150);
        assert_eq!(s.cumulative_allocated_bytes, 160);
        assert_eq!(s.live_allocations(), 2);
    }

    #[test]
    fn test_summary() {
        let mut s = AllocationStats::default();
        s.record_allocation(1024 * 1024, 1024 * 1024);
        s.record_oom();
        let text = s.summary();
        assert!(text.contains("1 allocations"));
        assert!(text.contains("1 OOMs"));
        assert!(text.contains("1.00 MB"));
    }
}
