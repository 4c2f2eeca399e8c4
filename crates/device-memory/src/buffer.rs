// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! RAII device buffer.

use crate::memory::ArenaInner;
use std::sync::Arc;

/// One device allocation.
///
/// Storage is word-aligned so the buffer can be viewed as `f32` without
/// copying. Dropping the buffer returns its bytes to the arena.
pub struct DeviceBuffer {
    words: Vec<f32>,
    size_bytes: usize,
    arena: Arc<ArenaInner>,
}

impl DeviceBuffer {
    pub(crate) fn new(size_bytes: usize, arena: Arc<ArenaInner>) -> Self {
        Self {
            words: vec![0.0; size_bytes.div_ceil(4)],
            size_bytes,
            arena,
        }
    }

    /// Size of this allocation in bytes.
    pub fn size_bytes(&self) -> usize {
        self.size_bytes
    }

    /// Raw byte view.
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: `words` holds at least `size_bytes` initialized bytes and
        // u8 has no alignment requirement.
        unsafe { std::slice::from_raw_parts(self.words.as_ptr() as *const u8, self.size_bytes) }
    }

    /// Mutable raw byte view.
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: see `as_bytes`; any bit pattern is a valid f32.
        unsafe {
            std::slice::from_raw_parts_mut(self.words.as_mut_ptr() as *mut u8, self.size_bytes)
        }
    }

    /// The buffer as `f32` elements. A trailing partial word is excluded.
    pub fn as_f32_slice(&self) -> &[f32] {
        &self.words[..self.size_bytes / 4]
    }

    pub fn as_f32_slice_mut(&mut self) -> &mut [f32] {
        let len = self.size_bytes / 4;
        &mut self.words[..len]
    }

    /// Overwrites the whole buffer with zeros.
    pub fn zero(&mut self) {
        self.words.fill(0.0);
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        self.arena.release(self.size_bytes);
    }
}

impl std::fmt::Debug for DeviceBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("size_bytes", &self.size_bytes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{DeviceMemory, WorkspaceSize};

    #[test]
    fn test_zero_initialized() {
        let mem = DeviceMemory::new(WorkspaceSize::from_mb(1));
        let buf = mem.allocate(64).unwrap();
        assert!(buf.as_bytes().iter().all(|&b| b == 0));
        assert_eq!(buf.as_f32_slice().len(), 16);
    }

    #[test]
    fn test_f32_and_byte_views_alias() {
        let mem = DeviceMemory::new(WorkspaceSize::from_mb(1));
        let mut buf = mem.allocate(8).unwrap();
        buf.as_f32_slice_mut()[1] = 1.0;
        assert_eq!(&buf.as_bytes()[4..8], &1.0f32.to_ne_bytes());

        buf.zero();
        assert_eq!(buf.as_f32_slice(), &[0.0, 0.0]);
    }

    #[test]
    fn test_odd_size() {
        let mem = DeviceMemory::new(WorkspaceSize::from_mb(1));
        let mut buf = mem.allocate(7).unwrap();
        assert_eq!(buf.as_bytes().len(), 7);
        assert_eq!(buf.as_f32_slice().len(), 1);
        buf.as_bytes_mut()[6] = 0xff;
        assert_eq!(buf.as_bytes()[6], 0xff);
    }
}
