// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # device-memory
//!
//! Device-side memory for plan building and execution.
//!
//! # Key Components
//!
//! - [`WorkspaceSize`]: a byte limit with human-readable parsing (`"512M"`,
//!   `"1G"`). Used both as the builder's workspace cap and as an arena size.
//! - [`DeviceMemory`]: the allocator. Enforces its limit and tracks
//!   statistics.
//! - [`DeviceBuffer`]: an RAII handle to one allocation. Dropping it releases
//!   the bytes back to the arena it came from.
//! - [`AllocationStats`]: cumulative allocator metrics.
//!
//! # Ownership Model
//!
//! ```text
//! DeviceMemory::allocate(size)
//!       │
//!       ▼
//!   DeviceBuffer  ◄─── owns the storage, holds Arc<ArenaInner>
//!       │
//!       │  drop()
//!       ▼
//!   ArenaInner::release()  ──► allocated bytes decremented
//! ```
//!
//! Inference bindings are a slice of `DeviceBuffer`s, one per I/O tensor,
//! in the engine's tensor index order.
//!
//! # Example
//! ```
//! use device_memory::{DeviceMemory, WorkspaceSize};
//!
//! let mem = DeviceMemory::new(WorkspaceSize::from_mb(4));
//! let a = mem.allocate(1024).unwrap();
//! let b = mem.allocate(4096).unwrap();
//! assert_eq!(mem.allocated_bytes(), 1024 + 4096);
//!
//! drop(a);
//! assert_eq!(mem.allocated_bytes(), 4096);
//! # drop(b);
//! ```

mod buffer;
mod error;
mod memory;
mod size;
mod stats;

pub use buffer::DeviceBuffer;
pub use error::MemoryError;
pub use memory::DeviceMemory;
pub use size::WorkspaceSize;
pub use stats::AllocationStats;
