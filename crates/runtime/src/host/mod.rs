// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Host reference backend.
//!
//! Builds plans by validating the network and recording what an optimizing
//! compiler would need, and runs them by producing "no detections" outputs.
//! Used by the CLI, the tests and the benches.

mod build;
mod document;
mod exec;

pub use document::{PlanDocument, PluginRecord, PLAN_FORMAT_VERSION, PLAN_MAGIC};
pub use exec::{HostContext, HostEngine, HostStream};

/// The host backend. Stateless; one instance may build and run any number
/// of plans.
#[derive(Debug, Clone, Copy, Default)]
pub struct HostBackend;

impl HostBackend {
    pub fn new() -> Self {
        Self
    }
}
