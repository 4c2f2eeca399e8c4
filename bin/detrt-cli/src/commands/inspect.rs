// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `detrt inspect`: print what a plan binds.

use anyhow::Context;
use runtime::{Engine, HostBackend};
use std::path::PathBuf;
use std::sync::Arc;

pub fn execute(plan: PathBuf, verbose: bool) -> anyhow::Result<()> {
    let engine = Engine::load(Arc::new(HostBackend::new()), &plan, verbose)
        .with_context(|| format!("failed to load '{}'", plan.display()))?;

    let (h, w) = engine.input_size();
    println!("  Plan:           {}", plan.display());
    println!("  Input size:     {h}x{w}");
    println!("  Batch range:    {}", engine.batch_range());
    println!("  Max detections: {}", engine.max_detections());
    println!();

    println!("  {:<4} {:<6} {:<24} {:<20} {:>5}", "Idx", "Mode", "Name", "Dims", "Type");
    println!("  {}", "-".repeat(63));
    for (i, t) in engine.io_tensors().enumerate() {
        let mode = if t.is_input() { "in" } else { "out" };
        println!(
            "  {:<4} {:<6} {:<24} {:<20} {:>5}",
            i,
            mode,
            t.name,
            t.dims.to_string(),
            t.dtype.as_str()
        );
    }
    Ok(())
}
