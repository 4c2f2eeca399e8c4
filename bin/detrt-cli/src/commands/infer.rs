// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `detrt infer`: run one batch and print the detections.

use anyhow::{bail, Context};
use device_memory::{DeviceMemory, WorkspaceSize};
use runtime::{Engine, HostBackend};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

pub fn execute(plan: PathBuf, batch: usize, images: Vec<PathBuf>, verbose: bool) -> anyhow::Result<()> {
    if images.len() > batch {
        bail!("{} images given for a batch of {batch}", images.len());
    }
    let mut engine = Engine::load(Arc::new(HostBackend::new()), &plan, verbose)
        .with_context(|| format!("failed to load '{}'", plan.display()))?;

    let bindings: Vec<_> = engine.io_tensors().map(|t| t.name.as_str()).collect();
    if bindings.len() != 4 {
        bail!("expected input, scores, boxes and classes bindings, plan has {bindings:?}");
    }
    let params = engine
        .io_tensors()
        .nth(2)
        .and_then(|t| t.dims.dim(2))
        .unwrap_or(4)
        .max(1) as usize;

    let memory = DeviceMemory::new(WorkspaceSize::from_gb(2));
    let mut buffers = engine.allocate_io_buffers(&memory, batch)?;

    let input = engine
        .io_tensors()
        .next()
        .context("plan has no input tensor")?
        .dims
        .clone();
    let dim = |axis: usize| input.dim(axis).unwrap_or(0).max(0) as usize;
    let (c, h, w) = (dim(1), dim(2), dim(3));
    let per_image = c * h * w;
    let data = buffers[0].as_f32_slice_mut();
    for (i, path) in images.iter().enumerate() {
        let img = image::open(path).with_context(|| format!("cannot read image '{}'", path.display()))?;
        plan_compiler::calibration::preprocess(&img, c, h, w, &mut data[i * per_image..(i + 1) * per_image]);
    }

    let start = Instant::now();
    engine.infer(&mut buffers, batch)?;
    let elapsed = start.elapsed();

    let d = engine.max_detections();
    let scores = buffers[1].as_f32_slice();
    let boxes = buffers[2].as_f32_slice();
    let classes = buffers[3].as_f32_slice();
    for b in 0..batch {
        let label = images
            .get(b)
            .map_or_else(|| "<zeros>".to_string(), |p| p.display().to_string());
        println!("  [{b}] {label}");
        let mut shown = 0;
        for k in 0..d {
            let score = scores[b * d + k];
            if score <= 0.0 {
                continue;
            }
            let bx = &boxes[(b * d + k) * params..(b * d + k + 1) * params];
            println!("      class {:>3}  score {score:.3}  box {bx:?}", classes[b * d + k] as i64);
            shown += 1;
        }
        if shown == 0 {
            println!("      no detections");
        }
    }
    println!("  Inference: {:.2} ms (batch {batch})", elapsed.as_secs_f64() * 1e3);
    Ok(())
}
