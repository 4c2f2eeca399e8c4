// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Example: export a three-scale detector, reload the plan and run a batch.
//!
//! ```bash
//! cargo run -p runtime --example detect
//! ```

use device_memory::{DeviceMemory, WorkspaceSize};
use network_ir::GraphDocument;
use plan_compiler::CompileOptions;
use runtime::{Engine, HostBackend};
use std::sync::Arc;
use tensor_core::{DType, Dims, TensorDesc};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    // Three feature maps at strides 8, 16 and 32 over a 256x256 input.
    let mut outputs = Vec::new();
    for (prefix, channels) in [("cls", 3 * 4), ("box", 3 * 4)] {
        for (i, hw) in [32, 16, 8].into_iter().enumerate() {
            outputs.push(TensorDesc::new(format!("{prefix}_{i}"), Dims::nchw(-1, channels, hw, hw), DType::F32));
        }
    }
    let names: Vec<String> = outputs.iter().map(|d| d.name.clone()).collect();
    let mut doc = GraphDocument::new("demo-detector")
        .input(TensorDesc::new("images", Dims::nchw(-1, 3, 256, 256), DType::F32))
        .node("backbone", "ResNet", &["images"], outputs);
    for name in names {
        doc = doc.output(name);
    }

    let anchor = |s: f32| vec![-s, -s, s, s, -2.0 * s, -s, 2.0 * s, s, -s, -2.0 * s, s, 2.0 * s];
    let options = CompileOptions {
        dynamic_batch_opts: vec![1, 2, 4],
        anchors: vec![anchor(16.0), anchor(32.0), anchor(64.0)],
        detections_per_im: 25,
        workspace_size: "256M".into(),
        ..CompileOptions::default()
    };

    let backend = Arc::new(HostBackend::new());
    let dir = std::env::temp_dir().join("detrt-demo");
    std::fs::create_dir_all(&dir)?;
    let plan_path = dir.join("demo.plan");

    let compiled = Engine::build(backend.clone(), doc.to_json()?.as_bytes(), &options)?;
    compiled.save(&plan_path)?;
    println!("Wrote {} ({} bytes)", plan_path.display(), compiled.plan().len());

    let mut engine = Engine::load(backend, &plan_path, true)?;
    let (h, w) = engine.input_size();
    println!("Input {h}x{w}, {} detections per image", engine.max_detections());
    for tensor in engine.io_tensors() {
        println!("  {tensor}");
    }

    let memory = DeviceMemory::new(WorkspaceSize::from_mb(64));
    let mut buffers = engine.allocate_io_buffers(&memory, 2)?;
    buffers[0].as_f32_slice_mut().fill(0.5);
    engine.infer(&mut buffers, 2)?;

    let scores = buffers[1].as_f32_slice();
    let kept = scores.iter().filter(|&&s| s > 0.0).count();
    println!("{kept} detections above zero score");
    println!("{}", memory.stats().summary());
    Ok(())
}
