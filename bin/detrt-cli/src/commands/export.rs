// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `detrt export`: graph in, plan out.
//!
//! Options come from `--config` first; explicit flags override them.

use anyhow::{bail, Context};
use plan_compiler::{CompileOptions, Precision};
use runtime::{Engine, HostBackend};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Exported backbone graph (JSON interchange document).
    pub graph: PathBuf,

    /// Where to write the plan.
    pub plan: PathBuf,

    /// TOML file with compile options.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// FP32, FP16 or INT8.
    #[arg(short, long)]
    pub precision: Option<Precision>,

    /// Batch sizes as `min,opt,max`.
    #[arg(long, value_delimiter = ',')]
    pub batch: Option<Vec<usize>>,

    /// Anchors per scale: scales separated by `;`, values by `,`.
    #[arg(long)]
    pub anchors: Option<String>,

    /// Build the rotated-box head.
    #[arg(long)]
    pub rotated: bool,

    #[arg(long)]
    pub score_thresh: Option<f32>,

    #[arg(long)]
    pub top_n: Option<usize>,

    #[arg(long)]
    pub nms_thresh: Option<f32>,

    #[arg(long)]
    pub detections_per_im: Option<usize>,

    /// Builder workspace, e.g. `512M` or `2G`.
    #[arg(long)]
    pub workspace: Option<String>,

    /// Directory of calibration images (INT8).
    #[arg(long)]
    pub calibration_images: Option<PathBuf>,

    /// Calibration table to reuse or write (INT8).
    #[arg(long)]
    pub calibration_table: Option<PathBuf>,

    /// Model name calibration scales are keyed by.
    #[arg(long)]
    pub model_name: Option<String>,
}

pub fn execute(args: ExportArgs, verbose: bool) -> anyhow::Result<()> {
    let options = resolve_options(&args, verbose)?;
    if options.anchors.is_empty() {
        bail!("no anchors given; set `anchors` in the config or pass --anchors");
    }
    tracing::info!(
        graph = %args.graph.display(),
        precision = %options.precision,
        batch = ?options.dynamic_batch_opts,
        "exporting"
    );

    let backend = Arc::new(HostBackend::new());
    let engine = Engine::build_from_file(backend, &args.graph, &options)
        .with_context(|| format!("failed to compile '{}'", args.graph.display()))?;
    engine
        .save(&args.plan)
        .with_context(|| format!("failed to write '{}'", args.plan.display()))?;

    println!(
        "Wrote {} ({} bytes, {})",
        args.plan.display(),
        engine.plan().len(),
        options.precision
    );
    Ok(())
}

fn resolve_options(args: &ExportArgs, verbose: bool) -> anyhow::Result<CompileOptions> {
    let mut options = match &args.config {
        Some(path) => CompileOptions::from_file(path)?,
        None => CompileOptions::default(),
    };
    if let Some(precision) = args.precision {
        options.precision = precision;
    }
    if let Some(batch) = &args.batch {
        options.dynamic_batch_opts = batch.clone();
    }
    if let Some(anchors) = &args.anchors {
        options.anchors = parse_anchors(anchors)?;
    }
    options.rotated |= args.rotated;
    options.verbose |= verbose;
    if let Some(v) = args.score_thresh {
        options.score_thresh = v;
    }
    if let Some(v) = args.top_n {
        options.top_n = v;
    }
    if let Some(v) = args.nms_thresh {
        options.nms_thresh = v;
    }
    if let Some(v) = args.detections_per_im {
        options.detections_per_im = v;
    }
    if let Some(v) = &args.workspace {
        options.workspace_size = v.clone();
    }
    if let Some(dir) = &args.calibration_images {
        options.calibration.images = list_images(dir)?;
    }
    if let Some(table) = &args.calibration_table {
        options.calibration.table = table.clone();
    }
    if let Some(name) = &args.model_name {
        options.calibration.model_name = name.clone();
    }
    Ok(options)
}

/// Parses `"x0,y0,x1,y1;x0,y0,x1,y1"` into one anchor list per scale.
fn parse_anchors(s: &str) -> anyhow::Result<Vec<Vec<f32>>> {
    s.split(';')
        .map(|scale| {
            scale
                .split(',')
                .map(|v| {
                    v.trim()
                        .parse::<f32>()
                        .with_context(|| format!("invalid anchor value '{}'", v.trim()))
                })
                .collect::<anyhow::Result<Vec<f32>>>()
        })
        .collect()
}

/// Images directly under `dir`, sorted by path.
fn list_images(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).with_context(|| format!("cannot read '{}'", dir.display()))?;
    let mut images = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);
        if matches!(ext.as_deref(), Some("jpg" | "jpeg" | "png")) {
            images.push(path);
        }
    }
    images.sort();
    tracing::info!("found {} calibration images in {}", images.len(), dir.display());
    Ok(images)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_anchors() {
        let anchors = parse_anchors("1,1,2,2;0.5, 0.5, 1, 1").unwrap();
        assert_eq!(anchors, vec![vec![1.0, 1.0, 2.0, 2.0], vec![0.5, 0.5, 1.0, 1.0]]);
        assert!(parse_anchors("1,x").is_err());
    }

    #[test]
    fn test_list_images_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.PNG", "a.jpg", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        let images = list_images(dir.path()).unwrap();
        let names: Vec<_> = images
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, ["a.jpg", "b.PNG"]);
    }
}
