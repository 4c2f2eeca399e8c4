// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # detrt
//!
//! Command-line interface for the detection plan compiler and runtime.
//!
//! ## Usage
//! ```bash
//! # Compile an exported backbone into a plan
//! detrt export retinanet.json retinanet.plan --config compile.toml --precision FP16
//!
//! # INT8 with calibration images
//! detrt export retinanet.json retinanet.plan --config compile.toml --precision INT8 \
//!     --calibration-images ./calib --calibration-table retinanet.cache
//!
//! # Show a plan's bindings
//! detrt inspect retinanet.plan
//!
//! # Run a batch
//! detrt infer retinanet.plan --batch 2 street.jpg park.jpg
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "detrt",
    about = "Detection plan compiler and runtime",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging (repeat for more: -v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a graph into a serialized plan.
    Export(commands::export::ExportArgs),

    /// Print a plan's I/O tensors and batch range.
    Inspect {
        /// Plan file.
        plan: PathBuf,
    },

    /// Load a plan and run one batch.
    Infer {
        /// Plan file.
        plan: PathBuf,

        /// Batch size; must lie in the plan's profile.
        #[arg(short, long, default_value_t = 1)]
        batch: usize,

        /// Images for the batch; missing slots are zero-filled.
        images: Vec<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Export(args) => commands::export::execute(args, cli.verbose > 0),
        Commands::Inspect { plan } => commands::inspect::execute(plan, cli.verbose > 0),
        Commands::Infer { plan, batch, images } => commands::infer::execute(plan, batch, images, cli.verbose > 0),
    }
}
