// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

use super::{HostBackend, PlanDocument, PluginRecord};
use crate::{IoTensor, TensorIoMode};
use device_memory::DeviceMemory;
use network_ir::{LayerKind, Network, TensorInfo};
use plan_compiler::{
    Builder, BuilderConfig, CalibrationTable, CompileError, Int8Calibrator, OptimizationProfile, SerializedPlan,
};
use std::collections::BTreeSet;
use tensor_core::{Logger, DYNAMIC};

const INT8_RANGE: f32 = 127.0;

impl Builder for HostBackend {
    fn name(&self) -> &str {
        "host"
    }

    fn build_serialized(
        &self,
        network: &Network,
        config: &BuilderConfig,
        calibrator: Option<&mut dyn Int8Calibrator>,
        logger: &Logger,
    ) -> Result<SerializedPlan, CompileError> {
        let io = io_tensors(network)?;
        let profile = check_profile(&io[0], config)?;
        let plugins = check_plugins(network)?;

        let workspace_bytes = estimate_workspace(network, profile.batch_range().max)?;
        let arena = DeviceMemory::new(config.workspace);
        let _scratch = arena.allocate(workspace_bytes).map_err(|e| {
            CompileError::Compilation(format!(
                "workspace of {} cannot hold the {workspace_bytes} byte activation estimate: {e}",
                config.workspace
            ))
        })?;
        logger.verbose(&format!(
            "reserved {workspace_bytes} bytes of a {} workspace for '{}'",
            config.workspace,
            network.name()
        ));

        let calibration = if config.int8 {
            let calibrator = calibrator.ok_or_else(|| {
                CompileError::Compilation("INT8 requested without a calibrator".into())
            })?;
            let expected = config.calibration_profile.as_ref().unwrap_or(profile);
            Some(calibrate(calibrator, &io[0].name, expected, logger)?)
        } else {
            None
        };

        let doc = PlanDocument {
            network: network.name().to_string(),
            precision: config.precision(),
            io,
            profiles: config.profiles.clone(),
            plugins,
            num_layers: network.num_layers(),
            workspace_bytes,
            calibration,
        };
        let plan = doc
            .encode()
            .map_err(|e| CompileError::Compilation(format!("plan serialization failed: {e}")))?;
        tracing::info!(
            network = network.name(),
            precision = %doc.precision,
            bytes = plan.len(),
            "plan built"
        );
        Ok(plan)
    }
}

fn io_tensors(network: &Network) -> Result<Vec<IoTensor>, CompileError> {
    if network.num_inputs() != 1 {
        return Err(CompileError::Compilation(format!(
            "host backend needs exactly one input, found {}",
            network.num_inputs()
        )));
    }
    if network.num_outputs() == 0 {
        return Err(CompileError::Compilation("network has no outputs".into()));
    }
    let entry = |id, mode| {
        let t: &TensorInfo = network.tensor(id);
        IoTensor {
            name: t.name.clone(),
            dims: t.dims.with_batch(DYNAMIC),
            dtype: t.dtype,
            mode,
        }
    };
    let inputs = network.inputs().iter().map(|&id| entry(id, TensorIoMode::Input));
    let outputs = network.outputs().iter().map(|&id| entry(id, TensorIoMode::Output));
    Ok(inputs.chain(outputs).collect())
}

fn check_profile<'c>(input: &IoTensor, config: &'c BuilderConfig) -> Result<&'c OptimizationProfile, CompileError> {
    let profile = match config.profiles.as_slice() {
        [profile] => profile,
        profiles => {
            return Err(CompileError::Compilation(format!(
                "host backend needs exactly one optimization profile, found {}",
                profiles.len()
            )))
        }
    };
    if profile.input != input.name {
        return Err(CompileError::Compilation(format!(
            "profile covers '{}' but the network input is '{}'",
            profile.input, input.name
        )));
    }
    let same_shape = profile.min.as_slice().get(1..) == input.dims.as_slice().get(1..);
    if !profile.is_valid() || !same_shape {
        return Err(CompileError::Compilation(format!(
            "profile min {} opt {} max {} does not cover input {}",
            profile.min, profile.opt, profile.max, input.dims
        )));
    }
    Ok(profile)
}

/// Re-derives every plugin's outputs through the operator registry.
fn check_plugins(network: &Network) -> Result<Vec<PluginRecord>, CompileError> {
    let mut records = Vec::new();
    for layer in network.plugin_layers() {
        let LayerKind::Plugin(spec) = &layer.kind else {
            continue;
        };
        if !detection_ops::is_registered(&spec.type_name) {
            return Err(CompileError::Compilation(format!(
                "layer '{}': no operator registered for '{}'",
                layer.name, spec.type_name
            )));
        }
        let op = detection_ops::create_plugin(spec)?;
        let inputs: Vec<&TensorInfo> = layer.inputs.iter().map(|&id| network.tensor(id)).collect();
        let derived = op
            .output_descs(&inputs)
            .map_err(|e| CompileError::Compilation(format!("layer '{}': {e}", layer.name)))?;
        let recorded = layer.outputs.iter().map(|&id| &network.tensor(id).dims);
        if derived.len() != layer.outputs.len() || !derived.iter().map(|d| &d.dims).eq(recorded) {
            return Err(CompileError::Compilation(format!(
                "layer '{}': recorded output shapes disagree with '{}'",
                layer.name, spec.type_name
            )));
        }
        records.push(PluginRecord {
            layer: layer.name.clone(),
            spec: spec.clone(),
        });
    }
    Ok(records)
}

/// Bytes needed to keep every tensor live at `max_batch`.
fn estimate_workspace(network: &Network, max_batch: usize) -> Result<usize, CompileError> {
    let ids: BTreeSet<_> = network
        .inputs()
        .iter()
        .copied()
        .chain(network.layers().flat_map(|l| l.outputs.iter().copied()))
        .collect();
    ids.into_iter().try_fold(0usize, |total, id| {
        let t = network.tensor(id);
        let bytes = t
            .dims
            .with_batch(max_batch as i64)
            .size_bytes(t.dtype)
            .map_err(|e| CompileError::Compilation(format!("tensor '{}': {e}", t.name)))?;
        Ok(total.saturating_add(bytes))
    })
}

fn calibrate(
    calibrator: &mut dyn Int8Calibrator,
    input: &str,
    expected: &OptimizationProfile,
    logger: &Logger,
) -> Result<CalibrationTable, CompileError> {
    if let Some(table) = calibrator.read_calibration_table() {
        logger.info(&format!("Reusing calibration table for '{}'", table.model));
        return Ok(table);
    }
    if calibrator.batch_dims() != &expected.opt {
        return Err(CompileError::Compilation(format!(
            "calibration batches are {} but the profile expects {}",
            calibrator.batch_dims(),
            expected.opt
        )));
    }

    let mut batches = 0usize;
    let mut abs_max = 0f32;
    while let Some(batch) = calibrator.next_batch() {
        let batch_max = batch.iter().fold(0f32, |m, v| m.max(v.abs()));
        abs_max = abs_max.max(batch_max);
        batches += 1;
    }
    if batches == 0 {
        return Err(CompileError::Compilation(
            "INT8 calibration received no batches".into(),
        ));
    }
    logger.verbose(&format!("calibrated on {batches} batches, |x|max = {abs_max}"));

    let mut table = CalibrationTable::new(calibrator.model_name());
    let scale = if abs_max > 0.0 { abs_max / INT8_RANGE } else { 1.0 / INT8_RANGE };
    table.insert(input, scale);
    calibrator.write_calibration_table(&table)?;
    Ok(table)
}
