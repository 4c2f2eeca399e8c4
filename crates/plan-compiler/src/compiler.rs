// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The compilation pipeline.
//!
//! ```text
//! graph bytes ──► parse ──► profile ──► precision flags ──► calibrator?
//!                                                              │
//!       plan ◄── backend build ◄── decode / concat / NMS ◄─────┘
//! ```

use crate::{
    attach_detection_head, BatchStream, Builder, BuilderConfig, CompileError, CompileOptions,
    EntropyCalibrator, ImageStream, Int8Calibrator, OptimizationProfile, SerializedPlan,
};
use network_ir::{GraphError, GraphParser, JsonGraphParser};
use tensor_core::{Dims, Logger, TensorDesc};

/// Compiles detection graphs into serialized plans with a given backend.
///
/// # Example
/// ```ignore
/// let compiler = PlanCompiler::new(&backend, Logger::new(true));
/// let plan = compiler.compile(&std::fs::read("model.json")?, &options)?;
/// plan.write_to(Path::new("model.plan"))?;
/// ```
pub struct PlanCompiler<'b> {
    builder: &'b dyn Builder,
    parser: Box<dyn GraphParser>,
    logger: Logger,
}

impl<'b> PlanCompiler<'b> {
    /// Creates a compiler that imports JSON graph documents.
    pub fn new(builder: &'b dyn Builder, logger: Logger) -> Self {
        Self {
            builder,
            parser: Box::new(JsonGraphParser),
            logger,
        }
    }

    /// Replaces the graph parser.
    pub fn with_parser(mut self, parser: impl GraphParser + 'static) -> Self {
        self.parser = Box::new(parser);
        self
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Compiles a graph, calibrating from `options.calibration.images` when
    /// building for INT8.
    pub fn compile(&self, graph: &[u8], options: &CompileOptions) -> Result<SerializedPlan, CompileError> {
        let images = options.calibration.images.clone();
        self.compile_with(graph, options, move |batch, dims| {
            Box::new(ImageStream::new(batch, dims, images))
        })
    }

    /// Compiles a graph with a caller-supplied calibration stream.
    ///
    /// `make_stream` is called only for INT8 builds, with the `opt` batch
    /// size and the `opt` input shape.
    pub fn compile_with<F>(
        &self,
        graph: &[u8],
        options: &CompileOptions,
        make_stream: F,
    ) -> Result<SerializedPlan, CompileError>
    where
        F: FnOnce(usize, &Dims) -> Box<dyn BatchStream>,
    {
        let precision = options.precision;
        self.logger.info(&format!("Building {precision} core model..."));

        let network = self.parser.parse(graph).map_err(|e| self.fail(e.into()))?;
        let input = single_input(&network).map_err(|e| self.fail(e))?;
        let profile = self.profile(&input, options)?;
        let workspace = options.workspace().map_err(|e| self.fail(e))?;

        let mut config = BuilderConfig::new(workspace).with_precision(precision);
        config.add_profile(profile.clone());

        let mut calibrator = None;
        if precision.enables_int8() {
            let batch = profile.batch_range().opt;
            let stream = make_stream(batch, &profile.opt);
            let model_name = match options.calibration.model_name.as_str() {
                "" => network.name().to_string(),
                name => name.to_string(),
            };
            calibrator = Some(EntropyCalibrator::new(
                stream,
                model_name,
                options.calibration.table.clone(),
                self.logger,
            ));
            config.calibration_profile = Some(profile);
        }

        self.logger.info("Building accelerated plugins...");
        let network = attach_detection_head(network, &options.head_params()).map_err(|e| self.fail(e))?;
        self.logger.verbose(&network.to_string());

        self.logger.info("Applying optimizations and building plan...");
        let plan = self
            .builder
            .build_serialized(
                &network,
                &config,
                calibrator.as_mut().map(|c| c as &mut dyn Int8Calibrator),
                &self.logger,
            )
            .map_err(|e| self.fail(e))?;

        tracing::info!(
            backend = self.builder.name(),
            bytes = plan.len(),
            "compiled {}",
            network.name()
        );
        Ok(plan)
    }

    fn profile(&self, input: &TensorDesc, options: &CompileOptions) -> Result<OptimizationProfile, CompileError> {
        let profile = options
            .batch_range()
            .and_then(|range| OptimizationProfile::for_input(input, range))
            .map_err(|e| self.fail(e))?;
        if !profile.is_valid() {
            return Err(self.fail(CompileError::Profile(format!(
                "inconsistent profile for '{}': {} / {} / {}",
                profile.input, profile.min, profile.opt, profile.max
            ))));
        }
        Ok(profile)
    }

    fn fail(&self, err: CompileError) -> CompileError {
        self.logger.error(&err.to_string());
        err
    }
}

fn single_input(network: &network_ir::Network) -> Result<TensorDesc, CompileError> {
    match network.inputs() {
        [input] => Ok(network.tensor(*input).desc()),
        inputs => Err(GraphError::Contract(format!(
            "expected exactly one network input, found {}",
            inputs.len()
        ))
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CalibrationTable, FixedStream, Precision};
    use network_ir::{GraphDocument, Network};
    use std::cell::{Cell, RefCell};
    use tensor_core::DType;

    /// Records what it was asked to build; pulls every calibration batch.
    #[derive(Default)]
    struct RecordingBuilder {
        reject: bool,
        outputs: RefCell<Vec<String>>,
        config: RefCell<Option<BuilderConfig>>,
        batches_pulled: Cell<usize>,
        table_reused: Cell<bool>,
    }

    impl Builder for RecordingBuilder {
        fn name(&self) -> &str {
            "recording"
        }

        fn build_serialized(
            &self,
            network: &Network,
            config: &BuilderConfig,
            calibrator: Option<&mut dyn Int8Calibrator>,
            _logger: &Logger,
        ) -> Result<SerializedPlan, CompileError> {
            *self.outputs.borrow_mut() = network
                .outputs()
                .iter()
                .map(|&o| network.tensor(o).name.clone())
                .collect();
            *self.config.borrow_mut() = Some(config.clone());
            if let Some(cal) = calibrator {
                if cal.read_calibration_table().is_some() {
                    self.table_reused.set(true);
                } else {
                    while cal.next_batch().is_some() {
                        self.batches_pulled.set(self.batches_pulled.get() + 1);
                    }
                }
            }
            if self.reject {
                return Err(CompileError::Compilation("rejected".into()));
            }
            Ok(SerializedPlan::from_bytes(b"plan".to_vec()))
        }
    }

    fn graph() -> Vec<u8> {
        GraphDocument::new("toy")
            .input(TensorDesc::new("input", Dims::nchw(-1, 3, 64, 64), DType::F32))
            .node(
                "head",
                "Conv",
                &["input"],
                vec![
                    TensorDesc::new("cls_0", Dims::nchw(-1, 2, 8, 8), DType::F32),
                    TensorDesc::new("box_0", Dims::nchw(-1, 4, 8, 8), DType::F32),
                ],
            )
            .output("cls_0")
            .output("box_0")
            .to_json()
            .unwrap()
            .into_bytes()
    }

    fn options() -> CompileOptions {
        CompileOptions {
            dynamic_batch_opts: vec![1, 1, 4],
            top_n: 100,
            score_thresh: 0.3,
            anchors: vec![vec![1.0, 1.0, 2.0, 2.0]],
            detections_per_im: 50,
            workspace_size: "16M".into(),
            ..Default::default()
        }
    }

    fn stream_of(n: usize) -> impl FnOnce(usize, &Dims) -> Box<dyn BatchStream> {
        move |_: usize, dims: &Dims| -> Box<dyn BatchStream> {
            let len = dims.num_elements().unwrap();
            Box::new(FixedStream::new(dims.clone(), vec![vec![0.1; len]; n]))
        }
    }

    #[test]
    fn test_fp32_compile() {
        let builder = RecordingBuilder::default();
        let plan = PlanCompiler::new(&builder, Logger::default())
            .compile(&graph(), &options())
            .unwrap();
        assert_eq!(plan.as_bytes(), b"plan");
        assert_eq!(*builder.outputs.borrow(), ["scores", "boxes", "classes"]);

        let config = builder.config.borrow().clone().unwrap();
        assert!(!config.fp16 && !config.int8);
        assert_eq!(config.profiles.len(), 1);
        assert_eq!(config.profiles[0].max.as_slice(), &[4, 3, 64, 64]);
        assert!(config.calibration_profile.is_none());
    }

    #[test]
    fn test_fp16_flags() {
        let builder = RecordingBuilder::default();
        let opts = CompileOptions {
            precision: Precision::Fp16,
            ..options()
        };
        PlanCompiler::new(&builder, Logger::default())
            .compile(&graph(), &opts)
            .unwrap();
        let config = builder.config.borrow().clone().unwrap();
        assert!(config.fp16 && !config.int8);
    }

    #[test]
    fn test_int8_pulls_batches_without_table() {
        let dir = tempfile::tempdir().unwrap();
        let builder = RecordingBuilder::default();
        let mut opts = CompileOptions {
            precision: Precision::Int8,
            dynamic_batch_opts: vec![1, 2, 4],
            ..options()
        };
        opts.calibration.table = dir.path().join("toy.calib");

        PlanCompiler::new(&builder, Logger::default())
            .compile_with(&graph(), &opts, stream_of(3))
            .unwrap();
        assert_eq!(builder.batches_pulled.get(), 3);
        let config = builder.config.borrow().clone().unwrap();
        assert!(config.fp16 && config.int8);
        assert_eq!(
            config.calibration_profile.unwrap().opt.as_slice(),
            &[2, 3, 64, 64]
        );
    }

    #[test]
    fn test_int8_reuses_table_for_same_model() {
        let dir = tempfile::tempdir().unwrap();
        let table = dir.path().join("toy.calib");
        CalibrationTable::new("toy").write(&table).unwrap();

        let builder = RecordingBuilder::default();
        let mut opts = CompileOptions {
            precision: Precision::Int8,
            ..options()
        };
        opts.calibration.table = table;
        PlanCompiler::new(&builder, Logger::default())
            .compile_with(&graph(), &opts, stream_of(3))
            .unwrap();
        assert!(builder.table_reused.get());
        assert_eq!(builder.batches_pulled.get(), 0);
    }

    #[test]
    fn test_profile_errors_stop_before_backend() {
        for batch in [vec![2, 1, 4], vec![0, 1, 1], vec![1, 2]] {
            let builder = RecordingBuilder::default();
            let opts = CompileOptions {
                dynamic_batch_opts: batch,
                ..options()
            };
            let err = PlanCompiler::new(&builder, Logger::default())
                .compile(&graph(), &opts)
                .unwrap_err();
            assert!(matches!(err, CompileError::Profile(_)), "{err}");
            assert!(builder.config.borrow().is_none());
        }
    }

    #[test]
    fn test_graph_import_error() {
        let builder = RecordingBuilder::default();
        let err = PlanCompiler::new(&builder, Logger::default())
            .compile(b"{ not a graph", &options())
            .unwrap_err();
        assert!(matches!(err, CompileError::GraphImport(_)));
    }

    #[test]
    fn test_backend_rejection() {
        let builder = RecordingBuilder {
            reject: true,
            ..Default::default()
        };
        let err = PlanCompiler::new(&builder, Logger::default())
            .compile(&graph(), &options())
            .unwrap_err();
        assert!(matches!(err, CompileError::Compilation(_)));
    }

    #[test]
    fn test_two_inputs_rejected() {
        let json = GraphDocument::new("two")
            .input(TensorDesc::new("a", Dims::nchw(-1, 3, 8, 8), DType::F32))
            .input(TensorDesc::new("b", Dims::nchw(-1, 3, 8, 8), DType::F32))
            .output("a")
            .output("b")
            .to_json()
            .unwrap();
        let builder = RecordingBuilder::default();
        let err = PlanCompiler::new(&builder, Logger::default())
            .compile(json.as_bytes(), &options())
            .unwrap_err();
        assert!(matches!(err, CompileError::GraphImport(_)));
    }
}
