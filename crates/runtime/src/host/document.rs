// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The host plan format.
//!
//! ```text
//! ┌────────┬──────────────┬──────────────────────────┐
//! │ "DRTP" │ version: u32 │ PlanDocument (JSON body) │
//! │ 4 B    │ 4 B, LE      │ rest of file             │
//! └────────┴──────────────┴──────────────────────────┘
//! ```

use crate::{IoTensor, RuntimeError};
use network_ir::PluginSpec;
use plan_compiler::{CalibrationTable, OptimizationProfile, Precision, SerializedPlan};

pub const PLAN_MAGIC: [u8; 4] = *b"DRTP";
pub const PLAN_FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 8;

/// A plugin layer as recorded in the plan.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PluginRecord {
    pub layer: String,
    pub spec: PluginSpec,
}

/// Everything the host runtime needs to recreate an engine.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PlanDocument {
    pub network: String,
    pub precision: Precision,
    /// Inputs first, then outputs in marking order.
    pub io: Vec<IoTensor>,
    pub profiles: Vec<OptimizationProfile>,
    pub plugins: Vec<PluginRecord>,
    pub num_layers: usize,
    pub workspace_bytes: usize,
    #[serde(default)]
    pub calibration: Option<CalibrationTable>,
}

impl PlanDocument {
    pub fn encode(&self) -> Result<SerializedPlan, serde_json::Error> {
        let body = serde_json::to_vec(self)?;
        let mut bytes = Vec::with_capacity(HEADER_LEN + body.len());
        bytes.extend_from_slice(&PLAN_MAGIC);
        bytes.extend_from_slice(&PLAN_FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&body);
        Ok(SerializedPlan::from_bytes(bytes))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, RuntimeError> {
        if bytes.len() < HEADER_LEN {
            return Err(RuntimeError::Deserialization(format!(
                "plan is {} bytes, shorter than its header",
                bytes.len()
            )));
        }
        let (header, body) = bytes.split_at(HEADER_LEN);
        if header[..4] != PLAN_MAGIC {
            return Err(RuntimeError::Deserialization("bad plan magic".into()));
        }
        let version = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if version != PLAN_FORMAT_VERSION {
            return Err(RuntimeError::Deserialization(format!(
                "unsupported plan version {version} (expected {PLAN_FORMAT_VERSION})"
            )));
        }
        let doc: Self = serde_json::from_slice(body)
            .map_err(|e| RuntimeError::Deserialization(format!("malformed plan body: {e}")))?;
        doc.validate()?;
        Ok(doc)
    }

    /// Structural checks a loaded plan must pass before an engine is
    /// handed out.
    fn validate(&self) -> Result<(), RuntimeError> {
        let bad = |msg: String| Err(RuntimeError::Deserialization(msg));
        let Some(input) = self.io.first() else {
            return bad("plan has no I/O tensors".into());
        };
        if !input.is_input() || input.dims.rank() != 4 {
            return bad(format!("I/O tensor 0 must be an NCHW input, got {input}"));
        }
        match self.io.get(1) {
            Some(t) if !t.is_input() && t.dims.rank() >= 2 => {}
            _ => return bad("I/O tensor 1 must be an output of rank >= 2".into()),
        }
        match self.profiles.first() {
            Some(p) if p.is_valid() && p.input == input.name => Ok(()),
            Some(p) => bad(format!("profile 0 for '{}' is inconsistent", p.input)),
            None => bad("plan has no optimization profile".into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TensorIoMode;
    use plan_compiler::BatchRange;
    use tensor_core::{DType, Dims, TensorDesc};

    fn doc() -> PlanDocument {
        let input = TensorDesc::new("images", Dims::nchw(-1, 3, 8, 8), DType::F32);
        let profile = OptimizationProfile::for_input(&input, BatchRange { min: 1, opt: 1, max: 2 }).unwrap();
        PlanDocument {
            network: "tiny".into(),
            precision: Precision::Fp32,
            io: vec![
                IoTensor {
                    name: "images".into(),
                    dims: input.dims.clone(),
                    dtype: DType::F32,
                    mode: TensorIoMode::Input,
                },
                IoTensor {
                    name: "scores".into(),
                    dims: Dims::new(vec![-1, 10]),
                    dtype: DType::F32,
                    mode: TensorIoMode::Output,
                },
            ],
            profiles: vec![profile],
            plugins: Vec::new(),
            num_layers: 0,
            workspace_bytes: 0,
            calibration: None,
        }
    }

    #[test]
    fn test_encode_header() {
        let plan = doc().encode().unwrap();
        assert_eq!(&plan.as_bytes()[..4], b"DRTP");
        assert_eq!(&plan.as_bytes()[4..8], &1u32.to_le_bytes());
        assert_eq!(PlanDocument::decode(plan.as_bytes()).unwrap(), doc());
    }

    #[test]
    fn test_decode_rejects_bad_headers() {
        let mut bytes = doc().encode().unwrap().into_bytes();
        assert!(matches!(PlanDocument::decode(&bytes[..3]), Err(RuntimeError::Deserialization(_))));

        bytes[4] = 9;
        let err = PlanDocument::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("unsupported plan version 9"));

        bytes[0] = b'X';
        let err = PlanDocument::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("magic"));
    }

    #[test]
    fn test_decode_rejects_malformed_body() {
        let mut bytes = PLAN_MAGIC.to_vec();
        bytes.extend_from_slice(&PLAN_FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(b"{not json");
        let err = PlanDocument::decode(&bytes).unwrap_err();
        assert!(err.to_string().contains("malformed plan body"));
    }

    #[test]
    fn test_decode_rejects_missing_outputs() {
        let mut d = doc();
        d.io.truncate(1);
        let bytes = d.encode().unwrap();
        assert!(PlanDocument::decode(bytes.as_bytes()).is_err());
    }
}
