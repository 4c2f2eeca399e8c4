// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The compiled, serialized execution plan.

use crate::CompileError;
use std::io::Write;
use std::path::Path;

/// An opaque, versioned plan produced by a [`Builder`](crate::Builder).
///
/// Immutable once produced. The byte layout belongs to the backend that
/// built it.
#[derive(Clone, PartialEq, Eq)]
pub struct SerializedPlan {
    bytes: Vec<u8>,
}

impl SerializedPlan {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Writes the plan to `path`.
    ///
    /// The bytes go to a sibling temporary file that is renamed into place,
    /// so readers never observe a partially written plan.
    pub fn write_to(&self, path: &Path) -> Result<(), CompileError> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".partial");
        let tmp = std::path::PathBuf::from(tmp);

        let write = || -> std::io::Result<()> {
            let mut file = std::fs::File::create(&tmp)?;
            file.write_all(&self.bytes)?;
            file.sync_all()?;
            std::fs::rename(&tmp, path)
        };
        write().map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            CompileError::io(path, e)
        })?;
        tracing::info!("wrote {} byte plan to {}", self.len(), path.display());
        Ok(())
    }
}

impl std::fmt::Debug for SerializedPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializedPlan")
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_to() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.plan");
        let plan = SerializedPlan::from_bytes(vec![1, 2, 3]);
        plan.write_to(&path).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
        assert!(!dir.path().join("model.plan.partial").exists());
    }

    #[test]
    fn test_write_to_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no/such/dir/model.plan");
        let err = SerializedPlan::from_bytes(vec![0]).write_to(&path).unwrap_err();
        assert!(matches!(err, CompileError::Io { .. }));
    }

    #[test]
    fn test_debug_hides_bytes() {
        let plan = SerializedPlan::from_bytes(vec![7; 100]);
        assert_eq!(format!("{plan:?}"), "SerializedPlan { len: 100 }");
        assert_eq!(plan.len(), 100);
        assert!(!plan.is_empty());
    }
}
