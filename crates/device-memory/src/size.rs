// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Workspace size limits and parsing.

use crate::MemoryError;
use std::fmt;
use std::str::FromStr;

const KB: usize = 1024;
const MB: usize = 1024 * KB;
const GB: usize = 1024 * MB;

/// A byte limit for device memory.
///
/// Serialized as a plain byte count; parsed from human-readable strings with
/// binary suffixes:
/// - `"512M"` / `"512MB"` → 512 × 1024² bytes
/// - `"1G"` / `"1GB"` → 1024³ bytes
/// - `"64K"` / `"64KB"` → 64 × 1024 bytes
/// - `"1073741824"` → raw byte count
///
/// # Examples
/// ```
/// use device_memory::WorkspaceSize;
///
/// let w: WorkspaceSize = "1G".parse().unwrap();
/// assert_eq!(w.as_mb(), 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct WorkspaceSize {
    bytes: usize,
}

impl WorkspaceSize {
    pub fn from_bytes(bytes: usize) -> Self {
        Self { bytes }
    }

    pub fn from_mb(mb: usize) -> Self {
        Self { bytes: mb * MB }
    }

    pub fn from_gb(gb: usize) -> Self {
        Self { bytes: gb * GB }
    }

    pub fn as_bytes(&self) -> usize {
        self.bytes
    }

    /// Returns the size in megabytes (truncated).
    pub fn as_mb(&self) -> usize {
        self.bytes / MB
    }

    /// Parses a human-readable size string. Case-insensitive; zero is
    /// rejected.
    pub fn parse(s: &str) -> Result<Self, MemoryError> {
        let trimmed = s.trim();
        let invalid = |reason: &str| MemoryError::InvalidSize {
            input: s.to_string(),
            reason: reason.to_string(),
        };
        if trimmed.is_empty() {
            return Err(invalid("empty string"));
        }

        let upper = trimmed.to_ascii_uppercase();
        let (digits, multiplier) = [("GB", GB), ("G", GB), ("MB", MB), ("M", MB), ("KB", KB), ("K", KB), ("B", 1)]
            .iter()
            .find_map(|(suffix, mult)| upper.strip_suffix(suffix).map(|rest| (rest, *mult)))
            .unwrap_or((upper.as_str(), 1));

        let value: usize = digits
            .trim()
            .parse()
            .map_err(|_| invalid("expected a number followed by an optional K, M or G suffix"))?;
        let bytes = value
            .checked_mul(multiplier)
            .ok_or_else(|| invalid("overflow"))?;
        if bytes == 0 {
            return Err(invalid("size must be non-zero"));
        }
        Ok(Self { bytes })
    }
}

impl Default for WorkspaceSize {
    /// 1 GB, the builder's default workspace cap.
    fn default() -> Self {
        Self::from_gb(1)
    }
}

impl FromStr for WorkspaceSize {
    type Err = MemoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for WorkspaceSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.bytes;
        if b >= GB && b % GB == 0 {
            write!(f, "{} GB", b / GB)
        } else if b >= MB && b % MB == 0 {
            write!(f, "{} MB", b / MB)
        } else if b >= KB && b % KB == 0 {
            write!(f, "{} KB", b / KB)
        } else {
            write!(f, "{b} B")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_suffixes() {
        assert_eq!(WorkspaceSize::parse("512M").unwrap().as_mb(), 512);
        assert_eq!(WorkspaceSize::parse("512mb").unwrap().as_mb(), 512);
        assert_eq!(WorkspaceSize::parse("2g").unwrap().as_mb(), 2048);
        assert_eq!(WorkspaceSize::parse("64K").unwrap().as_bytes(), 64 * 1024);
        assert_eq!(WorkspaceSize::parse("100B").unwrap().as_bytes(), 100);
        assert_eq!(WorkspaceSize::parse(" 1048576 ").unwrap().as_mb(), 1);
    }

    #[test]
    fn test_parse_invalid() {
        assert!(WorkspaceSize::parse("").is_err());
        assert!(WorkspaceSize::parse("lots").is_err());
        assert!(WorkspaceSize::parse("0M").is_err());
        assert!(WorkspaceSize::parse("99999999999999999999G").is_err());
    }

    #[test]
    fn test_from_str() {
        let w: WorkspaceSize = "256M".parse().unwrap();
        assert_eq!(w, WorkspaceSize::from_mb(256));
    }

    #[test]
    fn test_display() {
        assert_eq!(WorkspaceSize::from_gb(1).to_string(), "1 GB");
        assert_eq!(WorkspaceSize::from_mb(3).to_string(), "3 MB");
        assert_eq!(WorkspaceSize::from_bytes(2048).to_string(), "2 KB");
        assert_eq!(WorkspaceSize::from_bytes(10).to_string(), "10 B");
    }

    #[test]
    fn test_default_is_one_gb() {
        assert_eq!(WorkspaceSize::default().as_mb(), 1024);
    }

    #[test]
    fn test_serde_is_byte_count() {
        let json = serde_json::to_string(&WorkspaceSize::from_bytes(4096)).unwrap();
        assert_eq!(json, "4096");
    }
}
