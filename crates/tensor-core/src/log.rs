// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Severity-filtered diagnostics sink.
//!
//! The backend reports messages with a [`Severity`]. A [`Logger`] created
//! with `verbose = false` drops `Info` and `Verbose` messages and forwards
//! everything else to `tracing`. The logger is a plain value handed to the
//! compiler and runtime constructors.

/// Severity of a backend diagnostic, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    /// An internal backend invariant was violated.
    InternalError,
    /// An operation failed.
    Error,
    /// Something suspicious that does not stop the operation.
    Warning,
    /// Progress and informational messages.
    Info,
    /// Detailed tracing output.
    Verbose,
}

impl Severity {
    /// Returns a short label for this severity.
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::InternalError => "internal-error",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Verbose => "verbose",
        }
    }
}

/// Line-oriented diagnostics sink with a verbosity switch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Logger {
    verbose: bool,
}

impl Logger {
    /// Creates a logger. Non-verbose loggers suppress `Info` and `Verbose`.
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Returns `true` if this logger forwards `Info` and `Verbose` messages.
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }

    /// Returns `true` if a message of the given severity would be emitted.
    pub fn is_enabled(&self, severity: Severity) -> bool {
        self.verbose || !matches!(severity, Severity::Info | Severity::Verbose)
    }

    /// Emits one line at the given severity.
    pub fn log(&self, severity: Severity, msg: &str) {
        if !self.is_enabled(severity) {
            return;
        }
        match severity {
            Severity::InternalError | Severity::Error => tracing::error!("{msg}"),
            Severity::Warning => tracing::warn!("{msg}"),
            Severity::Info => tracing::info!("{msg}"),
            Severity::Verbose => tracing::debug!("{msg}"),
        }
    }

    pub fn error(&self, msg: &str) {
        self.log(Severity::Error, msg);
    }

    pub fn warning(&self, msg: &str) {
        self.log(Severity::Warning, msg);
    }

    pub fn info(&self, msg: &str) {
        self.log(Severity::Info, msg);
    }

    pub fn verbose(&self, msg: &str) {
        self.log(Severity::Verbose, msg);
    }
}
