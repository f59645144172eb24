//! Canonical error vocabulary shared by the harness and the component runtime.
//!
//! The harness prints these names in failure reports, so both sides of the ABI agree on the spelling.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The kinds of failure a suite run can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// The component library is missing, failed to link, or speaks another ABI version.
    LoadError,
    /// The component does not know the requested test case.
    NotFoundError,
    /// The test case raised (panicked or returned a failure status).
    ExecutionError,
    /// A result-bag expectation did not hold.
    AssertionError,
    /// Missing or inconsistent invocation arguments.
    ConfigError,
}

impl ErrorKind {
    pub const ALL: [ErrorKind; 5] = [
        ErrorKind::LoadError,
        ErrorKind::NotFoundError,
        ErrorKind::ExecutionError,
        ErrorKind::AssertionError,
        ErrorKind::ConfigError,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::LoadError => "LoadError",
            ErrorKind::NotFoundError => "NotFoundError",
            ErrorKind::ExecutionError => "ExecutionError",
            ErrorKind::AssertionError => "AssertionError",
            ErrorKind::ConfigError => "ConfigError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format a canonical `Kind: message` string.
pub fn error_string(kind: ErrorKind, msg: impl fmt::Display) -> String {
    format!("{}: {}", kind.as_str(), msg)
}
