//! Errors raised while loading components and running their test cases.

use std::io;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;
use ymut_core::ErrorKind;

/// Failure of a harness operation.
///
/// The `Display` form starts with the canonical kind name (`LoadError: ...`) so reports read the same whether the
/// failure came from the loader, the component or the invocation.
#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("{kind}: {message} ({})", path.display(), kind = ErrorKind::LoadError)]
    #[diagnostic(
        code(ymut::load),
        help("build the component first, e.g. `ymut build --target <dotted.suite>`")
    )]
    Load { path: PathBuf, message: String },

    #[error("{kind}: Test case {name} not found", kind = ErrorKind::NotFoundError)]
    #[diagnostic(code(ymut::not_found))]
    NotFound { name: String },

    #[error("{kind}: {message}", kind = ErrorKind::ExecutionError)]
    #[diagnostic(code(ymut::execution))]
    Execution { case: String, message: String },

    #[error("{kind}: {}", .0, kind = ErrorKind::ConfigError)]
    #[diagnostic(code(ymut::config))]
    Config(String),

    #[error("failed to access {}: {source}", path.display())]
    #[diagnostic(code(ymut::io))]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid JSON in {}: {source}", path.display())]
    #[diagnostic(code(ymut::json))]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl HarnessError {
    pub fn load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        HarnessError::Load {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        HarnessError::Config(message.into())
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        HarnessError::Io {
            path: path.into(),
            source,
        }
    }

    /// The canonical kind this error reports as.
    pub fn kind(&self) -> ErrorKind {
        match self {
            HarnessError::Load { .. } => ErrorKind::LoadError,
            HarnessError::NotFound { .. } => ErrorKind::NotFoundError,
            HarnessError::Execution { .. } => ErrorKind::ExecutionError,
            // A manifest or compile database that cannot be read is a configuration problem.
            HarnessError::Config(_) | HarnessError::Io { .. } | HarnessError::Json { .. } => ErrorKind::ConfigError,
        }
    }
}
