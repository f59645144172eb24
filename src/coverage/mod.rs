//! Coverage profile collection.
//!
//! ## Modules
//!
//! - `cache` - `profiles/cache.json`: which raw profiles exercised which library
//! - `profile` - Profile file layout, `LLVM_PROFILE_FILE` handling and the `llvm-profdata` / `llvm-cov` steps

pub mod cache;
pub mod profile;

use std::io;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use crate::process::ProcessError;

pub use cache::{CACHE_FILE_NAME, CoverageCache, record_profile};
pub use profile::{
    CoverageTools, PROFILE_ENV_VAR, ProfileEnv, ProfileLayout, clean_profiles, report_library, report_suite,
};

#[derive(Debug, Error, Diagnostic)]
pub enum CoverageError {
    #[error("failed to access {}: {source}", path.display())]
    #[diagnostic(code(ymut::io))]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid coverage cache {}: {source}", path.display())]
    #[diagnostic(code(ymut::json))]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(ymut::process))]
    Process(#[from] ProcessError),

    #[error("'{command}' {}", describe_exit(*code))]
    #[diagnostic(code(ymut::process))]
    ToolFailed { command: String, code: Option<i32> },

    #[error("no coverage profiles recorded for {library}")]
    #[diagnostic(
        code(ymut::coverage),
        help("run the suite with coverage enabled first (`ymut unittest --covenabled TRUE ...`)")
    )]
    NoProfiles { library: String },
}

impl CoverageError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CoverageError::Io {
            path: path.into(),
            source,
        }
    }
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with code {code}"),
        None => "was terminated by a signal".to_string(),
    }
}
