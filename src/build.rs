//! CMake configure and build steps for the unit-test tree.
//!
//! ## Notes
//!
//! - Builds happen in `build/` (or `covbuild/` for instrumented builds) directly under the unittest directory,
//!   which must hold the top-level `CMakeLists.txt`.
//! - A missing build directory is configured even without `--reconfigure`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use thiserror::Error;
use ymut_core::ErrorKind;

use crate::process::{self, ProcessError, RunOptions, ShellCommand};

pub const BUILD_DIR: &str = "build";
pub const COV_BUILD_DIR: &str = "covbuild";
pub const BUILD_SCRIPT: &str = "CMakeLists.txt";
/// Cache variable that switches the CMake project to instrumented builds.
pub const COV_DEFINE: &str = "-DYM_COV_ENABLED=True";

#[derive(Debug, Error, Diagnostic)]
pub enum BuildError {
    #[error("{kind}: no {BUILD_SCRIPT} in {}", dir.display(), kind = ErrorKind::ConfigError)]
    #[diagnostic(code(ymut::config), help("run `ymut build` from the unittest directory"))]
    NotAUnittestDir { dir: PathBuf },

    #[error("failed to prepare {}: {source}", path.display())]
    #[diagnostic(code(ymut::io))]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(ymut::process))]
    Process(#[from] ProcessError),

    #[error("'{command}' failed (exit code {})", code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    #[diagnostic(code(ymut::process))]
    Failed { command: String, code: Option<i32> },
}

/// One configure-and-build request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildPlan {
    unittest_dir: PathBuf,
    target: String,
    coverage: bool,
    reconfigure: bool,
}

impl BuildPlan {
    /// Plan a build of `target` in `unittest_dir`, which must contain a `CMakeLists.txt`.
    pub fn new(unittest_dir: impl Into<PathBuf>, target: impl Into<String>) -> Result<Self, BuildError> {
        let unittest_dir = unittest_dir.into();
        if !unittest_dir.join(BUILD_SCRIPT).is_file() {
            return Err(BuildError::NotAUnittestDir { dir: unittest_dir });
        }
        Ok(Self {
            unittest_dir,
            target: target.into(),
            coverage: false,
            reconfigure: false,
        })
    }

    pub fn coverage(mut self, coverage: bool) -> Self {
        self.coverage = coverage;
        self
    }

    pub fn reconfigure(mut self, reconfigure: bool) -> Self {
        self.reconfigure = reconfigure;
        self
    }

    pub fn unittest_dir(&self) -> &Path {
        &self.unittest_dir
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn is_coverage(&self) -> bool {
        self.coverage
    }

    pub fn build_dir(&self) -> PathBuf {
        self.unittest_dir
            .join(if self.coverage { COV_BUILD_DIR } else { BUILD_DIR })
    }

    pub fn needs_configure(&self) -> bool {
        self.reconfigure || !self.build_dir().is_dir()
    }

    pub fn configure_command(&self) -> ShellCommand {
        let command = ShellCommand::new("cmake").arg("..");
        if self.coverage { command.arg(COV_DEFINE) } else { command }
    }

    pub fn build_command(&self) -> ShellCommand {
        ShellCommand::new("cmake")
            .args(["--build", ".", "--target"])
            .arg(&self.target)
    }

    /// Configure if needed, then build. Output lines go to `on_line`.
    #[tracing::instrument(skip_all, fields(target = %self.target, coverage = self.coverage))]
    pub fn execute(&self, options: &RunOptions, on_line: &mut dyn FnMut(&str)) -> Result<(), BuildError> {
        let build_dir = self.build_dir();
        let options = options.clone().in_dir(&build_dir);

        if self.needs_configure() {
            if build_dir.is_dir() {
                fs::remove_dir_all(&build_dir).map_err(|source| BuildError::Io {
                    path: build_dir.clone(),
                    source,
                })?;
            }
            fs::create_dir_all(&build_dir).map_err(|source| BuildError::Io {
                path: build_dir.clone(),
                source,
            })?;
            tracing::info!(dir = %build_dir.display(), "configuring");
            run_step(&self.configure_command(), &options, on_line)?;
        }

        run_step(&self.build_command(), &options, on_line)
    }
}

fn run_step(command: &ShellCommand, options: &RunOptions, on_line: &mut dyn FnMut(&str)) -> Result<(), BuildError> {
    let output = process::run_cmd_streaming(command, options, on_line)?;
    if output.success() {
        Ok(())
    } else {
        Err(BuildError::Failed {
            command: command.to_string(),
            code: output.code,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn unittest_dir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(BUILD_SCRIPT), "project(ut)\n").unwrap();
        dir
    }

    #[test]
    fn test_requires_cmake_lists() {
        let dir = tempfile::tempdir().unwrap();
        let err = BuildPlan::new(dir.path(), "all").unwrap_err();
        assert!(matches!(err, BuildError::NotAUnittestDir { .. }));
        assert!(err.to_string().starts_with("ConfigError"));
    }

    #[test]
    fn test_commands_and_dirs() {
        let dir = unittest_dir();
        let plan = BuildPlan::new(dir.path(), "ym.common").unwrap();
        assert_eq!(plan.build_dir(), dir.path().join("build"));
        assert_eq!(plan.configure_command().to_string(), "cmake ..");
        assert_eq!(plan.build_command().to_string(), "cmake --build . --target ym.common");

        let cov = plan.coverage(true);
        assert_eq!(cov.build_dir(), dir.path().join("covbuild"));
        assert_eq!(cov.configure_command().to_string(), "cmake .. -DYM_COV_ENABLED=True");
    }

    #[test]
    fn test_configure_only_when_needed() {
        let dir = unittest_dir();
        let plan = BuildPlan::new(dir.path(), "all").unwrap();
        assert!(plan.needs_configure());
        fs::create_dir(plan.build_dir()).unwrap();
        assert!(!plan.needs_configure());
        assert!(plan.reconfigure(true).needs_configure());
    }
}
