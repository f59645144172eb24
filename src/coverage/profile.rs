//! Profile file layout and the LLVM coverage tools.

use std::fs;
use std::path::{Path, PathBuf};

use super::CoverageError;
use super::cache::{CACHE_FILE_NAME, CoverageCache};
use crate::harness::config::LIBRARY_DIR;
use crate::process::{self, RunOptions, ShellCommand};

/// Environment variable the LLVM profiling runtime reads its output path from.
pub const PROFILE_ENV_VAR: &str = "LLVM_PROFILE_FILE";
pub const PROFILES_DIR: &str = "profiles";
const RAW_EXTENSION: &str = "profraw";
const MERGED_EXTENSION: &str = "profdata";
const REPORT_SUFFIX: &str = "-covprofiles";

/// Where profiles, the cache and HTML reports live under a binary (build) directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileLayout {
    binary_dir: PathBuf,
}

impl ProfileLayout {
    pub fn new(binary_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary_dir: binary_dir.into(),
        }
    }

    pub fn binary_dir(&self) -> &Path {
        &self.binary_dir
    }

    pub fn profiles_dir(&self) -> PathBuf {
        self.binary_dir.join(PROFILES_DIR)
    }

    pub fn cache_path(&self) -> PathBuf {
        self.profiles_dir().join(CACHE_FILE_NAME)
    }

    /// `{binary_dir}/profiles/{stem}.profraw`
    pub fn raw_profile(&self, stem: &str) -> PathBuf {
        self.profiles_dir().join(format!("{stem}.{RAW_EXTENSION}"))
    }

    /// `{binary_dir}/profiles/{stem}.profdata`
    pub fn merged_profile(&self, stem: &str) -> PathBuf {
        self.profiles_dir().join(format!("{stem}.{MERGED_EXTENSION}"))
    }

    /// `{binary_dir}/profiles/{stem}-covprofiles`
    pub fn report_dir(&self, stem: &str) -> PathBuf {
        self.profiles_dir().join(format!("{stem}{REPORT_SUFFIX}"))
    }

    /// The instrumented library a report is rendered against.
    pub fn library_path(&self, library: &str) -> PathBuf {
        self.binary_dir.join(LIBRARY_DIR).join(library)
    }
}

/// What a child process should do with [`PROFILE_ENV_VAR`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileEnv {
    /// Write the raw profile to this path.
    Write(PathBuf),
    /// Make sure no inherited value leaks into the child.
    Disabled,
}

impl ProfileEnv {
    pub fn for_run(enabled: bool, layout: &ProfileLayout, stem: &str) -> Self {
        if enabled {
            ProfileEnv::Write(layout.raw_profile(stem))
        } else {
            ProfileEnv::Disabled
        }
    }

    pub fn apply(&self, options: RunOptions) -> RunOptions {
        match self {
            ProfileEnv::Write(path) => options.env(PROFILE_ENV_VAR, path.clone().into_os_string()),
            ProfileEnv::Disabled => options.env_remove(PROFILE_ENV_VAR),
        }
    }
}

// ============================================================================
// LLVM tools
// ============================================================================

/// `llvm-profdata` and `llvm-cov`, by program name or path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoverageTools {
    pub profdata: String,
    pub cov: String,
}

impl Default for CoverageTools {
    fn default() -> Self {
        Self {
            profdata: "llvm-profdata".to_string(),
            cov: "llvm-cov".to_string(),
        }
    }
}

impl CoverageTools {
    pub fn merge_command(&self, inputs: &[PathBuf], output: &Path) -> ShellCommand {
        ShellCommand::new(&self.profdata)
            .arg("merge")
            .args(inputs.iter().map(|p| p.display().to_string()))
            .arg(format!("-output={}", output.display()))
    }

    /// The first object is positional; further objects are passed with `-object=`.
    pub fn show_command(&self, objects: &[PathBuf], profdata: &Path, output_dir: &Path) -> ShellCommand {
        let mut command = ShellCommand::new(&self.cov).arg("show");
        for (i, object) in objects.iter().enumerate() {
            command = if i == 0 {
                command.arg(object.display().to_string())
            } else {
                command.arg(format!("-object={}", object.display()))
            };
        }
        command
            .arg(format!("-instr-profile={}", profdata.display()))
            .arg("-use-color")
            .arg("-format=html")
            .arg(format!("-output-dir={}", output_dir.display()))
    }

    fn run(&self, command: &ShellCommand, options: &RunOptions) -> Result<(), CoverageError> {
        let result = process::run_cmd_streaming(command, options, &mut |line| println!("{line}"))?;
        if result.success() {
            Ok(())
        } else {
            Err(CoverageError::ToolFailed {
                command: command.to_string(),
                code: result.code,
            })
        }
    }

    /// Merge raw profiles into one indexed profile.
    pub fn merge(&self, inputs: &[PathBuf], output: &Path, options: &RunOptions) -> Result<(), CoverageError> {
        self.run(&self.merge_command(inputs, output), options)
    }

    /// Render an HTML report covering `objects`.
    pub fn show(
        &self,
        objects: &[PathBuf],
        profdata: &Path,
        output_dir: &Path,
        options: &RunOptions,
    ) -> Result<(), CoverageError> {
        self.run(&self.show_command(objects, profdata, output_dir), options)
    }
}

// ============================================================================
// Reports
// ============================================================================

/// Render the report for one suite run from its raw profile. Returns the report directory.
#[tracing::instrument(skip_all, fields(suite = %stem, library = %library))]
pub fn report_suite(
    layout: &ProfileLayout,
    tools: &CoverageTools,
    stem: &str,
    library: &str,
    options: &RunOptions,
) -> Result<PathBuf, CoverageError> {
    let raw = layout.raw_profile(stem);
    if !raw.is_file() {
        return Err(CoverageError::NoProfiles {
            library: library.to_string(),
        });
    }
    let merged = layout.merged_profile(stem);
    tools.merge(&[raw], &merged, options)?;
    let report = layout.report_dir(stem);
    tools.show(&[layout.library_path(library)], &merged, &report, options)?;
    tracing::info!(report = %report.display(), "coverage report written");
    Ok(report)
}

/// Merge every cached profile for `library` into one report, then delete the profile files.
#[tracing::instrument(skip_all, fields(library = %library))]
pub fn report_library(
    layout: &ProfileLayout,
    tools: &CoverageTools,
    library: &str,
    options: &RunOptions,
) -> Result<PathBuf, CoverageError> {
    let cache = CoverageCache::load(&layout.cache_path())?;
    let recorded = cache.profiles(library).unwrap_or_default();
    let mut inputs = Vec::new();
    for profile in recorded {
        let path = PathBuf::from(profile);
        if path.is_file() {
            inputs.push(path);
        } else {
            tracing::warn!(profile = %path.display(), "cached profile no longer exists, skipping");
        }
    }
    if inputs.is_empty() {
        return Err(CoverageError::NoProfiles {
            library: library.to_string(),
        });
    }

    let merged = layout.merged_profile(library);
    tools.merge(&inputs, &merged, options)?;
    let report = layout.report_dir(library);
    tools.show(&[layout.library_path(library)], &merged, &report, options)?;

    let removed = clean_profiles(&layout.profiles_dir())?;
    tracing::info!(report = %report.display(), removed, "merged coverage report written");
    Ok(report)
}

/// Delete `*.profraw` and `*.profdata` files directly inside `dir`. Returns how many were removed.
pub fn clean_profiles(dir: &Path) -> Result<usize, CoverageError> {
    let entries = fs::read_dir(dir).map_err(|source| CoverageError::io(dir, source))?;
    let mut removed = 0;
    for entry in entries {
        let path = entry.map_err(|source| CoverageError::io(dir, source))?.path();
        let is_profile = path
            .extension()
            .is_some_and(|ext| ext == RAW_EXTENSION || ext == MERGED_EXTENSION);
        if is_profile && path.is_file() {
            fs::remove_file(&path).map_err(|source| CoverageError::io(&path, source))?;
            removed += 1;
        }
    }
    Ok(removed)
}
