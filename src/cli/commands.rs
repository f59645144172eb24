//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::build::BuildPlan;
use crate::coverage::{self, CoverageTools, ProfileEnv, ProfileLayout};
use crate::harness::{
    ConsoleReporter, HarnessError, HarnessPaths, SuiteConfig, SuiteDefinition, SuiteManifest, SuiteRunner,
};
use crate::process::{self, RunOptions, ShellCommand};
use crate::targets::{ALL_TARGET, TargetTree};

use super::{CliError, CliResult, ExitCode};

fn current_dir() -> CliResult<PathBuf> {
    env::current_dir().map_err(|e| CliError::failure(format!("Error reading the working directory: {e}")))
}

fn exit_code(passed: bool) -> ExitCode {
    if passed { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

// ============================================================================
// suite
// ============================================================================

/// Arguments of `ymut suite`.
#[derive(Debug, Clone, Default)]
pub struct SuiteArgs {
    pub suite: Option<String>,
    pub unittest_dir: Option<PathBuf>,
    pub project_root: Option<PathBuf>,
    pub build_dir: Option<PathBuf>,
    pub filepath: Option<String>,
    pub filename: Option<String>,
    pub cases: Vec<String>,
    pub verbose: bool,
    pub json: bool,
}

/// Split a dotted suite name into `(filepath, filename)`: `ym.common.random` → `("ym/common", "random")`.
pub fn split_target(target: &str) -> Result<(String, String), HarnessError> {
    let target = target.trim_matches('.');
    if target.is_empty() {
        return Err(HarnessError::config("empty suite name"));
    }
    Ok(match target.rsplit_once('.') {
        Some((path, name)) => (path.replace('.', "/"), name.to_string()),
        None => (String::new(), target.to_string()),
    })
}

/// Work out which suite `args` names and load its manifest when there is one.
///
/// A suite without a `testsuite.json` runs every case its component exports.
pub fn resolve_suite(paths: &HarnessPaths, args: &SuiteArgs) -> Result<SuiteDefinition, HarnessError> {
    let config = match (&args.suite, &args.filepath, &args.filename) {
        (Some(suite), _, _) => {
            let as_path = Path::new(suite);
            if as_path.is_file() {
                return Ok(SuiteManifest::load(as_path)?.into_definition(args.cases.clone()));
            }
            let (filepath, filename) = split_target(suite)?;
            SuiteConfig::new(filepath, filename)
        }
        (None, Some(filepath), Some(filename)) => SuiteConfig::new(filepath, filename),
        _ => {
            return Err(HarnessError::config(
                "name a SUITE or pass both --filepath and --filename",
            ));
        }
    };
    config.validate()?;

    let manifest_path = config.manifest_path(paths);
    if manifest_path.is_file() {
        Ok(SuiteManifest::load(&manifest_path)?.into_definition(args.cases.clone()))
    } else {
        tracing::debug!(manifest = %manifest_path.display(), "no manifest, running every exported case");
        Ok(SuiteDefinition::new(config.with_selection(args.cases.clone()), Vec::new()))
    }
}

/// Run one suite in this process.
pub fn run_suite(args: &SuiteArgs) -> CliResult<ExitCode> {
    let cwd = current_dir()?;
    let paths = HarnessPaths::discover(
        &cwd,
        args.unittest_dir.clone(),
        args.project_root.clone(),
        args.build_dir.clone(),
    )
    .map_err(CliError::diagnostic)?;
    let definition = resolve_suite(&paths, args).map_err(CliError::diagnostic)?;

    let mut runner = SuiteRunner::new(paths);
    let mut reporter = ConsoleReporter::new(args.verbose);
    let summary = runner.run_suite(&definition, &mut reporter);

    if args.json {
        let json = serde_json::to_string_pretty(&summary)
            .map_err(|e| CliError::failure(format!("Error serializing the summary: {e}")))?;
        println!("{json}");
    }
    Ok(exit_code(summary.all_passed()))
}

/// Run `ymut suite <suite>` in a child process so an instrumented library writes its profile on exit.
fn run_suite_child(
    suite: &str,
    paths: &HarnessPaths,
    profile: &ProfileEnv,
    options: &RunOptions,
) -> CliResult<bool> {
    let exe = env::current_exe().map_err(|e| CliError::failure(format!("Error locating the ymut executable: {e}")))?;
    let command = ShellCommand::new(exe.display().to_string())
        .arg("suite")
        .arg(suite)
        .arg("--unittestdir")
        .arg(paths.unittest_dir().display().to_string())
        .arg("--projrootdir")
        .arg(paths.project_root().display().to_string())
        .arg("--builddir")
        .arg(paths.build_dir().display().to_string());
    let options = profile.apply(options.clone().in_dir(paths.unittest_dir()));
    let output = process::run_cmd_streaming(&command, &options, &mut |line| println!("{line}"))
        .map_err(|e| CliError::failure(format!("Error: {e}")))?;
    Ok(output.success())
}

fn parent_of(dir: &Path) -> CliResult<PathBuf> {
    dir.parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| CliError::failure(format!("Error: {} has no parent directory", dir.display())))
}

// ============================================================================
// unittest
// ============================================================================

/// Arguments of `ymut unittest`.
#[derive(Debug, Clone)]
pub struct UnittestArgs {
    pub unittest_dir: PathBuf,
    pub binary_dir: PathBuf,
    pub suite_name: String,
    pub library_name: String,
    pub coverage: bool,
    pub timeout: Option<Duration>,
}

/// Run one suite in a child process and, with coverage on, record and render its profile.
#[tracing::instrument(skip_all, fields(suite = %args.suite_name, coverage = args.coverage))]
pub fn run_unittest(args: &UnittestArgs) -> CliResult<ExitCode> {
    let layout = ProfileLayout::new(&args.binary_dir);
    let profile = ProfileEnv::for_run(args.coverage, &layout, &args.suite_name);
    if let ProfileEnv::Write(path) = &profile {
        coverage::record_profile(&layout.cache_path(), &args.library_name, &path.display().to_string())
            .map_err(CliError::diagnostic)?;
    }

    let paths = HarnessPaths::new(&args.unittest_dir, parent_of(&args.unittest_dir)?, &args.binary_dir);
    let options = RunOptions::new().timeout(args.timeout);
    let passed = run_suite_child(&args.suite_name, &paths, &profile, &options)?;

    if args.coverage {
        coverage::report_suite(
            &layout,
            &CoverageTools::default(),
            &args.suite_name,
            &args.library_name,
            &options,
        )
        .map_err(CliError::diagnostic)?;
    }
    Ok(exit_code(passed))
}

// ============================================================================
// merge-cov
// ============================================================================

pub fn merge_coverage(binary_dir: &Path, library_name: &str) -> CliResult<ExitCode> {
    let layout = ProfileLayout::new(binary_dir);
    let report = coverage::report_library(&layout, &CoverageTools::default(), library_name, &RunOptions::new())
        .map_err(CliError::diagnostic)?;
    println!("{}", report.display());
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// build
// ============================================================================

/// Arguments of `ymut build`.
#[derive(Debug, Clone)]
pub struct BuildArgs {
    pub target: String,
    pub object: String,
    pub cov: bool,
    pub reconfigure: bool,
    pub run: bool,
    pub timeout: Option<Duration>,
}

/// Configure and build from the working directory, then optionally run the selected suites.
pub fn build(args: &BuildArgs) -> CliResult<ExitCode> {
    let cwd = current_dir()?;
    let plan = BuildPlan::new(&cwd, &args.target)
        .map_err(CliError::diagnostic)?
        .coverage(args.cov)
        .reconfigure(args.reconfigure);
    let options = RunOptions::new().timeout(args.timeout);
    plan.execute(&options, &mut |line| println!("{line}"))
        .map_err(CliError::diagnostic)?;

    if !args.run {
        return Ok(ExitCode::SUCCESS);
    }

    let tree = TargetTree::discover(&cwd);
    let selected = tree.select(&args.target).map_err(CliError::diagnostic)?;
    let build_dir = plan.build_dir();
    let paths = HarnessPaths::new(&cwd, parent_of(&cwd)?, &build_dir);
    let layout = ProfileLayout::new(&build_dir);

    let mut all_passed = true;
    let mut raw_profiles = Vec::new();
    let mut objects = Vec::new();
    for entry in selected {
        let (filepath, filename) = split_target(&entry.target).map_err(CliError::diagnostic)?;
        let library = SuiteConfig::new(filepath, filename).library_file_name();
        let profile = ProfileEnv::for_run(args.cov, &layout, &entry.target);

        if !run_suite_child(&entry.target, &paths, &profile, &options)? {
            all_passed = false;
        }
        if let ProfileEnv::Write(path) = &profile {
            if path.is_file() {
                coverage::record_profile(&layout.cache_path(), &library, &path.display().to_string())
                    .map_err(CliError::diagnostic)?;
                raw_profiles.push(path.clone());
            } else {
                tracing::warn!(profile = %path.display(), "suite wrote no coverage profile");
            }
        }
        objects.push(layout.library_path(&library));
    }

    if args.cov && !raw_profiles.is_empty() {
        let tools = CoverageTools::default();
        let merged = layout.merged_profile(&args.target);
        tools.merge(&raw_profiles, &merged, &options).map_err(CliError::diagnostic)?;
        let objects = if args.object == ALL_TARGET {
            objects
        } else {
            vec![layout.library_path(&args.object)]
        };
        let report = layout.report_dir(&args.target);
        tools.show(&objects, &merged, &report, &options).map_err(CliError::diagnostic)?;
        println!("coverage report: {}", report.display());
    }

    Ok(exit_code(all_passed))
}
