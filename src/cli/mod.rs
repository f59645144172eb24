//! CLI module for the ymut harness
//!
//! ## Commands
//!
//! - `build` - Configure and build the unit-test tree with CMake, optionally running suites
//! - `suite` - Load one component and run its test cases
//! - `unittest` - Run one suite in a child process, with optional coverage (called from CMake)
//! - `merge-cov` - Merge every cached coverage profile of a library into one report
//! - `new` - Write a `testsuite.json` skeleton
//!
//! ## Modules
//!
//! - `commands` - Command implementations
//! - `scaffold` - Manifest skeletons for `new`
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;
pub mod scaffold;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use miette::Diagnostic;

use crate::version::YMUT_VERSION;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }

    /// Render a diagnostic (code, message, help) as a failure.
    pub fn diagnostic<E>(error: E) -> Self
    where
        E: Diagnostic + Send + Sync + 'static,
    {
        Self::failure(format!("{:?}", miette::Report::new(error)))
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Unit-test harness for natively built components
#[derive(Parser, Debug)]
#[command(name = "ymut")]
#[command(version = YMUT_VERSION)]
#[command(about = "Unit-test harness for natively built components", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// `TRUE` / `FALSE` switch as passed by CMake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "UPPER")]
pub enum Toggle {
    True,
    False,
}

impl Toggle {
    pub fn enabled(self) -> bool {
        self == Toggle::True
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Configure and build unit-test libraries with CMake (run from the unittest directory)
    Build {
        /// Target to build: `all`, a dotted suite name or a dotted prefix
        #[arg(short = 't', long, default_value = "all")]
        target: String,
        /// Library file (under customlibs/) to render coverage against; `all` covers every built suite
        #[arg(short = 'o', long, default_value = "all")]
        object: String,
        /// Build instrumented libraries into covbuild/
        #[arg(short = 'c', long)]
        cov: bool,
        /// Remove the build directory and configure from scratch
        #[arg(short = 'f', long)]
        reconfigure: bool,
        /// Run the selected suites after building
        #[arg(short = 'r', long)]
        run: bool,
        /// Kill any single external command after this many seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },

    /// Run the test cases of one suite
    Suite {
        /// Dotted suite name (ym.common.random) or path to a testsuite.json
        #[arg(value_name = "SUITE")]
        suite: Option<String>,
        /// Unit-test root (default: nearest `unittests` ancestor of the working directory)
        #[arg(long = "unittestdir", value_name = "DIR")]
        unittest_dir: Option<PathBuf>,
        /// Project root (default: parent of the unit-test root)
        #[arg(long = "projrootdir", value_name = "DIR")]
        project_root: Option<PathBuf>,
        /// Build tree holding customlibs/ (default: <unittestdir>/build)
        #[arg(long = "builddir", value_name = "DIR")]
        build_dir: Option<PathBuf>,
        /// Path of the code under test, relative to the project root
        #[arg(long, conflicts_with = "suite", requires = "filename")]
        filepath: Option<String>,
        /// File stem of the code under test
        #[arg(long, conflicts_with = "suite", requires = "filepath")]
        filename: Option<String>,
        /// Run only this case (repeatable)
        #[arg(long = "case", value_name = "NAME")]
        cases: Vec<String>,
        /// List each case as it runs
        #[arg(short = 'v', long = "verbosity")]
        verbose: bool,
        /// Print the suite summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Run one suite in a child process, optionally collecting coverage
    Unittest {
        #[arg(long = "unittestdir", value_name = "DIR")]
        unittest_dir: PathBuf,
        /// Build tree holding customlibs/ and profiles/
        #[arg(long = "binarydir", value_name = "DIR")]
        binary_dir: PathBuf,
        /// Dotted suite name
        #[arg(long = "suitename", value_name = "NAME")]
        suite_name: String,
        /// Library file the suite exercises
        #[arg(long = "libraryname", value_name = "FILE")]
        library_name: String,
        #[arg(long = "covenabled", value_enum, ignore_case = true)]
        cov_enabled: Toggle,
        /// Kill any single external command after this many seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },

    /// Merge all cached coverage profiles of a library into one HTML report
    MergeCov {
        #[arg(long = "binarydir", value_name = "DIR")]
        binary_dir: PathBuf,
        #[arg(long = "libraryname", value_name = "FILE")]
        library_name: String,
    },

    /// Write a testsuite.json skeleton for a new suite
    New {
        /// Unit-test root (default: nearest `unittests` ancestor of the working directory)
        #[arg(long = "unittestdir", value_name = "DIR")]
        unittest_dir: Option<PathBuf>,
        #[arg(long)]
        filepath: String,
        #[arg(long)]
        filename: String,
    },
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            process::exit(usage_exit_code(&e).0);
        }
    };

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Exit code for an argument-parsing outcome: help and version requests succeed, all misuse is a failure.
pub fn usage_exit_code(error: &clap::Error) -> ExitCode {
    match error.kind() {
        clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    }
}

/// Execute the CLI command and return result.
pub fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Build {
            target,
            object,
            cov,
            reconfigure,
            run,
            timeout,
        } => commands::build(&commands::BuildArgs {
            target,
            object,
            cov,
            reconfigure,
            run,
            timeout: timeout.map(std::time::Duration::from_secs),
        }),
        Command::Suite {
            suite,
            unittest_dir,
            project_root,
            build_dir,
            filepath,
            filename,
            cases,
            verbose,
            json,
        } => commands::run_suite(&commands::SuiteArgs {
            suite,
            unittest_dir,
            project_root,
            build_dir,
            filepath,
            filename,
            cases,
            verbose,
            json,
        }),
        Command::Unittest {
            unittest_dir,
            binary_dir,
            suite_name,
            library_name,
            cov_enabled,
            timeout,
        } => commands::run_unittest(&commands::UnittestArgs {
            unittest_dir,
            binary_dir,
            suite_name,
            library_name,
            coverage: cov_enabled.enabled(),
            timeout: timeout.map(std::time::Duration::from_secs),
        }),
        Command::MergeCov {
            binary_dir,
            library_name,
        } => commands::merge_coverage(&binary_dir, &library_name),
        Command::New {
            unittest_dir,
            filepath,
            filename,
        } => scaffold::new_suite(unittest_dir, &filepath, &filename),
    }
}

// ============================================================================
// Tests
// ============================================================================
