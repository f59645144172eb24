#![deny(unsafe_code)]
//! ymut: unit-test harness for natively built components
//!
//! A component is a shared library that exports its test cases over a fixed C ABI (see [`ymut_core::abi`]). The
//! harness loads it, runs the cases, verifies each result bag and reports per-case outcomes. Around that core sit the
//! CMake build driver, the coverage profile cache and the `ymut` CLI.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **Component panics**: A panic inside a test case is caught on the component side and arrives as an
//!   `ExecutionError` for that case only.
//!
//! ## Unsafe code
//!
//! Only `harness::loader` may use `unsafe`, to call through the component ABI.

pub mod build;
pub mod cli;
pub mod coverage;
pub mod harness;
pub mod json;
pub mod process;
pub mod targets;
pub mod version;

pub use harness::{
    AssertionFailure, ComponentHandle, ComponentLoader, HarnessError, HarnessPaths, SuiteConfig, SuiteDefinition,
    SuiteManifest, SuiteRunner, SuiteSummary, Verifier,
};
pub use ymut_core::{ErrorKind, ResultBag, Value};

pub use coverage::{CoverageCache, CoverageError};
pub use process::{CommandOutput, ProcessError, RunOptions, ShellCommand, run_cmd};
