//! Suite runner and result verifier.
//!
//! ## Modules
//!
//! - `config` - Harness roots and suite identity (library naming rule)
//! - `environment` - Include/library search paths and compile defines
//! - `loader` - `dlopen`-based component loading behind the `ComponentHandle` trait
//! - `manifest` - `testsuite.json` parsing
//! - `verify` - Result-bag expectations and the shared preconditions
//! - `runner` - Per-case execution and suite summaries
//! - `report` - Reporter trait and console output
//!
//! ## Flow
//!
//! ```text
//! SuiteManifest ──► SuiteDefinition ──► SuiteRunner::run_suite
//!                                          │
//!                      ComponentLoader ◄───┤ (search paths, defines, dlopen, ABI check)
//!                                          │
//!                      run_test_case ──► Verifier ──► CaseReport ──► TestReporter
//! ```

pub mod config;
pub mod environment;
pub mod error;
#[allow(unsafe_code)]
pub mod loader;
pub mod manifest;
pub mod report;
pub mod runner;
pub mod verify;

pub use config::{HarnessPaths, SuiteConfig};
pub use environment::{Define, HostEnvironment};
pub use error::HarnessError;
pub use loader::{ComponentHandle, ComponentLoader, ComponentVTable, NativeComponent};
pub use manifest::{CaseDefinition, MANIFEST_FILE, SuiteDefinition, SuiteManifest};
pub use report::{CaseReport, ConsoleReporter, SilentReporter, SuiteSummary, TestReporter};
pub use runner::{SuiteRunner, execute_suite, run_test_case, verify_case};
pub use verify::{AssertionFailure, Check, Verifier, assert_key_equal, assert_key_false, assert_key_true};
