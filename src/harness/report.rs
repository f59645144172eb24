//! Reporting suite progress and results.
//!
//! ## TestReporter Trait
//!
//! The runner only produces [`CaseReport`]s and a [`SuiteSummary`]; how they are shown is up to the reporter.
//! [`ConsoleReporter`] prints a compact or verbose listing to stderr, and [`SuiteSummary`] serializes to JSON for
//! machine consumers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::verify::AssertionFailure;

// ============================================================================
// Results
// ============================================================================

/// Outcome of one test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseReport {
    pub name: String,
    pub failures: Vec<AssertionFailure>,
    pub duration_ms: u64,
}

impl CaseReport {
    pub fn new(name: impl Into<String>, failures: Vec<AssertionFailure>, duration: Duration) -> Self {
        Self {
            name: name.into(),
            failures,
            duration_ms: u64::try_from(duration.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Outcome of one suite.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuiteSummary {
    pub suite: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub cases: Vec<CaseReport>,
}

impl SuiteSummary {
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            ..Self::default()
        }
    }

    pub fn record(&mut self, report: CaseReport) {
        self.total += 1;
        if report.passed() {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        self.cases.push(report);
    }

    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }

    pub fn failures(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases.iter().filter(|c| !c.passed())
    }
}

// ============================================================================
// Test Reporter Trait
// ============================================================================

/// Trait for reporting suite execution.
///
/// Implement this trait to customize output (JSON, TAP, etc.)
pub trait TestReporter {
    /// Called once the cases to run are known
    fn on_suite_start(&mut self, _suite: &str, _case_count: usize) {}

    /// Called before a case runs
    fn on_case_start(&mut self, _case: &str) {}

    /// Called when a case completes
    fn on_case_complete(&mut self, report: &CaseReport);

    /// Called when all cases have completed
    fn on_run_complete(&mut self, summary: &SuiteSummary);
}

/// Default console reporter
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    pub verbose: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

impl TestReporter for ConsoleReporter {
    fn on_suite_start(&mut self, suite: &str, case_count: usize) {
        if case_count == 0 {
            eprintln!("No test cases collected for {suite}");
        } else if self.verbose {
            eprintln!("\x1b[1m{suite}\x1b[0m: {case_count} case(s)");
        }
    }

    fn on_case_start(&mut self, case: &str) {
        if self.verbose {
            eprint!("{case} ... ");
        }
    }

    fn on_case_complete(&mut self, report: &CaseReport) {
        let status = match (report.passed(), self.verbose) {
            (true, true) => format!("\x1b[32mok\x1b[0m ({}ms)", report.duration_ms),
            (true, false) => "\x1b[32m.\x1b[0m".to_string(),
            (false, true) => format!("\x1b[31mFAIL\x1b[0m ({}ms)", report.duration_ms),
            (false, false) => "\x1b[31mF\x1b[0m".to_string(),
        };

        if self.verbose {
            eprintln!("{status}");
        } else {
            eprint!("{status}");
        }
    }

    fn on_run_complete(&mut self, summary: &SuiteSummary) {
        if !self.verbose {
            eprintln!();
        }

        for case in summary.failures() {
            eprintln!("======================================================================");
            eprintln!("\x1b[31mFAIL\x1b[0m: {} ({})", case.name, summary.suite);
            eprintln!("----------------------------------------------------------------------");
            for failure in &case.failures {
                eprintln!("{failure}");
            }
            eprintln!();
        }

        eprintln!("----------------------------------------------------------------------");
        eprintln!(
            "Ran {} test case(s) in {:.3}s",
            summary.total,
            Duration::from_millis(summary.duration_ms).as_secs_f64()
        );
        eprintln!();
        if summary.all_passed() {
            eprintln!("\x1b[32mOK\x1b[0m");
        } else {
            eprintln!("\x1b[31mFAILED\x1b[0m (failures={})", summary.failed);
        }
    }
}

/// Reporter that records nothing. Useful when only the summary matters.
#[derive(Debug, Default)]
pub struct SilentReporter;

impl TestReporter for SilentReporter {
    fn on_case_complete(&mut self, _report: &CaseReport) {}

    fn on_run_complete(&mut self, _summary: &SuiteSummary) {}
}
