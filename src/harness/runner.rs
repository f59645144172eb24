//! Suite execution.
//!
//! Every case runs on its own: a failing, panicking or unknown case is reported and the next case still runs. A
//! component that fails to load fails each case of the suite with the load error instead of aborting the run.

use std::sync::Arc;
use std::time::Instant;

use ymut_core::ResultBag;

use super::config::{HarnessPaths, SuiteConfig};
use super::error::HarnessError;
use super::loader::{ComponentHandle, ComponentLoader, NativeComponent};
use super::manifest::{CaseDefinition, SuiteDefinition};
use super::report::{CaseReport, SuiteSummary, TestReporter};
use super::verify::{AssertionFailure, Verifier};

/// Invoke one test case on a loaded component.
#[tracing::instrument(skip_all, fields(component = handle.name(), case = name))]
pub fn run_test_case(handle: &dyn ComponentHandle, name: &str, input: &ResultBag) -> Result<ResultBag, HarnessError> {
    let result = handle.invoke(name, input);
    match &result {
        Ok(bag) => tracing::debug!(keys = bag.len(), "test case returned"),
        Err(error) => tracing::debug!(%error, "test case failed"),
    }
    result
}

/// Apply the preconditions and a case's declared checks to its outcome.
pub fn verify_case(case: &CaseDefinition, outcome: Result<&ResultBag, &HarnessError>) -> Vec<AssertionFailure> {
    let mut verifier = Verifier::new(&case.name, outcome);
    for check in &case.checks {
        verifier.check(check);
    }
    verifier.finish()
}

/// Which cases a suite run covers, in order.
///
/// A selection wins over the manifest; selected names the manifest does not declare run bare. Without either, every
/// case the component exports runs bare. Without a component, a single case named after the suite carries the load
/// failure.
fn plan_cases(
    suite: &SuiteDefinition,
    handle: Result<&dyn ComponentHandle, &HarnessError>,
) -> Result<Vec<CaseDefinition>, HarnessError> {
    if let Some(selected) = suite.config.selected() {
        return Ok(selected
            .iter()
            .map(|name| {
                suite
                    .cases
                    .iter()
                    .find(|c| &c.name == name)
                    .cloned()
                    .unwrap_or_else(|| CaseDefinition::bare(name))
            })
            .collect());
    }
    if !suite.cases.is_empty() {
        return Ok(suite.cases.clone());
    }
    match handle {
        Ok(handle) => Ok(handle
            .test_case_names()?
            .into_iter()
            .map(CaseDefinition::bare)
            .collect()),
        Err(_) => Ok(vec![CaseDefinition::bare(suite.config.target_name())]),
    }
}

/// Run `suite` against an already loaded component (or the error that prevented loading it).
pub fn execute_suite(
    handle: Result<&dyn ComponentHandle, &HarnessError>,
    suite: &SuiteDefinition,
    reporter: &mut dyn TestReporter,
) -> SuiteSummary {
    let started = Instant::now();
    let suite_name = suite.config.target_name();
    let mut summary = SuiteSummary::new(&suite_name);

    let (cases, listing_error) = match plan_cases(suite, handle) {
        Ok(cases) => (cases, None),
        Err(error) => (vec![CaseDefinition::bare(&suite_name)], Some(error)),
    };
    reporter.on_suite_start(&suite_name, cases.len());

    for case in &cases {
        reporter.on_case_start(&case.name);
        let case_started = Instant::now();
        let failures = match (listing_error.as_ref(), handle) {
            (Some(error), _) => verify_case(case, Err(error)),
            (None, Err(error)) => verify_case(case, Err(error)),
            (None, Ok(handle)) => {
                let outcome = run_test_case(handle, &case.name, &case.input);
                verify_case(case, outcome.as_ref())
            }
        };
        let report = CaseReport::new(&case.name, failures, case_started.elapsed());
        reporter.on_case_complete(&report);
        summary.record(report);
    }

    summary.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    reporter.on_run_complete(&summary);
    summary
}

/// Loads components and runs suites against them.
pub struct SuiteRunner {
    loader: ComponentLoader,
}

impl SuiteRunner {
    pub fn new(paths: HarnessPaths) -> Self {
        Self {
            loader: ComponentLoader::new(paths),
        }
    }

    pub fn loader(&self) -> &ComponentLoader {
        &self.loader
    }

    /// Load (or reuse) the component for `config`.
    pub fn load_component(&mut self, config: &SuiteConfig) -> Result<Arc<NativeComponent>, HarnessError> {
        self.loader.load_component(config)
    }

    /// Load the component for `config` and invoke one of its cases.
    pub fn run_test_case(
        &mut self,
        config: &SuiteConfig,
        name: &str,
        input: &ResultBag,
    ) -> Result<ResultBag, HarnessError> {
        let component = self.load_component(config)?;
        run_test_case(component.as_ref(), name, input)
    }

    #[tracing::instrument(skip_all, fields(suite = %suite.config.target_name()))]
    pub fn run_suite(&mut self, suite: &SuiteDefinition, reporter: &mut dyn TestReporter) -> SuiteSummary {
        match self.loader.load_component(&suite.config) {
            Ok(component) => {
                let handle: &dyn ComponentHandle = component.as_ref();
                execute_suite(Ok(handle), suite, reporter)
            }
            Err(error) => {
                tracing::warn!(%error, "component failed to load");
                execute_suite(Err(&error), suite, reporter)
            }
        }
    }
}
