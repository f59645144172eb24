//! Registry of named test cases.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use ymut_core::ResultBag;

/// Signature of a registered test case: input bag in, result bag out.
pub type TestCaseFn = fn(&ResultBag) -> Result<ResultBag, CaseFailure>;

/// A test case that gave up on its own, without panicking.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseFailure {
    pub message: String,
}

impl CaseFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for CaseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for CaseFailure {}

/// Why [`TestSuite::run_test_case`] produced no bag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    NotFound(String),
    Failed { case: String, message: String },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::NotFound(name) => write!(f, "Test case {} not found", name),
            RunError::Failed { message, .. } => f.write_str(message),
        }
    }
}

impl std::error::Error for RunError {}

struct TestCase {
    name: String,
    run: TestCaseFn,
}

/// The set of test cases a component exposes, in registration order.
pub struct TestSuite {
    name: String,
    cases: Vec<TestCase>,
}

impl TestSuite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cases: Vec::new(),
        }
    }

    /// Register a test case. Registering a name twice replaces the earlier function.
    pub fn case(mut self, name: impl Into<String>, run: TestCaseFn) -> Self {
        let name = name.into();
        if let Some(existing) = self.cases.iter_mut().find(|c| c.name == name) {
            existing.run = run;
        } else {
            self.cases.push(TestCase { name, run });
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn test_case_names(&self) -> Vec<String> {
        self.cases.iter().map(|c| c.name.clone()).collect()
    }

    /// Run one test case. Panics inside the case are captured and reported as [`RunError::Failed`].
    pub fn run_test_case(&self, name: &str, input: &ResultBag) -> Result<ResultBag, RunError> {
        let case = self
            .cases
            .iter()
            .find(|c| c.name == name)
            .ok_or_else(|| RunError::NotFound(name.to_string()))?;

        match panic::catch_unwind(AssertUnwindSafe(|| (case.run)(input))) {
            Ok(Ok(bag)) => Ok(bag),
            Ok(Err(failure)) => Err(RunError::Failed {
                case: name.to_string(),
                message: failure.message,
            }),
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::debug!(suite = %self.name, case = name, "test case panicked: {message}");
                Err(RunError::Failed {
                    case: name.to_string(),
                    message,
                })
            }
        }
    }

    /// Run every registered case with an empty input bag.
    pub fn run_all_test_cases(&self) -> BTreeMap<String, Result<ResultBag, RunError>> {
        let empty = ResultBag::new();
        self.cases
            .iter()
            .map(|c| (c.name.clone(), self.run_test_case(&c.name, &empty)))
            .collect()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "test case panicked".to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn open_close(_: &ResultBag) -> Result<ResultBag, CaseFailure> {
        Ok(ResultBag::new().with("IsOpen", true).with("IsClosed", true))
    }

    fn echo(input: &ResultBag) -> Result<ResultBag, CaseFailure> {
        Ok(input.clone())
    }

    fn gives_up(_: &ResultBag) -> Result<ResultBag, CaseFailure> {
        Err(CaseFailure::new("device not ready"))
    }

    fn explodes(_: &ResultBag) -> Result<ResultBag, CaseFailure> {
        panic!("index out of range")
    }

    fn suite() -> TestSuite {
        TestSuite::new("Sample")
            .case("OpenClose", open_close)
            .case("Echo", echo)
            .case("GivesUp", gives_up)
            .case("Explodes", explodes)
    }

    #[test]
    fn test_unknown_case_is_not_found() {
        let err = suite().run_test_case("Nope", &ResultBag::new()).unwrap_err();
        assert_eq!(err, RunError::NotFound("Nope".to_string()));
        assert_eq!(err.to_string(), "Test case Nope not found");
    }

    #[test]
    fn test_input_reaches_the_case() {
        let input = ResultBag::new().with("Seed", 7);
        assert_eq!(suite().run_test_case("Echo", &input).unwrap(), input);
    }

    #[test]
    fn test_failures_and_panics_are_captured() {
        let s = suite();
        let failed = s.run_test_case("GivesUp", &ResultBag::new()).unwrap_err();
        assert_eq!(failed.to_string(), "device not ready");

        let panicked = s.run_test_case("Explodes", &ResultBag::new()).unwrap_err();
        assert!(matches!(panicked, RunError::Failed { ref message, .. } if message == "index out of range"));
    }

    #[test]
    fn test_run_all_keeps_every_case() {
        let all = suite().run_all_test_cases();
        assert_eq!(all.len(), 4);
        assert!(all["OpenClose"].is_ok());
        assert!(all["Explodes"].is_err());
    }

    #[test]
    fn test_reregistering_replaces() {
        let s = TestSuite::new("S").case("A", gives_up).case("A", open_close);
        assert_eq!(s.test_case_names(), vec!["A"]);
        assert!(s.run_test_case("A", &ResultBag::new()).is_ok());
    }
}
