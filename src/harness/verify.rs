//! Result-bag expectations.
//!
//! The free functions check one key against one bag. [`Verifier`] applies them to the outcome of a test case and
//! collects every failure, after the two preconditions every case shares:
//!
//! 1. the invocation did not fail (`Unhandled exception in test case <name> - <error>`), and
//! 2. the bag is not empty (`Results is None`).
//!
//! Either precondition failing ends verification for that case.

use std::fmt;

use serde::{Deserialize, Serialize};
use ymut_core::{ErrorKind, ResultBag, Value};
use ymut_core::errors::error_string;

use super::error::HarnessError;

/// Message reported for an empty or absent result bag.
pub const RESULTS_IS_NONE: &str = "Results is None";

/// One expectation on a result bag, as written in a suite manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "assert", rename_all = "snake_case")]
pub enum Check {
    True {
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    False {
        key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    Equal {
        key: String,
        expected: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
}

impl Check {
    pub fn key(&self) -> &str {
        match self {
            Check::True { key, .. } | Check::False { key, .. } | Check::Equal { key, .. } => key,
        }
    }

    /// Apply this check to `bag`.
    pub fn apply(&self, bag: &ResultBag) -> Result<(), AssertionFailure> {
        match self {
            Check::True { key, message } => assert_key_true(bag, key, message.as_deref()),
            Check::False { key, message } => assert_key_false(bag, key, message.as_deref()),
            Check::Equal { key, expected, message } => assert_key_equal(bag, key, expected, message.as_deref()),
        }
    }
}

/// A failed expectation or precondition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionFailure {
    pub kind: ErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub message: String,
}

impl AssertionFailure {
    fn on_key(key: &str, detail: String, message: Option<&str>) -> Self {
        let message = match message {
            Some(extra) => format!("{detail} : {extra}"),
            None => detail,
        };
        Self {
            kind: ErrorKind::AssertionError,
            key: Some(key.to_string()),
            message,
        }
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&error_string(self.kind, &self.message))
    }
}

impl std::error::Error for AssertionFailure {}

fn lookup<'a>(bag: &'a ResultBag, key: &str, message: Option<&str>) -> Result<&'a Value, AssertionFailure> {
    bag.get(key)
        .ok_or_else(|| AssertionFailure::on_key(key, format!("key '{key}' missing from results"), message))
}

fn expect_bool(bag: &ResultBag, key: &str, wanted: bool, message: Option<&str>) -> Result<(), AssertionFailure> {
    let value = lookup(bag, key, message)?;
    match value.as_bool() {
        Some(actual) if actual == wanted => Ok(()),
        Some(actual) => Err(AssertionFailure::on_key(
            key,
            format!("key '{key}' is {actual}, expected {wanted}"),
            message,
        )),
        None => Err(AssertionFailure::on_key(
            key,
            format!("key '{key}' holds {} {value}, expected a bool", value.type_name()),
            message,
        )),
    }
}

/// The value under `key` is boolean `true`.
pub fn assert_key_true(bag: &ResultBag, key: &str, message: Option<&str>) -> Result<(), AssertionFailure> {
    expect_bool(bag, key, true, message)
}

/// The value under `key` is boolean `false`.
pub fn assert_key_false(bag: &ResultBag, key: &str, message: Option<&str>) -> Result<(), AssertionFailure> {
    expect_bool(bag, key, false, message)
}

/// The value under `key` equals `expected`, variant included (`Int(1)` is not `Float(1.0)`).
pub fn assert_key_equal(
    bag: &ResultBag,
    key: &str,
    expected: &Value,
    message: Option<&str>,
) -> Result<(), AssertionFailure> {
    let actual = lookup(bag, key, message)?;
    if actual == expected {
        return Ok(());
    }
    let detail = if actual.type_name() == expected.type_name() {
        format!("key '{key}': expected {expected}, got {actual}")
    } else {
        format!(
            "key '{key}': expected {} {expected}, got {} {actual}",
            expected.type_name(),
            actual.type_name()
        )
    };
    Err(AssertionFailure::on_key(key, detail, message))
}

// ============================================================================
// Verifier
// ============================================================================

/// Collects the failures of one test case.
#[derive(Debug)]
pub struct Verifier<'a> {
    bag: Option<&'a ResultBag>,
    failures: Vec<AssertionFailure>,
}

impl<'a> Verifier<'a> {
    /// Start verifying the outcome of `case`, applying both preconditions.
    pub fn new(case: &str, outcome: Result<&'a ResultBag, &HarnessError>) -> Self {
        match outcome {
            Err(error) => Self {
                bag: None,
                failures: vec![AssertionFailure {
                    kind: error.kind(),
                    key: None,
                    message: format!("Unhandled exception in test case {case} - {error}"),
                }],
            },
            Ok(bag) if bag.is_empty() => Self {
                bag: None,
                failures: vec![AssertionFailure {
                    kind: ErrorKind::AssertionError,
                    key: None,
                    message: RESULTS_IS_NONE.to_string(),
                }],
            },
            Ok(bag) => Self {
                bag: Some(bag),
                failures: Vec::new(),
            },
        }
    }

    /// The bag, if both preconditions held.
    pub fn results(&self) -> Option<&'a ResultBag> {
        self.bag
    }

    pub fn check(&mut self, check: &Check) -> &mut Self {
        if let Some(bag) = self.bag {
            if let Err(failure) = check.apply(bag) {
                self.failures.push(failure);
            }
        }
        self
    }

    pub fn assert_key_true(&mut self, key: &str, message: Option<&str>) -> &mut Self {
        self.check(&Check::True {
            key: key.to_string(),
            message: message.map(str::to_string),
        })
    }

    pub fn assert_key_false(&mut self, key: &str, message: Option<&str>) -> &mut Self {
        self.check(&Check::False {
            key: key.to_string(),
            message: message.map(str::to_string),
        })
    }

    pub fn assert_key_equal(&mut self, key: &str, expected: impl Into<Value>, message: Option<&str>) -> &mut Self {
        self.check(&Check::Equal {
            key: key.to_string(),
            expected: expected.into(),
            message: message.map(str::to_string),
        })
    }

    pub fn failures(&self) -> &[AssertionFailure] {
        &self.failures
    }

    pub fn finish(self) -> Vec<AssertionFailure> {
        self.failures
    }
}
