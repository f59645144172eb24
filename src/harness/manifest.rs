//! `testsuite.json` manifests.
//!
//! A manifest declares a suite's identity and, optionally, its cases with input bags and checks:
//!
//! ```json
//! {
//!    "filepath": "ym/common",
//!    "filename": "random",
//!    "cases": [
//!       {
//!          "name": "ZerosAndOnes",
//!          "input": {"NBits": 4096},
//!          "checks": [
//!             {"assert": "true", "key": "IsOpen"},
//!             {"assert": "equal", "key": "Val_int32", "expected": -2147483648, "message": "min int32"}
//!          ]
//!       }
//!    ]
//! }
//! ```
//!
//! A manifest without cases runs every case the component exports, with only the shared preconditions.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use ymut_core::ResultBag;

use super::config::SuiteConfig;
use super::error::HarnessError;
use super::verify::Check;

pub const MANIFEST_FILE: &str = "testsuite.json";

/// One declared test case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "ResultBag::is_empty")]
    pub input: ResultBag,
    #[serde(default)]
    pub checks: Vec<Check>,
}

impl CaseDefinition {
    /// A case with no input and only the shared preconditions.
    pub fn bare(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            input: ResultBag::new(),
            checks: Vec::new(),
        }
    }
}

/// A suite ready to run: identity, selection and declared cases.
#[derive(Debug, Clone, PartialEq)]
pub struct SuiteDefinition {
    pub config: SuiteConfig,
    pub cases: Vec<CaseDefinition>,
}

impl SuiteDefinition {
    pub fn new(config: SuiteConfig, cases: Vec<CaseDefinition>) -> Self {
        Self { config, cases }
    }
}

/// On-disk form of a suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteManifest {
    pub filepath: String,
    pub filename: String,
    #[serde(default)]
    pub cases: Vec<CaseDefinition>,
}

impl SuiteManifest {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load(path: &Path) -> Result<Self, HarnessError> {
        let json = fs::read_to_string(path).map_err(|source| HarnessError::io(path, source))?;
        let manifest = Self::from_json(&json).map_err(|source| HarnessError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Case names must be unique.
    pub fn validate(&self) -> Result<(), HarnessError> {
        let mut seen = HashSet::new();
        for case in &self.cases {
            if !seen.insert(case.name.as_str()) {
                return Err(HarnessError::config(format!(
                    "test case `{}` declared twice in suite {}/{}",
                    case.name, self.filepath, self.filename
                )));
            }
        }
        Ok(())
    }

    pub fn config(&self) -> SuiteConfig {
        SuiteConfig::new(&self.filepath, &self.filename)
    }

    /// Combine with a case selection. Selected names the manifest does not declare still run, bare.
    pub fn into_definition(self, selected: Vec<String>) -> SuiteDefinition {
        let config = self.config().with_selection(selected);
        SuiteDefinition::new(config, self.cases)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ymut_core::Value;

    const RANDOM: &str = r#"{"filepath":"ym/common","filename":"random","cases":[{"name":"ZerosAndOnes","input":{"NBits":4096},"checks":[{"assert":"true","key":"IsOpen"},{"assert":"equal","key":"Val_int32","expected":-2147483648,"message":"min int32"},{"assert":"false","key":"IsClosed"}]}]}"#;

    #[test]
    fn test_parse_full_manifest() {
        let manifest = SuiteManifest::from_json(RANDOM).unwrap();
        assert_eq!(manifest.config().target_name(), "ym.common.random");
        assert_eq!(manifest.cases.len(), 1);
        let case = &manifest.cases[0];
        assert_eq!(case.input.get("NBits"), Some(&Value::Int(4096)));
        assert_eq!(case.checks.len(), 3);
        assert_eq!(case.checks[2].key(), "IsClosed");
    }

    #[test]
    fn test_cases_are_optional() {
        let manifest = SuiteManifest::from_json(r#"{"filepath":"ym","filename":"x"}"#).unwrap();
        assert!(manifest.cases.is_empty());
        let case: CaseDefinition = serde_json::from_str(r#"{"name":"A"}"#).unwrap();
        assert_eq!(case, CaseDefinition::bare("A"));
    }

    #[test]
    fn test_duplicate_case_names_rejected() {
        let manifest =
            SuiteManifest::from_json(r#"{"filepath":"ym","filename":"x","cases":[{"name":"A"},{"name":"A"}]}"#)
                .unwrap();
        let err = manifest.validate().unwrap_err();
        assert!(err.to_string().contains("declared twice"));
    }

    #[test]
    fn test_load_reports_bad_json_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(MANIFEST_FILE);
        fs::write(&path, "{not json").unwrap();
        let err = SuiteManifest::load(&path).unwrap_err();
        assert!(matches!(err, HarnessError::Json { .. }));
        assert!(err.to_string().contains("testsuite.json"));
    }

    #[test]
    fn test_selection_flows_into_definition() {
        let definition = SuiteManifest::from_json(RANDOM)
            .unwrap()
            .into_definition(vec!["Other".to_string()]);
        assert_eq!(definition.config.selected(), Some(&["Other".to_string()][..]));
    }
}
