//! Suite discovery and dotted target selection.
//!
//! Every directory under the unittest root that holds a `testsuite.json` is a suite; its target name is the
//! directory's relative path with `/` replaced by `.` (`ym/common/random` → `ym.common.random`).

use std::fs;
use std::path::{Path, PathBuf};

use crate::build::{BUILD_DIR, COV_BUILD_DIR};
use crate::harness::HarnessError;
use crate::harness::manifest::MANIFEST_FILE;

/// Target name selecting every suite.
pub const ALL_TARGET: &str = "all";

/// One discovered suite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteEntry {
    pub target: String,
    pub dir: PathBuf,
}

impl SuiteEntry {
    pub fn manifest(&self) -> PathBuf {
        self.dir.join(MANIFEST_FILE)
    }
}

/// All suites under one unittest root, sorted by target name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetTree {
    suites: Vec<SuiteEntry>,
}

impl TargetTree {
    pub fn discover(root: &Path) -> Self {
        let mut suites = Vec::new();
        collect_suites(root, root, &mut suites);
        suites.sort_by(|a, b| a.target.cmp(&b.target));
        Self { suites }
    }

    pub fn suites(&self) -> &[SuiteEntry] {
        &self.suites
    }

    /// Resolve `target`: `all`, an exact suite, or a dotted prefix naming a subtree.
    pub fn select(&self, target: &str) -> Result<Vec<&SuiteEntry>, HarnessError> {
        if target == ALL_TARGET {
            return Ok(self.suites.iter().collect());
        }
        let prefix = format!("{target}.");
        let selected: Vec<&SuiteEntry> = self
            .suites
            .iter()
            .filter(|s| s.target == target || s.target.starts_with(&prefix))
            .collect();
        if selected.is_empty() {
            return Err(HarnessError::config(format!("unknown target `{target}`")));
        }
        Ok(selected)
    }
}

fn collect_suites(root: &Path, dir: &Path, out: &mut Vec<SuiteEntry>) {
    let Ok(entries) = fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if !name.starts_with('.') && name != "target" && name != BUILD_DIR && name != COV_BUILD_DIR {
                collect_suites(root, &path, out);
            }
        } else if path.file_name().is_some_and(|n| n == MANIFEST_FILE) {
            if let Some(target) = target_name(root, dir) {
                out.push(SuiteEntry {
                    target,
                    dir: dir.to_path_buf(),
                });
            }
        }
    }
}

fn target_name(root: &Path, dir: &Path) -> Option<String> {
    let relative = dir.strip_prefix(root).ok()?;
    let parts: Vec<&str> = relative.iter().filter_map(|p| p.to_str()).collect();
    if parts.is_empty() { None } else { Some(parts.join(".")) }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn tree() -> (tempfile::TempDir, TargetTree) {
        let dir = tempfile::tempdir().unwrap();
        for suite in ["ym/common/random", "ym/common/timer", "ym/hsm/hsm", "build/ym/stale", ".git/x"] {
            let suite_dir = dir.path().join(suite);
            fs::create_dir_all(&suite_dir).unwrap();
            fs::write(suite_dir.join(MANIFEST_FILE), "{}").unwrap();
        }
        // A directory without a manifest is not a suite.
        fs::create_dir_all(dir.path().join("ym/common/empty")).unwrap();
        let tree = TargetTree::discover(dir.path());
        (dir, tree)
    }

    fn names(entries: Vec<&SuiteEntry>) -> Vec<&str> {
        entries.into_iter().map(|e| e.target.as_str()).collect()
    }

    #[test]
    fn test_discovery_skips_build_and_hidden_dirs() {
        let (_dir, tree) = tree();
        let targets: Vec<&str> = tree.suites().iter().map(|s| s.target.as_str()).collect();
        assert_eq!(targets, vec!["ym.common.random", "ym.common.timer", "ym.hsm.hsm"]);
    }

    #[test]
    fn test_select_all_prefix_exact() {
        let (_dir, tree) = tree();
        assert_eq!(tree.select("all").unwrap().len(), 3);
        assert_eq!(names(tree.select("ym.common").unwrap()), vec!["ym.common.random", "ym.common.timer"]);
        assert_eq!(names(tree.select("ym.hsm.hsm").unwrap()), vec!["ym.hsm.hsm"]);
    }

    #[test]
    fn test_partial_segment_is_not_a_prefix() {
        let (_dir, tree) = tree();
        assert!(tree.select("ym.com").is_err());
        let err = tree.select("nope").unwrap_err();
        assert_eq!(err.to_string(), "ConfigError: unknown target `nope`");
    }
}
