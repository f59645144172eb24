//! Locations and suite identity.
//!
//! A suite is named by a path inside the project (`filepath`, e.g. `ym/common`) and a file stem (`filename`, e.g.
//! `random`). Everything else is derived from those two strings and the three harness roots:
//!
//! | what                 | where                                                              |
//! |----------------------|--------------------------------------------------------------------|
//! | suite sources        | `{unittest_dir}/{filepath}/{filename}/`                            |
//! | suite manifest       | `{unittest_dir}/{filepath}/{filename}/testsuite.json`              |
//! | component library    | `{build_dir}/customlibs/{prefix}{filepath.dotted}.{filename}-unittest{suffix}` |
//! | compile database     | `{build_dir}/compile_commands.json`                                |

use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::{Path, PathBuf};

use super::error::HarnessError;
use super::manifest::MANIFEST_FILE;

/// Directory (inside the build tree) holding the built component libraries.
pub const LIBRARY_DIR: &str = "customlibs";
/// Shared sources available to every suite.
pub const COMMON_DIR: &str = "common";
/// The directory name a unit-test tree is recognised by.
pub const UNITTEST_DIR_NAME: &str = "unittests";
/// CMake's compile database.
pub const COMPILE_COMMANDS: &str = "compile_commands.json";

/// The three roots a harness run works against. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessPaths {
    unittest_dir: PathBuf,
    project_root: PathBuf,
    build_dir: PathBuf,
}

impl HarnessPaths {
    pub fn new(
        unittest_dir: impl Into<PathBuf>,
        project_root: impl Into<PathBuf>,
        build_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            unittest_dir: unittest_dir.into(),
            project_root: project_root.into(),
            build_dir: build_dir.into(),
        }
    }

    /// Derive the roots from a working directory somewhere inside a `unittests` tree.
    ///
    /// Explicit `project_root` / `build_dir` values win; otherwise the project root is the parent of the
    /// `unittests` directory and the build tree is `unittests/build`.
    pub fn discover(
        cwd: &Path,
        unittest_dir: Option<PathBuf>,
        project_root: Option<PathBuf>,
        build_dir: Option<PathBuf>,
    ) -> Result<Self, HarnessError> {
        let unittest_dir = match unittest_dir {
            Some(dir) => dir,
            None => find_unittest_root(cwd).ok_or_else(|| {
                HarnessError::config(format!(
                    "--unittestdir not given and {} is not inside a `{UNITTEST_DIR_NAME}` directory",
                    cwd.display()
                ))
            })?,
        };
        let project_root = match project_root {
            Some(dir) => dir,
            None => unittest_dir.parent().map(Path::to_path_buf).ok_or_else(|| {
                HarnessError::config(format!(
                    "--projrootdir not given and {} has no parent directory",
                    unittest_dir.display()
                ))
            })?,
        };
        let build_dir = build_dir.unwrap_or_else(|| unittest_dir.join("build"));
        Ok(Self::new(unittest_dir, project_root, build_dir))
    }

    pub fn unittest_dir(&self) -> &Path {
        &self.unittest_dir
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn library_dir(&self) -> PathBuf {
        self.build_dir.join(LIBRARY_DIR)
    }

    pub fn common_dir(&self) -> PathBuf {
        self.unittest_dir.join(COMMON_DIR)
    }

    pub fn compile_commands(&self) -> PathBuf {
        self.build_dir.join(COMPILE_COMMANDS)
    }
}

fn find_unittest_root(cwd: &Path) -> Option<PathBuf> {
    cwd.ancestors()
        .find(|dir| dir.file_name().is_some_and(|name| name == UNITTEST_DIR_NAME))
        .map(Path::to_path_buf)
}

/// Identity of one suite plus the optional subset of cases to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteConfig {
    filepath: String,
    filename: String,
    selected: Option<Vec<String>>,
}

impl SuiteConfig {
    pub fn new(filepath: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            filepath: normalize_filepath(&filepath.into()),
            filename: filename.into(),
            selected: None,
        }
    }

    /// Restrict the run to `names`. An empty list keeps the full suite.
    pub fn with_selection(mut self, names: Vec<String>) -> Self {
        self.selected = if names.is_empty() { None } else { Some(names) };
        self
    }

    /// Reject identities that cannot name a library.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.filename.trim().is_empty() {
            return Err(HarnessError::config("suite filename is empty"));
        }
        if self.filename.contains('/') || self.filename.contains('\\') {
            return Err(HarnessError::config(format!(
                "suite filename `{}` must be a bare file stem",
                self.filename
            )));
        }
        Ok(())
    }

    pub fn filepath(&self) -> &str {
        &self.filepath
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn selected(&self) -> Option<&[String]> {
        self.selected.as_deref()
    }

    /// Dotted suite name, e.g. `ym.common.random`.
    pub fn target_name(&self) -> String {
        if self.filepath.is_empty() {
            self.filename.clone()
        } else {
            format!("{}.{}", self.filepath.replace('/', "."), self.filename)
        }
    }

    /// Library stem, e.g. `ym.common.random-unittest`.
    pub fn library_stem(&self) -> String {
        format!("{}-unittest", self.target_name())
    }

    /// Platform file name of the component library, e.g. `libym.common.random-unittest.so`.
    pub fn library_file_name(&self) -> String {
        format!("{DLL_PREFIX}{}{DLL_SUFFIX}", self.library_stem())
    }

    pub fn suite_dir(&self, paths: &HarnessPaths) -> PathBuf {
        paths.unittest_dir().join(&self.filepath).join(&self.filename)
    }

    pub fn manifest_path(&self, paths: &HarnessPaths) -> PathBuf {
        self.suite_dir(paths).join(MANIFEST_FILE)
    }

    /// Directory of the code under test.
    pub fn source_dir(&self, paths: &HarnessPaths) -> PathBuf {
        paths.project_root().join(&self.filepath)
    }
}

fn normalize_filepath(raw: &str) -> String {
    raw.replace('\\', "/").trim_matches('/').to_string()
}
