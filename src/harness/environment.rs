//! Search paths and preprocessor defines registered for loaded components.
//!
//! Registration is idempotent: adding a path or define that is already present changes nothing, so loading the same
//! suite twice leaves the environment as it was after the first load.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::config::{HarnessPaths, SuiteConfig};
use super::error::HarnessError;

/// Defines CMake adds for shared-library export macros. They describe the build, not the code under test.
const EXPORTS_SUFFIX: &str = "_EXPORTS";
/// Source file every suite is compiled from.
const SUITE_SOURCE: &str = "testsuite.cpp";

/// One `-D` preprocessor definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Define {
    pub name: String,
    pub value: Option<String>,
}

impl Define {
    /// Parse a `-DNAME` / `-DNAME=value` compiler argument. Export-macro defines are skipped.
    pub fn parse(arg: &str) -> Option<Define> {
        let body = arg.strip_prefix("-D")?;
        let (name, value) = match body.split_once('=') {
            Some((name, value)) => (name, Some(value.to_string())),
            None => (body, None),
        };
        if name.is_empty() || name.ends_with(EXPORTS_SUFFIX) {
            return None;
        }
        Some(Define {
            name: name.to_string(),
            value,
        })
    }
}

impl fmt::Display for Define {
    /// Renders as a preprocessor directive.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "#define {} {}", self.name, value),
            None => write!(f, "#define {}", self.name),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompileCommand {
    file: String,
    #[serde(default)]
    command: Option<String>,
    #[serde(default)]
    arguments: Vec<String>,
}

impl CompileCommand {
    fn args(&self) -> Vec<&str> {
        match &self.command {
            Some(command) => command.split_whitespace().collect(),
            None => self.arguments.iter().map(String::as_str).collect(),
        }
    }
}

/// Extract the defines used to compile `{filename}/testsuite.cpp` from a compile database.
pub fn defines_from_compile_commands(json: &str, filename: &str) -> Result<Vec<Define>, serde_json::Error> {
    let commands: Vec<CompileCommand> = serde_json::from_str(json)?;
    let suffix = Path::new(filename).join(SUITE_SOURCE);
    let mut defines: Vec<Define> = Vec::new();
    for entry in commands.iter().filter(|c| Path::new(&c.file).ends_with(&suffix)) {
        for define in entry.args().into_iter().filter_map(Define::parse) {
            if !defines.contains(&define) {
                defines.push(define);
            }
        }
    }
    Ok(defines)
}

/// Everything the host registered before loading components.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HostEnvironment {
    include_paths: Vec<PathBuf>,
    library_paths: Vec<PathBuf>,
    defines: Vec<Define>,
}

impl HostEnvironment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the path was not registered yet.
    pub fn add_include_path(&mut self, path: impl Into<PathBuf>) -> bool {
        push_unique(&mut self.include_paths, path.into())
    }

    /// Returns `true` if the path was not registered yet.
    pub fn add_library_path(&mut self, path: impl Into<PathBuf>) -> bool {
        push_unique(&mut self.library_paths, path.into())
    }

    /// Returns `true` if the define was not registered yet.
    pub fn add_define(&mut self, define: Define) -> bool {
        push_unique(&mut self.defines, define)
    }

    pub fn include_paths(&self) -> &[PathBuf] {
        &self.include_paths
    }

    pub fn library_paths(&self) -> &[PathBuf] {
        &self.library_paths
    }

    pub fn defines(&self) -> &[Define] {
        &self.defines
    }

    /// Register the search paths and defines one suite needs.
    ///
    /// Include paths: the shared `common` directory, the suite directory and the source directory under test.
    /// Library path: the build tree's library directory. Defines come from `compile_commands.json`; a build tree
    /// without one contributes none.
    #[tracing::instrument(skip_all, fields(suite = %config.target_name()))]
    pub fn register_suite(&mut self, paths: &HarnessPaths, config: &SuiteConfig) -> Result<(), HarnessError> {
        self.add_include_path(paths.common_dir());
        self.add_include_path(config.suite_dir(paths));
        self.add_include_path(config.source_dir(paths));
        self.add_library_path(paths.library_dir());

        let database = paths.compile_commands();
        let json = match fs::read_to_string(&database) {
            Ok(json) => json,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(path = %database.display(), "no compile database, skipping defines");
                return Ok(());
            }
            Err(source) => return Err(HarnessError::io(database, source)),
        };
        let defines = defines_from_compile_commands(&json, config.filename())
            .map_err(|source| HarnessError::Json { path: database, source })?;
        for define in defines {
            if self.add_define(define.clone()) {
                tracing::debug!(define = %define, "registered define");
            }
        }
        Ok(())
    }

    /// First existing `file_name` in the registered library paths, in registration order.
    pub fn resolve_library(&self, file_name: &str) -> Option<PathBuf> {
        self.library_paths
            .iter()
            .map(|dir| dir.join(file_name))
            .find(|candidate| candidate.is_file())
    }
}

fn push_unique<T: PartialEq>(items: &mut Vec<T>, item: T) -> bool {
    if items.contains(&item) {
        false
    } else {
        items.push(item);
        true
    }
}
