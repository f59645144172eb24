//! `ymut new`: suite manifest skeletons.

use std::path::{Path, PathBuf};

use crate::harness::{HarnessPaths, SuiteConfig, SuiteManifest};
use crate::json;

use super::{CliError, CliResult, ExitCode};

/// Skeleton manifest for a suite. No cases are declared, so every exported case runs.
pub fn skeleton(config: &SuiteConfig) -> SuiteManifest {
    SuiteManifest {
        filepath: config.filepath().to_string(),
        filename: config.filename().to_string(),
        cases: Vec::new(),
    }
}

/// Write the skeleton for `filepath`/`filename` under `root`. Refuses to overwrite an existing manifest.
pub fn write_skeleton(root: &Path, filepath: &str, filename: &str) -> CliResult<PathBuf> {
    let config = SuiteConfig::new(filepath, filename);
    config.validate().map_err(CliError::diagnostic)?;

    // Only the unit-test root matters for the manifest location.
    let paths = HarnessPaths::new(root, root, root);
    let path = config.manifest_path(&paths);
    if path.exists() {
        return Err(CliError::failure(format!("Error: {} already exists", path.display())));
    }

    let text = json::to_string_indented(&skeleton(&config))
        .map_err(|e| CliError::failure(format!("Error serializing manifest: {e}")))?;
    json::write_creating_dirs(&path, &text)
        .map_err(|e| CliError::failure(format!("Error writing {}: {e}", path.display())))?;
    Ok(path)
}

pub fn new_suite(unittest_dir: Option<PathBuf>, filepath: &str, filename: &str) -> CliResult<ExitCode> {
    let root = match unittest_dir {
        Some(dir) => dir,
        None => {
            let cwd = std::env::current_dir()
                .map_err(|e| CliError::failure(format!("Error reading the working directory: {e}")))?;
            HarnessPaths::discover(&cwd, None, None, None)
                .map_err(CliError::diagnostic)?
                .unittest_dir()
                .to_path_buf()
        }
    };
    let path = write_skeleton(&root, filepath, filename)?;
    println!("created {}", path.display());
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_skeleton_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_skeleton(dir.path(), "ym/common", "random").unwrap();
        assert_eq!(path, dir.path().join("ym/common/random/testsuite.json"));
        insta::assert_snapshot!(fs::read_to_string(&path).unwrap(), @r#"
        {
           "filepath": "ym/common",
           "filename": "random",
           "cases": []
        }
        "#);
        // The skeleton loads back as a manifest.
        assert!(SuiteManifest::load(&path).unwrap().cases.is_empty());
    }

    #[test]
    fn test_existing_manifest_is_kept() {
        let dir = tempfile::tempdir().unwrap();
        write_skeleton(dir.path(), "ym", "timer").unwrap();
        let err = write_skeleton(dir.path(), "ym", "timer").unwrap_err();
        assert!(err.message.contains("already exists"));
    }
}
