//! Load a real component library through `dlopen`.
//!
//! The `ymut_fixture_component` workspace member is built as a cdylib, copied to where the harness expects a suite's
//! library, and loaded with `ComponentLoader`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use ymut::harness::{
    ComponentHandle, ComponentLoader, HarnessPaths, SilentReporter, SuiteConfig, SuiteDefinition, SuiteRunner,
};
use ymut::process::{RunOptions, ShellCommand, run_cmd};
use ymut::{ErrorKind, ResultBag, Value};

const FIXTURE: &str = "ymut_fixture_component";

/// Build the fixture once per test binary and return the path of the produced library.
fn fixture_library() -> &'static Path {
    static LIBRARY: OnceLock<PathBuf> = OnceLock::new();
    LIBRARY.get_or_init(|| {
        let cargo = env::var_os("CARGO").map_or_else(|| "cargo".to_string(), |c| c.to_string_lossy().into_owned());
        let command = ShellCommand::new(cargo).args(["build", "--quiet", "-p", FIXTURE, "--message-format=json"]);
        let options = RunOptions::new().in_dir(env!("CARGO_MANIFEST_DIR")).quiet(true);
        let result = run_cmd(&command, &options).unwrap();
        assert!(result.success(), "building {FIXTURE} failed:\n{}", result.output);

        result
            .output
            .lines()
            .filter_map(|line| serde_json::from_str::<serde_json::Value>(line).ok())
            .filter(|msg| msg["reason"] == "compiler-artifact" && msg["target"]["name"] == FIXTURE)
            .flat_map(|msg| msg["filenames"].as_array().cloned().unwrap_or_default())
            .filter_map(|name| name.as_str().map(PathBuf::from))
            .find(|path| path.to_string_lossy().ends_with(env::consts::DLL_SUFFIX))
            .unwrap()
    })
}

/// A unit-test tree whose build directory holds the fixture under the suite's library name.
fn install(config: &SuiteConfig) -> (tempfile::TempDir, HarnessPaths) {
    let dir = tempfile::tempdir().unwrap();
    let unittests = dir.path().join("unittests");
    let build = unittests.join("build");
    let paths = HarnessPaths::new(&unittests, dir.path(), &build);
    fs::create_dir_all(paths.library_dir()).unwrap();
    fs::copy(fixture_library(), paths.library_dir().join(config.library_file_name())).unwrap();
    (dir, paths)
}

#[test]
fn loading_twice_reuses_the_handle_and_registrations() {
    let config = SuiteConfig::new("ym/common", "random");
    let (_dir, paths) = install(&config);
    let expected = paths.library_dir().join(config.library_file_name());

    let mut loader = ComponentLoader::new(paths);
    let first = loader.load_component(&config).unwrap();
    let environment = loader.environment().clone();
    let second = loader.load_component(&config).unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(loader.environment(), &environment);
    assert_eq!(loader.loaded_count(), 1);
    assert_eq!(first.path(), Some(expected.as_path()));
    assert_eq!(first.name(), "ym.common.random");
}

#[test]
fn loaded_component_runs_its_cases() {
    let config = SuiteConfig::new("ym/common", "random");
    let (_dir, paths) = install(&config);
    let mut loader = ComponentLoader::new(paths);
    let component = loader.load_component(&config).unwrap();

    assert_eq!(component.test_case_names().unwrap(), vec!["OpenClose", "Boom"]);

    let bag = component.invoke("OpenClose", &ResultBag::new()).unwrap();
    assert_eq!(bag.get("IsOpen"), Some(&Value::Bool(true)));
    assert_eq!(bag.get("Val_int8"), Some(&Value::Int(-128)));

    let err = component.invoke("Nope", &ResultBag::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFoundError);

    let err = component.invoke("Boom", &ResultBag::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExecutionError);
    assert_eq!(err.to_string(), "ExecutionError: boom");

    // A panicking case leaves the library usable.
    assert!(component.invoke("OpenClose", &ResultBag::new()).is_ok());
}

#[test]
fn suite_runner_reports_each_case() {
    let config = SuiteConfig::new("ym", "fixture");
    let (_dir, paths) = install(&config);
    let mut runner = SuiteRunner::new(paths);

    let summary = runner.run_suite(&SuiteDefinition::new(config, Vec::new()), &mut SilentReporter);

    assert_eq!(summary.suite, "ym.fixture");
    assert_eq!(summary.total, 2);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.cases[1].failures[0].kind, ErrorKind::ExecutionError);
    assert!(summary.cases[1].failures[0].message.contains("boom"));
}
