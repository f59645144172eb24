//! Component loading over the fixed C ABI.
//!
//! [`ComponentLoader`] resolves a suite's library through the registered library paths, opens it with `dlopen`,
//! checks its ABI version and caches the handle for the lifetime of the loader. Everything above the loader talks to
//! components through [`ComponentHandle`], so tests can substitute in-process components.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dlopen::symbor::{Library, SymBorApi, Symbol};
use dlopen_derive::SymBorApi;
use ymut_core::ResultBag;
use ymut_core::abi::{self, AbiVersionFn, FreeBufferFn, RawBuffer, RunTestCaseFn, Status, TestCaseNamesFn, symbols};

use super::config::{HarnessPaths, SuiteConfig};
use super::environment::HostEnvironment;
use super::error::HarnessError;

// ============================================================================
// Handle trait
// ============================================================================

/// A loaded component that can run its test cases by name.
pub trait ComponentHandle {
    /// Display name, usually the suite's dotted target.
    fn name(&self) -> &str;

    /// Names of every test case the component exports, in its registration order.
    fn test_case_names(&self) -> Result<Vec<String>, HarnessError>;

    /// Run one test case. Unknown names fail with [`HarnessError::NotFound`], failures inside the case with
    /// [`HarnessError::Execution`].
    fn invoke(&self, case: &str, input: &ResultBag) -> Result<ResultBag, HarnessError>;
}

// ============================================================================
// Native components
// ============================================================================

#[derive(SymBorApi)]
struct ComponentApi<'a> {
    ymut_abi_version: Symbol<'a, AbiVersionFn>,
    ymut_test_case_names: Symbol<'a, TestCaseNamesFn>,
    ymut_run_test_case: Symbol<'a, RunTestCaseFn>,
    ymut_free_buffer: Symbol<'a, FreeBufferFn>,
}

/// The four ABI entry points of a component.
#[derive(Debug, Clone, Copy)]
pub struct ComponentVTable {
    pub abi_version: AbiVersionFn,
    pub test_case_names: TestCaseNamesFn,
    pub run_test_case: RunTestCaseFn,
    pub free_buffer: FreeBufferFn,
}

impl ComponentVTable {
    fn from_api(api: &ComponentApi<'_>) -> Self {
        Self {
            abi_version: *api.ymut_abi_version,
            test_case_names: *api.ymut_test_case_names,
            run_test_case: *api.ymut_run_test_case,
            free_buffer: *api.ymut_free_buffer,
        }
    }
}

/// A component reached through its C ABI.
pub struct NativeComponent {
    name: String,
    path: Option<PathBuf>,
    vtable: ComponentVTable,
    // Keeps the vtable's code mapped.
    _lib: Option<Arc<Library>>,
}

impl NativeComponent {
    /// Open the shared library at `path` and bind its ABI symbols.
    #[tracing::instrument(skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path, name: impl Into<String>) -> Result<Self, HarnessError> {
        let lib = Library::open(path).map_err(|e| HarnessError::load(path, e.to_string()))?;
        let lib = Arc::new(lib);
        // SAFETY: the symbols are only used while `_lib` keeps the library mapped, and their signatures are the
        // ones `export_component!` generates.
        let vtable = unsafe { ComponentApi::load(&lib) }
            .map(|api| ComponentVTable::from_api(&api))
            .map_err(|e| {
                HarnessError::load(
                    path,
                    format!("missing ABI symbol (a component exports {}): {e}", symbols::ALL.join(", ")),
                )
            })?;

        // SAFETY: the library stays loaded for as long as the component exists.
        let mut component = unsafe { Self::from_vtable(name, vtable) }.map_err(|e| match e {
            HarnessError::Load { message, .. } => HarnessError::load(path, message),
            other => other,
        })?;
        component.path = Some(path.to_path_buf());
        component._lib = Some(lib);
        Ok(component)
    }

    /// Wrap entry points that are already linked into the process.
    ///
    /// # Safety
    ///
    /// The function pointers must implement the ABI in [`ymut_core::abi`] and remain valid for the lifetime of the
    /// returned component.
    pub unsafe fn from_vtable(name: impl Into<String>, vtable: ComponentVTable) -> Result<Self, HarnessError> {
        // SAFETY: guaranteed by the caller.
        let version = unsafe { (vtable.abi_version)() };
        if version != abi::ABI_VERSION {
            return Err(HarnessError::load(
                "<in-process>",
                format!("component ABI version {version}, harness expects {}", abi::ABI_VERSION),
            ));
        }
        Ok(Self {
            name: name.into(),
            path: None,
            vtable,
            _lib: None,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Copy a component-allocated buffer out and hand it back to the component.
    fn take(&self, buf: RawBuffer) -> Vec<u8> {
        // SAFETY: `buf` was just written by this component and is released exactly once, right after the copy.
        unsafe {
            let bytes = buf.as_bytes().to_vec();
            (self.vtable.free_buffer)(buf);
            bytes
        }
    }
}

impl ComponentHandle for NativeComponent {
    fn name(&self) -> &str {
        &self.name
    }

    fn test_case_names(&self) -> Result<Vec<String>, HarnessError> {
        let mut out = RawBuffer::empty();
        // SAFETY: `out` is a valid, writable buffer slot.
        let code = unsafe { (self.vtable.test_case_names)(&mut out) };
        let payload = self.take(out);
        match Status::from_code(code) {
            Some(Status::Ok) => abi::decode_names(&payload).map_err(|e| HarnessError::Execution {
                case: String::new(),
                message: format!("undecodable test case list: {e}"),
            }),
            _ => Err(HarnessError::Execution {
                case: String::new(),
                message: format!(
                    "listing test cases failed with status {code}: {}",
                    abi::decode_message(&payload)
                ),
            }),
        }
    }

    #[tracing::instrument(skip_all, fields(component = %self.name, case = %case))]
    fn invoke(&self, case: &str, input: &ResultBag) -> Result<ResultBag, HarnessError> {
        let input_bytes = if input.is_empty() {
            Vec::new()
        } else {
            abi::encode_bag(input).map_err(|e| HarnessError::Execution {
                case: case.to_string(),
                message: format!("cannot encode input bag: {e}"),
            })?
        };
        let input_ptr = if input_bytes.is_empty() {
            std::ptr::null()
        } else {
            input_bytes.as_ptr()
        };

        let mut out = RawBuffer::empty();
        // SAFETY: both slices outlive the call and `out` is a valid, writable buffer slot.
        let code = unsafe {
            (self.vtable.run_test_case)(case.as_ptr(), case.len(), input_ptr, input_bytes.len(), &mut out)
        };
        let payload = self.take(out);

        match Status::from_code(code) {
            Some(Status::Ok) => abi::decode_bag(&payload).map_err(|e| HarnessError::Execution {
                case: case.to_string(),
                message: format!("undecodable result bag: {e}"),
            }),
            Some(Status::NotFound) => Err(HarnessError::NotFound { name: case.to_string() }),
            Some(Status::Failed) => Err(HarnessError::Execution {
                case: case.to_string(),
                message: abi::decode_message(&payload),
            }),
            Some(Status::Encoding) => Err(HarnessError::Execution {
                case: case.to_string(),
                message: format!("component rejected the payload: {}", abi::decode_message(&payload)),
            }),
            None => Err(HarnessError::Execution {
                case: case.to_string(),
                message: format!("unknown status code {code}"),
            }),
        }
    }
}

// ============================================================================
// Loader
// ============================================================================

/// Loads components and caches them by library path.
pub struct ComponentLoader {
    paths: HarnessPaths,
    environment: HostEnvironment,
    loaded: HashMap<PathBuf, Arc<NativeComponent>>,
}

impl ComponentLoader {
    pub fn new(paths: HarnessPaths) -> Self {
        Self {
            paths,
            environment: HostEnvironment::new(),
            loaded: HashMap::new(),
        }
    }

    pub fn paths(&self) -> &HarnessPaths {
        &self.paths
    }

    pub fn environment(&self) -> &HostEnvironment {
        &self.environment
    }

    /// Where the suite's library is expected, whether or not it exists.
    pub fn library_path(&self, config: &SuiteConfig) -> PathBuf {
        self.paths.library_dir().join(config.library_file_name())
    }

    /// Register the suite's search paths and defines, then load (or reuse) its component library.
    #[tracing::instrument(skip_all, fields(suite = %config.target_name()))]
    pub fn load_component(&mut self, config: &SuiteConfig) -> Result<Arc<NativeComponent>, HarnessError> {
        config.validate()?;
        self.environment.register_suite(&self.paths, config)?;

        let file_name = config.library_file_name();
        let Some(path) = self.environment.resolve_library(&file_name) else {
            let searched: Vec<String> = self
                .environment
                .library_paths()
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            return Err(HarnessError::load(
                self.library_path(config),
                format!("{file_name} not found in [{}]", searched.join(", ")),
            ));
        };

        if let Some(component) = self.loaded.get(&path) {
            tracing::debug!("reusing loaded component");
            return Ok(Arc::clone(component));
        }

        let component = Arc::new(NativeComponent::open(&path, config.target_name())?);
        tracing::info!(library = %path.display(), "loaded component");
        self.loaded.insert(path, Arc::clone(&component));
        Ok(component)
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }
}
