//! Component-side runtime for libraries exercised by the `ymut` harness.
//!
//! A component is a shared library (`crate-type = ["cdylib"]`) that registers its test cases in a [`TestSuite`] and
//! exports the fixed ABI with [`export_component!`]:
//!
//! ```rust,ignore
//! use ymut_component::{CaseFailure, ResultBag, TestSuite, export_component};
//!
//! fn zeros_and_ones(_input: &ResultBag) -> Result<ResultBag, CaseFailure> {
//!     Ok(ResultBag::new().with("NTotalBits", 4096).with("NSetBits", 2051))
//! }
//!
//! fn suite() -> TestSuite {
//!     TestSuite::new("Random").case("ZerosAndOnes", zeros_and_ones)
//! }
//!
//! export_component!(suite);
//! ```

#![deny(clippy::unwrap_used)]

pub mod ffi;
mod suite;

pub use suite::{CaseFailure, RunError, TestCaseFn, TestSuite};
pub use ymut_core::{ResultBag, Value, abi};

/// Export the component ABI for a suite constructor `fn() -> TestSuite`.
///
/// The constructor runs on the first ABI call that needs the suite. If it panics, that call reports
/// `Status::Failed` with the panic message and the next call tries again. Invoke the macro at most once per library.
#[macro_export]
macro_rules! export_component {
    ($ctor:path) => {
        fn __ymut_component_suite() -> ::std::result::Result<&'static $crate::TestSuite, ::std::string::String> {
            static SUITE: ::std::sync::OnceLock<$crate::TestSuite> = ::std::sync::OnceLock::new();
            $crate::ffi::load_suite(&SUITE, $ctor)
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn ymut_abi_version() -> u32 {
            $crate::abi::ABI_VERSION
        }

        /// # Safety
        ///
        /// `out` must be null or point to writable memory for one `RawBuffer`.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn ymut_test_case_names(out: *mut $crate::abi::RawBuffer) -> i32 {
            match __ymut_component_suite() {
                Ok(suite) => unsafe { $crate::ffi::test_case_names(suite, out) },
                Err(message) => unsafe { $crate::ffi::report_failure(out, &message) },
            }
        }

        /// # Safety
        ///
        /// `name`/`input` must be valid for reads of their lengths (or null with length 0) and `out` must be null
        /// or point to writable memory for one `RawBuffer`.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn ymut_run_test_case(
            name: *const u8,
            name_len: usize,
            input: *const u8,
            input_len: usize,
            out: *mut $crate::abi::RawBuffer,
        ) -> i32 {
            match __ymut_component_suite() {
                Ok(suite) => unsafe { $crate::ffi::run_test_case(suite, name, name_len, input, input_len, out) },
                Err(message) => unsafe { $crate::ffi::report_failure(out, &message) },
            }
        }

        /// # Safety
        ///
        /// `buf` must have been produced by this library and not released before.
        #[unsafe(no_mangle)]
        pub unsafe extern "C" fn ymut_free_buffer(buf: $crate::abi::RawBuffer) {
            unsafe { $crate::ffi::free_buffer(buf) }
        }
    };
}
