//! Raw ABI entry points behind [`export_component!`](crate::export_component).
//!
//! The macro forwards every exported symbol to a function here, so the encoding rules live in ordinary Rust code.

use std::panic::{self, AssertUnwindSafe};
use std::sync::OnceLock;
use std::{slice, str};

use ymut_core::ResultBag;
use ymut_core::abi::{self, RawBuffer, Status};

use crate::suite::{RunError, TestSuite, panic_message};

/// Build the suite on first use. A panicking constructor leaves `cell` empty and is reported instead of unwinding
/// into the host.
pub fn load_suite(cell: &'static OnceLock<TestSuite>, ctor: fn() -> TestSuite) -> Result<&'static TestSuite, String> {
    if let Some(suite) = cell.get() {
        return Ok(suite);
    }
    panic::catch_unwind(AssertUnwindSafe(|| cell.get_or_init(ctor)))
        .map_err(|payload| format!("suite constructor panicked: {}", panic_message(&*payload)))
}

/// Write `message` into `out` and return [`Status::Failed`].
///
/// # Safety
///
/// `out` must be null or point to writable memory for one `RawBuffer`.
pub unsafe fn report_failure(out: *mut RawBuffer, message: &str) -> i32 {
    if out.is_null() {
        return Status::Encoding.code();
    }
    // SAFETY: `out` is non-null and writable per the caller contract.
    unsafe { out.write(RawBuffer::from_vec(message.as_bytes().to_vec())) };
    Status::Failed.code()
}

/// Write the suite's case names as a JSON array into `out`.
///
/// # Safety
///
/// `out` must be null or point to writable memory for one `RawBuffer`.
pub unsafe fn test_case_names(suite: &TestSuite, out: *mut RawBuffer) -> i32 {
    if out.is_null() {
        return Status::Encoding.code();
    }
    let (status, payload) = match abi::encode_names(&suite.test_case_names()) {
        Ok(bytes) => (Status::Ok, bytes),
        Err(e) => (Status::Encoding, e.to_string().into_bytes()),
    };
    // SAFETY: `out` is non-null and writable per the caller contract.
    unsafe { out.write(RawBuffer::from_vec(payload)) };
    status.code()
}

/// Run one test case and write the encoded bag (or failure message) into `out`.
///
/// # Safety
///
/// `name` and `input` must be valid for reads of `name_len` / `input_len` bytes, or null with a zero length. `out`
/// must be null or point to writable memory for one `RawBuffer`.
pub unsafe fn run_test_case(
    suite: &TestSuite,
    name: *const u8,
    name_len: usize,
    input: *const u8,
    input_len: usize,
    out: *mut RawBuffer,
) -> i32 {
    if out.is_null() {
        return Status::Encoding.code();
    }
    // SAFETY: forwarded caller contract.
    let (status, payload) = unsafe { dispatch(suite, name, name_len, input, input_len) };
    // SAFETY: `out` is non-null and writable per the caller contract.
    unsafe { out.write(RawBuffer::from_vec(payload)) };
    status.code()
}

/// Release a buffer produced by this library.
///
/// # Safety
///
/// `buf` must come from [`test_case_names`] or [`run_test_case`] and must not have been released.
pub unsafe fn free_buffer(buf: RawBuffer) {
    // SAFETY: forwarded caller contract.
    drop(unsafe { buf.into_vec() });
}

unsafe fn dispatch(
    suite: &TestSuite,
    name: *const u8,
    name_len: usize,
    input: *const u8,
    input_len: usize,
) -> (Status, Vec<u8>) {
    // SAFETY: forwarded caller contract.
    let name_bytes = unsafe { bytes_from_raw(name, name_len) };
    let Ok(name) = str::from_utf8(name_bytes) else {
        return (Status::Encoding, b"test case name is not valid UTF-8".to_vec());
    };

    // SAFETY: forwarded caller contract.
    let input_bytes = unsafe { bytes_from_raw(input, input_len) };
    let input = if input_bytes.is_empty() {
        ResultBag::new()
    } else {
        match abi::decode_bag(input_bytes) {
            Ok(bag) => bag,
            Err(e) => return (Status::Encoding, e.to_string().into_bytes()),
        }
    };

    match suite.run_test_case(name, &input) {
        Ok(bag) => match abi::encode_bag(&bag) {
            Ok(bytes) => (Status::Ok, bytes),
            Err(e) => (Status::Encoding, e.to_string().into_bytes()),
        },
        Err(err @ RunError::NotFound(_)) => (Status::NotFound, err.to_string().into_bytes()),
        Err(err @ RunError::Failed { .. }) => (Status::Failed, err.to_string().into_bytes()),
    }
}

unsafe fn bytes_from_raw<'a>(ptr: *const u8, len: usize) -> &'a [u8] {
    if ptr.is_null() || len == 0 {
        return &[];
    }
    // SAFETY: forwarded caller contract.
    unsafe { slice::from_raw_parts(ptr, len) }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::suite::CaseFailure;

    fn seeded(input: &ResultBag) -> Result<ResultBag, CaseFailure> {
        Ok(ResultBag::new().with("Seed", input.get("Seed").cloned().unwrap_or(0.into())))
    }

    fn suite() -> TestSuite {
        TestSuite::new("Ffi").case("Seeded", seeded)
    }

    fn call(suite: &TestSuite, name: &[u8], input: &[u8]) -> (i32, Vec<u8>) {
        let mut out = RawBuffer::empty();
        let code = unsafe { run_test_case(suite, name.as_ptr(), name.len(), input.as_ptr(), input.len(), &mut out) };
        let bytes = unsafe { out.into_vec() };
        (code, bytes)
    }

    #[test]
    fn test_ok_payload_is_a_bag() {
        let (code, bytes) = call(&suite(), b"Seeded", br#"{"Seed":42}"#);
        assert_eq!(code, Status::Ok.code());
        assert_eq!(abi::decode_bag(&bytes).unwrap(), ResultBag::new().with("Seed", 42));
    }

    #[test]
    fn test_empty_input_means_empty_bag() {
        let (code, bytes) = call(&suite(), b"Seeded", b"");
        assert_eq!(code, Status::Ok.code());
        assert_eq!(abi::decode_bag(&bytes).unwrap().get("Seed"), Some(&0.into()));
    }

    #[test]
    fn test_not_found_and_bad_input() {
        let (code, bytes) = call(&suite(), b"Missing", b"");
        assert_eq!(code, Status::NotFound.code());
        assert_eq!(abi::decode_message(&bytes), "Test case Missing not found");

        let (code, _) = call(&suite(), b"Seeded", b"[1,2]");
        assert_eq!(code, Status::Encoding.code());

        let (code, _) = call(&suite(), &[0xff, 0xfe], b"");
        assert_eq!(code, Status::Encoding.code());
    }

    #[test]
    fn test_null_out_pointer_is_rejected() {
        let s = suite();
        let code = unsafe { run_test_case(&s, b"Seeded".as_ptr(), 6, std::ptr::null(), 0, std::ptr::null_mut()) };
        assert_eq!(code, Status::Encoding.code());
        assert_eq!(unsafe { test_case_names(&s, std::ptr::null_mut()) }, Status::Encoding.code());
    }

    static BROKEN: OnceLock<TestSuite> = OnceLock::new();

    fn broken_suite() -> TestSuite {
        panic!("registry unavailable")
    }

    #[test]
    fn test_panicking_constructor_is_reported() {
        let err = load_suite(&BROKEN, broken_suite).unwrap_err();
        assert_eq!(err, "suite constructor panicked: registry unavailable");
        assert!(BROKEN.get().is_none());

        let mut out = RawBuffer::empty();
        let code = unsafe { report_failure(&mut out, &err) };
        assert_eq!(code, Status::Failed.code());
        assert_eq!(abi::decode_message(&unsafe { out.into_vec() }), err);
    }

    #[test]
    fn test_names_payload() {
        let mut out = RawBuffer::empty();
        let code = unsafe { test_case_names(&suite(), &mut out) };
        assert_eq!(code, Status::Ok.code());
        assert_eq!(abi::decode_names(unsafe { out.as_bytes() }).unwrap(), vec!["Seeded"]);
        unsafe { free_buffer(out) };
    }
}
