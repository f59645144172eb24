//! Fixed C ABI between the harness and component libraries.
//!
//! A component library exports four symbols (see [`symbols`]). Every payload that crosses the boundary is a
//! [`RawBuffer`] allocated by the component and handed back to the component's `ymut_free_buffer` once the harness
//! has copied it out. Payload contents:
//!
//! | status            | `ymut_run_test_case` payload | `ymut_test_case_names` payload |
//! |-------------------|------------------------------|--------------------------------|
//! | [`Status::Ok`]    | JSON object (result bag)     | JSON array of strings          |
//! | any other status  | UTF-8 message                | UTF-8 message                  |

use std::mem::ManuallyDrop;
use std::slice;

use thiserror::Error;

use crate::bag::ResultBag;

/// Version of the ABI described in this module. Bumped on any signature or payload change.
pub const ABI_VERSION: u32 = 1;

/// Exported symbol names.
pub mod symbols {
    pub const ABI_VERSION: &str = "ymut_abi_version";
    pub const TEST_CASE_NAMES: &str = "ymut_test_case_names";
    pub const RUN_TEST_CASE: &str = "ymut_run_test_case";
    pub const FREE_BUFFER: &str = "ymut_free_buffer";

    pub const ALL: [&str; 4] = [ABI_VERSION, TEST_CASE_NAMES, RUN_TEST_CASE, FREE_BUFFER];
}

pub type AbiVersionFn = unsafe extern "C" fn() -> u32;
pub type TestCaseNamesFn = unsafe extern "C" fn(out: *mut RawBuffer) -> i32;
pub type RunTestCaseFn = unsafe extern "C" fn(
    name: *const u8,
    name_len: usize,
    input: *const u8,
    input_len: usize,
    out: *mut RawBuffer,
) -> i32;
pub type FreeBufferFn = unsafe extern "C" fn(buf: RawBuffer);

/// Status code returned by the fallible ABI entry points.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok = 0,
    /// Unknown test-case name.
    NotFound = 1,
    /// The test case raised.
    Failed = 2,
    /// The component could not decode its input or encode its output.
    Encoding = 3,
}

impl Status {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Status::Ok),
            1 => Some(Status::NotFound),
            2 => Some(Status::Failed),
            3 => Some(Status::Encoding),
            _ => None,
        }
    }
}

/// Byte buffer handed across the ABI. Owned by whichever side allocated it.
#[repr(C)]
#[derive(Debug)]
pub struct RawBuffer {
    pub ptr: *mut u8,
    pub len: usize,
    pub cap: usize,
}

impl RawBuffer {
    pub const fn empty() -> Self {
        Self {
            ptr: std::ptr::null_mut(),
            len: 0,
            cap: 0,
        }
    }

    /// Leak `bytes` into a raw buffer. Reclaim it with [`RawBuffer::into_vec`] in the same library.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        let mut bytes = ManuallyDrop::new(bytes);
        Self {
            ptr: bytes.as_mut_ptr(),
            len: bytes.len(),
            cap: bytes.capacity(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.ptr.is_null()
    }

    /// Rebuild the vector this buffer was created from.
    ///
    /// # Safety
    ///
    /// The buffer must come from [`RawBuffer::from_vec`] in the same allocator and must not have been reclaimed yet.
    pub unsafe fn into_vec(self) -> Vec<u8> {
        if self.ptr.is_null() {
            return Vec::new();
        }
        // SAFETY: guaranteed by the caller; ptr/len/cap were produced by `from_vec`.
        unsafe { Vec::from_raw_parts(self.ptr, self.len, self.cap) }
    }

    /// Borrow the initialised bytes.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or valid for reads of `len` bytes for the lifetime of the borrow.
    pub unsafe fn as_bytes(&self) -> &[u8] {
        if self.ptr.is_null() {
            return &[];
        }
        // SAFETY: guaranteed by the caller.
        unsafe { slice::from_raw_parts(self.ptr, self.len) }
    }
}

impl Default for RawBuffer {
    fn default() -> Self {
        Self::empty()
    }
}

// ============================================================================
// Wire codec
// ============================================================================

#[derive(Debug, Error)]
pub enum WireError {
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn encode_bag(bag: &ResultBag) -> Result<Vec<u8>, WireError> {
    Ok(serde_json::to_vec(bag)?)
}

pub fn decode_bag(bytes: &[u8]) -> Result<ResultBag, WireError> {
    Ok(serde_json::from_slice(bytes)?)
}

pub fn encode_names(names: &[String]) -> Result<Vec<u8>, WireError> {
    Ok(serde_json::to_vec(names)?)
}

pub fn decode_names(bytes: &[u8]) -> Result<Vec<String>, WireError> {
    Ok(serde_json::from_slice(bytes)?)
}

/// Decode a failure message. Invalid UTF-8 is replaced rather than rejected.
pub fn decode_message(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[test]
    fn test_status_codes_are_stable() {
        for status in [Status::Ok, Status::NotFound, Status::Failed, Status::Encoding] {
            assert_eq!(Status::from_code(status.code()), Some(status));
        }
        assert_eq!(Status::from_code(42), None);
        assert_eq!(Status::NotFound.code(), 1);
    }

    #[test]
    fn test_raw_buffer_reclaims_its_bytes() {
        let buf = RawBuffer::from_vec(b"hello".to_vec());
        assert!(!buf.is_null());
        assert_eq!(unsafe { buf.as_bytes() }, b"hello");
        let back = unsafe { buf.into_vec() };
        assert_eq!(back, b"hello");

        let empty = RawBuffer::empty();
        assert_eq!(unsafe { empty.as_bytes() }, b"");
        assert!(unsafe { empty.into_vec() }.is_empty());
    }

    #[test]
    fn test_bag_payload_keeps_types() {
        let bag = ResultBag::new()
            .with("Val_int8", -5i8)
            .with("Ratio", 0.5)
            .with("Name", "rng");
        let decoded = decode_bag(&encode_bag(&bag).unwrap()).unwrap();
        assert_eq!(decoded.get("Val_int8"), Some(&Value::Int(-5)));
        assert_eq!(decoded, bag);
    }

    #[test]
    fn test_uint64_beyond_i64_is_rejected_not_widened() {
        let err = decode_bag(br#"{"Val_uint64":18446744073709551615}"#).unwrap_err();
        assert!(err.to_string().contains("does not fit in i64"));

        let bag = decode_bag(br#"{"Val_uint64":9223372036854775807}"#).unwrap();
        assert_eq!(bag.get("Val_uint64"), Some(&Value::Int(i64::MAX)));
    }

    #[test]
    fn test_null_payload_is_not_a_bag() {
        assert!(decode_bag(b"null").is_err());
        assert!(decode_bag(b"{}").unwrap().is_empty());
    }

    #[test]
    fn test_message_decoding_is_lossy() {
        assert_eq!(decode_message(b"boom"), "boom");
        assert_eq!(decode_message(&[0x66, 0xff]), "f\u{fffd}");
    }
}
