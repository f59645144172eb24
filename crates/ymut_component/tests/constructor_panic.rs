//! A suite constructor that panics must be reported over the ABI, never unwind into the host.

use ymut_component::abi::{self, RawBuffer, Status};
use ymut_component::{TestSuite, export_component};

fn suite() -> TestSuite {
    panic!("calibration table missing")
}

export_component!(suite);

#[test]
fn listing_reports_the_constructor_panic() {
    let mut out = RawBuffer::empty();
    let code = unsafe { ymut_test_case_names(&mut out) };
    let message = abi::decode_message(unsafe { out.as_bytes() });
    unsafe { ymut_free_buffer(out) };

    assert_eq!(code, Status::Failed.code());
    assert_eq!(message, "suite constructor panicked: calibration table missing");
}

#[test]
fn running_a_case_reports_the_constructor_panic() {
    let name = "Anything";
    let mut out = RawBuffer::empty();
    let code = unsafe { ymut_run_test_case(name.as_ptr(), name.len(), std::ptr::null(), 0, &mut out) };
    let message = abi::decode_message(unsafe { out.as_bytes() });
    unsafe { ymut_free_buffer(out) };

    assert_eq!(code, Status::Failed.code());
    assert!(message.contains("calibration table missing"));
    // Reading the ABI version never touches the suite.
    assert_eq!(ymut_abi_version(), abi::ABI_VERSION);
}
