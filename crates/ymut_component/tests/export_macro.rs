//! Exercise the symbols generated by `export_component!` through their C signatures.

use ymut_component::abi::{self, RawBuffer, Status};
use ymut_component::{CaseFailure, ResultBag, TestSuite, Value, export_component};

fn limits(_: &ResultBag) -> Result<ResultBag, CaseFailure> {
    Ok(ResultBag::new()
        .with("Val_int8", i8::MIN)
        .with("Val_int32", i32::MIN)
        .with("Val_uint16", u16::MAX))
}

fn broken(_: &ResultBag) -> Result<ResultBag, CaseFailure> {
    panic!("unreachable state reached")
}

fn suite() -> TestSuite {
    TestSuite::new("Limits").case("Limits", limits).case("Broken", broken)
}

export_component!(suite);

fn run(name: &str) -> (i32, Vec<u8>) {
    let mut out = RawBuffer::empty();
    let code = unsafe { ymut_run_test_case(name.as_ptr(), name.len(), std::ptr::null(), 0, &mut out) };
    let bytes = unsafe { out.as_bytes() }.to_vec();
    unsafe { ymut_free_buffer(out) };
    (code, bytes)
}

#[test]
fn abi_version_matches_core() {
    assert_eq!(ymut_abi_version(), abi::ABI_VERSION);
}

#[test]
fn exported_names_follow_registration_order() {
    let mut out = RawBuffer::empty();
    let code = unsafe { ymut_test_case_names(&mut out) };
    assert_eq!(code, Status::Ok.code());
    let names = abi::decode_names(unsafe { out.as_bytes() }).unwrap();
    unsafe { ymut_free_buffer(out) };
    assert_eq!(names, vec!["Limits", "Broken"]);
}

#[test]
fn signed_bytes_arrive_as_integers() {
    let (code, bytes) = run("Limits");
    assert_eq!(code, Status::Ok.code());
    let bag = abi::decode_bag(&bytes).unwrap();
    assert_eq!(bag.get("Val_int8"), Some(&Value::Int(-128)));
    assert_eq!(bag.get("Val_int32"), Some(&Value::Int(-2147483648)));
    assert_eq!(bag.get("Val_uint16"), Some(&Value::Int(65535)));
}

#[test]
fn panics_do_not_cross_the_boundary() {
    let (code, bytes) = run("Broken");
    assert_eq!(code, Status::Failed.code());
    assert_eq!(abi::decode_message(&bytes), "unreachable state reached");

    // The library stays usable after a failing case.
    let (code, _) = run("Limits");
    assert_eq!(code, Status::Ok.code());
}
