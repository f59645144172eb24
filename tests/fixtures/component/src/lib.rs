//! Small component exercised through `dlopen` by `tests/native_loader.rs`.

use ymut_component::{CaseFailure, ResultBag, TestSuite, export_component};

fn open_close(_: &ResultBag) -> Result<ResultBag, CaseFailure> {
    Ok(ResultBag::new()
        .with("IsOpen", true)
        .with("IsClosed", false)
        .with("Val_int8", i8::MIN))
}

fn boom(_: &ResultBag) -> Result<ResultBag, CaseFailure> {
    panic!("boom")
}

fn suite() -> TestSuite {
    TestSuite::new("Fixture").case("OpenClose", open_close).case("Boom", boom)
}

export_component!(suite);
