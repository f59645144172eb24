//! Guardrails for the component ABI surface.
//!
//! Symbol names and status codes are part of every component library ever built; changing them silently would make
//! old libraries fail to load or misreport. These tests pin them.

use std::collections::BTreeSet;

use ymut_core::abi::{self, Status, symbols};

#[test]
fn symbol_names_are_prefixed_and_unique() {
    let unique: BTreeSet<&str> = symbols::ALL.iter().copied().collect();
    assert_eq!(unique.len(), symbols::ALL.len(), "duplicate ABI symbol name");

    for name in symbols::ALL {
        assert!(name.starts_with("ymut_"), "ABI symbol `{name}` must carry the `ymut_` prefix");
        assert!(
            name.chars().all(|c| c.is_ascii_lowercase() || c == '_'),
            "ABI symbol `{name}` must be a plain C identifier"
        );
    }
}

#[test]
fn status_codes_are_pinned() {
    assert_eq!(Status::Ok.code(), 0);
    assert_eq!(Status::NotFound.code(), 1);
    assert_eq!(Status::Failed.code(), 2);
    assert_eq!(Status::Encoding.code(), 3);
}

#[test]
fn abi_version_is_one() {
    assert_eq!(abi::ABI_VERSION, 1);
}
