//! Harness version information.
//!
//! The CLI `--version` flag and the manifests written by `ymut new` read the same constant.
//!
//! ## Notes
//!
//! - The value is taken from Cargo metadata (`CARGO_PKG_VERSION`) at compile time.

/// The `ymut` version string (for example, `0.1.0-alpha.1`).
pub const YMUT_VERSION: &str = env!("CARGO_PKG_VERSION");
