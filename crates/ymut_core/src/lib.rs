//! Provide the data model and the component ABI shared by the `ymut` harness and the component runtime.
//!
//! Both sides of the plugin boundary depend on this crate:
//! - the harness decodes result bags and checks the ABI version of every library it loads, and
//! - the component runtime (`ymut_component`) encodes result bags and exports the ABI symbols.
//!
//! ## Notes
//!
//! - No filesystem IO, no dynamic loading and no global state live here.
//! - Result bags cross the boundary as UTF-8 JSON (see [`abi`]); the [`Value`] variants keep integer, float, string
//!   and boolean data apart so a signed 8-bit value is never mistaken for character data.

pub mod abi;
pub mod bag;
pub mod errors;
pub mod value;

pub use bag::ResultBag;
pub use errors::ErrorKind;
pub use value::Value;
