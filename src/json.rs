//! JSON output helpers shared by the coverage cache and manifest scaffolding.

use std::fs;
use std::io;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

/// Files written by the harness indent with three spaces.
const INDENT: &[u8] = b"   ";

/// Serialize `value` as pretty JSON with a three-space indent and a trailing newline.
pub fn to_string_indented<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let mut out = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(INDENT));
    value.serialize(&mut serializer)?;
    out.push(b'\n');
    // serde_json only emits UTF-8.
    Ok(String::from_utf8_lossy(&out).into_owned())
}

/// Write `contents` to `path`, creating missing parent directories first.
pub fn write_creating_dirs(path: &Path, contents: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)
}
