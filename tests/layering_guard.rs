//! Layering guardrails to keep the harness and the component runtime apart.
//!
//! The harness (`ymut` crate) may only use `ymut_component` as a **dev-dependency** (for in-process components in
//! tests), and the component runtime must never depend on the harness. Both sides share `ymut_core` only.

fn table_entries<'a>(manifest: &'a str, table: &str) -> Vec<&'a str> {
    let mut in_table = false;
    let mut entries = Vec::new();

    for raw_line in manifest.lines() {
        let line = raw_line.trim();
        // Track when we enter/exit the table.
        if line.starts_with('[') {
            in_table = line == table;
            continue;
        }
        if !in_table || line.is_empty() || line.starts_with('#') {
            continue;
        }
        // Strip inline comments for robustness.
        let line_no_comment = line.split('#').next().unwrap_or("").trim();
        if let Some(name) = line_no_comment.split(['=', ' ']).next() {
            entries.push(name);
        }
    }
    entries
}

#[test]
fn harness_does_not_depend_on_component_runtime() {
    let manifest = include_str!("../Cargo.toml");
    let deps = table_entries(manifest, "[dependencies]");
    assert!(
        !deps.contains(&"ymut_component"),
        "`ymut_component` must not appear in [dependencies]; use [dev-dependencies] instead"
    );
    assert!(deps.contains(&"ymut_core"));
    assert!(table_entries(manifest, "[dev-dependencies]").contains(&"ymut_component"));
}

#[test]
fn component_runtime_does_not_depend_on_harness() {
    let manifest = include_str!("../crates/ymut_component/Cargo.toml");
    let deps = table_entries(manifest, "[dependencies]");
    assert!(!deps.contains(&"ymut"), "`ymut_component` must not depend on the harness crate");
    assert!(deps.contains(&"ymut_core"));
}

#[test]
fn core_stays_free_of_harness_crates() {
    let manifest = include_str!("../crates/ymut_core/Cargo.toml");
    let deps = table_entries(manifest, "[dependencies]");
    assert!(!deps.iter().any(|d| d.starts_with("ymut")));
}
