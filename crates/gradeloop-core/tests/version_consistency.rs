//! Ensures workspace crates inherit the workspace version.

use std::path::Path;

fn workspace_root() -> &'static Path {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(Path::parent)
        .unwrap()
}

fn manifest(path: &Path) -> toml::Value {
    let content = std::fs::read_to_string(path.join("Cargo.toml"))
        .unwrap_or_else(|e| panic!("failed to read {}: {}", path.display(), e));
    content.parse().unwrap()
}

#[test]
fn all_crates_use_workspace_version() {
    for krate in ["crates/gradeloop-core", "crates/gradeloop-ledger"] {
        let doc = manifest(&workspace_root().join(krate));
        let inherits = doc["package"]["version"]
            .get("workspace")
            .and_then(|v| v.as_bool());
        assert_eq!(inherits, Some(true), "{krate} should use version.workspace = true");
    }
}

#[test]
fn workspace_version_matches_cargo_pkg() {
    let doc = manifest(workspace_root());
    let ws_version = doc["workspace"]["package"]["version"].as_str().unwrap();
    assert_eq!(ws_version, env!("CARGO_PKG_VERSION"));
    assert_eq!(gradeloop_core::VERSION, ws_version);
}
