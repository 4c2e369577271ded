//! BDD harness (cucumber-rs).
//!
//! This crate keeps scenario tests isolated from the production crates. The helpers here
//! stage the scaffolded fixture project and read back what a run left in it.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use onetouch_domain::copy_tree;
use onetouch_edit::PbxProject;
use std::path::Path;
use tempfile::TempDir;

/// Settings that swap every external tool for a local stand-in. The signing tool leaves a
/// marker behind so scenarios can tell whether it ran.
pub const STUB_CONFIG: &str = r#"
stdio = "ignore"

[tools]
bundler = "true"
scaffold = "true"
gradle = "sh ./gradlew"
apksigner = "touch apksigner-invoked; true"
"#;

pub const SIGNING_MARKER: &str = "apksigner-invoked";

/// Copy the fixture project into a temp dir and drop the stub settings next to it.
pub fn stage_fixture() -> anyhow::Result<(TempDir, Utf8PathBuf)> {
    let src = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .context("workspace root")?
        .join("tests/fixtures/capacitor_project/repo");
    let src = Utf8PathBuf::from_path_buf(src)
        .map_err(|p| anyhow::anyhow!("non-utf8 fixture path {}", p.display()))?;

    let temp = tempfile::tempdir().context("tempdir")?;
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf())
        .map_err(|p| anyhow::anyhow!("non-utf8 temp path {}", p.display()))?;
    copy_tree(&src, &root)?;
    fs::write(root.join("onetouch.toml"), STUB_CONFIG)?;
    Ok((temp, root))
}

/// Paths of the files directly under the project group named (or located at) `group`.
pub fn group_file_paths(pbx: &PbxProject, group: &str) -> Vec<String> {
    let Some(group_id) = pbx.group_by_name_or_path(group) else {
        return Vec::new();
    };
    let children = pbx
        .object(&group_id)
        .and_then(|g| g.get("children"))
        .and_then(|c| c.as_array())
        .unwrap_or_default();
    children
        .iter()
        .filter_map(|id| id.as_str())
        .filter_map(|id| pbx.object(id))
        .filter(|o| o.get_str("isa") == Some("PBXFileReference"))
        .filter_map(|o| o.get_str("path"))
        .map(|p| p.trim_matches('"').to_string())
        .collect()
}

pub fn read_pbx(root: &Utf8Path) -> anyhow::Result<PbxProject> {
    let path = root.join("platforms/ios/App/App.xcodeproj/project.pbxproj");
    let text = fs::read_to_string(&path)?;
    PbxProject::parse(&text).with_context(|| format!("parse {path}"))
}
