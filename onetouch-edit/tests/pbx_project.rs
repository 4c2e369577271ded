//! Xcode project graph edits against the scaffolded fixture project.

use onetouch_edit::PbxProject;
use pretty_assertions::assert_eq;
use std::path::Path;

const FIXTURE_PBXPROJ: &str =
    "tests/fixtures/capacitor_project/repo/platforms/ios/App/App.xcodeproj/project.pbxproj";

fn fixture() -> PbxProject {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let path = manifest_dir
        .parent()
        .expect("workspace root")
        .join(FIXTURE_PBXPROJ);
    let src = fs_read(&path);
    PbxProject::parse(&src).expect("parse fixture project")
}

fn fs_read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_else(|e| panic!("read {}: {e}", path.display()))
}

#[test]
fn finds_application_target() {
    let pbx = fixture();
    assert_eq!(pbx.app_target_name().as_deref(), Some("App"));
    assert_eq!(
        pbx.target_id("App").as_deref(),
        Some("504EC3031FED79650016851F")
    );
}

#[test]
fn build_settings_are_scoped_to_target_and_build() {
    let mut pbx = fixture();
    assert_eq!(pbx.build_configuration_ids("App", None).unwrap().len(), 2);
    assert_eq!(
        pbx.build_configuration_ids("App", Some("Release")).unwrap(),
        vec!["504EC3181FED79650016851F".to_string()]
    );

    let changed = pbx
        .set_build_setting("App", None, "DEVELOPMENT_TEAM", "ABCDE12345")
        .unwrap();
    assert!(changed);
    let changed = pbx
        .set_build_setting("App", None, "DEVELOPMENT_TEAM", "ABCDE12345")
        .unwrap();
    assert!(!changed);
    let debug_team = pbx.build_setting("App", Some("Debug"), "DEVELOPMENT_TEAM");
    assert_eq!(debug_team.as_deref(), Some("ABCDE12345"));
    assert_eq!(
        pbx.build_setting("App", None, "INFOPLIST_FILE").as_deref(),
        Some("App/Info.plist")
    );
}

#[test]
fn resource_file_is_added_once_under_target_group() {
    let mut pbx = fixture();
    let group = pbx.group_by_name_or_path("App").expect("App group");
    assert_eq!(group, "504EC3061FED79650016851F");

    let added = pbx
        .add_resource_file("GoogleService-Info.plist", &group, Some("App"))
        .unwrap();
    assert!(added);
    let added = pbx
        .add_resource_file("GoogleService-Info.plist", &group, Some("App"))
        .unwrap();
    assert!(!added);

    let rendered = pbx.render();
    let reparsed = PbxProject::parse(&rendered).unwrap();
    assert_eq!(reparsed, pbx);
    let file_ref = "path = \"GoogleService-Info.plist\"";
    assert_eq!(rendered.matches(file_ref).count(), 1);
    assert_eq!(rendered.matches("isa = PBXBuildFile;").count(), 6);
}

#[test]
fn resources_group_is_created_under_main_group() {
    let mut pbx = fixture();
    assert_eq!(pbx.group_by_name("Resources"), None);
    let id = pbx.add_group("Resources", "Resources").unwrap();
    assert_eq!(pbx.group_by_name("Resources"), Some(id.clone()));
    assert_eq!(id.len(), 24);

    let main = pbx.main_group().unwrap();
    assert_eq!(main, "504EC2FB1FED79650016851F");
    assert_eq!(pbx.anonymous_group(), Some(main));
}

#[test]
fn object_ids_are_deterministic() {
    let mut a = fixture();
    let mut b = fixture();
    let ga = a.add_group("Resources", "Resources").unwrap();
    let gb = b.add_group("Resources", "Resources").unwrap();
    assert_eq!(ga, gb);
    assert_eq!(a.render(), b.render());
}
