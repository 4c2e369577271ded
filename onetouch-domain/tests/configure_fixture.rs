//! Configurator passes against the scaffolded fixture project.
//!
//! Each test copies `tests/fixtures/capacitor_project/repo` into a temp dir, runs a pass,
//! commits it, and inspects the written files. A second pass over the result must find
//! nothing left to do.

use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use onetouch_domain::{
    MobileProject, PassReport, REQUIRED_PERMISSIONS, configure_platform, copy_tree,
};
use onetouch_edit::{PbxProject, PlistDocument, XmlDocument};
use onetouch_types::{BuildDescriptor, BuildVersion, Platform, Selector};
use plist::Value;
use pretty_assertions::assert_eq;
use std::path::Path;
use tempfile::TempDir;

fn fixture_repo() -> (TempDir, Utf8PathBuf) {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let workspace_root = manifest_dir.parent().expect("workspace root");
    let src = workspace_root
        .join("tests")
        .join("fixtures")
        .join("capacitor_project")
        .join("repo");
    assert!(src.exists(), "fixture not found: {}", src.display());

    let temp = TempDir::new().expect("create temp dir");
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 temp path");
    let src = Utf8PathBuf::from_path_buf(src).expect("utf8 fixture path");
    copy_tree(&src, &root).expect("copy fixture");
    (temp, root)
}

fn descriptor() -> BuildDescriptor {
    BuildDescriptor {
        app_id: "uk.co.ronoc.watchr".into(),
        app_name: "watchR".into(),
        version: BuildVersion::new(1, 2, 3, 4),
        min_sdk_version: 23,
        compile_sdk_version: 34,
        target_sdk_version: 34,
        custom_url_scheme: "watchr".into(),
        min_ios_version: Some("14.0".into()),
        target_ios_version: Some("15.0".into()),
        ios_development_team: Some("ABCDE12345".into()),
        config_key: None,
        android: Default::default(),
        ios: Default::default(),
    }
}

fn configure(project: &mut MobileProject, platform: Platform) -> anyhow::Result<PassReport> {
    let assets = Utf8Path::new("bin/assets");
    configure_platform(project, platform, &descriptor(), assets)
}

fn run_pass(root: &Utf8Path, platform: Platform) -> MobileProject {
    let mut project = MobileProject::load(root, "platforms");
    configure(&mut project, platform).expect("configure");
    project
}

fn read(root: &Utf8Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).expect("read file")
}

fn read_xml(root: &Utf8Path, rel: &str) -> XmlDocument {
    XmlDocument::parse(&read(root, rel)).expect("parse xml")
}

fn read_plist(root: &Utf8Path, rel: &str) -> PlistDocument {
    PlistDocument::parse(read(root, rel).as_bytes()).expect("parse plist")
}

fn read_pbx(root: &Utf8Path) -> PbxProject {
    PbxProject::parse(&read(root, PBXPROJ)).expect("parse pbxproj")
}

const ANDROID_MAIN: &str = "platforms/android/app/src/main";

#[test]
fn android_pass_writes_identity_and_manifest() {
    let (_temp, root) = fixture_repo();
    let mut project = run_pass(&root, Platform::Android);
    project.commit().expect("commit");

    let gradle = read(&root, "platforms/android/app/build.gradle");
    assert!(gradle.contains("applicationId \"uk.co.ronoc.watchr\""));
    assert!(gradle.contains("versionCode 1020304"));
    assert!(gradle.contains("versionName \"1.2.3\""));
    assert!(gradle.contains("namespace \"com.example.app\""));

    let variables = read(&root, "platforms/android/variables.gradle");
    assert!(variables.contains("    minSdkVersion = 23\n"));
    assert!(variables.contains("    compileSdkVersion = 34\n"));

    let manifest = read_xml(&root, &format!("{ANDROID_MAIN}/AndroidManifest.xml"));
    let activity = Selector::keys(["manifest", "application"])
        .child_where("activity", "android:name", ".MainActivity");
    let el = manifest.first(&activity).expect("main activity");
    assert_eq!(
        el.attr("android:label").as_deref(),
        Some("@string/app_name")
    );
    assert_eq!(
        el.attr("android:supportsPictureInPicture").as_deref(),
        Some("true")
    );
    assert_eq!(
        manifest
            .first(&Selector::parse("manifest/application").unwrap())
            .and_then(|a| a.attr("android:extractNativeLibs"))
            .as_deref(),
        Some("true")
    );
    for name in REQUIRED_PERMISSIONS {
        let permission =
            Selector::keys(["manifest"]).child_where("uses-permission", "android:name", name);
        assert_eq!(manifest.count(&permission), 1, "{name}");
    }
    let view = activity
        .clone()
        .child("intent-filter")
        .child_where("action", "android:name", "android.intent.action.VIEW");
    assert_eq!(manifest.count(&view), 1);

    let strings = read_xml(&root, &format!("{ANDROID_MAIN}/res/values/strings.xml"));
    let text = |name: &str| {
        let string = Selector::keys(["resources"]).child_where("string", "name", name);
        strings.first(&string).map(|e| e.text())
    };
    assert_eq!(text("app_name").as_deref(), Some("watchR"));
    assert_eq!(text("package_name").as_deref(), Some("uk.co.ronoc.watchr"));
    assert_eq!(text("custom_url_scheme").as_deref(), Some("watchr"));

    let styles = read(&root, &format!("{ANDROID_MAIN}/res/values/styles.xml"));
    let duration = "windowSplashScreenAnimationDuration\">3000<";
    assert!(styles.contains(duration));
    let file_paths = root.join(ANDROID_MAIN).join("res/xml/file_paths.xml");
    assert!(file_paths.is_file());
}

#[test]
fn android_assets_are_replaced_after_documents() {
    let (_temp, root) = fixture_repo();
    let res = root.join(ANDROID_MAIN).join("res");
    assert!(res.join("drawable-land-hdpi").is_dir());

    let mut project = run_pass(&root, Platform::Android);
    assert!(
        res.join("drawable-land-hdpi").is_dir(),
        "removal waits for commit"
    );
    project.commit().expect("commit");

    assert!(!res.join("drawable-land-hdpi").exists());
    assert!(res.join("drawable/splash.png").is_file());
    assert!(res.join("mipmap-hdpi/ic_launcher.png").is_file());
    assert!(res.join("values/strings.xml").is_file());
}

#[test]
fn android_second_pass_converges() {
    let (_temp, root) = fixture_repo();
    run_pass(&root, Platform::Android)
        .commit()
        .expect("first commit");

    let mut again = run_pass(&root, Platform::Android);
    assert_eq!(again.diff().unwrap(), "");
    assert!(again.modified_paths().is_empty());
    assert!(again.commit().expect("second commit").written.is_empty());
}

#[test]
fn android_missing_variables_file_is_skipped() {
    let (_temp, root) = fixture_repo();
    fs::remove_file(root.join("platforms/android/variables.gradle")).unwrap();

    let mut project = MobileProject::load(&root, "platforms");
    let report = configure(&mut project, Platform::Android).expect("pass still succeeds");
    assert_eq!(report.skipped, vec!["sdk versions".to_string()]);
}

#[test]
fn android_missing_app_gradle_is_fatal() {
    let (_temp, root) = fixture_repo();
    fs::remove_file(root.join("platforms/android/app/build.gradle")).unwrap();

    let mut project = MobileProject::load(&root, "platforms");
    let err = configure(&mut project, Platform::Android).unwrap_err();
    assert!(format!("{err:#}").contains("build.gradle"));
}

const IOS: &str = "platforms/ios/App";
const PBXPROJ: &str = "platforms/ios/App/App.xcodeproj/project.pbxproj";

#[test]
fn ios_pass_writes_identity_and_plugins() {
    let (_temp, root) = fixture_repo();
    let mut project = run_pass(&root, Platform::Ios);
    project.commit().expect("commit");

    let pbx = read_pbx(&root);
    let setting = |key: &str| pbx.build_setting("App", Some("Release"), key);
    assert_eq!(
        setting("PRODUCT_BUNDLE_IDENTIFIER").as_deref(),
        Some("uk.co.ronoc.watchr")
    );
    assert_eq!(setting("MARKETING_VERSION").as_deref(), Some("1.2.3"));
    assert_eq!(
        setting("CURRENT_PROJECT_VERSION").as_deref(),
        Some("1020304")
    );
    assert_eq!(setting("DEVELOPMENT_TEAM").as_deref(), Some("ABCDE12345"));
    assert_eq!(
        setting("IPHONEOS_DEPLOYMENT_TARGET").as_deref(),
        Some("15.0")
    );
    assert_eq!(
        setting("CODE_SIGN_ENTITLEMENTS").as_deref(),
        Some("App/App.entitlements")
    );

    let info = read_plist(&root, &format!("{IOS}/App/Info.plist"));
    let get_str = |key: &str| info.get(key).and_then(Value::as_string);
    let get_bool = |key: &str| info.get(key).and_then(Value::as_boolean);
    assert_eq!(get_str("CFBundleDisplayName"), Some("watchR"));
    assert_eq!(
        get_str("CFBundleShortVersionString"),
        Some("$(MARKETING_VERSION)")
    );
    assert_eq!(get_bool("ITSAppUsesNonExemptEncryption"), Some(false));
    assert_eq!(get_bool("UIStatusBarHidden"), Some(true));

    let entitlements = read_plist(&root, &format!("{IOS}/App/App.entitlements"));
    let aps = entitlements
        .get("aps-environment")
        .and_then(Value::as_string);
    assert_eq!(aps, Some("development"));

    let podfile = read(&root, &format!("{IOS}/Podfile"));
    let firebase = "  # Add your Pods here\n  pod 'FirebaseMessaging'\nend";
    assert!(podfile.contains(firebase));

    let target = root.join(IOS).join("App");
    assert!(target.join("GoogleService-Info.plist").is_file());
    let splash = target.join("Assets.xcassets/Splash.imageset/splash-2732x2732.png");
    assert!(splash.is_file());
}

#[test]
fn ios_resource_under_target_group_has_prefix_stripped() {
    let (_temp, root) = fixture_repo();
    let mut project = run_pass(&root, Platform::Ios);
    project.commit().expect("commit");

    let pbx = read_pbx(&root);
    let app_group = pbx.group_by_name_or_path("App").expect("App group");
    let children: Vec<String> = pbx
        .object(&app_group)
        .and_then(|g| g.get("children"))
        .and_then(|c| c.as_array())
        .unwrap()
        .iter()
        .filter_map(|id| id.as_str())
        .filter_map(|id| pbx.object(id))
        .filter_map(|f| f.get_str("path"))
        .map(str::to_string)
        .collect();
    assert!(children.contains(&"GoogleService-Info.plist".to_string()));
    assert!(children.contains(&"sound.caf".to_string()));
    assert!(!children.iter().any(|p| p.starts_with("App/")));
    assert!(pbx.group_by_name("Resources").is_some());
}

#[test]
fn ios_second_pass_converges() {
    let (_temp, root) = fixture_repo();
    run_pass(&root, Platform::Ios)
        .commit()
        .expect("first commit");

    let mut again = run_pass(&root, Platform::Ios);
    assert_eq!(again.diff().unwrap(), "");
    assert!(again.commit().expect("second commit").written.is_empty());

    let privacy = read_plist(&root, &format!("{IOS}/App/PrivacyInfo.xcprivacy"));
    let types = privacy
        .get("NSPrivacyAccessedAPITypes")
        .and_then(|v| v.as_array())
        .expect("api types");
    assert_eq!(types.len(), 2);
}

#[test]
fn ios_privacy_manifest_is_written_to_the_target_folder() {
    let (_temp, root) = fixture_repo();
    run_pass(&root, Platform::Ios).commit().expect("commit");

    let manifest = root.join(IOS).join("App/PrivacyInfo.xcprivacy");
    assert!(manifest.is_file());
    let beside_target = root.join(IOS).join("PrivacyInfo.xcprivacy");
    assert!(!beside_target.exists());
}

#[test]
fn ios_missing_podfile_is_fatal() {
    let (_temp, root) = fixture_repo();
    fs::remove_file(root.join(IOS).join("Podfile")).unwrap();

    let mut project = MobileProject::load(&root, "platforms");
    let err = configure(&mut project, Platform::Ios).unwrap_err();
    assert!(format!("{err:#}").contains("Podfile"));
}

#[test]
fn dry_run_reports_without_writing() {
    let (_temp, root) = fixture_repo();
    let before = read(&root, &format!("{ANDROID_MAIN}/AndroidManifest.xml"));

    let mut project = MobileProject::load(&root, "platforms").with_dry_run(true);
    configure(&mut project, Platform::Android).unwrap();
    let diff = project.diff().unwrap();
    let added =
        "+    <uses-permission android:name=\"android.permission.ACCESS_MEDIA_LOCATION\" />";
    assert!(diff.contains(added));

    let summary = project.commit().unwrap();
    assert!(summary.dry_run);
    assert!(!summary.written.is_empty());
    let after = read(&root, &format!("{ANDROID_MAIN}/AndroidManifest.xml"));
    assert_eq!(after, before);
}
