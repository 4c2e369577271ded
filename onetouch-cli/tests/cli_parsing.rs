//! CLI end-to-end tests against a copy of the fixture project.
//!
//! `onetouch.toml` swaps every external tool for a stand-in: the bundler and scaffold are
//! `true`, Gradle is the fixture's shell script, and the signing tool always fails.

#![allow(deprecated)]

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const STUB_CONFIG: &str = r#"
stdio = "ignore"

[tools]
bundler = "true"
scaffold = "true"
gradle = "sh ./gradlew"
apksigner = "false"
"#;

fn onetouch() -> Command {
    Command::cargo_bin("onetouch").expect("onetouch binary")
}

fn copy_dir(from: &Path, to: &Path) {
    fs::create_dir_all(to).unwrap();
    for entry in fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let dest = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_dir(&entry.path(), &dest);
        } else {
            fs::copy(entry.path(), dest).unwrap();
        }
    }
}

fn fixture_project() -> TempDir {
    let src = Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .expect("workspace root")
        .join("tests/fixtures/capacitor_project/repo");
    let temp = tempfile::tempdir().expect("tempdir");
    copy_dir(&src, temp.path());
    fs::write(temp.path().join("onetouch.toml"), STUB_CONFIG).unwrap();
    temp
}

#[test]
fn test_help_lists_commands() {
    onetouch()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("list-configs"));
}

#[test]
fn test_unknown_platform_is_rejected() {
    let temp = fixture_project();
    onetouch()
        .current_dir(temp.path())
        .args(["sync", "windows"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value 'windows'"));
}

#[test]
fn test_list_configs_skips_base_profile() {
    let temp = fixture_project();
    onetouch()
        .current_dir(temp.path())
        .arg("list-configs")
        .assert()
        .success()
        .stdout(predicate::eq("staging\n"));

    onetouch()
        .current_dir(temp.path())
        .args(["list-configs", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"staging\""))
        .stdout(predicate::str::contains("default").not());
}

#[test]
fn test_unknown_config_lists_choices() {
    let temp = fixture_project();
    onetouch()
        .current_dir(temp.path())
        .args(["sync", "android", "--config", "nightly"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown config 'nightly'"))
        .stderr(predicate::str::contains("staging"));
}

#[test]
fn test_configure_dry_run_prints_diff_only() {
    let temp = fixture_project();
    let manifest = temp
        .path()
        .join("platforms/android/app/src/main/AndroidManifest.xml");
    let before = fs::read_to_string(&manifest).unwrap();

    onetouch()
        .current_dir(temp.path())
        .args(["configure", "android", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("AndroidManifest.xml"))
        .stdout(predicate::str::contains("versionCode 1020304"))
        .stdout(predicate::str::contains("# remove"));

    assert_eq!(fs::read_to_string(&manifest).unwrap(), before);
}

#[test]
fn test_debug_build_reports_apk() {
    let temp = fixture_project();
    onetouch()
        .current_dir(temp.path())
        .args(["build", "android"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "app/build/outputs/apk/debug/app-debug.apk",
        ));

    let gradle =
        fs::read_to_string(temp.path().join("platforms/android/app/build.gradle")).unwrap();
    assert!(gradle.contains("versionName \"1.2.3\""));
}

#[test]
fn test_default_project_root_reports_absolute_artifact() {
    let temp = fixture_project();
    let assert = onetouch()
        .current_dir(temp.path())
        .args(["build", "android"])
        .assert()
        .success();

    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).into_owned();
    let artifact = Path::new(stdout.trim_end());
    assert!(artifact.is_absolute(), "artifact path {stdout:?}");
    assert!(artifact.is_file());
}

#[test]
fn test_signing_failure_fails_release_build() {
    let temp = fixture_project();
    onetouch()
        .current_dir(temp.path())
        .args(["build", "android", "--release", "-c", "staging"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("sign release apk"));

    // The rename happened before signing.
    assert!(temp
        .path()
        .join("platforms/android/app/build/outputs/apk/release/app-release.apk")
        .exists());
}

#[test]
fn test_project_root_flag() {
    let temp = fixture_project();
    onetouch()
        .args(["list-configs", "--project-root"])
        .arg(temp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("staging"));
}

#[test]
fn test_before_sync_hook_raises_podfile_floor() {
    let temp = fixture_project();
    onetouch()
        .current_dir(temp.path())
        .args(["hook", "before-sync"])
        .env("CAPACITOR_PLATFORM_NAME", "ios")
        .env("CAPACITOR_ROOT_DIR", temp.path())
        .env("CAPACITOR_CONFIG", r#"{"ios":{"path":"platforms/ios"}}"#)
        .assert()
        .success();

    let podfile = fs::read_to_string(temp.path().join("platforms/ios/App/Podfile")).unwrap();
    assert!(podfile.contains("platform :ios, '14.0'"));
}

#[test]
fn test_before_sync_hook_ignores_android() {
    let temp = fixture_project();
    onetouch()
        .current_dir(temp.path())
        .args(["hook", "before-sync"])
        .env("CAPACITOR_PLATFORM_NAME", "android")
        .assert()
        .success();

    let podfile = fs::read_to_string(temp.path().join("platforms/ios/App/Podfile")).unwrap();
    assert!(podfile.contains("platform :ios, '13.0'"));
}
