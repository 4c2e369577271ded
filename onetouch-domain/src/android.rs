//! Android configurator.
//!
//! Identity and version writes to `app/build.gradle` are mandatory. Every other feature
//! degrades: a missing manifest, resource file or Gradle variables file skips that feature
//! and the pass carries on.

use crate::project::MobileProject;
use crate::report::PassReport;
use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use onetouch_edit::{EditResult, GradleFile, XmlDocument, apply_mutation};
use onetouch_types::{AttrMatch, BuildDescriptor, Mutation, Platform, Selector};
use quick_xml::escape::escape;
use tracing::{debug, info};

const APP_GRADLE: &str = "app/build.gradle";
const VARIABLES_GRADLE: &str = "variables.gradle";
const MANIFEST: &str = "app/src/main/AndroidManifest.xml";
const RES_DIR: &str = "app/src/main/res";

const MAIN_ACTIVITY: &str = ".MainActivity";
const VIEW_ACTION: &str = "android.intent.action.VIEW";
const CONFIG_CHANGES: &str = "\
    orientation|keyboardHidden|keyboard|screenSize|locale|smallestScreenSize|screenLayout|\
    uiMode|navigation|fontScale|density|fontWeightAdjustment";

pub const REQUIRED_PERMISSIONS: [&str; 3] = [
    "android.permission.ACCESS_MEDIA_LOCATION",
    "android.permission.READ_EXTERNAL_STORAGE",
    "android.permission.MANAGE_EXTERNAL_STORAGE",
];

const URL_INTENT_FILTER: &str = r#"<intent-filter>
    <action android:name="android.intent.action.VIEW" />
    <category android:name="android.intent.category.DEFAULT" />
    <category android:name="android.intent.category.BROWSABLE" />
    <data android:scheme="@string/custom_url_scheme" />
</intent-filter>"#;

const FILE_PATHS_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<paths xmlns:android="http://schemas.android.com/apk/res/android">
    <root-path name="root" path="." />
    <files-path name="files" path="." />
    <cache-path name="cache" path="." />
    <external-files-path name="external-files" path="." />
    <external-cache-path name="external-cache" path="." />
    <external-path name="external" path="." />
</paths>
"#;

const SPLASH_STYLE_NAME: &str = "AppTheme.NoActionBarLaunch";
const SPLASH_STYLE: &str = r#"<style name="AppTheme.NoActionBarLaunch" parent="Theme.SplashScreen">
    <item name="windowSplashScreenBackground">@color/ic_launcher_background</item>
    <item name="windowSplashScreenAnimatedIcon">@drawable/ic_launcher_foreground</item>
    <item name="windowSplashScreenAnimationDuration">3000</item>
    <item name="postSplashScreenTheme">@style/AppTheme.NoActionBar</item>
</style>"#;

pub struct AndroidConfigurator<'a> {
    descriptor: &'a BuildDescriptor,
    assets: Utf8PathBuf,
    attr_match: AttrMatch,
}

impl<'a> AndroidConfigurator<'a> {
    /// `assets` is the asset root relative to the project root (`bin/assets`).
    pub fn new(descriptor: &'a BuildDescriptor, assets: impl Into<Utf8PathBuf>) -> Self {
        Self {
            descriptor,
            assets: assets.into(),
            attr_match: AttrMatch::Exact,
        }
    }

    /// How attribute predicates in manifest and resource selectors compare names.
    pub fn with_attr_match(mut self, mode: AttrMatch) -> Self {
        self.attr_match = mode;
        self
    }

    pub fn configure(&self, project: &mut MobileProject) -> anyhow::Result<PassReport> {
        let dir = project.android_dir();
        let mut report = PassReport::new(Platform::Android);
        info!(
            platform = "android",
            op = "configure",
            app_id = %self.descriptor.app_id,
            "configuring"
        );

        self.identity(project, &dir, &mut report)?;
        self.manifest(project, &dir, &mut report)?;
        self.sdk_versions(project, &dir, &mut report)?;
        self.strings(project, &dir, &mut report)?;
        self.file_paths(project, &dir)?;
        self.splash_style(project, &dir, &mut report)?;
        self.replace_assets(project, &dir, &mut report)?;

        debug!(
            platform = "android",
            applied = report.applied,
            unchanged = report.unchanged,
            skipped = report.skipped.len(),
            "configure done"
        );
        Ok(report)
    }

    fn main_activity(&self) -> Selector {
        Selector::keys(["manifest", "application"])
            .child_where("activity", "android:name", MAIN_ACTIVITY)
            .with_match(self.attr_match)
    }

    fn identity(
        &self,
        project: &mut MobileProject,
        dir: &Utf8Path,
        report: &mut PassReport,
    ) -> anyhow::Result<()> {
        let d = self.descriptor;
        let path = dir.join(APP_GRADLE);
        let gradle: &mut GradleFile = project
            .require(&path)
            .context("android identity cannot be written")?;

        let writes = [
            ("applicationId", groovy_string(&d.app_id)),
            ("versionCode", d.version.version_code().to_string()),
            ("versionName", groovy_string(&d.version.version_name())),
        ];
        for (key, rhs) in writes {
            let changed = gradle
                .replace_property(&["android", "defaultConfig", key], &rhs)
                .with_context(|| format!("set {key} in {path}"))?;
            report.changed(changed);
        }
        Ok(())
    }

    fn manifest(
        &self,
        project: &mut MobileProject,
        dir: &Utf8Path,
        report: &mut PassReport,
    ) -> anyhow::Result<()> {
        let path = dir.join(MANIFEST);
        let Some(manifest) = project.document::<XmlDocument>(&path)? else {
            report.skip("manifest", format!("{path} not found"));
            return Ok(());
        };

        let application = Selector::keys(["manifest", "application"]);
        let applied = manifest.set_attrs(&application, &[("android:extractNativeLibs", "true")]);
        if let Some(n) = soft(report, "native libs flag", applied)? {
            report.changed(n > 0);
        }

        let activity = self.main_activity();
        let applied = manifest.set_attrs(
            &activity,
            &[
                ("android:label", "@string/app_name"),
                ("android:configChanges", CONFIG_CHANGES),
                ("android:supportsPictureInPicture", "true"),
            ],
        );
        if let Some(n) = soft(report, "main activity", applied)? {
            report.changed(n > 0);
        }

        let intent_filter = Mutation::InsertIfAbsent {
            probe: activity
                .clone()
                .child("intent-filter")
                .child_where("action", "android:name", VIEW_ACTION)
                .with_match(self.attr_match),
            parent: activity,
            fragment: URL_INTENT_FILTER.to_string(),
        };
        let applied = apply_mutation(manifest, &intent_filter);
        if let Some(outcome) = soft(report, "url intent filter", applied)? {
            report.record(outcome);
        }

        for name in REQUIRED_PERMISSIONS {
            let permission = Mutation::InsertIfAbsent {
                probe: Selector::keys(["manifest"])
                    .child_where("uses-permission", "android:name", name)
                    .with_match(self.attr_match),
                parent: Selector::keys(["manifest"]),
                fragment: format!("<uses-permission android:name=\"{name}\" />"),
            };
            let outcome = apply_mutation(manifest, &permission)
                .with_context(|| format!("add {name} to {path}"))?;
            report.record(outcome);
        }
        Ok(())
    }

    fn sdk_versions(
        &self,
        project: &mut MobileProject,
        dir: &Utf8Path,
        report: &mut PassReport,
    ) -> anyhow::Result<()> {
        let path = dir.join(VARIABLES_GRADLE);
        let Some(variables) = project.document::<GradleFile>(&path)? else {
            report.skip("sdk versions", format!("{path} not found"));
            return Ok(());
        };

        let d = self.descriptor;
        let wanted = [
            ("minSdkVersion", d.min_sdk_version),
            ("compileSdkVersion", d.compile_sdk_version),
            ("targetSdkVersion", d.target_sdk_version),
        ];
        for (name, want) in wanted {
            let current = variables.first_integer(&["ext", name]);
            if current == Some(u64::from(want)) {
                debug!(name, want, "sdk version already set");
                report.changed(false);
                continue;
            }
            let written = variables.replace_property(&["ext", name], &format!("= {want}"));
            if let Some(changed) = soft(report, "sdk versions", written)? {
                debug!(name, ?current, want, "sdk version written");
                report.changed(changed);
            }
        }
        Ok(())
    }

    fn strings(
        &self,
        project: &mut MobileProject,
        dir: &Utf8Path,
        report: &mut PassReport,
    ) -> anyhow::Result<()> {
        let path = dir.join(RES_DIR).join("values/strings.xml");
        let Some(strings) = project.document::<XmlDocument>(&path)? else {
            report.skip("string resources", format!("{path} not found"));
            return Ok(());
        };

        let d = self.descriptor;
        let entries = [
            ("app_name", d.app_name.as_str()),
            ("title_activity_main", d.app_name.as_str()),
            ("package_name", d.app_id.as_str()),
            ("custom_url_scheme", d.custom_url_scheme.as_str()),
        ];
        for (name, value) in entries {
            let outcome = apply_mutation(strings, &self.string_upsert(name, value))
                .with_context(|| format!("upsert string {name} in {path}"))?;
            report.record(outcome);
        }
        Ok(())
    }

    fn string_upsert(&self, name: &str, value: &str) -> Mutation<String> {
        Mutation::Upsert {
            target: Selector::keys(["resources"])
                .child_where("string", "name", name)
                .with_match(self.attr_match),
            parent: Selector::keys(["resources"]),
            fragment: format!("<string name=\"{name}\">{}</string>", escape(value)),
        }
    }

    fn file_paths(&self, project: &mut MobileProject, dir: &Utf8Path) -> anyhow::Result<()> {
        let path = dir.join(RES_DIR).join("xml/file_paths.xml");
        let doc = XmlDocument::parse(FILE_PATHS_XML).context("file provider paths")?;
        project.put_document(&path, doc)
    }

    fn splash_style(
        &self,
        project: &mut MobileProject,
        dir: &Utf8Path,
        report: &mut PassReport,
    ) -> anyhow::Result<()> {
        let path = dir.join(RES_DIR).join("values/styles.xml");
        let Some(styles) = project.document::<XmlDocument>(&path)? else {
            report.skip("splash style", format!("{path} not found"));
            return Ok(());
        };

        let replace = Mutation::ReplaceIfPresent {
            target: Selector::keys(["resources"])
                .child_where("style", "name", SPLASH_STYLE_NAME)
                .with_match(self.attr_match),
            fragment: SPLASH_STYLE.to_string(),
        };
        let outcome =
            apply_mutation(styles, &replace).with_context(|| format!("splash style in {path}"))?;
        report.record(outcome);
        Ok(())
    }

    /// Swap every `drawable*` and `mipmap*` directory for the default asset bundle. Queued
    /// behind all document writes.
    fn replace_assets(
        &self,
        project: &mut MobileProject,
        dir: &Utf8Path,
        report: &mut PassReport,
    ) -> anyhow::Result<()> {
        let source = self.assets.join("android/default");
        if !project.abs(&source).is_dir() {
            report.skip("default assets", format!("{source} not found"));
            return Ok(());
        }
        let res = dir.join(RES_DIR);
        if !project.abs(&res).is_dir() {
            report.skip("default assets", format!("{res} not found"));
            return Ok(());
        }

        for name in project.list_dirs(&res)? {
            if name.starts_with("drawable") || name.starts_with("mipmap") {
                project.remove_dir(res.join(&name));
            }
        }
        project.copy_dir(source, res)
    }
}

/// Keep the value when the edit worked, record a skip when its target is missing, and fail
/// on anything else.
fn soft<T>(
    report: &mut PassReport,
    feature: &str,
    result: EditResult<T>,
) -> anyhow::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_missing_target() => {
            report.skip(feature, err);
            Ok(None)
        }
        Err(err) => Err(err).with_context(|| format!("android {feature}")),
    }
}

fn groovy_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}
