//! iOS configurator.
//!
//! The pass resolves the Xcode target and build names once, writes identity and version into
//! the project graph and Info.plist, then runs each [`IosPlugin`] in order. Unlike Android,
//! every file the pass touches is expected to exist once the platform is added, so a missing
//! project file, Info.plist or Podfile fails the pass.

mod plugins;

use crate::project::MobileProject;
use crate::report::PassReport;
use anyhow::{Context, anyhow};
use camino::{Utf8Path, Utf8PathBuf};
use onetouch_edit::plist_file::ROOT_SEGMENT;
use onetouch_edit::{PbxProject, PlistDocument, apply_mutation};
use onetouch_types::{BuildDescriptor, Mutation, MutationOutcome, Platform, Selector};
use plist::{Dictionary, Value};
use tracing::{debug, info};

pub use plugins::builtin_plugins;

const PBXPROJ: &str = "App.xcodeproj/project.pbxproj";
const DEFAULT_TARGET: &str = "App";
const DEFAULT_INFO_PLIST: &str = "App/Info.plist";
const PRIVACY_MANIFEST: &str = "PrivacyInfo.xcprivacy";
const RESOURCES_GROUP: &str = "Resources";

/// One named group of iOS edits.
pub trait IosPlugin {
    fn name(&self) -> &'static str;

    fn apply(
        &self,
        ctx: &IosContext<'_>,
        project: &mut MobileProject,
        report: &mut PassReport,
    ) -> anyhow::Result<()>;
}

/// State resolved once at the start of an iOS pass and shared by every plugin.
#[derive(Debug, Clone)]
pub struct IosContext<'a> {
    pub descriptor: &'a BuildDescriptor,
    pub target: String,
    pub build: Option<String>,
    assets: &'a Utf8Path,
    ios_dir: Utf8PathBuf,
    pbx_path: Utf8PathBuf,
    info_plist: Utf8PathBuf,
}

impl<'a> IosContext<'a> {
    pub fn build(&self) -> Option<&str> {
        self.build.as_deref()
    }

    /// The asset root relative to the project root.
    pub fn assets(&self) -> &Utf8Path {
        self.assets
    }

    /// The Xcode project directory.
    pub fn ios_dir(&self) -> &Utf8Path {
        &self.ios_dir
    }

    /// The app target's source folder.
    pub fn target_dir(&self) -> Utf8PathBuf {
        self.ios_dir.join(&self.target)
    }

    pub fn info_plist_path(&self) -> &Utf8Path {
        &self.info_plist
    }

    pub fn privacy_manifest_path(&self) -> Utf8PathBuf {
        self.target_dir().join(PRIVACY_MANIFEST)
    }

    pub fn pbx<'p>(&self, project: &'p mut MobileProject) -> anyhow::Result<&'p mut PbxProject> {
        project.require(&self.pbx_path)
    }

    /// Overwrite top-level Info.plist keys. Returns whether anything changed.
    pub fn update_info_plist(
        &self,
        project: &mut MobileProject,
        entries: Dictionary,
    ) -> anyhow::Result<bool> {
        let plist = project.require::<PlistDocument>(&self.info_plist)?;
        Ok(plist.update(entries, true))
    }

    /// Declare a required-reason API in the privacy manifest, creating the manifest when the
    /// project has none. An existing entry for `api_type` is left alone.
    pub fn declare_api_access(
        &self,
        project: &mut MobileProject,
        api_type: &str,
        reason: &str,
    ) -> anyhow::Result<MutationOutcome> {
        let path = self.privacy_manifest_path();
        let doc = project.document_or_create(&path, PlistDocument::empty)?;
        let mutation = Mutation::AppendIfNotMatching {
            list: Selector::keys([ROOT_SEGMENT, "NSPrivacyAccessedAPITypes"]),
            field: "NSPrivacyAccessedAPIType".to_string(),
            value: api_type.to_string(),
            fragment: Value::Dictionary(dict([
                ("NSPrivacyAccessedAPIType", string(api_type)),
                (
                    "NSPrivacyAccessedAPITypeReasons",
                    Value::Array(vec![string(reason)]),
                ),
            ])),
        };
        apply_mutation(doc, &mutation).with_context(|| format!("privacy manifest {path}"))
    }

    /// The target's entitlements file. When `CODE_SIGN_ENTITLEMENTS` is unset it is pointed
    /// at `<target>/<target>.entitlements`.
    pub fn entitlements_path(&self, project: &mut MobileProject) -> anyhow::Result<Utf8PathBuf> {
        let pbx = self.pbx(project)?;
        let rel = match pbx.build_setting(&self.target, self.build(), "CODE_SIGN_ENTITLEMENTS") {
            Some(path) => project_relative(&path),
            None => {
                let path = format!("{0}/{0}.entitlements", self.target);
                pbx.set_build_setting(&self.target, self.build(), "CODE_SIGN_ENTITLEMENTS", &path)?;
                path
            }
        };
        Ok(self.ios_dir.join(rel))
    }

    /// Merge entries into the entitlements file. Returns whether anything changed.
    pub fn add_entitlements(
        &self,
        project: &mut MobileProject,
        entries: Dictionary,
    ) -> anyhow::Result<bool> {
        let path = self.entitlements_path(project)?;
        let doc = project.document_or_create(&path, PlistDocument::empty)?;
        Ok(doc.update(entries, false))
    }

    /// Register files as bundle resources of the target.
    ///
    /// A path whose first segment is the target name goes under the target's group with that
    /// segment stripped; anything else goes under the project's anonymous root group. Returns
    /// how many files were newly added.
    pub fn add_resource_files(
        &self,
        project: &mut MobileProject,
        items: &[String],
    ) -> anyhow::Result<usize> {
        let target = self.target.as_str();
        let pbx = self.pbx(project)?;
        if pbx.group_by_name(RESOURCES_GROUP).is_none() {
            pbx.add_group(RESOURCES_GROUP, RESOURCES_GROUP)?;
        }
        let app_group = pbx.group_by_name_or_path(target);
        let fallback = pbx.anonymous_group();

        let mut added = 0;
        for item in items {
            let (group, path) = match (item.split_once('/'), &app_group) {
                (Some((first, rest)), Some(group)) if first == target => {
                    (group.clone(), rest.to_string())
                }
                _ => {
                    let group = fallback
                        .clone()
                        .ok_or_else(|| anyhow!("no project group can hold {item}"))?;
                    (group, item.clone())
                }
            };
            if pbx.add_resource_file(&path, &group, Some(target))? {
                debug!(path = %path, group = %group, "registered resource");
                added += 1;
            }
        }
        Ok(added)
    }
}

pub struct IosConfigurator<'a> {
    descriptor: &'a BuildDescriptor,
    assets: Utf8PathBuf,
    plugins: Vec<Box<dyn IosPlugin>>,
}

impl<'a> IosConfigurator<'a> {
    /// `assets` is the asset root relative to the project root (`bin/assets`).
    pub fn new(descriptor: &'a BuildDescriptor, assets: impl Into<Utf8PathBuf>) -> Self {
        Self {
            descriptor,
            assets: assets.into(),
            plugins: builtin_plugins(),
        }
    }

    pub fn with_plugins(mut self, plugins: Vec<Box<dyn IosPlugin>>) -> Self {
        self.plugins = plugins;
        self
    }

    pub fn configure(&self, project: &mut MobileProject) -> anyhow::Result<PassReport> {
        let mut report = PassReport::new(Platform::Ios);
        let ctx = self.resolve(project)?;
        info!(
            platform = "ios",
            op = "configure",
            app_id = %self.descriptor.app_id,
            target_name = %ctx.target,
            "configuring"
        );

        self.identity(&ctx, project, &mut report)?;
        for plugin in &self.plugins {
            debug!(platform = "ios", plugin = plugin.name(), "applying plugin");
            plugin
                .apply(&ctx, project, &mut report)
                .with_context(|| format!("ios {} plugin", plugin.name()))?;
        }

        debug!(
            platform = "ios",
            applied = report.applied,
            unchanged = report.unchanged,
            "configure done"
        );
        Ok(report)
    }

    /// Resolve target, build and Info.plist location before anything is edited.
    fn resolve(&self, project: &mut MobileProject) -> anyhow::Result<IosContext<'_>> {
        let ios_dir = project.ios_dir();
        let pbx_path = ios_dir.join(PBXPROJ);
        let pbx = project
            .require::<PbxProject>(&pbx_path)
            .context("ios project cannot be configured")?;

        let target = pbx
            .app_target_name()
            .unwrap_or_else(|| DEFAULT_TARGET.to_string());
        let build = None;
        let info_plist = pbx
            .build_setting(&target, build, "INFOPLIST_FILE")
            .map(|p| project_relative(&p))
            .unwrap_or_else(|| DEFAULT_INFO_PLIST.to_string());

        Ok(IosContext {
            descriptor: self.descriptor,
            target,
            build: build.map(str::to_string),
            assets: &self.assets,
            info_plist: ios_dir.join(info_plist),
            ios_dir,
            pbx_path,
        })
    }

    fn identity(
        &self,
        ctx: &IosContext<'_>,
        project: &mut MobileProject,
        report: &mut PassReport,
    ) -> anyhow::Result<()> {
        let d = self.descriptor;
        let version_name = d.version.version_name();
        let build_number = d.version.version_code().to_string();

        let mut settings = vec![
            ("PRODUCT_BUNDLE_IDENTIFIER", d.app_id.clone()),
            ("MARKETING_VERSION", version_name.clone()),
            ("CURRENT_PROJECT_VERSION", build_number.clone()),
        ];
        if let Some(team) = &d.ios_development_team {
            settings.push(("DEVELOPMENT_TEAM", team.clone()));
        }
        if let Some(version) = &d.target_ios_version {
            settings.push(("IPHONEOS_DEPLOYMENT_TARGET", version.clone()));
        }

        let pbx = ctx.pbx(project)?;
        for (key, value) in settings {
            let changed = pbx
                .set_build_setting(&ctx.target, ctx.build(), key, &value)
                .with_context(|| format!("set {key}"))?;
            report.changed(changed);
        }

        let plist = project.require::<PlistDocument>(ctx.info_plist_path())?;
        let mut entries = dict([
            ("CFBundleDisplayName", string(&d.app_name)),
            ("ITSAppUsesNonExemptEncryption", Value::Boolean(false)),
        ]);
        for (key, value) in [
            ("CFBundleShortVersionString", version_name),
            ("CFBundleVersion", build_number),
        ] {
            // Build-setting references resolve to the values written above.
            let is_reference = plist
                .get(key)
                .and_then(Value::as_string)
                .is_some_and(|s| s.starts_with("$("));
            if !is_reference {
                entries.insert(key.to_string(), Value::String(value));
            }
        }
        report.changed(plist.update(entries, true));
        Ok(())
    }
}

/// Build-setting paths may be written relative to `$(SRCROOT)`, which is the Xcode project
/// directory.
fn project_relative(path: &str) -> String {
    let path = path.trim_matches('"');
    path.strip_prefix("$(SRCROOT)/")
        .or_else(|| path.strip_prefix("${SRCROOT}/"))
        .unwrap_or(path)
        .to_string()
}

pub(crate) fn dict<const N: usize>(entries: [(&str, Value); N]) -> Dictionary {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

pub(crate) fn string(s: &str) -> Value {
    Value::String(s.to_string())
}
