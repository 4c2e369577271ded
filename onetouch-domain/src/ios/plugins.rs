use super::{IosContext, IosPlugin, dict, string};
use crate::project::MobileProject;
use crate::report::PassReport;
use anyhow::Context;
use onetouch_edit::Podfile;
use plist::Value;

const CAMERA_USAGE: &str = "\
    In some workflows users can take photos to attach to records raised in the app. This is \
    usually to provide evidence or for compliance reasons. The camera is also used for \
    scanning QR codes and barcodes.";
const PHOTO_ADD_USAGE: &str = "\
    In some workflows users can take photos to attach to records raised in the app. This is \
    usually to provide evidence or for compliance reasons. The photos are stored in the Photo \
    Library so that if the device is unable to connect to our servers, the photos can be \
    uploaded once connectivity is restored.";
const PHOTO_LIBRARY_USAGE: &str = "\
    In workflows which allow photos to be attached for evidence or compliance reasons, users \
    need to be able to attach existing photos from their library.";
const LOCATION_USAGE: &str = "\
    On some workflows, location data is used to record where the record was created, for \
    safety & compliance reasons. Location data is not continuously tracked or logged, it is \
    only stamped onto a record at the time it is created. Location data may also be used for \
    geofencing if required for a workflow.";
const NFC_USAGE: &str = "\
    NFC tags are used by some workflows for automatically recording that a record is being \
    created at a specific location - for instance, this can be used to set up a \
    client-specific patrol, where the user must record they have reached certain checkpoints. \
    NFC tags are always used in some cases to swap workflows, or record the beginning of a \
    session.";

const PODS_MARKER: &str = "# Add your Pods here";
const FIREBASE_POD: &str = "pod 'FirebaseMessaging'";

/// The plugins of a full iOS pass, in the order they run.
pub fn builtin_plugins() -> Vec<Box<dyn IosPlugin>> {
    vec![
        Box::new(AppPlugin),
        Box::new(BadgePlugin),
        Box::new(CameraPlugin),
        Box::new(FilesystemPlugin),
        Box::new(GeolocationPlugin),
        Box::new(PushNotificationsPlugin),
        Box::new(NfcPlugin),
        Box::new(SplashScreenPlugin),
        Box::new(StatusBarPlugin),
    ]
}

/// Registers the custom URL scheme.
pub struct AppPlugin;

impl IosPlugin for AppPlugin {
    fn name(&self) -> &'static str {
        "app"
    }

    fn apply(
        &self,
        ctx: &IosContext<'_>,
        project: &mut MobileProject,
        report: &mut PassReport,
    ) -> anyhow::Result<()> {
        let url_type = dict([
            ("CFBundleURLName", string("")),
            (
                "CFBundleURLSchemes",
                Value::Array(vec![string(&ctx.descriptor.custom_url_scheme)]),
            ),
        ]);
        let url_types = Value::Array(vec![Value::Dictionary(url_type)]);
        let entries = dict([("CFBundleURLTypes", url_types)]);
        report.changed(ctx.update_info_plist(project, entries)?);
        Ok(())
    }
}

pub struct BadgePlugin;

impl IosPlugin for BadgePlugin {
    fn name(&self) -> &'static str {
        "badge"
    }

    fn apply(
        &self,
        ctx: &IosContext<'_>,
        project: &mut MobileProject,
        report: &mut PassReport,
    ) -> anyhow::Result<()> {
        let outcome = ctx.declare_api_access(
            project,
            "NSPrivacyAccessedAPICategoryUserDefaults",
            "CA92.1",
        )?;
        report.record(outcome);
        Ok(())
    }
}

pub struct CameraPlugin;

impl IosPlugin for CameraPlugin {
    fn name(&self) -> &'static str {
        "camera"
    }

    fn apply(
        &self,
        ctx: &IosContext<'_>,
        project: &mut MobileProject,
        report: &mut PassReport,
    ) -> anyhow::Result<()> {
        let entries = dict([
            ("NSCameraUsageDescription", string(CAMERA_USAGE)),
            ("NSPhotoLibraryAddUsageDescription", string(PHOTO_ADD_USAGE)),
            ("NSPhotoLibraryUsageDescription", string(PHOTO_LIBRARY_USAGE)),
        ]);
        report.changed(ctx.update_info_plist(project, entries)?);
        Ok(())
    }
}

/// File sharing flags plus the file-timestamp privacy declaration.
pub struct FilesystemPlugin;

impl IosPlugin for FilesystemPlugin {
    fn name(&self) -> &'static str {
        "filesystem"
    }

    fn apply(
        &self,
        ctx: &IosContext<'_>,
        project: &mut MobileProject,
        report: &mut PassReport,
    ) -> anyhow::Result<()> {
        let entries = dict([
            ("UIFileSharingEnabled", Value::Boolean(true)),
            ("LSSupportsOpeningDocumentsInPlace", Value::Boolean(true)),
        ]);
        report.changed(ctx.update_info_plist(project, entries)?);

        let outcome = ctx.declare_api_access(
            project,
            "NSPrivacyAccessedAPICategoryFileTimestamp",
            "C617.1",
        )?;
        report.record(outcome);
        Ok(())
    }
}

pub struct GeolocationPlugin;

impl IosPlugin for GeolocationPlugin {
    fn name(&self) -> &'static str {
        "geolocation"
    }

    fn apply(
        &self,
        ctx: &IosContext<'_>,
        project: &mut MobileProject,
        report: &mut PassReport,
    ) -> anyhow::Result<()> {
        let entries = dict([(
            "NSLocationWhenInUseUsageDescription",
            string(LOCATION_USAGE),
        )]);
        report.changed(ctx.update_info_plist(project, entries)?);
        Ok(())
    }
}

/// Push entitlement, Firebase configuration files and the messaging pod.
pub struct PushNotificationsPlugin;

impl IosPlugin for PushNotificationsPlugin {
    fn name(&self) -> &'static str {
        "push-notifications"
    }

    fn apply(
        &self,
        ctx: &IosContext<'_>,
        project: &mut MobileProject,
        report: &mut PassReport,
    ) -> anyhow::Result<()> {
        let entitlements = dict([("aps-environment", string("development"))]);
        report.changed(ctx.add_entitlements(project, entitlements)?);

        project.copy_dir(ctx.assets().join("ios/extras"), ctx.target_dir())?;
        let resources = [
            format!("{}/GoogleService-Info.plist", ctx.target),
            format!("{}/sound.caf", ctx.target),
        ];
        let added = ctx.add_resource_files(project, &resources)?;
        report.changed(added > 0);

        let path = ctx.ios_dir().join("Podfile");
        let podfile = project.require::<Podfile>(&path)?;
        if podfile.contains(FIREBASE_POD) {
            report.changed(false);
        } else {
            podfile
                .insert_after_marker(PODS_MARKER, &format!("  {FIREBASE_POD}"))
                .with_context(|| format!("add {FIREBASE_POD} to {path}"))?;
            report.changed(true);
        }
        Ok(())
    }
}

pub struct NfcPlugin;

impl IosPlugin for NfcPlugin {
    fn name(&self) -> &'static str {
        "nfc"
    }

    fn apply(
        &self,
        ctx: &IosContext<'_>,
        project: &mut MobileProject,
        report: &mut PassReport,
    ) -> anyhow::Result<()> {
        let entitlements = dict([(
            "com.apple.developer.nfc.readersession.formats",
            Value::Array(vec![string("TAG")]),
        )]);
        report.changed(ctx.add_entitlements(project, entitlements)?);

        let entries = dict([("NFCReaderUsageDescription", string(NFC_USAGE))]);
        report.changed(ctx.update_info_plist(project, entries)?);
        Ok(())
    }
}

/// Swaps the app icon and splash image sets for the default bundle.
pub struct SplashScreenPlugin;

impl IosPlugin for SplashScreenPlugin {
    fn name(&self) -> &'static str {
        "splash-screen"
    }

    fn apply(
        &self,
        ctx: &IosContext<'_>,
        project: &mut MobileProject,
        _report: &mut PassReport,
    ) -> anyhow::Result<()> {
        let catalog = ctx.target_dir().join("Assets.xcassets");
        project.remove_dir(catalog.join("AppIcon.appiconset"));
        project.remove_dir(catalog.join("Splash.imageset"));
        project.copy_dir(ctx.assets().join("ios/default"), catalog)
    }
}

pub struct StatusBarPlugin;

impl IosPlugin for StatusBarPlugin {
    fn name(&self) -> &'static str {
        "status-bar"
    }

    fn apply(
        &self,
        ctx: &IosContext<'_>,
        project: &mut MobileProject,
        report: &mut PassReport,
    ) -> anyhow::Result<()> {
        let entries = dict([
            (
                "UIViewControllerBasedStatusBarAppearance",
                Value::Boolean(true),
            ),
            ("UIStatusBarHidden", Value::Boolean(true)),
        ]);
        report.changed(ctx.update_info_plist(project, entries)?);
        Ok(())
    }
}
