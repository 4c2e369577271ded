//! Native build & package stage.
//!
//! Android: clean the apk output, assemble with Gradle, then for release builds validate the
//! signing inputs, rename the unsigned apk and sign it in place. iOS: clean the intermediate
//! build directory, archive, then export with the configuration's export options.

use crate::ports::{Invocation, ProcessPort, SpawnOptions};
use crate::settings::CoreSettings;
use anyhow::{Context, bail, ensure};
use camino::Utf8PathBuf;
use fs_err as fs;
use onetouch_types::{BuildDescriptor, CommandOptions, Platform, StdioMode};
use tracing::info;

const IOS_DESTINATION: &str = "generic/platform=iOS";

/// Where a package stage left its artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOutcome {
    pub platform: Platform,
    pub artifact: Utf8PathBuf,
}

pub fn package(
    settings: &CoreSettings,
    options: &CommandOptions,
    descriptor: &BuildDescriptor,
    process: &dyn ProcessPort,
) -> anyhow::Result<PackageOutcome> {
    let artifact = match options.platform {
        Platform::Android => package_android(settings, options, descriptor, process)?,
        Platform::Ios => package_ios(settings, options, descriptor, process)?,
    };
    info!(
        platform = %options.platform,
        op = "build",
        artifact = %artifact,
        "Output at: {artifact}"
    );
    Ok(PackageOutcome {
        platform: options.platform,
        artifact,
    })
}

pub fn package_android(
    settings: &CoreSettings,
    options: &CommandOptions,
    descriptor: &BuildDescriptor,
    process: &dyn ProcessPort,
) -> anyhow::Result<Utf8PathBuf> {
    let defaults = SpawnOptions::defaults(&settings.project_root, options.stdio);
    let platform_dir = settings.abs(&settings.paths.platforms).join("android");
    let build_type = options.build_type();
    let output_dir = platform_dir.join("app/build/outputs/apk").join(build_type);
    let output = output_dir.join(format!("app-{build_type}.apk"));

    if output_dir.exists() {
        fs::remove_dir_all(&output_dir)?;
    }

    info!(
        platform = "android",
        op = "build",
        build_type,
        "running gradle build"
    );
    let task = if options.release {
        "assembleRelease"
    } else {
        "assembleDebug"
    };
    let spawn = SpawnOptions::in_dir(&platform_dir).merge_over(&defaults);
    let gradle =
        Invocation::new(&settings.tools.gradle, [task, "--stacktrace"]).with_options(spawn);
    process.run(&gradle).context("gradle build")?;

    if !options.release {
        ensure!(
            output.is_file(),
            "gradle finished but {output} was not produced"
        );
        return Ok(output);
    }

    let signing = &descriptor.android.build_options;
    let missing = signing.missing();
    if !missing.is_empty() {
        bail!(
            "missing options for android signing: {}. Supply all of keystorePath, \
             keystorePassword, keystoreAlias and keystoreAliasPassword",
            missing.join(", ")
        );
    }
    let (Some(keystore), Some(keystore_pass), Some(alias), Some(alias_pass)) = (
        signing.keystore_path.as_deref(),
        signing.keystore_password.as_deref(),
        signing.keystore_alias.as_deref(),
        signing.keystore_alias_password.as_deref(),
    ) else {
        bail!("android signing options are incomplete");
    };

    let unsigned = output_dir.join(format!("app-{build_type}-unsigned.apk"));
    fs::rename(&unsigned, &output).with_context(|| format!("rename {unsigned}"))?;

    info!(platform = "android", op = "build", "signing release");
    let args = vec![
        "sign".to_string(),
        "--ks".to_string(),
        keystore.to_string(),
        "--ks-pass".to_string(),
        format!("pass:{keystore_pass}"),
        "--ks-key-alias".to_string(),
        alias.to_string(),
        "--key-pass".to_string(),
        format!("pass:{alias_pass}"),
        "--pass-encoding".to_string(),
        "utf-8".to_string(),
        output.to_string(),
    ];
    let sign = Invocation::new(&settings.tools.apksigner, args).with_options(
        SpawnOptions::default()
            .with_stdio(StdioMode::Ignore)
            .redacted()
            .merge_over(&defaults),
    );
    process.run(&sign).context("sign release apk")?;

    Ok(output)
}

pub fn package_ios(
    settings: &CoreSettings,
    options: &CommandOptions,
    descriptor: &BuildDescriptor,
    process: &dyn ProcessPort,
) -> anyhow::Result<Utf8PathBuf> {
    let defaults = SpawnOptions::defaults(&settings.project_root, options.stdio);
    let platform_dir = settings.abs(&settings.paths.platforms).join("ios");
    let build_dir = platform_dir.join("build");

    if build_dir.exists() {
        fs::remove_dir_all(&build_dir)?;
    }

    let scheme = descriptor.ios.scheme_or_default();
    let configuration = options.configuration();
    let archive = build_dir.join(format!("{scheme}.xcarchive"));
    let spawn = SpawnOptions::in_dir(platform_dir.join(scheme)).merge_over(&defaults);

    info!(
        platform = "ios",
        op = "build",
        scheme,
        configuration,
        "running xcode archive"
    );
    let archive_args = vec![
        "archive".to_string(),
        "-workspace".to_string(),
        settings.ios_workspace.clone(),
        "-scheme".to_string(),
        scheme.to_string(),
        "-destination".to_string(),
        IOS_DESTINATION.to_string(),
        "-configuration".to_string(),
        configuration.to_string(),
        "-archivePath".to_string(),
        archive.to_string(),
    ];
    let invocation =
        Invocation::new(&settings.tools.xcodebuild, archive_args).with_options(spawn.clone());
    process.run(&invocation).context("xcode archive")?;

    let export_args = vec![
        "-exportArchive".to_string(),
        "-archivePath".to_string(),
        archive.to_string(),
        "-exportOptionsPlist".to_string(),
        format!("ExportOptions.{configuration}.plist"),
        "-exportPath".to_string(),
        build_dir.to_string(),
    ];
    let invocation = Invocation::new(&settings.tools.xcodebuild, export_args).with_options(spawn);
    process.run(&invocation).context("xcode export")?;

    Ok(build_dir.join(format!("{scheme}.ipa")))
}
