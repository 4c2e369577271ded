//! Clap-free pipeline entry points.
//!
//! Every operation is a fixed sequence of stages over one descriptor and one set of options.
//! A failing stage aborts the rest of the sequence.

use crate::bundler::bundle_web_assets;
use crate::package::{PackageOutcome, package};
use crate::platform::{ScaffoldCommand, run_scaffold, wipe_platform};
use crate::ports::ProcessPort;
use crate::settings::CoreSettings;
use anyhow::Context;
use onetouch_domain::{CommitSummary, MobileProject, PassReport, configure_platform};
use onetouch_profiles::load_profiles;
use onetouch_types::{BuildDescriptor, CommandOptions};
use tracing::{info, warn};

/// Result of a configurator pass.
#[derive(Debug, Clone, Default)]
pub struct ConfigureOutcome {
    /// `None` when the platform has not been added yet.
    pub report: Option<PassReport>,
    pub summary: CommitSummary,
    /// Unified diff of the document edits, rendered before commit.
    pub diff: String,
}

/// Load `build.json` and resolve the descriptor for `options.config`.
pub fn load_descriptor(
    settings: &CoreSettings,
    options: &CommandOptions,
) -> anyhow::Result<BuildDescriptor> {
    let path = settings.profiles_path();
    let profiles = load_profiles(&path)?;
    Ok(profiles.resolve(options.config.as_deref())?)
}

/// Wipe the platform directory, bundle, then scaffold the platform afresh.
pub fn run_init(
    settings: &CoreSettings,
    options: &CommandOptions,
    process: &dyn ProcessPort,
) -> anyhow::Result<()> {
    wipe_platform(settings, options.platform)?;
    bundle_web_assets(settings, options, process).context("web bundler stage")?;
    run_scaffold(settings, options, ScaffoldCommand::Add, process)
}

/// Bundle, configure, then let the scaffold sync.
pub fn run_sync(
    settings: &CoreSettings,
    options: &CommandOptions,
    descriptor: &BuildDescriptor,
    process: &dyn ProcessPort,
) -> anyhow::Result<ConfigureOutcome> {
    prepare(
        settings,
        options,
        descriptor,
        process,
        ScaffoldCommand::Sync,
    )
}

/// Bundle, configure, then let the scaffold deploy to a device.
pub fn run_run(
    settings: &CoreSettings,
    options: &CommandOptions,
    descriptor: &BuildDescriptor,
    process: &dyn ProcessPort,
) -> anyhow::Result<ConfigureOutcome> {
    prepare(settings, options, descriptor, process, ScaffoldCommand::Run)
}

/// Bundle, configure, sync, then build and package the native artifact.
pub fn run_build(
    settings: &CoreSettings,
    options: &CommandOptions,
    descriptor: &BuildDescriptor,
    process: &dyn ProcessPort,
) -> anyhow::Result<PackageOutcome> {
    prepare(
        settings,
        options,
        descriptor,
        process,
        ScaffoldCommand::Sync,
    )?;
    package(settings, options, descriptor, process).context("package stage")
}

/// Run the configurator for `options.platform` and commit (or, dry, only report) its edits.
pub fn run_configure(
    settings: &CoreSettings,
    options: &CommandOptions,
    descriptor: &BuildDescriptor,
    dry_run: bool,
) -> anyhow::Result<ConfigureOutcome> {
    let mut project = MobileProject::load(&settings.project_root, &settings.paths.platforms)
        .with_dry_run(dry_run);

    if !project.has_platform(options.platform) {
        warn!(
            platform = %options.platform,
            op = "configure",
            "platform has not been added; nothing to configure"
        );
        return Ok(ConfigureOutcome::default());
    }

    let report = configure_platform(
        &mut project,
        options.platform,
        descriptor,
        &settings.paths.assets,
    )?;
    let diff = project.diff()?;
    let summary = project.commit()?;

    info!(
        platform = %options.platform,
        op = "configure",
        applied = report.applied,
        unchanged = report.unchanged,
        skipped = report.skipped.len(),
        "configured native project"
    );
    Ok(ConfigureOutcome {
        report: Some(report),
        summary,
        diff,
    })
}

fn prepare(
    settings: &CoreSettings,
    options: &CommandOptions,
    descriptor: &BuildDescriptor,
    process: &dyn ProcessPort,
    command: ScaffoldCommand,
) -> anyhow::Result<ConfigureOutcome> {
    bundle_web_assets(settings, options, process).context("web bundler stage")?;
    let outcome = run_configure(settings, options, descriptor, false).context("configure stage")?;
    run_scaffold(settings, options, command, process)?;
    Ok(outcome)
}
