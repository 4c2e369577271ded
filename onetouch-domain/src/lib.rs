//! Native project configuration: turn a build descriptor into edits of the generated
//! Android and iOS projects.
//!
//! This crate owns *what* gets written into the native trees. Parsing and editing the
//! individual documents is the `onetouch-edit` crate's job; running toolchains is
//! `onetouch-core`'s.

mod android;
mod ios;
mod project;
mod report;

pub use android::{AndroidConfigurator, REQUIRED_PERMISSIONS};
pub use ios::{IosConfigurator, IosContext, IosPlugin, builtin_plugins};
pub use project::{CommitSummary, FsOp, MobileProject, NativeDoc, NativeDocument, copy_tree};
pub use report::PassReport;

use camino::Utf8Path;
use onetouch_types::{BuildDescriptor, Platform};

/// Run the configurator for `platform` against `project`. Edits stay pending until
/// [`MobileProject::commit`].
pub fn configure_platform(
    project: &mut MobileProject,
    platform: Platform,
    descriptor: &BuildDescriptor,
    assets: &Utf8Path,
) -> anyhow::Result<PassReport> {
    match platform {
        Platform::Android => AndroidConfigurator::new(descriptor, assets).configure(project),
        Platform::Ios => IosConfigurator::new(descriptor, assets).configure(project),
    }
}
