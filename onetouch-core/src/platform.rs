//! Platform initializer and scaffolding tool invocations.

use crate::ports::{Invocation, ProcessPort, SpawnOptions};
use crate::settings::CoreSettings;
use anyhow::Context;
use fs_err as fs;
use onetouch_types::{CommandOptions, Platform};
use tracing::info;

/// Scaffolding tool subcommands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaffoldCommand {
    Add,
    Sync,
    Run,
}

impl ScaffoldCommand {
    pub fn as_str(self) -> &'static str {
        match self {
            ScaffoldCommand::Add => "add",
            ScaffoldCommand::Sync => "sync",
            ScaffoldCommand::Run => "run",
        }
    }
}

/// Remove the native project directory of `platform`, if any.
pub fn wipe_platform(settings: &CoreSettings, platform: Platform) -> anyhow::Result<()> {
    let dir = settings
        .abs(&settings.paths.platforms)
        .join(platform.as_str());
    if dir.exists() {
        fs::remove_dir_all(&dir).with_context(|| format!("wipe {platform} platform"))?;
        info!(platform = %platform, op = "init", path = %dir, "removed platform directory");
    }
    Ok(())
}

/// `<scaffold> cap <command> <platform> -- <forwarded flags>`.
pub fn scaffold_invocation(
    settings: &CoreSettings,
    options: &CommandOptions,
    command: ScaffoldCommand,
) -> Invocation {
    let mut args = vec![
        "cap".to_string(),
        command.as_str().to_string(),
        options.platform.to_string(),
    ];
    let extra = options.forwarded_flags();
    if !extra.is_empty() {
        args.push("--".to_string());
        args.extend(extra);
    }
    let spawn = SpawnOptions::defaults(&settings.project_root, options.stdio);
    Invocation::new(&settings.tools.scaffold, args).with_options(spawn)
}

pub fn run_scaffold(
    settings: &CoreSettings,
    options: &CommandOptions,
    command: ScaffoldCommand,
    process: &dyn ProcessPort,
) -> anyhow::Result<()> {
    info!(
        platform = %options.platform,
        op = command.as_str(),
        "handing over to scaffolding tool"
    );
    let invocation = scaffold_invocation(settings, options, command);
    process
        .run(&invocation)
        .with_context(|| format!("cap {} {}", command.as_str(), options.platform))
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn scaffold_args_forward_options_after_separator() {
        let settings = CoreSettings::default();
        let mut options = CommandOptions::new(Platform::Android);
        options.release = true;
        options.config = Some("staging".into());

        let inv = scaffold_invocation(&settings, &options, ScaffoldCommand::Sync);
        assert_eq!(inv.program, "npx");
        assert_eq!(
            inv.args,
            [
                "cap",
                "sync",
                "android",
                "--",
                "--release",
                "--config",
                "staging",
                "--android",
                "--platform",
                "android",
            ]
        );
    }

    #[test]
    fn wipe_removes_only_the_selected_platform() {
        let temp = TempDir::new().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        fs::create_dir_all(root.join("platforms/android/app")).unwrap();
        fs::create_dir_all(root.join("platforms/ios/App")).unwrap();
        let settings = CoreSettings {
            project_root: root.clone(),
            ..CoreSettings::default()
        };

        wipe_platform(&settings, Platform::Android).unwrap();
        wipe_platform(&settings, Platform::Android).unwrap();

        assert!(!root.join("platforms/android").exists());
        assert!(root.join("platforms/ios/App").exists());
    }
}
