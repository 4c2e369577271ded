//! Web-asset bundler stage.

use crate::ports::{Invocation, ProcessPort, SpawnOptions};
use crate::settings::CoreSettings;
use anyhow::Context;
use fs_err as fs;
use onetouch_domain::copy_tree;
use onetouch_types::CommandOptions;
use tracing::{debug, info};

/// Build the web assets, then stage the branding overlay of the selected configuration.
///
/// The overlay is `<assets>/universal/<config>/`, copied into `<web>/branding` when it
/// exists.
pub fn bundle_web_assets(
    settings: &CoreSettings,
    options: &CommandOptions,
    process: &dyn ProcessPort,
) -> anyhow::Result<()> {
    let defaults = SpawnOptions::defaults(&settings.project_root, options.stdio);

    if settings.skip_bundler {
        debug!(op = "bundle", "bundler skipped");
    } else {
        let mode = if options.release {
            "production"
        } else {
            "development"
        };
        info!(op = "bundle", mode, "building web assets");
        let invocation = Invocation::new(&settings.tools.bundler, ["build", "-m", mode])
            .with_options(defaults.clone());
        process
            .run(&invocation)
            .with_context(|| format!("bundle web assets with {}", settings.tools.bundler))?;

        let temp = settings.abs(&settings.paths.temp);
        if temp.exists() {
            fs::remove_dir_all(&temp)?;
            debug!(path = %temp, "removed bundler temp dir");
        }
    }

    if let Some(config) = &options.config {
        let branding = settings
            .abs(&settings.paths.assets)
            .join("universal")
            .join(config);
        if branding.is_dir() {
            let dest = settings.abs(&settings.paths.web).join("branding");
            copy_tree(&branding, &dest)
                .with_context(|| format!("stage branding {branding} -> {dest}"))?;
            info!(op = "bundle", config = %config, dest = %dest, "staged branding");
        } else {
            debug!(op = "bundle", config = %config, "no branding overlay");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::RecordingProcessPort;
    use camino::Utf8PathBuf;
    use onetouch_types::Platform;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn settings(temp: &TempDir) -> CoreSettings {
        CoreSettings {
            project_root: Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap(),
            ..CoreSettings::default()
        }
    }

    #[test]
    fn release_builds_production_and_clears_temp() {
        let temp = TempDir::new().unwrap();
        let settings = settings(&temp);
        fs::create_dir_all(settings.project_root.join("temp/cache")).unwrap();

        let port = RecordingProcessPort::new();
        let mut options = CommandOptions::new(Platform::Android);
        options.release = true;
        bundle_web_assets(&settings, &options, &port).unwrap();

        let calls = port.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].program, "vite");
        assert_eq!(calls[0].args, ["build", "-m", "production"]);
        assert_eq!(calls[0].options.cwd.as_ref(), Some(&settings.project_root));
        assert!(!settings.project_root.join("temp").exists());
    }

    #[test]
    fn branding_overlay_is_copied_for_config() {
        let temp = TempDir::new().unwrap();
        let settings = CoreSettings {
            skip_bundler: true,
            ..settings(&temp)
        };
        let overlay = settings.project_root.join("bin/assets/universal/staging");
        fs::create_dir_all(&overlay).unwrap();
        fs::write(overlay.join("logo.svg"), "<svg/>").unwrap();

        let port = RecordingProcessPort::new();
        let mut options = CommandOptions::new(Platform::Ios);
        options.config = Some("staging".into());
        bundle_web_assets(&settings, &options, &port).unwrap();

        assert!(port.calls().is_empty());
        let staged =
            fs::read_to_string(settings.project_root.join("dist/branding/logo.svg")).unwrap();
        assert_eq!(staged, "<svg/>");
    }

    #[test]
    fn bundler_failure_aborts() {
        let temp = TempDir::new().unwrap();
        let settings = settings(&temp);
        let port = RecordingProcessPort::new().fail("vite");
        let options = CommandOptions::new(Platform::Android);
        let err = bundle_web_assets(&settings, &options, &port).unwrap_err();
        assert!(format!("{err:#}").contains("vite exited with exit code 1"));
    }
}
