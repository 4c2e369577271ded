//! Configuration file loading for onetouch.
//!
//! Discovers and loads `onetouch.toml` from the project root.
//! Merges config file settings with CLI arguments (CLI takes precedence).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use onetouch_core::settings::CoreSettings;
use onetouch_types::StdioMode;
use serde::Deserialize;
use tracing::debug;

/// The config file name to search for.
pub const CONFIG_FILE_NAME: &str = "onetouch.toml";

/// Top-level configuration from onetouch.toml.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OnetouchConfig {
    /// Log debug detail.
    pub verbose: Option<bool>,

    /// How child processes treat stdio.
    pub stdio: Option<StdioMode>,

    /// Skip the web bundler invocation.
    pub skip_bundler: Option<bool>,

    pub paths: PathsConfig,
    pub tools: ToolsConfig,
    pub ios: IosConfig,
}

/// Project layout, relative to the project root.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathsConfig {
    pub platforms: Option<Utf8PathBuf>,
    pub web: Option<Utf8PathBuf>,
    pub assets: Option<Utf8PathBuf>,
    pub temp: Option<Utf8PathBuf>,
    pub profiles: Option<Utf8PathBuf>,
}

/// External programs, passed to the shell verbatim.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolsConfig {
    pub bundler: Option<String>,
    pub scaffold: Option<String>,
    pub gradle: Option<String>,
    pub apksigner: Option<String>,
    pub xcodebuild: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IosConfig {
    /// Xcode workspace to archive.
    pub workspace: Option<String>,
}

/// Discover the onetouch.toml config file in the project root.
pub fn discover_config(project_root: &Utf8Path) -> Option<Utf8PathBuf> {
    let config_path = project_root.join(CONFIG_FILE_NAME);
    if config_path.exists() {
        debug!("found config file at {}", config_path);
        Some(config_path)
    } else {
        debug!("no config file found at {}", config_path);
        None
    }
}

/// Load and parse an onetouch.toml config file.
pub fn load_config(path: &Utf8Path) -> anyhow::Result<OnetouchConfig> {
    let contents = fs::read_to_string(path).with_context(|| format!("read config file {}", path))?;
    parse_config(&contents).with_context(|| format!("parse config file {}", path))
}

pub fn parse_config(contents: &str) -> anyhow::Result<OnetouchConfig> {
    let config: OnetouchConfig = toml::from_str(contents).context("invalid TOML")?;
    Ok(config)
}

/// Load config from the project root, or return default if not found.
pub fn load_or_default(project_root: &Utf8Path) -> anyhow::Result<OnetouchConfig> {
    match discover_config(project_root) {
        Some(path) => load_config(&path),
        None => Ok(OnetouchConfig::default()),
    }
}

/// Flags from the command line that can override the config file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub project_root: Utf8PathBuf,
    pub stdio: Option<StdioMode>,
    pub verbose: bool,
}

/// Merged configuration combining config file and CLI arguments.
#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub settings: CoreSettings,
    pub stdio: StdioMode,
    pub verbose: bool,
}

/// Builder for merging config file with CLI arguments.
pub struct ConfigMerger {
    config: OnetouchConfig,
}

impl ConfigMerger {
    pub fn new(config: OnetouchConfig) -> Self {
        Self { config }
    }

    /// CLI values win; unset file values keep the built-in defaults.
    pub fn merge(self, cli: &CliOverrides) -> MergedConfig {
        let defaults = CoreSettings::default();
        let OnetouchConfig {
            verbose,
            stdio,
            skip_bundler,
            paths,
            tools,
            ios,
        } = self.config;

        let mut settings = CoreSettings {
            project_root: cli.project_root.clone(),
            skip_bundler: skip_bundler.unwrap_or(defaults.skip_bundler),
            ios_workspace: ios.workspace.unwrap_or(defaults.ios_workspace),
            ..defaults
        };

        let p = &mut settings.paths;
        p.platforms = paths.platforms.unwrap_or(p.platforms.clone());
        p.web = paths.web.unwrap_or(p.web.clone());
        p.assets = paths.assets.unwrap_or(p.assets.clone());
        p.temp = paths.temp.unwrap_or(p.temp.clone());
        p.profiles = paths.profiles.unwrap_or(p.profiles.clone());

        let t = &mut settings.tools;
        t.bundler = tools.bundler.unwrap_or(t.bundler.clone());
        t.scaffold = tools.scaffold.unwrap_or(t.scaffold.clone());
        t.gradle = tools.gradle.unwrap_or(t.gradle.clone());
        t.apksigner = tools.apksigner.unwrap_or(t.apksigner.clone());
        t.xcodebuild = tools.xcodebuild.unwrap_or(t.xcodebuild.clone());

        MergedConfig {
            settings,
            stdio: cli.stdio.or(stdio).unwrap_or_default(),
            verbose: cli.verbose || verbose.unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full_config() {
        let contents = r#"
verbose = true
stdio = "ignore"

[paths]
platforms = "native"
web = "www"

[tools]
bundler = "true"
gradle = "sh ./gradlew"

[ios]
workspace = "Watchr.xcworkspace"
"#;

        let config = parse_config(contents).unwrap();
        assert_eq!(config.verbose, Some(true));
        assert_eq!(config.stdio, Some(StdioMode::Ignore));
        assert_eq!(
            config.paths.platforms.as_deref(),
            Some(Utf8Path::new("native"))
        );
        assert_eq!(config.tools.gradle.as_deref(), Some("sh ./gradlew"));
        assert_eq!(config.ios.workspace.as_deref(), Some("Watchr.xcworkspace"));
    }

    #[test]
    fn test_parse_empty_config() {
        let config = parse_config("").unwrap();
        assert!(config.verbose.is_none());
        assert!(config.tools.bundler.is_none());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = parse_config("[tools]\nbundlr = \"vite\"\n").unwrap_err();
        assert!(format!("{err:#}").contains("bundlr"));
    }

    #[test]
    fn test_merge_keeps_defaults_for_unset_values() {
        let config = parse_config("[tools]\nscaffold = \"pnpm exec\"\n").unwrap();
        let cli = CliOverrides {
            project_root: "/repo".into(),
            ..Default::default()
        };
        let merged = ConfigMerger::new(config).merge(&cli);

        assert_eq!(merged.settings.project_root, "/repo");
        assert_eq!(merged.settings.tools.scaffold, "pnpm exec");
        assert_eq!(merged.settings.tools.bundler, "vite");
        assert_eq!(merged.settings.paths.platforms, "platforms");
        assert_eq!(merged.settings.ios_workspace, "App.xcworkspace");
        assert_eq!(merged.stdio, StdioMode::Inherit);
        assert!(!merged.verbose);
    }

    #[test]
    fn test_cli_wins_over_file() {
        let config = parse_config("stdio = \"pipe\"\nverbose = false\n").unwrap();
        let cli = CliOverrides {
            project_root: ".".into(),
            stdio: Some(StdioMode::Ignore),
            verbose: true,
        };
        let merged = ConfigMerger::new(config).merge(&cli);
        assert_eq!(merged.stdio, StdioMode::Ignore);
        assert!(merged.verbose);
    }

    #[test]
    fn test_load_or_default_returns_default_when_missing() {
        let temp = TempDir::new().expect("temp dir");
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        assert!(discover_config(&root).is_none());
        let cfg = load_or_default(&root).expect("load default");
        assert!(cfg.paths.profiles.is_none());

        std::fs::write(root.join(CONFIG_FILE_NAME), "skip_bundler = true\n").unwrap();
        let cfg = load_or_default(&root).expect("load file");
        assert_eq!(cfg.skip_bundler, Some(true));
    }
}
