//! Scaffolding tool hooks.
//!
//! The scaffold runs `hook before-sync` with its context in environment variables. When iOS
//! is first added the generated Podfile declares the scaffold's own minimum platform, which
//! can be lower than what the app's pods need; the hook raises it to `minIosVersion`.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use onetouch_edit::raise_platform_floor;
use onetouch_profiles::load_profiles;
use serde_json::Value;
use tracing::{debug, info};

pub const PLATFORM_VAR: &str = "CAPACITOR_PLATFORM_NAME";
pub const ROOT_DIR_VAR: &str = "CAPACITOR_ROOT_DIR";
pub const CONFIG_VAR: &str = "CAPACITOR_CONFIG";

/// What the scaffold told the hook about the current sync.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookEnv {
    pub platform: Option<String>,
    pub root_dir: Option<Utf8PathBuf>,
    /// The scaffold's resolved configuration, as JSON.
    pub config: Option<String>,
}

impl HookEnv {
    pub fn from_env() -> Self {
        Self {
            platform: std::env::var(PLATFORM_VAR).ok(),
            root_dir: std::env::var(ROOT_DIR_VAR).ok().map(Utf8PathBuf::from),
            config: std::env::var(CONFIG_VAR).ok(),
        }
    }

    /// `<root>/<ios.path>/App/Podfile`, with `ios.path` defaulting to `ios`.
    fn podfile_path(&self) -> anyhow::Result<Utf8PathBuf> {
        let root = self
            .root_dir
            .clone()
            .unwrap_or_else(|| Utf8PathBuf::from("."));
        let ios_path = match &self.config {
            Some(json) => {
                let config: Value =
                    serde_json::from_str(json).with_context(|| format!("parse {CONFIG_VAR}"))?;
                config
                    .pointer("/ios/path")
                    .and_then(Value::as_str)
                    .unwrap_or("ios")
                    .to_string()
            }
            None => "ios".to_string(),
        };
        Ok(root.join(ios_path).join("App").join("Podfile"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookOutcome {
    NotIos,
    NoPodfile,
    NoMinimum,
    AlreadySatisfied,
    Raised { podfile: Utf8PathBuf, to: String },
}

/// Raise the Podfile's `platform :ios` floor to the base profile's `minIosVersion`.
pub fn before_sync(env: &HookEnv, profiles: &Utf8Path) -> anyhow::Result<HookOutcome> {
    if env.platform.as_deref() != Some("ios") {
        debug!(platform = env.platform.as_deref(), "before-sync: not ios");
        return Ok(HookOutcome::NotIos);
    }

    let podfile = env.podfile_path()?;
    if !podfile.is_file() {
        debug!(path = %podfile, "before-sync: no podfile yet");
        return Ok(HookOutcome::NoPodfile);
    }

    let descriptor = load_profiles(profiles)?.resolve(None)?;
    let Some(min) = descriptor.min_ios_version else {
        return Ok(HookOutcome::NoMinimum);
    };

    let text = fs::read_to_string(&podfile)?;
    match raise_platform_floor(&text, &min) {
        Some(updated) => {
            fs::write(&podfile, updated)?;
            info!(
                platform = "ios",
                op = "before-sync",
                min_ios_version = %min,
                "raised Podfile platform floor"
            );
            Ok(HookOutcome::Raised { podfile, to: min })
        }
        None => Ok(HookOutcome::AlreadySatisfied),
    }
}
